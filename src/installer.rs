//! Install orchestration: resolve → build → write → copy.
//!
//! `Installer::install` and `Installer::plan` return typed results for
//! programmatic callers. `Installer::run` wraps them with the printed summary
//! and the exit code the command-line entry point returns.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::assets::{self, AssetBundle};
use crate::environment::Environment;
use crate::error::{AssetCopyError, DescriptorWriteError, InstallError, EXIT_PARTIAL, EXIT_SUCCESS};
use crate::kernelspec::{
    build_descriptor, descriptor_state, kernel_dir, remove_kernel_dir, resolve_target_directory,
    validate_kernel_name, write_descriptor, DescriptorState, KernelDescriptor, KernelSettings, Scope,
    DESCRIPTOR_FILENAME,
};
use crate::preflight::check_launch_command;

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub scope: Scope,
    pub settings: KernelSettings,
    /// Replace a differing descriptor without asking.
    pub force: bool,
    /// Report intended actions without writing anything.
    pub dry_run: bool,
    /// CodeMirror `mode/` directory to receive `kestrel/kestrel.js`.
    pub codemirror_dir: Option<PathBuf>,
}

/// Decides whether an existing, different kernel spec may be replaced.
pub trait ConfirmOverwrite {
    fn confirm_overwrite(&mut self, descriptor_path: &Path) -> bool;
}

/// Replaces existing kernel specs without asking.
pub struct AlwaysOverwrite;

impl ConfirmOverwrite for AlwaysOverwrite {
    fn confirm_overwrite(&mut self, descriptor_path: &Path) -> bool {
        log::warn!("replacing existing kernel spec '{}'", descriptor_path.display());
        true
    }
}

/// Result of an install that wrote the descriptor.
#[derive(Debug)]
pub struct InstallReport {
    pub root: PathBuf,
    pub kernel_dir: PathBuf,
    pub descriptor_path: PathBuf,
    pub previous: DescriptorState,
    pub assets: Vec<PathBuf>,
    pub asset_error: Option<AssetCopyError>,
    pub warnings: Vec<String>,
}

impl InstallReport {
    pub fn exit_code(&self) -> i32 {
        if self.asset_error.is_some() {
            EXIT_PARTIAL
        } else {
            EXIT_SUCCESS
        }
    }
}

/// What an install would do, computed without writing anything.
#[derive(Debug)]
pub struct InstallPlan {
    pub root: PathBuf,
    pub kernel_dir: PathBuf,
    pub descriptor_path: PathBuf,
    pub descriptor: KernelDescriptor,
    pub descriptor_json: String,
    pub existing: DescriptorState,
    pub assets: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct UninstallReport {
    pub kernel_dir: PathBuf,
    pub removed: bool,
}

pub struct Installer {
    env: Environment,
    bundle: AssetBundle,
    options: InstallOptions,
}

impl Installer {
    pub fn new(env: Environment, bundle: AssetBundle, options: InstallOptions) -> Self {
        Self {
            env,
            bundle,
            options,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Resolve the target and build the descriptor; touches nothing on disk.
    pub fn plan(&self) -> Result<InstallPlan, InstallError> {
        let root = resolve_target_directory(&self.options.scope, &self.env)?;
        let descriptor = build_descriptor(&self.env.interpreter, &self.options.settings)?;
        let descriptor_json = descriptor.to_json().map_err(|e| {
            DescriptorWriteError::new(
                kernel_dir(&root, &descriptor).join(DESCRIPTOR_FILENAME),
                "serialize",
                e.into(),
            )
        })?;

        let dir = kernel_dir(&root, &descriptor);
        let mut assets: Vec<PathBuf> = self.bundle.iter().map(|a| dir.join(&a.name)).collect();
        if let Some(codemirror_dir) = &self.options.codemirror_dir {
            assets.push(assets::codemirror_mode_path(codemirror_dir));
        }

        Ok(InstallPlan {
            descriptor_path: dir.join(DESCRIPTOR_FILENAME),
            existing: descriptor_state(&root, &descriptor),
            warnings: check_launch_command(&descriptor.launch_argv),
            kernel_dir: dir,
            root,
            descriptor,
            descriptor_json,
            assets,
        })
    }

    /// Run the full install. Asset failures are reported in the result, not as errors.
    pub fn install(
        &self,
        confirm: &mut dyn ConfirmOverwrite,
    ) -> Result<InstallReport, InstallError> {
        let plan = self.plan()?;
        for warning in &plan.warnings {
            log::warn!("{warning}");
        }

        if plan.existing == DescriptorState::Different
            && !self.options.force
            && !confirm.confirm_overwrite(&plan.descriptor_path)
        {
            return Err(InstallError::Cancelled(plan.kernel_dir));
        }

        let descriptor_path = write_descriptor(&plan.root, &plan.descriptor)?;
        log::info!("wrote {}", descriptor_path.display());

        let mut copied: Vec<PathBuf> = self
            .bundle
            .iter()
            .map(|asset| plan.kernel_dir.join(&asset.name))
            .collect();
        let mut asset_error = assets::copy_assets(&plan.kernel_dir, &self.bundle).err();
        if let Some(err) = &asset_error {
            copied.retain(|path| err.failures.iter().all(|f| &f.destination != path));
        }

        if let Some(codemirror_dir) = &self.options.codemirror_dir {
            match assets::install_codemirror_mode(codemirror_dir, &self.bundle) {
                Ok(path) => copied.push(path),
                Err(err) => match asset_error.as_mut() {
                    Some(existing) => existing.failures.extend(err.failures),
                    None => asset_error = Some(err),
                },
            }
        }

        Ok(InstallReport {
            root: plan.root,
            kernel_dir: plan.kernel_dir,
            descriptor_path,
            previous: plan.existing,
            assets: copied,
            asset_error,
            warnings: plan.warnings,
        })
    }

    /// Remove the kernel spec directory for the configured scope and name.
    pub fn uninstall(&self) -> Result<UninstallReport, InstallError> {
        validate_kernel_name(&self.options.settings.name)?;
        let root = resolve_target_directory(&self.options.scope, &self.env)?;
        let dir = root.join(&self.options.settings.name);
        if self.options.dry_run {
            return Ok(UninstallReport {
                removed: dir.exists(),
                kernel_dir: dir,
            });
        }
        let removed = remove_kernel_dir(&root, &self.options.settings.name)?;
        Ok(UninstallReport {
            kernel_dir: dir,
            removed,
        })
    }

    /// Install (or plan, for dry runs), print a summary to `out`, return the exit code.
    pub fn run(&self, confirm: &mut dyn ConfirmOverwrite, out: &mut dyn Write) -> i32 {
        let tag = if self.options.dry_run {
            "kestrel:dry-run"
        } else {
            "kestrel:install"
        };

        if self.options.dry_run {
            return match self.plan() {
                Ok(plan) => {
                    print_plan(out, tag, &self.options.scope, &plan);
                    EXIT_SUCCESS
                }
                Err(err) => fail(out, tag, err),
            };
        }

        match self.install(confirm) {
            Ok(report) => {
                print_report(out, tag, &self.options.scope, &report);
                report.exit_code()
            }
            Err(err) => fail(out, tag, err),
        }
    }

    /// Uninstall, print a summary to `out`, return the exit code.
    pub fn run_uninstall(&self, out: &mut dyn Write) -> i32 {
        let tag = "kestrel:uninstall";
        match self.uninstall() {
            Ok(report) => {
                let line = match (report.removed, self.options.dry_run) {
                    (true, true) => format!("would remove {}", report.kernel_dir.display()),
                    (true, false) => format!("removed {}", report.kernel_dir.display()),
                    (false, _) => format!(
                        "no kernel spec installed at {}",
                        report.kernel_dir.display()
                    ),
                };
                say(out, tag, &line);
                EXIT_SUCCESS
            }
            Err(err) => fail(out, tag, err),
        }
    }
}

fn say(out: &mut dyn Write, tag: &str, line: &str) {
    if let Err(err) = writeln!(out, "[{tag}] {line}") {
        log::error!("failed to write summary: {err}");
    }
}

fn fail(out: &mut dyn Write, tag: &str, err: InstallError) -> i32 {
    log::error!("{err}");
    say(out, tag, &format!("error: {err}"));
    err.exit_code()
}

fn print_plan(out: &mut dyn Write, tag: &str, scope: &Scope, plan: &InstallPlan) {
    say(
        out,
        tag,
        &format!("kernel-spec root ({}): {}", scope.label(), plan.root.display()),
    );
    let existing = match plan.existing {
        DescriptorState::Missing => "new install",
        DescriptorState::Identical => "identical descriptor already installed",
        DescriptorState::Different => "would replace a different descriptor",
    };
    say(out, tag, existing);
    say(
        out,
        tag,
        &format!("would write {}:", plan.descriptor_path.display()),
    );
    if let Err(err) = out.write_all(plan.descriptor_json.as_bytes()) {
        log::error!("failed to write summary: {err}");
    }
    for asset in &plan.assets {
        say(out, tag, &format!("would copy {}", asset.display()));
    }
    for warning in &plan.warnings {
        say(out, tag, &format!("warning: {warning}"));
    }
}

fn print_report(out: &mut dyn Write, tag: &str, scope: &Scope, report: &InstallReport) {
    say(
        out,
        tag,
        &format!("kernel-spec root ({}): {}", scope.label(), report.root.display()),
    );
    let verb = match report.previous {
        DescriptorState::Missing => "installed",
        DescriptorState::Identical => "reinstalled",
        DescriptorState::Different => "replaced",
    };
    say(
        out,
        tag,
        &format!("{verb} {}", report.descriptor_path.display()),
    );
    for asset in &report.assets {
        say(out, tag, &format!("copied {}", asset.display()));
    }
    for warning in &report.warnings {
        say(out, tag, &format!("warning: {warning}"));
    }
    match &report.asset_error {
        Some(err) => {
            log::warn!("{err}");
            say(out, tag, &format!("warning: {err}"));
            say(
                out,
                tag,
                "partial success: the kernel is registered but its static assets are incomplete",
            );
        }
        None => say(out, tag, "done"),
    }
}
