use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;
use kestrel_jupyter::config::load_kernel_settings;
use kestrel_jupyter::error::{EXIT_ENVIRONMENT, EXIT_USAGE};
use kestrel_jupyter::logging::{init_logging, DEFAULT_LOG_LEVEL};
use kestrel_jupyter::{
    AlwaysOverwrite, AssetBundle, ConfirmOverwrite, Environment, InstallOptions, Installer,
    KernelSettings, Scope,
};

/// Install the Kestrel kernel spec for Jupyter.
#[derive(Parser, Debug)]
#[command(name = "kestrel_jupyter_setup", version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    install: InstallArgs,

    /// Diagnostic log level on stderr (off, error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install or refresh the kernel spec (default)
    Install(InstallArgs),
    /// Remove the kernel spec
    Uninstall(TargetArgs),
}

#[derive(Args, Debug, Clone, Default)]
struct InstallArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Replace an existing, different kernel spec without prompting
    #[arg(short, long)]
    force: bool,

    /// Label shown in the notebook's kernel picker
    #[arg(long, value_name = "LABEL")]
    display_name: Option<String>,

    /// Copy assets from this directory instead of the bundled ones
    #[arg(long, value_name = "DIR")]
    assets_dir: Option<PathBuf>,

    /// Also install the CodeMirror mode under this CodeMirror `mode/` directory
    #[arg(long, value_name = "DIR")]
    codemirror_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
struct TargetArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// Kernel name (directory under the kernel-spec root)
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Interpreter that runs the Kestrel backend [default: active Python]
    #[arg(long, value_name = "PATH")]
    python: Option<PathBuf>,

    /// TOML file with a [kernel] table
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report what would be done without writing anything
    #[arg(short = 'n', long)]
    dry_run: bool,
}

#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
struct ScopeArgs {
    /// Kernel-spec root to install into
    #[arg(long, value_enum, value_name = "SCOPE")]
    scope: Option<ScopeKind>,

    /// Install for the current user (default)
    #[arg(long)]
    user: bool,

    /// Install system-wide
    #[arg(long)]
    system: bool,

    /// Install into the active environment's prefix
    #[arg(long)]
    sys_prefix: bool,

    /// Install into <PATH>/share/jupyter/kernels
    #[arg(long, value_name = "PATH")]
    prefix: Option<PathBuf>,

    /// Install into this kernel-spec root directly
    #[arg(long, value_name = "PATH")]
    kernel_root: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    User,
    System,
    Prefix,
}

impl ScopeArgs {
    fn to_scope(&self, cwd: &Path) -> Scope {
        if let Some(root) = &self.kernel_root {
            return Scope::Explicit(cwd.join(root));
        }
        if let Some(prefix) = &self.prefix {
            return Scope::Prefix(Some(cwd.join(prefix)));
        }
        if self.system {
            return Scope::System;
        }
        if self.sys_prefix {
            return Scope::Prefix(None);
        }
        match self.scope {
            Some(ScopeKind::System) => Scope::System,
            Some(ScopeKind::Prefix) => Scope::Prefix(None),
            Some(ScopeKind::User) | None => Scope::User,
        }
    }
}

/// Prompts on an interactive terminal; otherwise replaces with a warning.
struct TerminalConfirm {
    interactive: bool,
}

impl TerminalConfirm {
    fn detect() -> Self {
        Self {
            interactive: io::stdin().is_terminal(),
        }
    }
}

impl ConfirmOverwrite for TerminalConfirm {
    fn confirm_overwrite(&mut self, descriptor_path: &Path) -> bool {
        if !self.interactive {
            return AlwaysOverwrite.confirm_overwrite(descriptor_path);
        }
        let text = format!(
            "A different kernel spec exists at {}. Replace it?",
            descriptor_path.display()
        );
        match Confirm::new().with_prompt(text).default(false).interact() {
            Ok(answer) => answer,
            Err(err) => {
                log::error!("overwrite prompt failed: {err}");
                false
            }
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(EXIT_USAGE);
        }
        Err(err) => err.exit(),
    };

    if let Err(err) = init_logging(&cli.log_level) {
        eprintln!("{err:#}");
        std::process::exit(EXIT_USAGE);
    }

    let code = match cli.command {
        Some(Command::Uninstall(target)) => uninstall(&target),
        Some(Command::Install(args)) => install(&args),
        None => install(&cli.install),
    };
    std::process::exit(code);
}

fn install(args: &InstallArgs) -> i32 {
    let (options, env) = match prepare(&args.target) {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };
    let options = InstallOptions {
        force: args.force,
        codemirror_dir: args.codemirror_dir.clone(),
        settings: KernelSettings {
            display_name: args
                .display_name
                .clone()
                .unwrap_or(options.settings.display_name),
            ..options.settings
        },
        ..options
    };

    let bundle = match &args.assets_dir {
        Some(dir) => match AssetBundle::from_dir(dir) {
            Ok(bundle) => bundle,
            Err(err) => {
                eprintln!("[kestrel:install] error: {err:#}");
                return EXIT_USAGE;
            }
        },
        None => AssetBundle::embedded(),
    };

    let installer = Installer::new(env, bundle, options);
    installer.run(&mut TerminalConfirm::detect(), &mut io::stdout())
}

fn uninstall(target: &TargetArgs) -> i32 {
    let (options, env) = match prepare(target) {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };
    let installer = Installer::new(env, AssetBundle::embedded(), options);
    installer.run_uninstall(&mut io::stdout())
}

/// Resolve the environment and shared options, or the exit code to stop with.
fn prepare(target: &TargetArgs) -> std::result::Result<(InstallOptions, Environment), i32> {
    let cwd = match std::env::current_dir().context("resolving current directory") {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("[kestrel] error: {err:#}");
            return Err(EXIT_ENVIRONMENT);
        }
    };

    let settings = match load_settings(target) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("[kestrel] error: {err:#}");
            return Err(EXIT_USAGE);
        }
    };

    let env = match Environment::detect(target.python.as_deref()) {
        Ok(env) => env,
        Err(err) => {
            eprintln!("[kestrel] error: {err:#}");
            return Err(EXIT_ENVIRONMENT);
        }
    };
    log::debug!("environment: {env:?}");

    let options = InstallOptions {
        scope: target.scope.to_scope(&cwd),
        settings,
        dry_run: target.dry_run,
        ..InstallOptions::default()
    };
    Ok((options, env))
}

fn load_settings(target: &TargetArgs) -> Result<KernelSettings> {
    let mut settings = match &target.config {
        Some(path) => load_kernel_settings(path)?,
        None => KernelSettings::default(),
    };
    if let Some(name) = &target.name {
        kestrel_jupyter::kernelspec::validate_kernel_name(name)?;
        settings.name = name.clone();
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("kestrel_jupyter_setup").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn no_arguments_means_user_install() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert_eq!(cli.install.target.scope.to_scope(Path::new("/")), Scope::User);
        assert_eq!(scope(&["--user"]), Scope::User);
        assert_eq!(cli.log_level, "warn");
    }

    fn scope(args: &[&str]) -> Scope {
        parse(args).install.target.scope.to_scope(Path::new("/work"))
    }

    #[test]
    fn scope_flags_map_to_scopes() {
        assert_eq!(scope(&["--system"]), Scope::System);
        assert_eq!(scope(&["--sys-prefix"]), Scope::Prefix(None));
        assert_eq!(scope(&["--scope", "prefix"]), Scope::Prefix(None));
        assert_eq!(
            scope(&["--prefix", "env"]),
            Scope::Prefix(Some(PathBuf::from("/work/env")))
        );
        assert_eq!(
            scope(&["--kernel-root", "/srv/kernels"]),
            Scope::Explicit(PathBuf::from("/srv/kernels"))
        );
    }

    #[test]
    fn scope_flags_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["kestrel_jupyter_setup", "--user", "--system"]);
        assert!(result.is_err());
    }

    #[test]
    fn uninstall_subcommand_parses() {
        let cli = parse(&["uninstall", "--name", "kestrel-dev", "--dry-run"]);
        let Some(Command::Uninstall(target)) = cli.command else {
            panic!("expected uninstall");
        };
        assert_eq!(target.name.as_deref(), Some("kestrel-dev"));
        assert!(target.dry_run);
    }

    #[test]
    fn install_flags_parse() {
        let cli = parse(&["install", "--force", "--display-name", "Kestrel (dev)"]);
        let Some(Command::Install(args)) = cli.command else {
            panic!("expected install");
        };
        assert!(args.force);
        assert_eq!(args.display_name.as_deref(), Some("Kestrel (dev)"));
    }

    #[test]
    fn non_interactive_confirm_replaces() {
        let mut confirm = TerminalConfirm { interactive: false };
        assert!(confirm.confirm_overwrite(Path::new("/k/kestrel/kernel.json")));
    }

    #[test]
    fn invalid_name_is_a_usage_error() {
        let target = TargetArgs {
            name: Some("bad name".to_string()),
            ..TargetArgs::default()
        };
        assert!(load_settings(&target).is_err());
    }
}
