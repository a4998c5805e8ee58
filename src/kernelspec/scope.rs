//! Kernel-spec root selection.
//!
//! Each scope maps to exactly one root. There is no fallback between roots:
//! if the selected root is not writable the install stops before touching
//! the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use crate::environment::Environment;
use crate::error::EnvironmentResolutionError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Per-user data directory (or `JUPYTER_DATA_DIR`).
    #[default]
    User,
    /// System-wide data directory.
    System,
    /// `<prefix>/share/jupyter`; `None` uses the active environment's prefix.
    Prefix(Option<PathBuf>),
    /// A kernel-spec root given verbatim.
    Explicit(PathBuf),
}

impl Scope {
    pub fn label(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::System => "system",
            Scope::Prefix(_) => "prefix",
            Scope::Explicit(_) => "explicit",
        }
    }
}

/// Canonical kernel-spec root for `scope`, without checking writability.
pub fn kernel_root(scope: &Scope, env: &Environment) -> Result<PathBuf, EnvironmentResolutionError> {
    let data_dir = match scope {
        Scope::User => env
            .jupyter_data_dir
            .clone()
            .or_else(|| env.user_data_dir.clone())
            .ok_or_else(|| {
                EnvironmentResolutionError::new(
                    "<user data dir>",
                    "no home directory and JUPYTER_DATA_DIR is not set",
                )
            })?,
        Scope::System => env.system_data_dir.clone().ok_or_else(|| {
            EnvironmentResolutionError::new(
                "<system data dir>",
                "no system-wide Jupyter data directory on this platform",
            )
        })?,
        Scope::Prefix(prefix) => prefix
            .clone()
            .or_else(|| env.prefix.clone())
            .map(|prefix| prefix.join("share").join("jupyter"))
            .ok_or_else(|| {
                EnvironmentResolutionError::new(
                    env.interpreter.clone(),
                    "cannot determine the environment prefix of this interpreter; pass --prefix",
                )
            })?,
        Scope::Explicit(root) => return Ok(root.clone()),
    };
    Ok(data_dir.join("kernels"))
}

/// Resolve the kernel-spec root for `scope` and confirm it can be written.
///
/// The root itself may not exist yet; its nearest existing ancestor must be a
/// writable directory. Nothing is created here.
pub fn resolve_target_directory(
    scope: &Scope,
    env: &Environment,
) -> Result<PathBuf, EnvironmentResolutionError> {
    let root = kernel_root(scope, env)?;
    ensure_writable(&root)?;
    Ok(root)
}

fn ensure_writable(root: &Path) -> Result<(), EnvironmentResolutionError> {
    let ancestor = root
        .ancestors()
        .find(|candidate| fs::symlink_metadata(candidate).is_ok())
        .ok_or_else(|| EnvironmentResolutionError::new(root, "no existing ancestor directory"))?;

    if !ancestor.is_dir() {
        return Err(EnvironmentResolutionError::new(
            root,
            format!("'{}' exists but is not a directory", ancestor.display()),
        ));
    }
    if !is_writable(ancestor) {
        return Err(EnvironmentResolutionError::new(
            root,
            format!("'{}' is not writable by the current user", ancestor.display()),
        ));
    }
    log::debug!(
        "kernel-spec root '{}' writable via '{}'",
        root.display(),
        ancestor.display()
    );
    Ok(())
}

#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    rustix::fs::access(path, rustix::fs::Access::WRITE_OK).is_ok()
}

#[cfg(not(unix))]
fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}
