//! Preflight checks for the kernel launch command.
//!
//! The installer does not require the backend to be runnable at install time,
//! but an obviously broken `argv[0]` is worth a warning before the front-end
//! fails to start the kernel.
//!
//! # Example
//!
//! ```rust
//! use kestrel_jupyter::preflight::check_launch_command;
//!
//! let argv = vec!["/definitely/not/python".to_string()];
//! for warning in check_launch_command(&argv) {
//!     eprintln!("warning: {}", warning);
//! }
//! ```

use std::path::Path;

/// Check if a command can be found on PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Warnings about the launch command; empty when nothing looks wrong.
pub fn check_launch_command(argv: &[String]) -> Vec<String> {
    let mut warnings = Vec::new();

    let Some(program) = argv.first() else {
        warnings.push("kernel launch command is empty".to_string());
        return warnings;
    };

    let path = Path::new(program);
    if !path.is_absolute() {
        if !command_exists(program) {
            warnings.push(format!("'{}' is not on PATH", program));
        }
        return warnings;
    }

    if !path.exists() {
        warnings.push(format!(
            "interpreter '{}' does not exist; the kernel will fail to start until it does",
            path.display()
        ));
    } else if !path.is_file() {
        warnings.push(format!("interpreter '{}' is not a file", path.display()));
    } else if !is_executable(path) {
        warnings.push(format!("interpreter '{}' is not executable", path.display()));
    }

    warnings
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
