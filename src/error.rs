//! Installer error taxonomy and the exit codes each class maps to.
//!
//! Resolution and descriptor-write errors are fatal. Asset-copy errors are
//! collected per file and downgrade a run to partial success.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ENVIRONMENT: i32 = 1;
pub const EXIT_DESCRIPTOR: i32 = 2;
pub const EXIT_PARTIAL: i32 = 3;
pub const EXIT_CANCELLED: i32 = 4;
pub const EXIT_USAGE: i32 = 64;

/// No writable kernel-spec root could be resolved for the requested scope.
#[derive(Debug, Error)]
#[error("cannot use kernel-spec root '{}': {reason}", path.display())]
pub struct EnvironmentResolutionError {
    pub path: PathBuf,
    pub reason: String,
}

impl EnvironmentResolutionError {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Serializing or persisting `kernel.json` failed.
#[derive(Debug, Error)]
#[error("failed to {action} '{}': {source}", path.display())]
pub struct DescriptorWriteError {
    pub path: PathBuf,
    pub action: &'static str,
    #[source]
    pub source: io::Error,
}

impl DescriptorWriteError {
    pub fn new(path: impl Into<PathBuf>, action: &'static str, source: io::Error) -> Self {
        Self {
            path: path.into(),
            action,
            source,
        }
    }
}

/// One asset that could not be copied.
#[derive(Debug)]
pub struct AssetFailure {
    pub name: String,
    pub destination: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for AssetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> '{}': {}",
            self.name,
            self.destination.display(),
            self.source
        )
    }
}

/// Every asset that failed during a copy pass.
#[derive(Debug)]
pub struct AssetCopyError {
    pub failures: Vec<AssetFailure>,
}

impl AssetCopyError {
    /// Names of the assets that failed, in bundle order.
    pub fn failed_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.name.as_str()).collect()
    }
}

impl fmt::Display for AssetCopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} asset(s) failed to copy:", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AssetCopyError {}

/// Fatal outcome of an installer run.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Environment(#[from] EnvironmentResolutionError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorWriteError),
    #[error("invalid kernel name '{0}': expected only ASCII letters, digits, '.', '_' or '-'")]
    InvalidName(String),
    #[error("kept existing kernel spec at '{}'", .0.display())]
    Cancelled(PathBuf),
}

impl InstallError {
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::Environment(_) => EXIT_ENVIRONMENT,
            InstallError::Descriptor(_) => EXIT_DESCRIPTOR,
            InstallError::Cancelled(_) => EXIT_CANCELLED,
            InstallError::InvalidName(_) => EXIT_USAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_copy_error_names_every_failure() {
        let err = AssetCopyError {
            failures: vec![
                AssetFailure {
                    name: "kernel.js".into(),
                    destination: PathBuf::from("/k/kernel.js"),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
                },
                AssetFailure {
                    name: "kestrel.js".into(),
                    destination: PathBuf::from("/k/kestrel.js"),
                    source: io::Error::new(io::ErrorKind::Other, "disk full"),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.starts_with("2 asset(s) failed"));
        assert!(msg.contains("kernel.js -> '/k/kernel.js': denied"));
        assert!(msg.contains("kestrel.js -> '/k/kestrel.js': disk full"));
        assert_eq!(err.failed_names(), vec!["kernel.js", "kestrel.js"]);
    }

    #[test]
    fn exit_codes_follow_failure_class() {
        let env: InstallError = EnvironmentResolutionError::new("/nope", "not writable").into();
        assert_eq!(env.exit_code(), EXIT_ENVIRONMENT);

        let desc: InstallError = DescriptorWriteError::new(
            "/k/kernel.json",
            "write",
            io::Error::new(io::ErrorKind::Other, "boom"),
        )
        .into();
        assert_eq!(desc.exit_code(), EXIT_DESCRIPTOR);
        assert!(desc.to_string().contains("/k/kernel.json"));

        assert_eq!(
            InstallError::Cancelled(PathBuf::from("/k")).exit_code(),
            EXIT_CANCELLED
        );
    }
}
