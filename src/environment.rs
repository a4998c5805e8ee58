//! Snapshot of the execution environment the installer targets.
//!
//! Everything the installer needs from the process environment (interpreter
//! path, environment prefix, Jupyter data directories) is read once here and
//! then passed around as a plain value.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable naming the interpreter to register, ahead of PATH lookup.
pub const PYTHON_ENV_VAR: &str = "KESTREL_PYTHON";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Interpreter that launches the Kestrel backend (`argv[0]` of the kernel).
    pub interpreter: PathBuf,
    /// Install prefix of the active environment (`sys.prefix` equivalent).
    pub prefix: Option<PathBuf>,
    /// `JUPYTER_DATA_DIR`, which replaces the per-user data directory when set.
    pub jupyter_data_dir: Option<PathBuf>,
    /// Platform default per-user Jupyter data directory.
    pub user_data_dir: Option<PathBuf>,
    /// System-wide Jupyter data directory.
    pub system_data_dir: Option<PathBuf>,
}

impl Environment {
    /// Detect the environment from the current process.
    pub fn detect(python: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("resolving current directory")?;
        Self::detect_with(python, &cwd, |key| std::env::var_os(key))
    }

    /// Detect the environment through an explicit variable lookup.
    pub fn detect_with<F>(python: Option<&Path>, cwd: &Path, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let path_var = |key: &str| var(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        let explicit = python
            .map(Path::to_path_buf)
            .or_else(|| path_var(PYTHON_ENV_VAR))
            .map(|path| absolute(cwd, &path));

        // A named interpreter carries its own environment; the activated one may differ.
        let (interpreter, prefix) = match explicit {
            Some(interpreter) => {
                let prefix = interpreter_prefix(&interpreter)
                    .or_else(|| path_var("VIRTUAL_ENV"))
                    .or_else(|| path_var("CONDA_PREFIX"));
                (interpreter, prefix)
            }
            None => {
                let interpreter = locate_interpreter(&path_var)?;
                let prefix = path_var("VIRTUAL_ENV")
                    .or_else(|| path_var("CONDA_PREFIX"))
                    .or_else(|| interpreter_prefix(&interpreter));
                (interpreter, prefix)
            }
        };

        let user_data_dir = default_user_data_dir(&path_var);
        let system_data_dir = default_system_data_dir(&path_var);

        Ok(Self {
            interpreter,
            prefix,
            jupyter_data_dir: path_var("JUPYTER_DATA_DIR").map(|p| absolute(cwd, &p)),
            user_data_dir,
            system_data_dir,
        })
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn locate_interpreter(path_var: &dyn Fn(&str) -> Option<PathBuf>) -> Result<PathBuf> {
    for env_key in ["VIRTUAL_ENV", "CONDA_PREFIX"] {
        if let Some(prefix) = path_var(env_key) {
            let candidate = prefix_interpreter(&prefix);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    for name in ["python3", "python"] {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    bail!(
        "Could not find a Python interpreter.\n\n\
         Resolution order tried:\n\
         1. {PYTHON_ENV_VAR} env var - not set\n\
         2. VIRTUAL_ENV / CONDA_PREFIX interpreters - not found\n\
         3. python3 / python on PATH - not found\n\n\
         Pass --python /path/to/python or set {PYTHON_ENV_VAR}."
    )
}

#[cfg(windows)]
fn prefix_interpreter(prefix: &Path) -> PathBuf {
    let scripts = prefix.join("Scripts").join("python.exe");
    if scripts.is_file() {
        scripts
    } else {
        prefix.join("python.exe")
    }
}

#[cfg(not(windows))]
fn prefix_interpreter(prefix: &Path) -> PathBuf {
    prefix.join("bin").join("python")
}

/// Derive the install prefix from the interpreter's location on disk.
fn interpreter_prefix(interpreter: &Path) -> Option<PathBuf> {
    let parent = interpreter.parent()?;
    match parent.file_name().and_then(|part| part.to_str()) {
        Some("bin") | Some("Scripts") => parent.parent().map(Path::to_path_buf),
        _ if cfg!(windows) => Some(parent.to_path_buf()),
        _ => None,
    }
}

#[cfg(target_os = "macos")]
fn default_user_data_dir(_path_var: &dyn Fn(&str) -> Option<PathBuf>) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Library").join("Jupyter"))
}

#[cfg(windows)]
fn default_user_data_dir(path_var: &dyn Fn(&str) -> Option<PathBuf>) -> Option<PathBuf> {
    path_var("APPDATA")
        .or_else(dirs::data_dir)
        .map(|appdata| appdata.join("jupyter"))
}

#[cfg(not(any(target_os = "macos", windows)))]
fn default_user_data_dir(path_var: &dyn Fn(&str) -> Option<PathBuf>) -> Option<PathBuf> {
    path_var("XDG_DATA_HOME")
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .map(|data| data.join("jupyter"))
}

#[cfg(windows)]
fn default_system_data_dir(path_var: &dyn Fn(&str) -> Option<PathBuf>) -> Option<PathBuf> {
    path_var("PROGRAMDATA").map(|programdata| programdata.join("jupyter"))
}

#[cfg(not(windows))]
fn default_system_data_dir(_path_var: &dyn Fn(&str) -> Option<PathBuf>) -> Option<PathBuf> {
    Some(PathBuf::from("/usr/local/share/jupyter"))
}
