//! Registers the Kestrel runtime as a Jupyter kernel.
//!
//! The crate writes a kernel spec (`kernel.json` plus static assets) into one
//! of the kernel-spec roots the notebook front-end scans. The Kestrel backend
//! itself is an external Python module the descriptor launches.
//!
//! # Architecture
//!
//! ```text
//! kestrel_jupyter_setup (bin)
//!     │
//!     ├── Environment::detect        interpreter, prefix, data dirs (read once)
//!     └── Installer::run
//!             ├── resolve_target_directory   scope -> writable kernel-spec root
//!             ├── build_descriptor           argv / display_name / language
//!             ├── write_descriptor           temp file + atomic rename
//!             └── copy_assets                kernel.js, kestrel.js
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use kestrel_jupyter::{AlwaysOverwrite, AssetBundle, Environment, InstallOptions, Installer};
//!
//! let env = Environment::detect(None)?;
//! let installer = Installer::new(env, AssetBundle::embedded(), InstallOptions::default());
//! let code = installer.run(&mut AlwaysOverwrite, &mut std::io::stdout());
//! std::process::exit(code);
//! ```

pub mod assets;
pub mod config;
pub mod environment;
pub mod error;
pub mod installer;
pub mod kernelspec;
pub mod logging;
pub mod preflight;

pub use assets::{copy_assets, AssetBundle};
pub use environment::Environment;
pub use error::{AssetCopyError, DescriptorWriteError, EnvironmentResolutionError, InstallError};
pub use installer::{AlwaysOverwrite, ConfirmOverwrite, InstallOptions, Installer};
pub use kernelspec::{
    build_descriptor, resolve_target_directory, write_descriptor, KernelDescriptor,
    KernelSettings, Scope,
};
