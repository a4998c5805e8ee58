//! Optional TOML configuration for the installed kernel.
//!
//! ```toml
//! [kernel]
//! name = "kestrel-dev"
//! display_name = "Kestrel (dev)"
//! module = "kestrel_jupyter_kernel"
//!
//! [kernel.env]
//! KESTREL_CONFIG = "/etc/kestrel/kestrel.yaml"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::kernelspec::{validate_kernel_name, KernelSettings};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallerToml {
    kernel: Option<KernelToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KernelToml {
    name: Option<String>,
    display_name: Option<String>,
    module: Option<String>,
    env: Option<BTreeMap<String, String>>,
}

pub fn load_kernel_settings(config_path: &Path) -> Result<KernelSettings> {
    let text = fs::read_to_string(config_path)
        .with_context(|| format!("reading installer config '{}'", config_path.display()))?;
    parse_kernel_settings(&text, config_path)
}

pub fn parse_kernel_settings(text: &str, config_path: &Path) -> Result<KernelSettings> {
    let parsed: InstallerToml = toml::from_str(text)
        .with_context(|| format!("parsing installer config '{}'", config_path.display()))?;

    let mut settings = KernelSettings::default();
    let Some(kernel) = parsed.kernel else {
        return Ok(settings);
    };

    if let Some(name) = kernel.name {
        let name = name.trim().to_string();
        if validate_kernel_name(&name).is_err() {
            bail!(
                "invalid installer config '{}': kernel name '{}' may only contain ASCII letters, digits, '.', '_' or '-'",
                config_path.display(),
                name
            );
        }
        settings.name = name;
    }
    if let Some(display_name) = kernel.display_name {
        if display_name.trim().is_empty() {
            bail!(
                "invalid installer config '{}': display_name must not be empty",
                config_path.display()
            );
        }
        settings.display_name = display_name;
    }
    if let Some(module) = kernel.module {
        let module = module.trim().to_string();
        if module.is_empty() || !module.split('.').all(is_python_identifier) {
            bail!(
                "invalid installer config '{}': module '{}' is not a dotted Python module path",
                config_path.display(),
                module
            );
        }
        settings.module = module;
    }
    if let Some(env) = kernel.env {
        settings.env = env;
    }

    Ok(settings)
}

fn is_python_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
