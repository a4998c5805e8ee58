//! The `kernel.json` descriptor read by the notebook front-end.
//!
//! Field names follow the Jupyter kernel-spec schema:
//! <https://jupyter-client.readthedocs.io/en/stable/kernels.html#kernel-specs>

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::InstallError;

pub const DESCRIPTOR_FILENAME: &str = "kernel.json";
pub const DEFAULT_KERNEL_NAME: &str = "kestrel";
pub const DEFAULT_DISPLAY_NAME: &str = "Kestrel";
pub const KERNEL_LANGUAGE: &str = "kestrel";
/// Python module that runs the Kestrel kernel process.
pub const DEFAULT_BACKEND_MODULE: &str = "kestrel_jupyter_kernel";
/// Placeholder the front-end substitutes with the connection file path.
pub const CONNECTION_FILE_PLACEHOLDER: &str = "{connection_file}";

/// User-adjustable parts of the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSettings {
    pub name: String,
    pub display_name: String,
    pub module: String,
    pub env: BTreeMap<String, String>,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_KERNEL_NAME.to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            module: DEFAULT_BACKEND_MODULE.to_string(),
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelDescriptor {
    /// Directory name under the kernel-spec root; not part of the file.
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "argv")]
    pub launch_argv: Vec<String>,
    pub display_name: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt_mode: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl KernelDescriptor {
    /// Pretty-printed JSON with a trailing newline, exactly as written to disk.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Build the descriptor that launches the Kestrel backend under `interpreter`.
///
/// The output depends only on the interpreter path, the settings and the
/// crate version, so repeated installs produce identical files.
pub fn build_descriptor(
    interpreter: &Path,
    settings: &KernelSettings,
) -> Result<KernelDescriptor, InstallError> {
    validate_kernel_name(&settings.name)?;

    let mut metadata = BTreeMap::new();
    metadata.insert(
        "kestrel_jupyter".to_string(),
        serde_json::json!({ "installer_version": env!("CARGO_PKG_VERSION") }),
    );

    Ok(KernelDescriptor {
        name: settings.name.clone(),
        launch_argv: vec![
            interpreter.to_string_lossy().into_owned(),
            "-m".to_string(),
            settings.module.clone(),
            "-f".to_string(),
            CONNECTION_FILE_PLACEHOLDER.to_string(),
        ],
        display_name: settings.display_name.clone(),
        language: KERNEL_LANGUAGE.to_string(),
        env: settings.env.clone(),
        interrupt_mode: Some("signal".to_string()),
        metadata,
    })
}

/// Kernel names become directory names the front-end matches case-insensitively.
pub fn validate_kernel_name(name: &str) -> Result<(), InstallError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(InstallError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_descriptor_matches_kernel_spec_schema() {
        let descriptor =
            build_descriptor(Path::new("/opt/venv/bin/python"), &KernelSettings::default())
                .unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&descriptor.to_json().unwrap()).unwrap();

        assert_eq!(
            value["argv"],
            serde_json::json!([
                "/opt/venv/bin/python",
                "-m",
                "kestrel_jupyter_kernel",
                "-f",
                "{connection_file}"
            ])
        );
        assert_eq!(value["display_name"], "Kestrel");
        assert_eq!(value["language"], "kestrel");
        assert_eq!(value["interrupt_mode"], "signal");
        assert!(value.get("env").is_none(), "empty env must be omitted");
        assert!(value.get("name").is_none(), "name is the directory, not a field");
    }

    #[test]
    fn descriptor_is_deterministic() {
        let settings = KernelSettings {
            env: BTreeMap::from([
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "1".to_string()),
            ]),
            ..KernelSettings::default()
        };
        let first = build_descriptor(Path::new("/usr/bin/python3"), &settings).unwrap();
        let second = build_descriptor(Path::new("/usr/bin/python3"), &settings).unwrap();

        let json = first.to_json().unwrap();
        assert_eq!(json, second.to_json().unwrap());
        assert!(json.ends_with("}\n"));
        assert!(json.find("\"A\"").unwrap() < json.find("\"B\"").unwrap());
    }

    #[test]
    fn descriptor_parses_back_without_name() {
        let descriptor =
            build_descriptor(Path::new("/usr/bin/python3"), &KernelSettings::default()).unwrap();
        let parsed: KernelDescriptor =
            serde_json::from_str(&descriptor.to_json().unwrap()).unwrap();

        assert_eq!(parsed.launch_argv, descriptor.launch_argv);
        assert_eq!(parsed.name, "");
    }

    #[test]
    fn kernel_name_rules() {
        for ok in ["kestrel", "kestrel-2", "kestrel_dev.1"] {
            assert!(validate_kernel_name(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["", ".", "..", "kes/trel", "kes trel", "këstrel"] {
            assert!(validate_kernel_name(bad).is_err(), "{bad} should be rejected");
        }
    }
}
