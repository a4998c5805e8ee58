//! Static front-end assets shipped alongside the kernel descriptor.
//!
//! The default bundle is compiled into the binary. `--assets-dir` swaps it
//! for the regular files found directly inside a directory.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{AssetCopyError, AssetFailure};
use crate::kernelspec::{DESCRIPTOR_FILENAME, STAGING_PREFIX};

pub const KERNEL_JS: &str = "kernel.js";
pub const CODEMIRROR_MODE_JS: &str = "kestrel.js";
/// Subdirectory of a CodeMirror `mode/` directory that holds the Kestrel mode.
pub const CODEMIRROR_MODE_DIR: &str = "kestrel";

const EMBEDDED: &[(&str, &[u8])] = &[
    (
        KERNEL_JS,
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/kernel.js")),
    ),
    (
        CODEMIRROR_MODE_JS,
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/kestrel.js")),
    ),
];

#[derive(Debug, Clone)]
pub enum AssetSource {
    Embedded(&'static [u8]),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub source: AssetSource,
}

impl Asset {
    fn write_to(&self, dest: &Path) -> io::Result<()> {
        match &self.source {
            AssetSource::Embedded(bytes) => fs::write(dest, bytes),
            AssetSource::File(src) => fs::copy(src, dest).map(|_| ()),
        }
    }
}

/// Ordered, read-only set of assets.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    assets: Vec<Asset>,
}

impl AssetBundle {
    /// The assets compiled into this binary.
    pub fn embedded() -> Self {
        Self {
            assets: EMBEDDED
                .iter()
                .map(|&(name, bytes)| Asset {
                    name: name.to_string(),
                    source: AssetSource::Embedded(bytes),
                })
                .collect(),
        }
    }

    /// Every regular file directly inside `dir`, sorted by name.
    ///
    /// `kernel.json` and leftover staging files are skipped.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("asset directory not found: {}", dir.display());
        }

        let mut assets = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("reading asset directory '{}'", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                log::warn!("skipping asset with non UTF-8 name: {}", entry.path().display());
                continue;
            };
            if is_reserved_name(name) {
                log::warn!(
                    "skipping asset '{}': the descriptor is written by the installer",
                    entry.path().display()
                );
                continue;
            }
            assets.push(Asset {
                name: name.to_string(),
                source: AssetSource::File(entry.path().to_path_buf()),
            });
        }
        Ok(Self { assets })
    }

    pub fn from_assets(assets: Vec<Asset>) -> Self {
        Self { assets }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name == name)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn is_reserved_name(name: &str) -> bool {
    name == DESCRIPTOR_FILENAME || name.starts_with(STAGING_PREFIX)
}

/// Copy every asset into `dir`, overwriting existing copies.
///
/// All assets are attempted; failures are collected into one error.
pub fn copy_assets(dir: &Path, bundle: &AssetBundle) -> Result<Vec<PathBuf>, AssetCopyError> {
    let mut copied = Vec::new();
    let mut failures = Vec::new();

    for asset in bundle.iter() {
        let dest = dir.join(&asset.name);
        match asset.write_to(&dest) {
            Ok(()) => {
                log::debug!("copied asset {} -> {}", asset.name, dest.display());
                copied.push(dest);
            }
            Err(source) => {
                log::warn!("failed to copy asset {} -> {}: {source}", asset.name, dest.display());
                failures.push(AssetFailure {
                    name: asset.name.clone(),
                    destination: dest,
                    source,
                });
            }
        }
    }

    if failures.is_empty() {
        Ok(copied)
    } else {
        Err(AssetCopyError { failures })
    }
}

/// Destination of the CodeMirror mode under a CodeMirror `mode/` directory.
pub fn codemirror_mode_path(codemirror_dir: &Path) -> PathBuf {
    codemirror_dir
        .join(CODEMIRROR_MODE_DIR)
        .join(CODEMIRROR_MODE_JS)
}

/// Install `kestrel.js` as a CodeMirror mode for the classic notebook editor.
pub fn install_codemirror_mode(
    codemirror_dir: &Path,
    bundle: &AssetBundle,
) -> Result<PathBuf, AssetCopyError> {
    let dest = codemirror_mode_path(codemirror_dir);
    let fail = |source: io::Error| AssetCopyError {
        failures: vec![AssetFailure {
            name: CODEMIRROR_MODE_JS.to_string(),
            destination: dest.clone(),
            source,
        }],
    };

    let asset = bundle.get(CODEMIRROR_MODE_JS).ok_or_else(|| {
        fail(io::Error::new(
            io::ErrorKind::NotFound,
            "asset bundle has no CodeMirror mode",
        ))
    })?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(&fail)?;
    }
    asset.write_to(&dest).map_err(&fail)?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_dirs() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let kernel = temp.path().join("kernel");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&kernel).unwrap();
        (temp, source, kernel)
    }

    #[test]
    fn embedded_bundle_contents() {
        let bundle = AssetBundle::embedded();
        let names: Vec<&str> = bundle.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec![KERNEL_JS, CODEMIRROR_MODE_JS]);

        let Some(AssetSource::Embedded(bytes)) = bundle.get(CODEMIRROR_MODE_JS).map(|a| &a.source)
        else {
            panic!("kestrel.js should be embedded");
        };
        assert!(String::from_utf8_lossy(bytes).contains("defineSimpleMode(\"kestrel\""));
    }

    #[test]
    fn copy_assets_overwrites_existing_copies() {
        let (_temp, _source, kernel) = temp_dirs();
        fs::write(kernel.join(KERNEL_JS), "stale").unwrap();

        let copied = copy_assets(&kernel, &AssetBundle::embedded()).unwrap();

        assert_eq!(copied.len(), 2);
        let fresh = fs::read_to_string(kernel.join(KERNEL_JS)).unwrap();
        assert!(fresh.contains("onload"));
    }

    #[test]
    fn copy_assets_continues_past_failures() {
        let (_temp, source, kernel) = temp_dirs();
        fs::write(source.join("a.js"), "a").unwrap();
        fs::write(source.join("c.js"), "c").unwrap();
        let bundle = AssetBundle::from_assets(vec![
            Asset {
                name: "a.js".into(),
                source: AssetSource::File(source.join("a.js")),
            },
            Asset {
                name: "b.js".into(),
                source: AssetSource::File(source.join("missing.js")),
            },
            Asset {
                name: "c.js".into(),
                source: AssetSource::File(source.join("c.js")),
            },
        ]);

        let err = copy_assets(&kernel, &bundle).unwrap_err();

        assert_eq!(err.failed_names(), vec!["b.js"]);
        assert_eq!(fs::read_to_string(kernel.join("a.js")).unwrap(), "a");
        assert_eq!(fs::read_to_string(kernel.join("c.js")).unwrap(), "c");
    }

    #[test]
    fn from_dir_lists_files_sorted() {
        let (_temp, source, _kernel) = temp_dirs();
        fs::write(source.join("z.js"), "z").unwrap();
        fs::write(source.join("a.js"), "a").unwrap();
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("nested/skip.js"), "skip").unwrap();

        let bundle = AssetBundle::from_dir(&source).unwrap();
        let names: Vec<&str> = bundle.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a.js", "z.js"]);
    }

    #[test]
    fn from_dir_skips_descriptor_files() {
        let (_temp, source, _kernel) = temp_dirs();
        fs::write(source.join("kernel.json"), "not json").unwrap();
        fs::write(source.join(".kernel.json.abc123"), "stale").unwrap();
        fs::write(source.join("kernel.js"), "js").unwrap();

        let bundle = AssetBundle::from_dir(&source).unwrap();
        let names: Vec<&str> = bundle.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["kernel.js"]);
    }

    #[test]
    fn from_dir_missing_directory() {
        let (temp, _source, _kernel) = temp_dirs();
        assert!(AssetBundle::from_dir(&temp.path().join("nope")).is_err());
    }

    #[test]
    fn codemirror_mode_is_installed_under_mode_dir() {
        let (temp, _source, _kernel) = temp_dirs();
        let mode_dir = temp.path().join("codemirror/mode");

        let dest = install_codemirror_mode(&mode_dir, &AssetBundle::embedded()).unwrap();

        assert_eq!(dest, mode_dir.join("kestrel/kestrel.js"));
        assert!(dest.is_file());
    }

    #[test]
    fn codemirror_mode_missing_from_bundle() {
        let (temp, _source, _kernel) = temp_dirs();
        let bundle = AssetBundle::from_assets(Vec::new());

        let err = install_codemirror_mode(temp.path(), &bundle).unwrap_err();
        assert_eq!(err.failed_names(), vec![CODEMIRROR_MODE_JS]);
    }
}
