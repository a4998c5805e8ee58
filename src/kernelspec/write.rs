//! Atomic descriptor persistence and kernel directory removal.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::DescriptorWriteError;
use crate::kernelspec::descriptor::{KernelDescriptor, DESCRIPTOR_FILENAME};

/// Prefix of the temporary file `kernel.json` is staged in.
pub const STAGING_PREFIX: &str = ".kernel.json.";

/// What is currently on disk where a descriptor would be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorState {
    Missing,
    Identical,
    Different,
}

pub fn kernel_dir(root: &Path, descriptor: &KernelDescriptor) -> PathBuf {
    root.join(&descriptor.name)
}

/// Compare the descriptor against any existing `kernel.json` under `root`.
pub fn descriptor_state(root: &Path, descriptor: &KernelDescriptor) -> DescriptorState {
    let path = kernel_dir(root, descriptor).join(DESCRIPTOR_FILENAME);
    let Ok(existing) = fs::read(&path) else {
        return DescriptorState::Missing;
    };
    match descriptor.to_json() {
        Ok(json) if json.as_bytes() == existing.as_slice() => DescriptorState::Identical,
        _ => DescriptorState::Different,
    }
}

/// Write `<root>/<name>/kernel.json`, replacing any existing descriptor.
///
/// The file is staged in a temporary file next to the target and renamed
/// into place. On failure the temporary file is removed, and so is any
/// directory this call created.
pub fn write_descriptor(
    root: &Path,
    descriptor: &KernelDescriptor,
) -> Result<PathBuf, DescriptorWriteError> {
    let dir = kernel_dir(root, descriptor);
    let created = create_kernel_dir(&dir)?;

    match persist_descriptor(&dir, descriptor) {
        Ok(path) => Ok(path),
        Err(err) => {
            if let Some(created) = created {
                if let Err(cleanup) = fs::remove_dir_all(&created) {
                    log::warn!(
                        "could not remove partially created '{}': {cleanup}",
                        created.display()
                    );
                }
            }
            Err(err)
        }
    }
}

/// Create `dir` and return the topmost directory that did not exist before.
fn create_kernel_dir(dir: &Path) -> Result<Option<PathBuf>, DescriptorWriteError> {
    let first_missing = dir
        .ancestors()
        .take_while(|candidate| fs::symlink_metadata(candidate).is_err())
        .last()
        .map(Path::to_path_buf);

    if let Err(e) = fs::create_dir_all(dir) {
        if let Some(created) = &first_missing {
            if let Err(cleanup) = fs::remove_dir_all(created) {
                log::warn!(
                    "could not remove partially created '{}': {cleanup}",
                    created.display()
                );
            }
        }
        return Err(DescriptorWriteError::new(dir, "create kernel directory", e));
    }
    Ok(first_missing)
}

fn persist_descriptor(
    dir: &Path,
    descriptor: &KernelDescriptor,
) -> Result<PathBuf, DescriptorWriteError> {
    let target = dir.join(DESCRIPTOR_FILENAME);
    let json = descriptor
        .to_json()
        .map_err(|e| DescriptorWriteError::new(&target, "serialize", e.into()))?;

    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| DescriptorWriteError::new(dir, "create temporary descriptor in", e))?;
    staged
        .write_all(json.as_bytes())
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| DescriptorWriteError::new(staged.path(), "write", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o644))
            .map_err(|e| DescriptorWriteError::new(staged.path(), "set permissions on", e))?;
    }

    staged
        .persist(&target)
        .map_err(|e| DescriptorWriteError::new(&target, "replace", e.error))?;
    Ok(target)
}

/// Remove `<root>/<name>/`. Returns `false` when nothing was installed.
pub fn remove_kernel_dir(root: &Path, name: &str) -> Result<bool, DescriptorWriteError> {
    let dir = root.join(name);
    if fs::symlink_metadata(&dir).is_err() {
        return Ok(false);
    }
    fs::remove_dir_all(&dir).map_err(|e| DescriptorWriteError::new(&dir, "remove", e))?;
    Ok(true)
}
