//! Kernel-spec layout: root resolution, the descriptor, and writing it.
//!
//! ```text
//! <kernel-spec root>/
//!     <name>/
//!         kernel.json     descriptor read by the front-end
//!         kernel.js       classic-notebook extension
//!         kestrel.js      CodeMirror mode
//! ```

pub mod descriptor;
pub mod scope;
pub mod write;

pub use descriptor::{
    build_descriptor, validate_kernel_name, KernelDescriptor, KernelSettings, DESCRIPTOR_FILENAME,
};
pub use scope::{kernel_root, resolve_target_directory, Scope};
pub use write::{
    descriptor_state, kernel_dir, remove_kernel_dir, write_descriptor, DescriptorState,
    STAGING_PREFIX,
};
