//! Filesystem operations used by the relocation engine.

mod atomic;
mod helpers;
mod lock;
mod meta;
mod space;
mod tree;
mod util;

pub use atomic::{rename_tree, RenameError};
pub use helpers::{describe_io_error, io_error_with_help, io_error_with_help_io};
pub use lock::{try_acquire_instance_lock, InstanceLock};
pub use space::format_bytes;
pub(crate) use space::ensure_space_for_copy;
pub use tree::{copy_tree, remove_path, tree_size, TreeCopyStats};
