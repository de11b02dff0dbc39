//! Validated path types used by extraction.
//!
//! Every path that extraction writes to is either an [`ExtractRoot`] or a
//! [`SafePath`]/[`SafeSymlink`] resolved against one. None of these types can
//! be built from a raw path without going through validation.

pub mod extract_root;
pub mod safe_path;
pub mod safe_symlink;

pub use extract_root::ExtractRoot;
pub use safe_path::SafePath;
pub use safe_symlink::SafeSymlink;

/// Cancellation hook invoked by the reader and writer between members.
///
/// Returning an error aborts the operation with that error.
pub type Checkpoint<'a> = dyn Fn() -> crate::Result<()> + Sync + 'a;
