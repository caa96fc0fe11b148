//! Memory-mapped dictionary input.
//!
//! The whole file is mapped once and wrapped in a [`Bytes`] that owns the
//! [`Mmap`]. Every structure loaded from it holds a cheap `Bytes` slice, so
//! the mapping stays alive exactly as long as some view needs it.

use std::fs::File;
use std::path::Path;

use bytes::Bytes;
use lexis_common::utils::error::Result;
use memmap2::Mmap;

/// Maps `path` read-only and returns its contents without copying.
///
/// An empty file yields empty bytes without creating a mapping.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or mapped.
pub fn map_file(path: impl AsRef<Path>) -> Result<Bytes> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Bytes::new());
    }

    // SAFETY: the mapping is read-only. Dictionary files are replaced by
    // rename, never modified in place, so the mapped pages do not change
    // underneath the views.
    #[allow(unsafe_code)]
    let mmap = unsafe { Mmap::map(&file)? };

    tracing::debug!(path = %path.display(), bytes = mmap.len(), "mapped dictionary file");
    Ok(Bytes::from_owner(mmap))
}
