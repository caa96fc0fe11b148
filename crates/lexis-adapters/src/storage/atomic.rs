//! Atomically replaced output files.
//!
//! The builder writes into a temporary file in the destination directory and
//! renames it over the target only after every section has been written. A
//! failed build drops the temporary file, so the target path either keeps
//! its old contents or holds a complete new dictionary.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use lexis_common::utils::error::{Error, Result};
use tempfile::NamedTempFile;

/// A buffered writer whose contents appear at the target path on commit.
pub struct AtomicFile {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl AtomicFile {
    /// Creates a temporary file next to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created.
    pub fn create(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&dir)?;
        tracing::trace!(temp = %temp.path().display(), target = %target.display(), "opened temporary output");
        Ok(Self {
            target,
            writer: BufWriter::new(temp),
        })
    }

    /// The final path.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flushes, syncs, and renames the file into place.
    ///
    /// Returns the number of bytes in the committed file.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing, syncing, or renaming fails. The
    /// temporary file is removed in that case.
    pub fn commit(self) -> Result<u64> {
        let temp = self.writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        temp.as_file().sync_all()?;
        let len = temp.as_file().metadata()?.len();
        temp.persist(&self.target).map_err(|e| Error::Io(e.error))?;
        tracing::debug!(target = %self.target.display(), bytes = len, "committed output file");
        Ok(len)
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
