//! CLI command implementations.

pub mod build;
pub mod info;
pub mod lookup;
pub mod scan;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use lexis_engine::Dictionary;

/// Opens a compiled dictionary, naming the file on failure.
fn open(path: &Path) -> Result<Dictionary> {
    Dictionary::open(path).with_context(|| format!("failed to open dictionary {}", path.display()))
}
