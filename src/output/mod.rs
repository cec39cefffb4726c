//! Console reporting and document output

pub mod console;
pub mod error_document;

pub use console::{Console, Spinner};
pub use error_document::build_error_document;

use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `bytes` to `path` atomically: the data goes to a temporary file in
/// the same directory, which is then renamed over the destination. Readers
/// never observe a partial document.
pub fn save_document(bytes: &[u8], path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
