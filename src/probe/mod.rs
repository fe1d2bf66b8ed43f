//! Adapters for external analysis tools
//!
//! Each adapter runs a tool through [`ToolCommand`] and parses its output
//! into JSON values. A missing tool always surfaces as
//! `MediaError::ProbeUnavailable`.

pub mod barcode;
pub mod exiftool;
pub mod faces;
pub mod ffprobe;
pub mod raster;
pub mod tool;

pub use tool::{ToolCommand, ToolOutput};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Absolute form of `path` without resolving symlinks.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute() {
        assert_eq!(absolute(Path::new("/a/b.png")).unwrap(), PathBuf::from("/a/b.png"));
        let rel = absolute(Path::new("b.png")).unwrap();
        assert!(rel.is_absolute());
        assert!(rel.ends_with("b.png"));
    }
}
