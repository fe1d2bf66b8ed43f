//! Temporary artifacts owned by a media handle
//!
//! Files are registered the moment they exist on disk, before any tool is
//! asked to write into them, so a failed conversion never leaks an untracked
//! file.

use crate::error::{MediaError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TEMP_PREFIX: &str = "tmp_file_metadata";

#[derive(Debug, Default)]
pub struct TempArtifacts {
    paths: BTreeSet<PathBuf>,
}

impl TempArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty, uniquely named file in the system temp directory and
    /// take ownership of it.
    pub fn create(&mut self, suffix: &str) -> Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(suffix)
            .tempfile()?;
        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| MediaError::Tool(e.error))?;
        self.paths.insert(path.clone());
        debug!("Created temp artifact {}", path.display());
        Ok(path)
    }

    /// Take ownership of a file produced by some other means.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every owned file. Missing files are ignored; calling this again
    /// is a no-op.
    pub fn close(&mut self) {
        for path in std::mem::take(&mut self.paths) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed temp artifact {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove temp artifact {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_registers_and_close_removes() {
        let mut temp = TempArtifacts::new();
        let a = temp.create(".png").unwrap();
        let b = temp.create(".png").unwrap();
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
        assert!(a.file_name().unwrap().to_string_lossy().starts_with(TEMP_PREFIX));
        assert!(a.to_string_lossy().ends_with(".png"));
        assert_eq!(temp.len(), 2);

        temp.close();
        assert!(!a.exists() && !b.exists());
        assert!(temp.is_empty());
        temp.close();
    }

    #[test]
    fn test_close_tolerates_missing_files() {
        let mut temp = TempArtifacts::new();
        let path = temp.create(".tmp").unwrap();
        std::fs::remove_file(&path).unwrap();
        temp.register("/nonexistent/tmp_file_metadata_never_created");
        temp.close();
        assert!(temp.is_empty());
    }

    #[test]
    fn test_drop_cleans_up() {
        let path = {
            let mut temp = TempArtifacts::new();
            temp.create(".txt").unwrap()
        };
        assert!(!path.exists());
    }
}
