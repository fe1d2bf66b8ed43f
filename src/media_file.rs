//! Open media handle
//!
//! A [`MediaFile`] owns everything derived from one file: memoized views and
//! the temporary files they needed. Dropping the handle (or calling
//! [`MediaFile::close`]) removes those temporary files.

use crate::analyze::{self, RoutineFilter};
use crate::cache::{View, ViewCache, ViewKey, ViewParams};
use crate::config::Config;
use crate::error::Result;
use crate::handler::{self, HandlerKind};
use crate::result::AnalysisResult;
use crate::temp::TempArtifacts;
use crate::views;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct MediaFile {
    path: PathBuf,
    kind: HandlerKind,
    mime: String,
    config: Config,
    cache: ViewCache,
    temp: TempArtifacts,
}

impl MediaFile {
    pub(crate) fn new(path: PathBuf, kind: HandlerKind, mime: String, config: Config) -> Self {
        Self {
            path,
            kind,
            mime,
            config,
            cache: ViewCache::new(),
            temp: TempArtifacts::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// MIME type reported by the sniffing chain
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch a derived view without parameters.
    pub fn fetch(&mut self, name: &str) -> Result<View> {
        self.fetch_with(name, &ViewParams::new())
    }

    /// Fetch a derived view, computing it on first use.
    ///
    /// Views that cannot be produced for this file (missing tool, malformed
    /// content, pixel ceiling) come back as [`View::Unavailable`] and are
    /// cached like any other result.
    pub fn fetch_with(&mut self, name: &str, params: &ViewParams) -> Result<View> {
        let key = ViewKey::new(name, params);
        if let Some(view) = self.cache.get(&key) {
            return Ok(view);
        }

        debug!("Computing view {} of {}", name, self.path.display());
        let view = match views::compute(self, name, params) {
            Ok(Some(view)) => view,
            Ok(None) => View::Unavailable(format!("{} has no view named {}", self.kind, name)),
            Err(e) if e.is_recoverable() => {
                warn!("View {} unavailable for {}: {}", name, self.path.display(), e);
                View::Unavailable(e.to_string())
            }
            Err(e) => return Err(e),
        };
        self.cache.insert(key, view.clone());
        Ok(view)
    }

    /// Whether `name` has already been computed.
    pub fn is_cached(&self, name: &str, params: &ViewParams) -> bool {
        self.cache.contains(&ViewKey::new(name, params))
    }

    /// Cache (hits, misses)
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    /// Drop all memoized views. Temporary files stay until [`close`](Self::close).
    pub fn flush(&mut self) {
        self.cache.clear();
    }

    /// Release cached views and delete temporary files. Safe to call twice.
    pub fn close(&mut self) {
        self.cache.clear();
        self.temp.close();
    }

    pub fn temp_artifacts(&self) -> impl Iterator<Item = &Path> {
        self.temp.iter()
    }

    pub(crate) fn temp_mut(&mut self) -> &mut TempArtifacts {
        &mut self.temp
    }

    /// Run the analysis routines of this file's kind.
    pub fn analyze(&mut self, filter: &RoutineFilter) -> Result<AnalysisResult> {
        analyze::analyze(self, filter)
    }
}

impl Drop for MediaFile {
    fn drop(&mut self) {
        self.close();
    }
}

/// Resolve `path`, run `f` on the handle and close it afterwards.
pub fn with_file<T>(path: impl AsRef<Path>, f: impl FnOnce(&mut MediaFile) -> Result<T>) -> Result<T> {
    let mut file = handler::resolve(path)?;
    let outcome = f(&mut file);
    file.close();
    outcome
}
