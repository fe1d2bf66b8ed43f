//! Memoized derived views of a file

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::pixels::PixelBuffer;

/// View parameters, normalized by key order.
pub type ViewParams = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub name: String,
    pub params: ViewParams,
}

impl ViewKey {
    pub fn new(name: &str, params: &ViewParams) -> Self {
        Self {
            name: name.to_string(),
            params: params.clone(),
        }
    }
}

/// A computed representation of a file's content.
///
/// Cloning is cheap; heavy payloads are shared.
#[derive(Debug, Clone)]
pub enum View {
    Pixels(Arc<PixelBuffer>),
    Path(PathBuf),
    Text(String),
    Json(Arc<Value>),
    /// The view cannot be produced for this file; the reason is kept for
    /// logging.
    Unavailable(String),
}

impl View {
    pub fn is_available(&self) -> bool {
        !matches!(self, View::Unavailable(_))
    }

    pub fn as_pixels(&self) -> Option<&Arc<PixelBuffer>> {
        match self {
            View::Pixels(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            View::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            View::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Arc<Value>> {
        match self {
            View::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            View::Unavailable(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewCache {
    entries: HashMap<ViewKey, View>,
    hits: u64,
    misses: u64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &ViewKey) -> Option<View> {
        match self.entries.get(key) {
            Some(view) => {
                self.hits += 1;
                Some(view.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: ViewKey, view: View) {
        self.entries.insert(key, view);
    }

    pub fn contains(&self, key: &ViewKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
