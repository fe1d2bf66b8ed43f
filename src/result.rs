//! Merged analysis output
//!
//! Keys are namespaced as `"<Source>:<Field>"` (e.g. `Color:AverageRGB`).
//! Null values are never stored, so a routine can insert optional fields
//! without checking them first.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map::{self, BTreeMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult {
    entries: BTreeMap<String, Value>,
}

impl AnalysisResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, overwriting any previous one. Null values are dropped
    /// and remove nothing.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if value.is_null() {
            return;
        }
        self.entries.insert(key.into(), value);
    }

    /// Insert only when `value` is `Some`.
    pub fn insert_opt<V: Into<Value>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(v) = value {
            self.insert(key, v);
        }
    }

    /// Merge `other` into `self`; keys from `other` win.
    pub fn merge(&mut self, other: AnalysisResult) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.entries.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AnalysisResult {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut result = AnalysisResult::new();
        for (k, v) in iter {
            result.insert(k, v);
        }
        result
    }
}

impl IntoIterator for AnalysisResult {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Build a JSON object from pairs, dropping nulls. Used for nested records
/// such as per-stream entries.
pub fn record<I, K>(pairs: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Object(
        pairs
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.into(), v))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_none_elision() {
        let mut data = AnalysisResult::new();
        data.insert("K", Value::Null);
        data.insert("J", 5);
        data.insert_opt::<i64>("L", None);
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("J"), Some(&json!(5)));
        assert!(!data.contains_key("K"));
    }

    #[test]
    fn test_null_does_not_erase() {
        let mut data = AnalysisResult::new();
        data.insert("a", 1);
        data.insert("a", Value::Null);
        assert_eq!(data.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut first: AnalysisResult = [("A", json!(1)), ("B", json!("x"))].into_iter().collect();
        let second: AnalysisResult = [("A", json!(2))].into_iter().collect();
        first.merge(second);
        assert_eq!(first.get("A"), Some(&json!(2)));
        assert_eq!(first.get("B"), Some(&json!("x")));
    }

    #[test]
    fn test_record_drops_nulls() {
        let rec = record([("Width", json!(320)), ("Rate", Value::Null)]);
        assert_eq!(rec, json!({"Width": 320}));
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let data: AnalysisResult = [("Color:AverageRGB", json!([255, 0, 0]))].into_iter().collect();
        let text = serde_json::to_string(&data).unwrap();
        assert_eq!(text, r#"{"Color:AverageRGB":[255,0,0]}"#);
    }
}
