//! Parameter blob parsing for marker-delimited template bodies.
//!
//! A template body looks like `tag|key=value|key=value`; the leading segment
//! is the tag itself and carries no parameter.

use histmerge_shared::{HistmergeError, Result};

// ---------------------------------------------------------------------------
// ParamMap
// ---------------------------------------------------------------------------

/// Insertion-ordered string parameter map.
///
/// Template parameter counts are tiny (tens at most), so a vector of pairs
/// is used; first-seen order is preserved so unknown parameters round-trip
/// in their original order. Inserting an existing key overwrites in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    entries: Vec<(String, String)>,
}

impl ParamMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the parameter is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a parameter, keeping its original position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove a parameter, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Keep only the parameters for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.entries.retain(|(k, v)| keep(k, v));
    }

    /// Iterate parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split a template body into an ordered key/value map.
///
/// The leading segment (the tag) is discarded, each remaining segment is
/// trimmed, empty segments are dropped, and each segment splits on its first
/// `=`. A non-empty segment without `=` aborts the whole document.
pub fn parse(body: &str) -> Result<ParamMap> {
    let mut params = ParamMap::new();

    for segment in body.split('|').skip(1) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((key, value)) = segment.split_once('=') else {
            return Err(HistmergeError::malformed(segment));
        };
        params.insert(key.trim(), value.trim());
    }

    Ok(params)
}
