//! Declaration-time metadata tags
//!
//! Classes, properties and functions carry a small string-keyed map of
//! [`Value`] metadata. Generic algorithms consult tags to vary behavior
//! without new code paths — the serialization engine filters on caller
//! tags and honors behavioral tags like `AddFunction`.

use rustc_hash::FxHashMap;

use crate::value::Value;

/// String-keyed tag metadata, iterated in insertion order
#[derive(Debug, Default)]
pub struct TagMap {
    entries: Vec<(String, Value)>,
    index: FxHashMap<String, usize>,
}

impl TagMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a tag, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
            }
        }
    }

    /// Check for a tag by name
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tag value, or `None` if absent
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no tags are attached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut tags = TagMap::new();
        assert!(tags.is_empty());

        tags.insert("persistent", Value::None);
        tags.insert("doc", Value::from("position"));

        assert!(tags.has("persistent"));
        assert!(!tags.has("transient"));
        assert_eq!(tags.get("doc"), Some(&Value::from("position")));
        assert_eq!(tags.get("missing"), None);
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut tags = TagMap::new();
        tags.insert("a", Value::from(1));
        tags.insert("b", Value::from(2));
        tags.insert("a", Value::from(3));

        let names: Vec<&str> = tags.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(tags.get("a"), Some(&Value::from(3)));
        assert_eq!(tags.len(), 2);
    }
}
