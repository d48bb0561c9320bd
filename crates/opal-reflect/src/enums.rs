//! Enumeration metaobjects
//!
//! An [`EnumDescriptor`] mirrors a host enumeration: a process-unique name
//! plus an ordered list of `(name, value)` pairs with by-name and by-value
//! indexes. Descriptors are built once with [`EnumBuilder`] and frozen
//! behind an `Arc` for the rest of the process lifetime.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// One named value of an enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumPair {
    /// Instance name
    pub name: String,
    /// Instance ordinal
    pub value: i64,
}

/// Reflection descriptor for a registered enumeration
#[derive(Debug)]
pub struct EnumDescriptor {
    name: String,
    pairs: Vec<EnumPair>,
    by_name: FxHashMap<String, usize>,
    by_value: FxHashMap<i64, usize>,
}

impl EnumDescriptor {
    /// Name of the enumeration
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of declared pairs
    pub fn size(&self) -> usize {
        self.pairs.len()
    }

    /// Pair at declaration index
    pub fn pair(&self, index: usize) -> Result<&EnumPair> {
        self.pairs.get(index).ok_or(Error::OutOfRange {
            index,
            size: self.pairs.len(),
        })
    }

    /// Check whether a name is declared
    pub fn has_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Check whether an ordinal is declared
    pub fn has_value(&self, value: i64) -> bool {
        self.by_value.contains_key(&value)
    }

    /// Ordinal of a declared name
    pub fn value(&self, name: &str) -> Result<i64> {
        self.by_name
            .get(name)
            .map(|&i| self.pairs[i].value)
            .ok_or(Error::ElementNotFound)
    }

    /// Name of a declared ordinal
    pub fn name_of(&self, value: i64) -> Result<&str> {
        self.by_value
            .get(&value)
            .map(|&i| self.pairs[i].name.as_str())
            .ok_or(Error::ElementNotFound)
    }
}

impl PartialEq for EnumDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EnumDescriptor {}

/// Append-only builder for an [`EnumDescriptor`]
#[derive(Debug)]
pub struct EnumBuilder {
    name: String,
    pairs: Vec<EnumPair>,
    by_name: FxHashMap<String, usize>,
    by_value: FxHashMap<i64, usize>,
}

impl EnumBuilder {
    /// Start declaring an enumeration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pairs: Vec::new(),
            by_name: FxHashMap::default(),
            by_value: FxHashMap::default(),
        }
    }

    /// Declare one `(name, value)` pair
    ///
    /// A name declared twice keeps its first ordinal; a value declared
    /// twice resolves names back to the first declaration, matching the
    /// first-wins lookup of the name index.
    pub fn value(mut self, name: impl Into<String>, value: i64) -> Self {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return self;
        }
        let index = self.pairs.len();
        self.by_name.insert(name.clone(), index);
        self.by_value.entry(value).or_insert(index);
        self.pairs.push(EnumPair { name, value });
        self
    }

    /// Freeze the descriptor
    pub fn build(self) -> Arc<EnumDescriptor> {
        Arc::new(EnumDescriptor {
            name: self.name,
            pairs: self.pairs,
            by_name: self.by_name,
            by_value: self.by_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color() -> Arc<EnumDescriptor> {
        EnumBuilder::new("Color")
            .value("red", 0)
            .value("green", 1)
            .value("blue", 4)
            .build()
    }

    #[test]
    fn test_enum_lookups() {
        let e = color();
        assert_eq!(e.name(), "Color");
        assert_eq!(e.size(), 3);
        assert_eq!(e.value("green").unwrap(), 1);
        assert_eq!(e.name_of(4).unwrap(), "blue");
        assert!(e.has_name("red"));
        assert!(!e.has_name("cyan"));
        assert!(e.has_value(4));
        assert!(!e.has_value(2));
    }

    #[test]
    fn test_enum_missing_lookups() {
        let e = color();
        assert_eq!(e.value("cyan"), Err(Error::ElementNotFound));
        assert_eq!(e.name_of(99).unwrap_err(), Error::ElementNotFound);
    }

    #[test]
    fn test_enum_pair_by_index() {
        let e = color();
        assert_eq!(e.pair(0).unwrap().name, "red");
        assert_eq!(e.pair(2).unwrap().value, 4);
        assert_eq!(
            e.pair(3).unwrap_err(),
            Error::OutOfRange { index: 3, size: 3 }
        );
    }

    #[test]
    fn test_duplicate_name_keeps_first() {
        let e = EnumBuilder::new("E").value("a", 1).value("a", 2).build();
        assert_eq!(e.size(), 1);
        assert_eq!(e.value("a").unwrap(), 1);
    }
}
