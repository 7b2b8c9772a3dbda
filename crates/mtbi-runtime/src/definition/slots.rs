//! Ordered slot mappings.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered mapping from slot name to value.
///
/// Declaration order is significant: bare `{input}` placeholders expand
/// in this order, so the mapping keeps entries in the order they were
/// inserted (or appeared in the source document) rather than hashing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slots<V> {
    entries: Vec<(String, V)>,
}

impl<V> Slots<V> {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts a value, replacing and returning any previous value for the slot.
    pub fn insert(&mut self, slot: impl Into<String>, value: V) -> Option<V> {
        let slot = slot.into();
        match self.entries.iter_mut().find(|(name, _)| *name == slot) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((slot, value));
                None
            }
        }
    }

    /// Returns the value bound to a slot.
    pub fn get(&self, slot: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(name, _)| name == slot)
            .map(|(_, value)| value)
    }

    /// Returns whether the slot is declared.
    pub fn contains(&self, slot: &str) -> bool {
        self.get(slot).is_some()
    }

    /// Returns the number of slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no slot is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(slot, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Iterates over slot names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Iterates over values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }
}

impl<V> Default for Slots<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Slots<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut slots = Self::new();
        for (slot, value) in iter {
            slots.insert(slot, value);
        }
        slots
    }
}

impl<V> IntoIterator for Slots<V> {
    type IntoIter = std::vec::IntoIter<(String, V)>;
    type Item = (String, V);

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<V: Serialize> Serialize for Slots<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Slots<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SlotsVisitor(PhantomData))
    }
}

struct SlotsVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for SlotsVisitor<V> {
    type Value = Slots<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping from slot name to value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut slots = Slots::new();
        while let Some((name, value)) = access.next_entry::<String, V>()? {
            if slots.contains(&name) {
                return Err(serde::de::Error::custom(format!(
                    "duplicate slot `{name}`"
                )));
            }
            slots.entries.push((name, value));
        }
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_declaration_order() {
        let mut slots = Slots::new();
        slots.insert("b", 1);
        slots.insert("a", 2);
        slots.insert("c", 3);
        assert_eq!(slots.names().collect::<Vec<_>>(), ["b", "a", "c"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut slots: Slots<i32> = [("x", 1), ("y", 2)].into_iter().collect();
        assert_eq!(slots.insert("x", 10), Some(1));
        assert_eq!(slots.names().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(slots.get("x"), Some(&10));
    }

    #[test]
    fn test_deserialize_preserves_document_order() {
        let slots: Slots<String> =
            serde_json::from_str(r#"{"zeta": "1", "alpha": "2", "mid": "3"}"#).unwrap();
        assert_eq!(slots.names().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_deserialize_rejects_duplicate_slots() {
        let result: Result<Slots<String>, _> = serde_json::from_str(r#"{"a": "1", "a": "2"}"#);
        assert!(result.is_err());
    }
}
