//! Substitution values for command templates.

use std::collections::HashMap;

use super::Section;

/// Values placeholders resolve to, keyed by `(section, slot)`.
///
/// Insertion order is kept per section so that bare `{section}`
/// placeholders expand deterministically.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<(Section, String), String>,
    order: Vec<(Section, String)>,
}

impl Bindings {
    /// Creates an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a slot, replacing any previous value.
    pub fn insert(&mut self, section: Section, slot: impl Into<String>, value: impl Into<String>) {
        let key = (section, slot.into());
        if self.values.insert(key.clone(), value.into()).is_none() {
            self.order.push(key);
        }
    }

    /// Looks up a single slot.
    pub fn get(&self, section: Section, slot: &str) -> Option<&str> {
        self.values
            .get(&(section, slot.to_owned()))
            .map(String::as_str)
    }

    /// Joins every value of a section with single spaces, in insertion order.
    pub fn joined(&self, section: Section) -> String {
        self.order
            .iter()
            .filter(|(s, _)| *s == section)
            .filter_map(|key| self.values.get(key))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
