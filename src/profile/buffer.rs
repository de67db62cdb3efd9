//! Locally held candidate values, one per editable field.

use std::collections::BTreeMap;

use super::model::{FieldName, Profile};

/// In-progress edits keyed by field. May diverge from the server snapshot
/// until the next reconciliation overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEditBuffer {
    values: BTreeMap<FieldName, String>,
}

impl Default for FieldEditBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldEditBuffer {
    pub fn new() -> Self {
        let values = FieldName::ALL
            .iter()
            .map(|field| (*field, String::new()))
            .collect();
        Self { values }
    }

    /// Overwrites every entry with the snapshot's values.
    pub fn hydrate(&mut self, snapshot: &Profile) {
        for field in FieldName::ALL {
            self.values.insert(field, snapshot.get(field).to_string());
        }
    }

    /// Records a keystroke. Returns `false` when the value did not change.
    pub fn set(&mut self, field: FieldName, value: impl Into<String>) -> bool {
        let value = value.into();
        match self.values.get(&field) {
            Some(current) if *current == value => false,
            _ => {
                self.values.insert(field, value);
                true
            }
        }
    }

    pub fn get(&self, field: FieldName) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    /// Buffer contents rendered as a profile record.
    pub fn snapshot(&self) -> Profile {
        let mut profile = Profile::default();
        for (field, value) in &self.values {
            profile.set(*field, value.clone());
        }
        profile
    }
}
