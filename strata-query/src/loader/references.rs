//! Reference table: where related records get spliced in.
//!
//! A parent node registers each new record under `key::value` for every key
//! column its child loaders need. Child loaders later look a row's key up
//! here to find the parent records to attach to; several parents sharing a
//! key value each receive the child.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;
use smol_str::SmolStr;

use super::arena::{RecordArena, RecordId};
use crate::filter::FilterValue;

/// Composite key `key_name::key_value` locating parent records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceKey {
    name: SmolStr,
    value: String,
}

impl ReferenceKey {
    /// Build a key; `None` when the value is null (no reference).
    pub fn new(name: impl Into<SmolStr>, value: &FilterValue) -> Option<Self> {
        value.key_repr().map(|value| Self {
            name: name.into(),
            value,
        })
    }

    /// Key column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical key value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.name, self.value)
    }
}

/// Per-node table of reference slots plus the distinct key values seen.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    slots: HashMap<ReferenceKey, SmallVec<[RecordId; 1]>>,
    aggregated: IndexMap<SmolStr, IndexMap<String, FilterValue>>,
}

impl ReferenceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `record` under `name::value`. Null values are ignored.
    pub fn register(&mut self, name: &SmolStr, value: &FilterValue, record: RecordId) {
        let Some(key) = ReferenceKey::new(name.clone(), value) else {
            return;
        };

        self.aggregated
            .entry(name.clone())
            .or_default()
            .entry(key.value.clone())
            .or_insert_with(|| value.clone());

        let slots = self.slots.entry(key).or_default();
        if !slots.contains(&record) {
            slots.push(record);
        }
    }

    /// Records registered under `key`, in registration order.
    pub fn slots(&self, key: &ReferenceKey) -> &[RecordId] {
        self.slots.get(key).map(|s| s.as_slice()).unwrap_or(&[])
    }

    /// Check if any record is registered under `key`.
    pub fn contains(&self, key: &ReferenceKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Distinct values seen for key column `name`, in first-seen order.
    pub fn aggregated_keys(&self, name: &str) -> Vec<FilterValue> {
        self.aggregated
            .get(name)
            .map(|values| values.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Attach `child` under `relation` to every record registered at `key`.
    ///
    /// Returns the number of parent records that received the child.
    pub fn splice(
        &self,
        key: &ReferenceKey,
        relation: &SmolStr,
        child: RecordId,
        many: bool,
        arena: &mut RecordArena,
    ) -> usize {
        self.slots(key)
            .iter()
            .filter(|parent| arena.attach(**parent, relation, child, many))
            .count()
    }

    /// Number of distinct reference keys.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.aggregated.is_empty()
    }

    /// Drop every slot and aggregated value.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.aggregated.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::arena::{Fields, Record};

    #[test]
    fn test_reference_key_display() {
        let key = ReferenceKey::new("user_id", &FilterValue::Int(5)).unwrap();
        assert_eq!(key.to_string(), "user_id::5");
        assert_eq!(key.name(), "user_id");
        assert_eq!(key.value(), "5");
        assert!(ReferenceKey::new("user_id", &FilterValue::Null).is_none());
    }

    #[test]
    fn test_register_groups_parents_by_key() {
        let mut table = ReferenceTable::new();
        let key = SmolStr::new("team_id");
        table.register(&key, &FilterValue::Int(10), RecordId::from_index(0));
        table.register(&key, &FilterValue::Int(10), RecordId::from_index(1));
        table.register(&key, &FilterValue::Int(20), RecordId::from_index(2));
        table.register(&key, &FilterValue::Null, RecordId::from_index(3));

        let ten = ReferenceKey::new("team_id", &FilterValue::Int(10)).unwrap();
        assert_eq!(table.slots(&ten), &[RecordId::from_index(0), RecordId::from_index(1)]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.aggregated_keys("team_id"),
            vec![FilterValue::Int(10), FilterValue::Int(20)]
        );
        assert!(table.aggregated_keys("other").is_empty());
    }

    #[test]
    fn test_register_same_record_once() {
        let mut table = ReferenceTable::new();
        let key = SmolStr::new("id");
        table.register(&key, &FilterValue::Int(1), RecordId::from_index(0));
        table.register(&key, &FilterValue::Int(1), RecordId::from_index(0));
        let one = ReferenceKey::new("id", &FilterValue::Int(1)).unwrap();
        assert_eq!(table.slots(&one).len(), 1);
    }

    #[test]
    fn test_splice_into_every_parent() {
        let mut arena = RecordArena::new();
        let p1 = arena.insert(Record::new(Fields::new()));
        let p2 = arena.insert(Record::new(Fields::new()));
        let child = arena.insert(Record::new(Fields::new()));

        let mut table = ReferenceTable::new();
        let key_name = SmolStr::new("team_id");
        table.register(&key_name, &FilterValue::Int(10), p1);
        table.register(&key_name, &FilterValue::Int(10), p2);

        let key = ReferenceKey::new("team_id", &FilterValue::Int(10)).unwrap();
        let relation = SmolStr::new("members");
        assert_eq!(table.splice(&key, &relation, child, true, &mut arena), 2);
        // Second splice of the same child changes nothing.
        assert_eq!(table.splice(&key, &relation, child, true, &mut arena), 0);

        let missing = ReferenceKey::new("team_id", &FilterValue::Int(99)).unwrap();
        assert_eq!(table.splice(&missing, &relation, child, true, &mut arena), 0);
    }

    #[test]
    fn test_clear() {
        let mut table = ReferenceTable::new();
        table.register(&SmolStr::new("id"), &FilterValue::Int(1), RecordId::from_index(0));
        assert!(!table.is_empty());
        table.clear();
        assert!(table.is_empty());
        assert!(table.aggregated_keys("id").is_empty());
    }
}
