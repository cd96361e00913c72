//! Per-node duplicate detection.
//!
//! Joined queries repeat a parent's columns on every row of a joined child,
//! so each node collapses rows describing the same entity onto one record.
//! Identity is the primary key when the schema declares one. Entities
//! without a primary key fall back to the serialized content of every
//! field; [`Fields`] preserves column order, so equal rows always produce
//! equal identities.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use super::arena::{Fields, RecordId};
use crate::error::QueryResult;
use crate::filter::FilterValue;

/// Identity of a record within one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Canonical primary key value.
    Primary(String),
    /// Serialized field content of a key-less entity.
    Content(String),
}

impl Identity {
    /// Compute the identity of a row.
    ///
    /// Returns `None` when the row cannot be identified: the primary key is
    /// null, or the entity has no primary key and content identity is off.
    /// Such rows always produce a new record.
    pub fn of(
        fields: &Fields,
        primary_key: Option<&str>,
        content_identity: bool,
    ) -> QueryResult<Option<Self>> {
        match primary_key {
            Some(pk) => Ok(fields.get(pk).and_then(|value| value.key_repr()).map(Self::Primary)),
            None if content_identity => {
                let content: Vec<(&str, Tagged<'_>)> =
                    fields.iter().map(|(name, value)| (name.as_str(), Tagged(value))).collect();
                Ok(Some(Self::Content(serde_json::to_string(&content)?)))
            }
            None => Ok(None),
        }
    }
}

/// Serializes a value together with its kind.
///
/// Plain JSON would merge `NaN` with null and `1` with `1.0`; tagging keeps
/// every distinct value distinct.
struct Tagged<'a>(&'a FilterValue);

impl Serialize for Tagged<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            FilterValue::Null => ("null",).serialize(serializer),
            FilterValue::Bool(v) => ("bool", v).serialize(serializer),
            FilterValue::Int(v) => ("int", v).serialize(serializer),
            FilterValue::Float(v) if v.is_finite() => ("float", v).serialize(serializer),
            FilterValue::Float(v) => ("float", v.to_string()).serialize(serializer),
            FilterValue::String(v) => ("string", v).serialize(serializer),
            FilterValue::Json(v) => ("json", v).serialize(serializer),
            FilterValue::List(values) => {
                let items: Vec<Tagged<'_>> = values.iter().map(Tagged).collect();
                ("list", items).serialize(serializer)
            }
        }
    }
}

/// Map from identity to the record first materialized for it.
#[derive(Debug, Clone, Default)]
pub struct DuplicateRegistry {
    entries: HashMap<Identity, RecordId>,
}

impl DuplicateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the canonical record for an identity.
    pub fn get(&self, identity: &Identity) -> Option<RecordId> {
        self.entries.get(identity).copied()
    }

    /// Resolve a row to its canonical record.
    ///
    /// Returns the existing record when the identity was seen before,
    /// otherwise calls `create`, remembers the new record and returns it.
    /// The flag is `true` for a newly created record.
    pub fn resolve(
        &mut self,
        identity: Option<Identity>,
        create: impl FnOnce() -> RecordId,
    ) -> (RecordId, bool) {
        match identity {
            Some(identity) => {
                if let Some(existing) = self.entries.get(&identity) {
                    return (*existing, false);
                }
                let id = create();
                self.entries.insert(identity, id);
                (id, true)
            }
            None => (create(), true),
        }
    }

    /// Number of remembered identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every identity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
