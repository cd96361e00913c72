//! Index-addressed storage for materialized records.
//!
//! Records reachable from several parents are stored once and referenced by
//! [`RecordId`]. Attaching a child to a record mutates the arena slot, so
//! every parent holding that id observes the change.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::filter::FilterValue;

/// Named field values of one record, in column order.
pub type Fields = IndexMap<SmolStr, FilterValue>;

/// Handle to a record inside a [`RecordArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(usize);

impl RecordId {
    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Position of the record in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Related records attached to a parent under one relation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationSlot {
    /// Single-valued relation; `None` until a related record is found.
    One(Option<RecordId>),
    /// Many-valued relation in attachment order.
    Many(Vec<RecordId>),
}

impl RelationSlot {
    /// Create an empty slot.
    pub fn empty(many: bool) -> Self {
        if many {
            Self::Many(Vec::new())
        } else {
            Self::One(None)
        }
    }

    /// Attach a related record.
    ///
    /// A single slot keeps the first record it receives; a many slot ignores
    /// a record it already holds. Returns whether the slot changed.
    pub fn attach(&mut self, id: RecordId) -> bool {
        match self {
            Self::One(slot @ None) => {
                *slot = Some(id);
                true
            }
            Self::One(Some(_)) => false,
            Self::Many(ids) => {
                if ids.contains(&id) {
                    false
                } else {
                    ids.push(id);
                    true
                }
            }
        }
    }

    /// Attached record ids.
    pub fn ids(&self) -> &[RecordId] {
        match self {
            Self::One(slot) => slot.as_slice(),
            Self::Many(ids) => ids,
        }
    }

    /// Check if this is a many-valued slot.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// Number of attached records.
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    /// Check if nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }
}

/// A materialized record with its relation slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Fields,
    relations: IndexMap<SmolStr, RelationSlot>,
}

impl Record {
    /// Create a record without relation slots.
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            relations: IndexMap::new(),
        }
    }

    /// Field values in column order.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.fields.get(field)
    }

    /// Get the slot for a relation.
    pub fn relation(&self, name: &str) -> Option<&RelationSlot> {
        self.relations.get(name)
    }

    /// Relation slots in loader order.
    pub fn relations(&self) -> impl Iterator<Item = (&SmolStr, &RelationSlot)> {
        self.relations.iter()
    }

    /// Open an empty slot for a relation unless one exists.
    pub fn open_slot(&mut self, name: SmolStr, many: bool) {
        self.relations
            .entry(name)
            .or_insert_with(|| RelationSlot::empty(many));
    }

    /// Attach a related record under `name`, opening the slot if needed.
    pub fn attach(&mut self, name: &SmolStr, id: RecordId, many: bool) -> bool {
        self.relations
            .entry(name.clone())
            .or_insert_with(|| RelationSlot::empty(many))
            .attach(id)
    }
}

/// Append-only record storage for one load operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordArena {
    records: Vec<Record>,
}

impl RecordArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record and return its handle.
    pub fn insert(&mut self, record: Record) -> RecordId {
        let id = RecordId(self.records.len());
        self.records.push(record);
        id
    }

    /// Get a record.
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.0)
    }

    /// Get a record mutably.
    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.records.get_mut(id.0)
    }

    /// Attach `child` to `parent` under `relation`.
    ///
    /// Returns `false` when the parent is unknown or already holds the child.
    pub fn attach(
        &mut self,
        parent: RecordId,
        relation: &SmolStr,
        child: RecordId,
        many: bool,
    ) -> bool {
        self.get_mut(parent)
            .map(|record| record.attach(relation, child, many))
            .unwrap_or(false)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Iterate over all records with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| (RecordId(i), record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(id: i64) -> Fields {
        let mut fields = Fields::new();
        fields.insert("id".into(), FilterValue::Int(id));
        fields
    }

    #[test]
    fn test_single_slot_keeps_first() {
        let mut slot = RelationSlot::empty(false);
        assert!(slot.is_empty());
        assert!(slot.attach(RecordId(3)));
        assert!(!slot.attach(RecordId(4)));
        assert_eq!(slot.ids(), &[RecordId(3)]);
    }

    #[test]
    fn test_many_slot_ignores_repeats() {
        let mut slot = RelationSlot::empty(true);
        assert!(slot.attach(RecordId(1)));
        assert!(slot.attach(RecordId(2)));
        assert!(!slot.attach(RecordId(1)));
        assert_eq!(slot.len(), 2);
        assert!(slot.is_many());
    }

    #[test]
    fn test_arena_insert_and_get() {
        let mut arena = RecordArena::new();
        let a = arena.insert(Record::new(fields(1)));
        let b = arena.insert(Record::new(fields(2)));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena.get(b).unwrap().get("id"), Some(&FilterValue::Int(2)));
        assert!(arena.get(RecordId(9)).is_none());
    }

    #[test]
    fn test_attach_is_visible_through_every_holder() {
        let mut arena = RecordArena::new();
        let author = arena.insert(Record::new(fields(1)));
        let badge = arena.insert(Record::new(fields(10)));
        let post_a = arena.insert(Record::new(fields(100)));
        let post_b = arena.insert(Record::new(fields(101)));
        let name = SmolStr::new("author");
        arena.attach(post_a, &name, author, false);
        arena.attach(post_b, &name, author, false);

        arena.attach(author, &SmolStr::new("badges"), badge, true);

        for post in [post_a, post_b] {
            let author_id = arena.get(post).unwrap().relation("author").unwrap().ids()[0];
            let badges = arena.get(author_id).unwrap().relation("badges").unwrap();
            assert_eq!(badges.ids(), &[badge]);
        }
    }

    #[test]
    fn test_attach_unknown_parent() {
        let mut arena = RecordArena::new();
        assert!(!arena.attach(RecordId(0), &SmolStr::new("x"), RecordId(1), false));
    }

    #[test]
    fn test_open_slot_is_idempotent() {
        let mut record = Record::new(fields(1));
        record.open_slot("posts".into(), true);
        record.attach(&SmolStr::new("posts"), RecordId(5), true);
        record.open_slot("posts".into(), true);
        assert_eq!(record.relation("posts").unwrap().len(), 1);
    }
}
