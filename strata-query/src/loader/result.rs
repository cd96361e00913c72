//! Materialized output of a load.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::arena::{Record, RecordArena, RecordId, RelationSlot};
use crate::error::{QueryError, QueryResult};

/// Records produced by one load, with the root records in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    arena: RecordArena,
    roots: Vec<RecordId>,
    rows_processed: usize,
    queries_executed: usize,
}

impl LoadResult {
    pub(crate) fn new(
        arena: RecordArena,
        roots: Vec<RecordId>,
        rows_processed: usize,
        queries_executed: usize,
    ) -> Self {
        Self {
            arena,
            roots,
            rows_processed,
            queries_executed,
        }
    }

    /// Ids of the root records.
    pub fn roots(&self) -> &[RecordId] {
        &self.roots
    }

    /// Root records in order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.roots.iter().filter_map(|id| self.arena.get(*id))
    }

    /// Get any record of the load.
    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.arena.get(id)
    }

    /// Records attached to `id` under `relation`.
    pub fn related(&self, id: RecordId, relation: &str) -> Vec<&Record> {
        self.arena
            .get(id)
            .and_then(|record| record.relation(relation))
            .map(|slot| slot.ids().iter().filter_map(|id| self.arena.get(*id)).collect())
            .unwrap_or_default()
    }

    /// Storage holding every record of the load.
    pub fn arena(&self) -> &RecordArena {
        &self.arena
    }

    /// Number of root records.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Check if no root record was loaded.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Rows parsed from the primary query.
    pub fn rows_processed(&self) -> usize {
        self.rows_processed
    }

    /// Queries handed to the executor.
    pub fn queries_executed(&self) -> usize {
        self.queries_executed
    }

    /// Nested JSON array of the root records.
    ///
    /// Each object holds the record's fields followed by one entry per
    /// relation: an object or `null` for single relations, an array for
    /// many relations.
    pub fn to_json(&self) -> Value {
        Value::Array(self.roots.iter().map(|id| self.record_json(*id)).collect())
    }

    /// Nested JSON object for one record.
    pub fn record_json(&self, id: RecordId) -> Value {
        let Some(record) = self.arena.get(id) else {
            return Value::Null;
        };

        let mut object = Map::new();
        for (name, value) in record.fields() {
            object.insert(name.to_string(), value.to_json());
        }
        for (name, slot) in record.relations() {
            let value = match slot {
                RelationSlot::One(Some(child)) => self.record_json(*child),
                RelationSlot::One(None) => Value::Null,
                RelationSlot::Many(children) => {
                    Value::Array(children.iter().map(|child| self.record_json(*child)).collect())
                }
            };
            object.insert(name.to_string(), value);
        }
        Value::Object(object)
    }

    /// Decode the root records into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> QueryResult<Vec<T>> {
        self.roots
            .iter()
            .map(|id| {
                serde_json::from_value(self.record_json(*id)).map_err(|e| {
                    QueryError::deserialization(e.to_string()).with_source(e)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;
    use crate::loader::arena::Fields;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;
    use smol_str::SmolStr;

    fn record(id: i64, name: &str) -> Record {
        let mut fields = Fields::new();
        fields.insert("id".into(), FilterValue::Int(id));
        fields.insert("name".into(), FilterValue::String(name.into()));
        Record::new(fields)
    }

    fn sample() -> LoadResult {
        let mut arena = RecordArena::new();
        let mut user = record(1, "ann");
        user.open_slot("profile".into(), false);
        user.open_slot("posts".into(), true);
        let user = arena.insert(user);
        let lonely = arena.insert({
            let mut r = record(2, "bob");
            r.open_slot("profile".into(), false);
            r.open_slot("posts".into(), true);
            r
        });
        let profile = arena.insert(record(10, "bio"));
        let post = arena.insert(record(100, "hello"));
        arena.attach(user, &SmolStr::new("profile"), profile, false);
        arena.attach(user, &SmolStr::new("posts"), post, true);

        LoadResult::new(arena, vec![user, lonely], 2, 2)
    }

    #[test]
    fn test_accessors() {
        let result = sample();
        assert_eq!(result.len(), 2);
        assert!(!result.is_empty());
        assert_eq!(result.rows_processed(), 2);
        assert_eq!(result.queries_executed(), 2);
        assert_eq!(result.records().count(), 2);
        assert_eq!(result.related(result.roots()[0], "posts").len(), 1);
        assert!(result.related(result.roots()[1], "posts").is_empty());
        assert!(result.related(result.roots()[1], "missing").is_empty());
    }

    #[test]
    fn test_to_json_nests_relations() {
        let result = sample();
        assert_eq!(
            result.to_json(),
            json!([
                {
                    "id": 1,
                    "name": "ann",
                    "profile": { "id": 10, "name": "bio" },
                    "posts": [{ "id": 100, "name": "hello" }]
                },
                {
                    "id": 2,
                    "name": "bob",
                    "profile": null,
                    "posts": []
                }
            ])
        );
    }

    #[test]
    fn test_deserialize() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Post {
            id: i64,
        }

        #[derive(Debug, Deserialize, PartialEq)]
        struct User {
            id: i64,
            name: String,
            posts: Vec<Post>,
        }

        let users: Vec<User> = sample().deserialize().unwrap();
        assert_eq!(users[0].posts, vec![Post { id: 100 }]);
        assert_eq!(users[1].name, "bob");
    }

    #[test]
    fn test_deserialize_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrong {
            id: String,
        }

        let err = sample().deserialize::<Wrong>().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::DeserializationError);
    }

    #[test]
    fn test_default_is_empty() {
        let result = LoadResult::default();
        assert!(result.is_empty());
        assert_eq!(result.to_json(), json!([]));
    }
}
