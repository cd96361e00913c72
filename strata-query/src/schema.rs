//! Entity schemas consumed by the loader.
//!
//! The loader never inspects a database catalog itself. It asks a
//! [`SchemaProvider`] for the [`EntitySchema`] of each entity role it
//! reaches while resolving relation paths. [`SchemaRegistry`] is the
//! in-memory provider; applications construct one and hand it to every
//! [`Loader`](crate::Loader) they build.
//!
//! ```rust
//! use strata_query::{ColumnType, EntitySchema, RelationSpec, SchemaProvider, SchemaRegistry};
//!
//! let registry = SchemaRegistry::new()
//!     .with(
//!         EntitySchema::new("user", "users")
//!             .column("id", ColumnType::Int)
//!             .column("name", ColumnType::String)
//!             .primary_key("id")
//!             .relation(RelationSpec::one_to_many("posts", "post").keys("id", "author_id")),
//!     );
//!
//! let user = registry.entity("user").unwrap();
//! assert_eq!(user.column_names(), vec!["id", "name"]);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};
use crate::relations::RelationSpec;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Boolean column.
    Bool,
    /// Integer column.
    Int,
    /// Floating point column.
    Float,
    /// Text column.
    String,
    /// JSON document column.
    Json,
}

/// Schema of one entity: its table, ordered columns, key and relations.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    /// Role name relations use to point at this entity.
    pub role: SmolStr,
    /// Database the table lives in, if not the default one.
    pub database: Option<SmolStr>,
    /// Table name.
    pub table: SmolStr,
    /// Columns in select order.
    pub columns: IndexMap<SmolStr, ColumnType>,
    /// Primary key column, if the entity declares one.
    pub primary_key: Option<SmolStr>,
    /// Relations declared on this entity, by name.
    pub relations: IndexMap<SmolStr, RelationSpec>,
}

impl EntitySchema {
    /// Create a schema for `role` stored in `table`.
    pub fn new(role: impl Into<SmolStr>, table: impl Into<SmolStr>) -> Self {
        Self {
            role: role.into(),
            database: None,
            table: table.into(),
            columns: IndexMap::new(),
            primary_key: None,
            relations: IndexMap::new(),
        }
    }

    /// Set the database.
    pub fn database(mut self, database: impl Into<SmolStr>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Append a column.
    pub fn column(mut self, name: impl Into<SmolStr>, column_type: ColumnType) -> Self {
        self.columns.insert(name.into(), column_type);
        self
    }

    /// Set the primary key column.
    pub fn primary_key(mut self, column: impl Into<SmolStr>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// Declare a relation.
    pub fn relation(mut self, spec: RelationSpec) -> Self {
        self.relations.insert(spec.name.clone(), spec);
        self
    }

    /// Get a relation by name.
    pub fn get_relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.get(name)
    }

    /// Column names in select order.
    pub fn column_names(&self) -> Vec<SmolStr> {
        self.columns.keys().cloned().collect()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check that the primary key, when declared, is one of the columns.
    ///
    /// A key outside the column list would never be fetched, leaving every
    /// row without an identity.
    pub fn validate(&self) -> QueryResult<()> {
        match &self.primary_key {
            Some(key) if !self.columns.contains_key(key) => {
                Err(QueryError::missing_primary_key(self.role.as_str(), key.as_str()))
            }
            _ => Ok(()),
        }
    }
}

/// Source of entity schemas.
pub trait SchemaProvider {
    /// Look up the schema registered for an entity role.
    fn entity(&self, role: &str) -> Option<Arc<EntitySchema>>;
}

/// In-memory schema registry.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: HashMap<SmolStr, Arc<EntitySchema>>,
}

impl SchemaRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity schema, replacing any schema with the same role.
    pub fn register(&mut self, schema: EntitySchema) {
        self.entities.insert(schema.role.clone(), Arc::new(schema));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no entity is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl SchemaProvider for SchemaRegistry {
    fn entity(&self, role: &str) -> Option<Arc<EntitySchema>> {
        self.entities.get(role).cloned()
    }
}

impl<P: SchemaProvider + ?Sized> SchemaProvider for Arc<P> {
    fn entity(&self, role: &str) -> Option<Arc<EntitySchema>> {
        (**self).entity(role)
    }
}
