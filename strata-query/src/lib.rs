//! # strata-query
//!
//! Hierarchical relational result loading for the Strata ORM.
//!
//! This crate turns flat SQL result rows into nested object graphs:
//! - Relation loader trees built from dotted paths (`"posts.author"`)
//! - Joined loading through `LEFT JOIN` with column-offset row slicing
//! - Separate loading through key-filtered follow-up queries, batched
//! - Per-node duplicate collapsing by primary key or record content
//! - Blocking and async executor seams
//!
//! ## Filters
//!
//! ```rust
//! use strata_query::{DatabaseType, Filter, FilterValue};
//!
//! let filter = Filter::and([
//!     Filter::Equals("users.active".into(), FilterValue::Bool(true)),
//!     Filter::In("users.team_id".into(), vec![1.into(), 2.into()]),
//! ]);
//!
//! let (sql, params) = filter.to_sql(DatabaseType::PostgreSQL);
//! assert_eq!(sql, "(users.active = $1 AND users.team_id IN ($2, $3))");
//! assert_eq!(params.len(), 3);
//! ```
//!
//! ## Loader Options
//!
//! ```rust
//! use strata_query::{LoaderOptions, RelationLoadStrategy};
//!
//! let options = LoaderOptions::new().separate().alias("recent");
//! assert_eq!(options.strategy, Some(RelationLoadStrategy::Separate));
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_query::{EntitySchema, ErrorCode, Loader, LoaderOptions, SchemaRegistry};
//!
//! let registry = SchemaRegistry::new().with(EntitySchema::new("user", "users"));
//! let mut loader = Loader::new(Arc::new(registry), "user").unwrap();
//!
//! let err = loader.add_loader("posts", LoaderOptions::new()).unwrap_err();
//! assert_eq!(err.code, ErrorCode::UnknownRelation);
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod query;
pub mod relations;
pub mod schema;
pub mod sql;
pub mod traits;

pub use config::{DEFAULT_BATCH_SIZE, LoaderConfig};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use filter::{Filter, FilterValue};
pub use loader::{
    DeferredLoad, Fields, LoadResult, Loader, LoaderNode, Record, RecordArena, RecordId,
    RelationSlot,
};
pub use query::{JoinClause, SelectColumn, SelectQuery};
pub use relations::{LoaderOptions, RelationLoadStrategy, RelationSpec, RelationType};
pub use schema::{ColumnType, EntitySchema, SchemaProvider, SchemaRegistry};
pub use sql::{DatabaseType, SqlBuilder};
pub use traits::{AsyncQueryExecutor, QueryExecutor, Row};

// Re-export logging utilities
pub use logging::{get_log_format, get_log_level, init as init_logging, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::LoaderConfig;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::loader::{LoadResult, Loader, LoaderNode, RecordId};
    pub use crate::query::SelectQuery;
    pub use crate::relations::{LoaderOptions, RelationLoadStrategy, RelationSpec};
    pub use crate::schema::{ColumnType, EntitySchema, SchemaProvider, SchemaRegistry};
    pub use crate::traits::{AsyncQueryExecutor, QueryExecutor, Row};
}
