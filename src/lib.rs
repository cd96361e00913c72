//! # Strata
//!
//! Relational result loading for Rust.
//!
//! Strata fetches a root entity together with any tree of related entities
//! and hands back a nested record graph. Single-valued relations are joined
//! into the primary statement; many-valued relations are fetched with
//! follow-up queries keyed on the parents already loaded, so parent rows are
//! never multiplied.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_orm::prelude::*;
//!
//! let registry = SchemaRegistry::new()
//!     .with(
//!         EntitySchema::new("user", "users")
//!             .column("id", ColumnType::Int)
//!             .primary_key("id")
//!             .relation(RelationSpec::one_to_many("posts", "post").keys("id", "author_id")),
//!     )
//!     .with(
//!         EntitySchema::new("post", "posts")
//!             .column("id", ColumnType::Int)
//!             .column("author_id", ColumnType::Int)
//!             .primary_key("id"),
//!     );
//!
//! let mut loader = Loader::new(Arc::new(registry), "user")?
//!     .with_config(LoaderConfig::from_env()?);
//! loader.add_loader("posts", LoaderOptions::new())?;
//!
//! let users = loader.load(&my_executor)?;
//! println!("{}", users.to_json());
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Loader core.
pub mod query {
    pub use strata_query::*;
}

/// Logging setup.
pub mod logging {
    pub use strata_query::logging::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use strata_query::prelude::*;
}

// Re-export key types at the crate root
pub use strata_query::{
    DatabaseType, ErrorCode, Filter, FilterValue, LoadResult, Loader, LoaderConfig, LoaderOptions,
    QueryError, QueryResult,
};
