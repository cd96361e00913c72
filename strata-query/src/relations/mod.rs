//! Relation declarations and loader options.
//!
//! This module provides the types that describe the relation graph:
//! - `RelationSpec` for one declared relation between two entities
//! - `RelationLoadStrategy` for joined vs. separate loading
//! - `LoaderOptions` for per-node overrides when building a load
//!
//! ## Example
//!
//! ```rust
//! use strata_query::{RelationLoadStrategy, RelationSpec};
//!
//! // A user has many posts; posts carry `author_id`.
//! let posts = RelationSpec::one_to_many("posts", "post").keys("id", "author_id");
//! assert_eq!(posts.effective_strategy(), RelationLoadStrategy::Separate);
//!
//! // A post belongs to its author.
//! let author = RelationSpec::many_to_one("author", "user").keys("author_id", "id");
//! assert_eq!(author.effective_strategy(), RelationLoadStrategy::Join);
//! ```

mod options;
mod spec;
mod strategy;

pub use options::LoaderOptions;
pub use spec::{RelationSpec, RelationType};
pub use strategy::RelationLoadStrategy;
