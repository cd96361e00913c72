//! Relation loading strategies.

use serde::Deserialize;

/// Strategy for loading relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationLoadStrategy {
    /// Load relations in separate queries filtered by the parent keys.
    #[default]
    Separate,
    /// Load relations using LEFT JOINs in the parent's query.
    Join,
}

impl RelationLoadStrategy {
    /// Check if this is a separate query strategy.
    pub fn is_separate(&self) -> bool {
        matches!(self, Self::Separate)
    }

    /// Check if this is a join strategy.
    pub fn is_join(&self) -> bool {
        matches!(self, Self::Join)
    }
}
