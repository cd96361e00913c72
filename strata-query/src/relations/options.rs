//! Per-loader options.

use smol_str::SmolStr;

use super::strategy::RelationLoadStrategy;
use crate::filter::Filter;

/// Options attached to one node of the load graph.
///
/// Every field is optional; unset fields fall back to whatever the node
/// already has (its relation's default strategy, its derived alias).
///
/// ```rust
/// use strata_query::{Filter, LoaderOptions, RelationLoadStrategy};
///
/// let options = LoaderOptions::new()
///     .join()
///     .alias("recent_posts")
///     .r#where(Filter::IsNull("recent_posts.deleted_at".into()));
/// assert_eq!(options.strategy, Some(RelationLoadStrategy::Join));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoaderOptions {
    /// Loading strategy.
    pub strategy: Option<RelationLoadStrategy>,
    /// Alias used for this node's columns in the compiled query.
    pub alias: Option<SmolStr>,
    /// Extra predicate for the related records.
    pub filter: Option<Filter>,
}

impl LoaderOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the loading strategy.
    pub fn strategy(mut self, strategy: RelationLoadStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Load through a LEFT JOIN in the parent's query.
    pub fn join(self) -> Self {
        self.strategy(RelationLoadStrategy::Join)
    }

    /// Load through a separate query.
    pub fn separate(self) -> Self {
        self.strategy(RelationLoadStrategy::Separate)
    }

    /// Override the query alias.
    pub fn alias(mut self, alias: impl Into<SmolStr>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Add a filter to the related records.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Check if no option is set.
    pub fn is_empty(&self) -> bool {
        self.strategy.is_none() && self.alias.is_none() && self.filter.is_none()
    }

    /// Merge `newer` over these options; fields set in `newer` win.
    pub fn merge(self, newer: LoaderOptions) -> Self {
        Self {
            strategy: newer.strategy.or(self.strategy),
            alias: newer.alias.or(self.alias),
            filter: newer.filter.or(self.filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = LoaderOptions::new().separate().alias("p");
        assert_eq!(options.strategy, Some(RelationLoadStrategy::Separate));
        assert_eq!(options.alias.as_deref(), Some("p"));
        assert!(options.filter.is_none());
        assert!(!options.is_empty());
        assert!(LoaderOptions::new().is_empty());
    }

    #[test]
    fn test_merge_newer_wins() {
        let current = LoaderOptions::new().join().alias("a");
        let merged = current.merge(LoaderOptions::new().separate());
        assert_eq!(merged.strategy, Some(RelationLoadStrategy::Separate));
        assert_eq!(merged.alias.as_deref(), Some("a"));
    }

    #[test]
    fn test_merge_keeps_unset() {
        let current = LoaderOptions::new().r#where(Filter::IsNull("x".into()));
        let merged = current.clone().merge(LoaderOptions::new());
        assert_eq!(merged, current);
    }
}
