//! Relation specification types.

use smol_str::SmolStr;

use super::strategy::RelationLoadStrategy;
use crate::filter::{Filter, FilterValue};

/// Type of relation between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// One-to-one relation (e.g., User has one Profile).
    OneToOne,
    /// One-to-many relation (e.g., User has many Posts).
    OneToMany,
    /// Many-to-one relation (e.g., Post belongs to User).
    ManyToOne,
}

impl RelationType {
    /// Check if this relation returns multiple records.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::OneToMany)
    }

    /// Check if this relation returns a single record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Check if the parent record carries the foreign key.
    pub fn parent_owns_key(&self) -> bool {
        matches!(self, Self::ManyToOne)
    }

    /// Default loading strategy for this kind.
    ///
    /// Many-valued relations would multiply parent rows when joined, so they
    /// are fetched separately unless asked otherwise.
    pub fn default_strategy(&self) -> RelationLoadStrategy {
        if self.is_many() {
            RelationLoadStrategy::Separate
        } else {
            RelationLoadStrategy::Join
        }
    }

    /// Get a display name for logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToOne => "many-to-one",
        }
    }
}

/// Specification for a relation between entities.
///
/// `inner_key` is always a column of the parent record and `outer_key` a
/// column of the related record. For one-to-one and one-to-many relations
/// the parent's primary key is the inner key and the child's foreign key is
/// the outer key; a many-to-one relation flips ownership, so the parent's
/// foreign key is the inner key and the child's primary key the outer one.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSpec {
    /// Name of the relation (container field on the parent).
    pub name: SmolStr,
    /// Type of relation.
    pub relation_type: RelationType,
    /// Role of the related entity in the schema registry.
    pub target: SmolStr,
    /// Key column read from the parent record.
    pub inner_key: SmolStr,
    /// Key column read from the related record.
    pub outer_key: SmolStr,
    /// Loading strategy declared by the schema, overriding the kind default.
    pub load_strategy: Option<RelationLoadStrategy>,
}

impl RelationSpec {
    fn new(
        name: impl Into<SmolStr>,
        relation_type: RelationType,
        target: impl Into<SmolStr>,
    ) -> Self {
        Self {
            name: name.into(),
            relation_type,
            target: target.into(),
            inner_key: SmolStr::new_static("id"),
            outer_key: SmolStr::new_static("id"),
            load_strategy: None,
        }
    }

    /// Create a one-to-one relation spec.
    pub fn one_to_one(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(name, RelationType::OneToOne, target)
    }

    /// Create a one-to-many relation spec.
    pub fn one_to_many(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(name, RelationType::OneToMany, target)
    }

    /// Create a many-to-one relation spec.
    pub fn many_to_one(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(name, RelationType::ManyToOne, target)
    }

    /// Set the parent-side key column.
    pub fn inner_key(mut self, key: impl Into<SmolStr>) -> Self {
        self.inner_key = key.into();
        self
    }

    /// Set the related-side key column.
    pub fn outer_key(mut self, key: impl Into<SmolStr>) -> Self {
        self.outer_key = key.into();
        self
    }

    /// Set both key columns at once.
    pub fn keys(self, inner: impl Into<SmolStr>, outer: impl Into<SmolStr>) -> Self {
        self.inner_key(inner).outer_key(outer)
    }

    /// Declare a loading strategy for this relation.
    pub fn strategy(mut self, strategy: RelationLoadStrategy) -> Self {
        self.load_strategy = Some(strategy);
        self
    }

    /// Strategy a fresh loader for this relation starts with.
    pub fn effective_strategy(&self) -> RelationLoadStrategy {
        self.load_strategy
            .unwrap_or_else(|| self.relation_type.default_strategy())
    }

    /// Predicate joining the related alias onto the parent alias.
    pub fn join_condition(&self, parent_alias: &str, child_alias: &str) -> Filter {
        match self.relation_type {
            // Child carries the foreign key pointing at the parent.
            RelationType::OneToOne | RelationType::OneToMany => Filter::ColumnEquals(
                format!("{}.{}", child_alias, self.outer_key),
                format!("{}.{}", parent_alias, self.inner_key),
            ),
            // Parent carries the foreign key pointing at the child.
            RelationType::ManyToOne => Filter::ColumnEquals(
                format!("{}.{}", parent_alias, self.inner_key),
                format!("{}.{}", child_alias, self.outer_key),
            ),
        }
    }

    /// Predicate restricting a separate query to the parent keys seen so far.
    pub fn key_filter(&self, child_alias: &str, keys: Vec<FilterValue>) -> Filter {
        Filter::In(format!("{}.{}", child_alias, self.outer_key), keys)
    }
}
