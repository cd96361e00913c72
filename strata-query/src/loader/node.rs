//! Nodes of the loader tree.
//!
//! Every node stands for one entity in the requested graph: the root entity
//! or a relation reached through a dotted path. A node owns its column
//! range in the query that fetches it, its duplicate registry, the
//! reference table its children splice into, and the ids of the records it
//! materialized.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use tracing::{debug, trace};

use super::DeferredLoad;
use super::arena::{Fields, Record, RecordArena, RecordId};
use super::duplicates::{DuplicateRegistry, Identity};
use super::references::{ReferenceKey, ReferenceTable};
use super::slice::fetch_data;
use crate::config::LoaderConfig;
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::query::SelectQuery;
use crate::relations::{LoaderOptions, RelationLoadStrategy, RelationSpec};
use crate::schema::{EntitySchema, SchemaProvider};
use crate::traits::Row;

/// A relation path segment resolved against the schema.
struct Segment {
    relation: RelationSpec,
    schema: Arc<EntitySchema>,
}

/// One node of the loader tree.
#[derive(Debug, Clone)]
pub struct LoaderNode {
    container: SmolStr,
    relation: Option<RelationSpec>,
    schema: Arc<EntitySchema>,
    options: LoaderOptions,
    alias: SmolStr,
    columns: Vec<SmolStr>,
    offset: Option<usize>,
    reference_keys: IndexSet<SmolStr>,
    loaders: IndexMap<SmolStr, LoaderNode>,
    duplicates: DuplicateRegistry,
    references: ReferenceTable,
    result: Vec<RecordId>,
}

impl LoaderNode {
    pub(crate) fn root(schema: Arc<EntitySchema>) -> Self {
        Self::build(schema.role.clone(), None, schema.table.clone(), schema)
    }

    fn child(relation: RelationSpec, schema: Arc<EntitySchema>, alias: SmolStr) -> Self {
        Self::build(relation.name.clone(), Some(relation), alias, schema)
    }

    fn build(
        container: SmolStr,
        relation: Option<RelationSpec>,
        alias: SmolStr,
        schema: Arc<EntitySchema>,
    ) -> Self {
        Self {
            container,
            relation,
            columns: schema.column_names(),
            schema,
            options: LoaderOptions::default(),
            alias,
            offset: None,
            reference_keys: IndexSet::new(),
            loaders: IndexMap::new(),
            duplicates: DuplicateRegistry::new(),
            references: ReferenceTable::new(),
            result: Vec::new(),
        }
    }

    /// Field on the parent record this node fills; the entity role for the root.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Relation this node loads, `None` for the root.
    pub fn relation(&self) -> Option<&RelationSpec> {
        self.relation.as_ref()
    }

    /// Check if this is the root node.
    pub fn is_root(&self) -> bool {
        self.relation.is_none()
    }

    /// Schema of the entity this node materializes.
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Options merged so far.
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Alias of this node's table in the query that fetches it.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Columns this node selects, in row order.
    pub fn columns(&self) -> &[SmolStr] {
        &self.columns
    }

    /// Position of the first column in the rows this node parses.
    ///
    /// Only meaningful once the query fetching this node was compiled.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Check if parents hold a list of these records.
    pub fn is_many(&self) -> bool {
        self.relation
            .as_ref()
            .is_some_and(|relation| relation.relation_type.is_many())
    }

    /// How this node is loaded.
    ///
    /// An explicit option wins over the relation's declared strategy, which
    /// wins over the kind default. The root always belongs to the primary
    /// query.
    pub fn strategy(&self) -> RelationLoadStrategy {
        match &self.relation {
            Some(relation) => self
                .options
                .strategy
                .unwrap_or_else(|| relation.effective_strategy()),
            None => RelationLoadStrategy::Join,
        }
    }

    /// Key columns child loaders need references for, in request order.
    pub fn reference_keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.reference_keys.iter()
    }

    /// Get a direct child loader.
    pub fn loader(&self, name: &str) -> Option<&LoaderNode> {
        self.loaders.get(name)
    }

    /// Direct child loaders in registration order.
    pub fn loaders(&self) -> impl Iterator<Item = &LoaderNode> {
        self.loaders.values()
    }

    /// Find a descendant by path segments.
    pub fn node(&self, path: &[SmolStr]) -> Option<&LoaderNode> {
        match path.split_first() {
            None => Some(self),
            Some((name, rest)) => self.loaders.get(name)?.node(rest),
        }
    }

    pub(crate) fn node_mut(&mut self, path: &[SmolStr]) -> Option<&mut LoaderNode> {
        match path.split_first() {
            None => Some(self),
            Some((name, rest)) => self.loaders.get_mut(name)?.node_mut(rest),
        }
    }

    /// Records this node materialized, in first-seen order.
    pub fn result(&self) -> &[RecordId] {
        &self.result
    }

    /// Duplicate registry of this node.
    pub fn duplicates(&self) -> &DuplicateRegistry {
        &self.duplicates
    }

    /// Reference table children splice into.
    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    /// Merge options over the current ones; fields set in `options` win.
    pub fn set_options(&mut self, options: LoaderOptions) -> &mut Self {
        self.options = std::mem::take(&mut self.options).merge(options);
        if let Some(alias) = &self.options.alias {
            self.alias = alias.clone();
        }
        self
    }

    /// Add (or reconfigure) the loader at a dotted relation path.
    ///
    /// Intermediate nodes are created with default options. Every segment
    /// is checked against the schema before the tree is touched, so an
    /// unknown relation anywhere in the path leaves the tree unchanged.
    /// Returns the deepest node.
    pub fn add_loader(
        &mut self,
        schemas: &dyn SchemaProvider,
        path: &str,
        options: LoaderOptions,
    ) -> QueryResult<&mut LoaderNode> {
        let segments = self.resolve_path(schemas, path)?;
        Ok(self.attach_path(&segments, options))
    }

    fn resolve_path(
        &self,
        schemas: &dyn SchemaProvider,
        path: &str,
    ) -> QueryResult<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut schema = Arc::clone(&self.schema);
        let mut container = self.container.clone();

        for name in path.split('.') {
            let relation = schema
                .get_relation(name)
                .cloned()
                .ok_or_else(|| QueryError::unknown_relation(name, container.as_str()))?;
            let target = schemas
                .entity(&relation.target)
                .ok_or_else(|| QueryError::unknown_entity(relation.target.as_str()))?;
            target.validate()?;

            container = relation.name.clone();
            schema = Arc::clone(&target);
            segments.push(Segment {
                relation,
                schema: target,
            });
        }

        Ok(segments)
    }

    fn attach_path(&mut self, segments: &[Segment], options: LoaderOptions) -> &mut LoaderNode {
        let Some((segment, rest)) = segments.split_first() else {
            self.set_options(options);
            return self;
        };

        let name = segment.relation.name.clone();
        if !self.loaders.contains_key(&name) {
            self.reference_keys.insert(segment.relation.inner_key.clone());
            debug!(
                parent = %self.alias,
                relation = %name,
                kind = segment.relation.relation_type.as_str(),
                "Added relation loader"
            );
        }

        let alias = self.child_alias(&name);
        let child = self.loaders.entry(name).or_insert_with(|| {
            LoaderNode::child(segment.relation.clone(), Arc::clone(&segment.schema), alias)
        });

        if rest.is_empty() {
            child.set_options(options);
            child
        } else {
            child.attach_path(rest, options)
        }
    }

    fn child_alias(&self, container: &str) -> SmolStr {
        if self.is_root() {
            SmolStr::new(container)
        } else {
            SmolStr::from(format!("{}_{}", self.alias, container))
        }
    }

    /// Recompute aliases top-down and check they are unique.
    pub(crate) fn assign_aliases(
        &mut self,
        parent: Option<&LoaderNode>,
        seen: &mut HashSet<SmolStr>,
    ) -> QueryResult<()> {
        self.alias = match (&self.options.alias, parent) {
            (Some(alias), _) => alias.clone(),
            (None, Some(parent)) => parent.child_alias(&self.container),
            (None, None) => self.schema.table.clone(),
        };
        if !seen.insert(self.alias.clone()) {
            return Err(QueryError::duplicate_alias(self.alias.as_str()));
        }

        let mut loaders = std::mem::take(&mut self.loaders);
        let outcome = loaders
            .values_mut()
            .try_for_each(|child| child.assign_aliases(Some(&*self), seen));
        self.loaders = loaders;
        outcome
    }

    /// Register this node and its joined subtree on `query`.
    pub(crate) fn register_columns(&mut self, query: &mut SelectQuery) {
        let offset = query.register_columns(&self.alias, &self.columns);
        self.offset = Some(offset);
        trace!(
            alias = %self.alias,
            offset,
            columns = self.columns.len(),
            "Registered loader columns"
        );

        let Self { alias, loaders, .. } = self;
        for child in loaders.values_mut() {
            if !child.strategy().is_join() {
                continue;
            }
            if let Some(relation) = &child.relation {
                let mut on = relation.join_condition(alias.as_str(), &child.alias);
                if let Some(filter) = &child.options.filter {
                    on = on.and_then(filter.clone());
                }
                query.left_join(child.schema.table.clone(), child.alias.clone(), on);
            }
            child.register_columns(query);
        }
    }

    /// Build the query this node heads: the primary query for the root, a
    /// key-filtered query for a separate node.
    pub(crate) fn build_query(
        &mut self,
        keys: Option<Vec<FilterValue>>,
    ) -> QueryResult<SelectQuery> {
        let mut query = SelectQuery::new(self.schema.table.clone(), self.alias.clone())
            .with_database(self.schema.database.clone());

        if let Some(keys) = keys {
            let relation = self.relation.as_ref().ok_or_else(|| {
                QueryError::internal(format!("root loader '{}' cannot be key filtered", self.alias))
            })?;
            query.and_where(relation.key_filter(&self.alias, keys));
        }
        if let Some(filter) = &self.options.filter {
            query.and_where(filter.clone());
        }

        self.register_columns(&mut query);
        Ok(query)
    }

    /// Collect separate loads reachable from this node without crossing
    /// another separate node.
    pub(crate) fn collect_deferred(
        &mut self,
        path: &mut Vec<SmolStr>,
        batch_size: usize,
        out: &mut Vec<DeferredLoad>,
    ) -> QueryResult<()> {
        let Self {
            loaders,
            references,
            ..
        } = self;

        for (name, child) in loaders.iter_mut() {
            path.push(name.clone());
            if child.strategy().is_separate() {
                if let Some(load) = child.plan_deferred(references, path, batch_size)? {
                    out.push(load);
                }
            } else {
                child.collect_deferred(path, batch_size, out)?;
            }
            path.pop();
        }

        Ok(())
    }

    fn plan_deferred(
        &mut self,
        parent_refs: &ReferenceTable,
        path: &[SmolStr],
        batch_size: usize,
    ) -> QueryResult<Option<DeferredLoad>> {
        let keys = match &self.relation {
            Some(relation) => parent_refs.aggregated_keys(&relation.inner_key),
            None => return Ok(None),
        };
        if keys.is_empty() {
            trace!(alias = %self.alias, "No parent keys, skipping separate query");
            return Ok(None);
        }

        let queries = keys
            .chunks(batch_size.max(1))
            .map(|chunk| self.build_query(Some(chunk.to_vec())))
            .collect::<QueryResult<Vec<_>>>()?;
        debug!(
            alias = %self.alias,
            keys = keys.len(),
            queries = queries.len(),
            "Planned separate load"
        );

        Ok(Some(DeferredLoad::new(
            path.to_vec(),
            self.alias.clone(),
            keys.len(),
            queries,
        )))
    }

    /// Parse one primary row at the root.
    pub(crate) fn parse_root(
        &mut self,
        row: &[FilterValue],
        arena: &mut RecordArena,
        config: &LoaderConfig,
    ) -> QueryResult<()> {
        let fields = self.slice(row)?;
        self.materialize(fields, arena, config)?;
        self.parse_joined(row, arena, config)
    }

    /// Parse rows of a separate load into the node at `path` below this one.
    pub(crate) fn parse_deferred(
        &mut self,
        path: &[SmolStr],
        rows: &[Row],
        arena: &mut RecordArena,
        config: &LoaderConfig,
    ) -> QueryResult<()> {
        let Some((name, rest)) = path.split_first() else {
            return Err(QueryError::internal("separate load has an empty path"));
        };
        let Self {
            alias,
            loaders,
            references,
            ..
        } = self;
        let child = loaders.get_mut(name).ok_or_else(|| {
            QueryError::internal(format!("loader '{}' has no child '{}'", alias, name))
        })?;

        if rest.is_empty() {
            for row in rows {
                child.parse_related(row, references, arena, config)?;
            }
            Ok(())
        } else {
            child.parse_deferred(rest, rows, arena, config)
        }
    }

    fn parse_related(
        &mut self,
        row: &[FilterValue],
        parent_refs: &ReferenceTable,
        arena: &mut RecordArena,
        config: &LoaderConfig,
    ) -> QueryResult<()> {
        let fields = self.slice(row)?;
        let key = self.relation.as_ref().and_then(|relation| {
            fields
                .get(&relation.outer_key)
                .and_then(|value| ReferenceKey::new(relation.inner_key.clone(), value))
        });

        // Null outer key: the relation is absent for this row.
        let Some(key) = key else {
            return Ok(());
        };
        if !parent_refs.contains(&key) {
            crate::strata_trace!(
                alias = %self.alias,
                key = %key,
                "Dropping row without a parent reference"
            );
            return Ok(());
        }

        let id = self.materialize(fields, arena, config)?;
        parent_refs.splice(&key, &self.container, id, self.is_many(), arena);
        self.parse_joined(row, arena, config)
    }

    fn parse_joined(
        &mut self,
        row: &[FilterValue],
        arena: &mut RecordArena,
        config: &LoaderConfig,
    ) -> QueryResult<()> {
        let Self {
            loaders,
            references,
            ..
        } = self;
        for child in loaders.values_mut() {
            if child.strategy().is_join() {
                child.parse_related(row, references, arena, config)?;
            }
        }
        Ok(())
    }

    fn slice(&self, row: &[FilterValue]) -> QueryResult<Fields> {
        let offset = self.offset.ok_or_else(|| {
            QueryError::internal(format!("loader '{}' has not been compiled", self.alias))
        })?;
        fetch_data(row, offset, &self.columns, &self.alias)
    }

    /// Resolve a row to its canonical record, creating it on first sight.
    fn materialize(
        &mut self,
        fields: Fields,
        arena: &mut RecordArena,
        config: &LoaderConfig,
    ) -> QueryResult<RecordId> {
        let primary_key = self.schema.primary_key.as_deref();
        let identity = Identity::of(&fields, primary_key, config.content_identity)?;
        let Self {
            alias,
            loaders,
            reference_keys,
            duplicates,
            references,
            result,
            ..
        } = self;

        let (id, created) = duplicates.resolve(identity, || {
            let mut record = Record::new(fields);
            for child in loaders.values() {
                record.open_slot(child.container.clone(), child.is_many());
            }
            arena.insert(record)
        });

        if !created {
            trace!(alias = %alias, record = id.index(), "Merged duplicate row");
            return Ok(id);
        }

        if let Some(record) = arena.get(id) {
            for key in reference_keys.iter() {
                if let Some(value) = record.get(key) {
                    references.register(key, value, id);
                }
            }
        }
        result.push(id);
        Ok(id)
    }

    /// Clear load state here and in every descendant.
    pub fn reset(&mut self) {
        self.duplicates.clear();
        self.references.clear();
        self.result.clear();
        for child in self.loaders.values_mut() {
            child.reset();
        }
    }
}
