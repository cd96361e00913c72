//! Hierarchical result loading.
//!
//! A [`Loader`] turns one primary query plus a tree of relation loaders into
//! a graph of materialized records. Relations configured with the
//! [`Join`](crate::RelationLoadStrategy::Join) strategy are fetched in the
//! same statement through `LEFT JOIN`s and sliced out of each row by column
//! offset. Relations configured with the
//! [`Separate`](crate::RelationLoadStrategy::Separate) strategy are fetched
//! afterwards with a query restricted to the parent keys seen so far, and
//! spliced into every parent record sharing that key.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_query::{
//!     ColumnType, EntitySchema, FilterValue, Loader, LoaderOptions, QueryExecutor,
//!     QueryResult, RelationSpec, Row, SchemaRegistry, SelectQuery,
//! };
//!
//! let registry = SchemaRegistry::new()
//!     .with(
//!         EntitySchema::new("user", "users")
//!             .column("id", ColumnType::Int)
//!             .column("name", ColumnType::String)
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
//! struct Canned;
//!
//! impl QueryExecutor for Canned {
//!     fn fetch(&self, query: &SelectQuery) -> QueryResult<Vec<Row>> {
//!         Ok(match query.table() {
//!             "users" => vec![vec![1.into(), "ann".into()]],
//!             _ => vec![vec![10.into(), 1.into()], vec![11.into(), 1.into()]],
//!         })
//!     }
//! }
//!
//! let mut loader = Loader::new(Arc::new(registry), "user").unwrap();
//! loader.add_loader("posts", LoaderOptions::new()).unwrap();
//!
//! let result = loader.load(&Canned).unwrap();
//! assert_eq!(result.len(), 1);
//! assert_eq!(result.related(result.roots()[0], "posts").len(), 2);
//! assert_eq!(result.queries_executed(), 2);
//! ```

mod arena;
mod duplicates;
mod node;
mod references;
mod result;
mod slice;

pub use arena::{Fields, Record, RecordArena, RecordId, RelationSlot};
pub use duplicates::{DuplicateRegistry, Identity};
pub use node::LoaderNode;
pub use references::{ReferenceKey, ReferenceTable};
pub use result::LoadResult;
pub use slice::fetch_data;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use smol_str::SmolStr;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::query::SelectQuery;
use crate::relations::LoaderOptions;
use crate::schema::SchemaProvider;
use crate::traits::{AsyncQueryExecutor, QueryExecutor, Row};

/// Queries fetching one separate relation, split into key batches.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredLoad {
    path: Vec<SmolStr>,
    alias: SmolStr,
    keys: usize,
    queries: Vec<SelectQuery>,
}

impl DeferredLoad {
    pub(crate) fn new(
        path: Vec<SmolStr>,
        alias: SmolStr,
        keys: usize,
        queries: Vec<SelectQuery>,
    ) -> Self {
        Self {
            path,
            alias,
            keys,
            queries,
        }
    }

    /// Dotted relation path of the loaded node.
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// Relation path segments.
    pub fn segments(&self) -> &[SmolStr] {
        &self.path
    }

    /// Alias of the loaded node.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Number of distinct parent keys requested.
    pub fn key_count(&self) -> usize {
        self.keys
    }

    /// Batched queries, each restricted to a slice of the parent keys.
    pub fn queries(&self) -> &[SelectQuery] {
        &self.queries
    }
}

/// Root of a loader tree and driver of the load pipeline.
pub struct Loader {
    schemas: Arc<dyn SchemaProvider + Send + Sync>,
    config: LoaderConfig,
    root: LoaderNode,
    arena: RecordArena,
    rows_processed: usize,
    queries_executed: usize,
}

impl Loader {
    /// Create a loader for the entity registered as `role`.
    pub fn new(schemas: Arc<dyn SchemaProvider + Send + Sync>, role: &str) -> QueryResult<Self> {
        let schema = schemas
            .entity(role)
            .ok_or_else(|| QueryError::unknown_entity(role))?;
        schema.validate()?;

        Ok(Self {
            root: LoaderNode::root(schema),
            schemas,
            config: LoaderConfig::default(),
            arena: RecordArena::new(),
            rows_processed: 0,
            queries_executed: 0,
        })
    }

    /// Use the given configuration.
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Filter the root records.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.root.set_options(LoaderOptions::new().r#where(filter));
        self
    }

    /// Override the root alias (the root table name by default).
    pub fn alias(mut self, alias: impl Into<SmolStr>) -> Self {
        self.root.set_options(LoaderOptions::new().alias(alias));
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Root node of the tree.
    pub fn root(&self) -> &LoaderNode {
        &self.root
    }

    /// Find a node by dotted path.
    pub fn node(&self, path: &str) -> Option<&LoaderNode> {
        let segments: Vec<SmolStr> = path.split('.').map(SmolStr::new).collect();
        self.root.node(&segments)
    }

    /// Add (or reconfigure) the loader at a dotted relation path.
    ///
    /// ```rust,ignore
    /// loader.add_loader("author.profile", LoaderOptions::new().separate())?;
    /// ```
    pub fn add_loader(
        &mut self,
        path: &str,
        options: LoaderOptions,
    ) -> QueryResult<&mut LoaderNode> {
        self.root.add_loader(self.schemas.as_ref(), path, options)
    }

    /// Build the primary query and assign every joined node its offset.
    pub fn compile(&mut self) -> QueryResult<SelectQuery> {
        self.config.validate()?;
        self.root.assign_aliases(None, &mut HashSet::new())?;

        let query = self.root.build_query(None)?;
        debug!(
            table = query.table(),
            columns = query.column_count(),
            joins = query.joins().len(),
            sql = %self.to_sql(&query).0,
            "Compiled primary query"
        );
        Ok(query)
    }

    /// Render `query` in the configured database's placeholder and quoting
    /// style.
    pub fn to_sql(&self, query: &SelectQuery) -> (String, Vec<FilterValue>) {
        query.to_sql(self.config.database)
    }

    /// Parse one row of the primary query.
    pub fn parse_row(&mut self, row: &[FilterValue]) -> QueryResult<()> {
        self.root.parse_root(row, &mut self.arena, &self.config)?;
        self.rows_processed += 1;
        Ok(())
    }

    /// Separate loads that can run once the primary rows are parsed.
    pub fn deferred_loads(&mut self) -> QueryResult<Vec<DeferredLoad>> {
        let mut loads = Vec::new();
        self.root
            .collect_deferred(&mut Vec::new(), self.config.batch_size, &mut loads)?;
        Ok(loads)
    }

    /// Parse the rows one of `load`'s queries returned.
    pub fn apply_deferred(&mut self, load: &DeferredLoad, rows: &[Row]) -> QueryResult<()> {
        self.root
            .parse_deferred(load.segments(), rows, &mut self.arena, &self.config)
    }

    /// Separate loads below the node `load` fetched.
    ///
    /// Call after every query of `load` was applied; the keys they filter
    /// on come from that node's records.
    pub fn nested_loads(&mut self, load: &DeferredLoad) -> QueryResult<Vec<DeferredLoad>> {
        let node = self.root.node_mut(load.segments()).ok_or_else(|| {
            QueryError::internal(format!("no loader at path '{}'", load.path()))
        })?;
        let mut loads = Vec::new();
        node.collect_deferred(&mut load.segments().to_vec(), self.config.batch_size, &mut loads)?;
        Ok(loads)
    }

    /// Take the records gathered so far and reset the tree.
    pub fn finish(&mut self) -> LoadResult {
        let result = LoadResult::new(
            std::mem::take(&mut self.arena),
            self.root.result().to_vec(),
            self.rows_processed,
            self.queries_executed,
        );
        self.reset();
        result
    }

    /// Drop all load state: records, duplicate registries and reference
    /// tables of every node.
    pub fn reset(&mut self) {
        self.root.reset();
        self.arena.clear();
        self.rows_processed = 0;
        self.queries_executed = 0;
    }

    /// Run the whole pipeline against a blocking executor.
    ///
    /// On error the tree is reset and no partial result is returned.
    pub fn load<E: QueryExecutor + ?Sized>(&mut self, executor: &E) -> QueryResult<LoadResult> {
        self.reset();
        let outcome = self.run(executor);
        if outcome.is_err() {
            self.reset();
        }
        outcome
    }

    fn run<E: QueryExecutor + ?Sized>(&mut self, executor: &E) -> QueryResult<LoadResult> {
        let query = self.compile()?;
        let rows = executor.fetch(&query)?;
        self.queries_executed += 1;
        for row in &rows {
            self.parse_row(row)?;
        }

        let mut pending: VecDeque<DeferredLoad> = self.deferred_loads()?.into();
        while let Some(load) = pending.pop_front() {
            for query in load.queries() {
                crate::strata_trace!(
                    path = %load.path(),
                    sql = %self.to_sql(query).0,
                    "Deferred query"
                );
                let rows = executor.fetch(query)?;
                self.queries_executed += 1;
                self.apply_deferred(&load, &rows)?;
            }
            for nested in self.nested_loads(&load)?.into_iter().rev() {
                pending.push_front(nested);
            }
        }

        crate::strata_debug!(
            rows = self.rows_processed,
            queries = self.queries_executed,
            records = self.arena.len(),
            "Load finished"
        );
        Ok(self.finish())
    }

    /// Run the whole pipeline against an asynchronous executor.
    ///
    /// Queries are awaited one after another in the same order [`load`](Self::load)
    /// runs them.
    pub async fn load_async<E: AsyncQueryExecutor + ?Sized>(
        &mut self,
        executor: &E,
    ) -> QueryResult<LoadResult> {
        self.reset();
        let outcome = self.run_async(executor).await;
        if outcome.is_err() {
            self.reset();
        }
        outcome
    }

    async fn run_async<E: AsyncQueryExecutor + ?Sized>(
        &mut self,
        executor: &E,
    ) -> QueryResult<LoadResult> {
        let query = self.compile()?;
        let rows = executor.fetch(&query).await?;
        self.queries_executed += 1;
        for row in &rows {
            self.parse_row(row)?;
        }

        let mut pending: VecDeque<DeferredLoad> = self.deferred_loads()?.into();
        while let Some(load) = pending.pop_front() {
            for query in load.queries() {
                crate::strata_trace!(
                    path = %load.path(),
                    sql = %self.to_sql(query).0,
                    "Deferred query"
                );
                let rows = executor.fetch(query).await?;
                self.queries_executed += 1;
                self.apply_deferred(&load, &rows)?;
            }
            for nested in self.nested_loads(&load)?.into_iter().rev() {
                pending.push_front(nested);
            }
        }

        crate::strata_debug!(
            rows = self.rows_processed,
            queries = self.queries_executed,
            records = self.arena.len(),
            "Load finished"
        );
        Ok(self.finish())
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("config", &self.config)
            .field("root", &self.root)
            .field("records", &self.arena.len())
            .finish_non_exhaustive()
    }
}
