//! Executor traits the loader drives.
//!
//! The loader builds [`SelectQuery`] values and hands them to an executor;
//! the executor returns positional rows whose layout matches the query's
//! column list. Errors returned by an executor are propagated by the loader
//! unchanged.

use futures::future::BoxFuture;

use crate::error::QueryResult;
use crate::filter::FilterValue;
use crate::query::SelectQuery;

/// A flat result row: one value per selected column, in select order.
pub type Row = Vec<FilterValue>;

/// Blocking query executor.
pub trait QueryExecutor {
    /// Execute `query` and return every row it produces.
    fn fetch(&self, query: &SelectQuery) -> QueryResult<Vec<Row>>;
}

/// Asynchronous query executor.
///
/// The loader awaits each call to completion before parsing its rows; it
/// never runs two queries of one load concurrently.
pub trait AsyncQueryExecutor: Send + Sync {
    /// Execute `query` and return every row it produces.
    fn fetch<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    fn fetch(&self, query: &SelectQuery) -> QueryResult<Vec<Row>> {
        (**self).fetch(query)
    }
}

impl<E: AsyncQueryExecutor + ?Sized> AsyncQueryExecutor for &E {
    fn fetch<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        (**self).fetch(query)
    }
}
