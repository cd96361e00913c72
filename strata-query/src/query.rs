//! Select statements assembled by the loader.
//!
//! A [`SelectQuery`] is built up by the loader tree: every node taking part
//! in a statement registers its column range, joined nodes add a
//! `LEFT JOIN`, and separate nodes add a key filter. The result is handed to
//! a [`QueryExecutor`](crate::QueryExecutor), which may execute the rendered
//! SQL or interpret the structure directly.
//!
//! ```rust
//! use strata_query::{DatabaseType, Filter, SelectQuery};
//!
//! let mut query = SelectQuery::new("posts", "posts");
//! let offset = query.register_columns("posts", &["id".into(), "title".into()]);
//! assert_eq!(offset, 0);
//!
//! let offset = query.register_columns("author", &["id".into(), "name".into()]);
//! assert_eq!(offset, 2);
//! query.left_join(
//!     "users",
//!     "author",
//!     Filter::ColumnEquals("posts.author_id".into(), "author.id".into()),
//! );
//!
//! let (sql, _) = query.to_sql(DatabaseType::PostgreSQL);
//! assert!(sql.starts_with("SELECT posts.id AS posts__id"));
//! assert!(sql.contains("LEFT JOIN users AS author ON posts.author_id = author.id"));
//! ```

use smol_str::SmolStr;

use crate::filter::{Filter, FilterValue};
use crate::sql::{DatabaseType, SqlBuilder};

/// One selected column, qualified by the alias that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    /// Loader alias.
    pub alias: SmolStr,
    /// Column name.
    pub column: SmolStr,
}

/// A `LEFT JOIN` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// Joined table.
    pub table: SmolStr,
    /// Alias of the joined table.
    pub alias: SmolStr,
    /// Join condition.
    pub on: Filter,
}

/// A select statement over one root table plus joined tables.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    database: Option<SmolStr>,
    table: SmolStr,
    alias: SmolStr,
    columns: Vec<SelectColumn>,
    joins: Vec<JoinClause>,
    filter: Filter,
}

impl SelectQuery {
    /// Create a query selecting from `table AS alias`.
    pub fn new(table: impl Into<SmolStr>, alias: impl Into<SmolStr>) -> Self {
        Self {
            database: None,
            table: table.into(),
            alias: alias.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            filter: Filter::None,
        }
    }

    /// Target a specific database.
    pub fn with_database(mut self, database: Option<SmolStr>) -> Self {
        self.database = database;
        self
    }

    /// Append a contiguous column range for `alias`.
    ///
    /// Returns the offset of the first registered column within every row
    /// this query produces.
    pub fn register_columns(&mut self, alias: &str, columns: &[SmolStr]) -> usize {
        let offset = self.columns.len();
        self.columns.extend(columns.iter().map(|column| SelectColumn {
            alias: SmolStr::new(alias),
            column: column.clone(),
        }));
        offset
    }

    /// Add a `LEFT JOIN table AS alias ON condition`.
    pub fn left_join(&mut self, table: impl Into<SmolStr>, alias: impl Into<SmolStr>, on: Filter) {
        self.joins.push(JoinClause {
            table: table.into(),
            alias: alias.into(),
            on,
        });
    }

    /// AND a predicate into the `WHERE` clause.
    pub fn and_where(&mut self, filter: Filter) {
        let current = std::mem::take(&mut self.filter);
        self.filter = current.and_then(filter);
    }

    /// Restrict `column` to the given key values.
    pub fn where_in(&mut self, column: impl Into<String>, keys: Vec<FilterValue>) {
        self.and_where(Filter::In(column.into(), keys));
    }

    /// Database the statement targets, if not the default one.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Root table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Alias of the root table.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Selected columns in row order.
    pub fn columns(&self) -> &[SelectColumn] {
        &self.columns
    }

    /// Number of columns each row carries.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Join clauses in registration order.
    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    /// The `WHERE` predicate.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Render the statement with placeholders for `db_type`.
    pub fn to_sql(&self, db_type: DatabaseType) -> (String, Vec<FilterValue>) {
        let mut builder = SqlBuilder::new(db_type);
        builder.push("SELECT ");
        if self.columns.is_empty() {
            builder.push("*");
        }
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder
                .push_identifier(&col.alias)
                .push(".")
                .push_identifier(&col.column)
                .push(" AS ")
                .push_identifier(&format!("{}__{}", col.alias, col.column));
        }

        builder.push(" FROM ").push_identifier(&self.table);
        builder.push(" AS ").push_identifier(&self.alias);

        for join in &self.joins {
            builder
                .push(" LEFT JOIN ")
                .push_identifier(&join.table)
                .push(" AS ")
                .push_identifier(&join.alias)
                .push(" ON ");
            join.on.write_sql(&mut builder);
        }

        if !self.filter.is_none() {
            builder.push(" WHERE ");
            self.filter.write_sql(&mut builder);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<SmolStr> {
        names.iter().map(|n| SmolStr::new(n)).collect()
    }

    #[test]
    fn test_register_columns_offsets() {
        let mut query = SelectQuery::new("users", "users");
        assert_eq!(query.register_columns("users", &cols(&["id", "name"])), 0);
        assert_eq!(query.register_columns("profile", &cols(&["id", "user_id", "bio"])), 2);
        assert_eq!(query.register_columns("team", &cols(&["id"])), 5);
        assert_eq!(query.column_count(), 6);
        assert_eq!(query.columns()[2].alias, "profile");
    }

    #[test]
    fn test_to_sql_with_join_and_filter() {
        let mut query = SelectQuery::new("users", "users");
        query.register_columns("users", &cols(&["id"]));
        query.register_columns("profile", &cols(&["bio"]));
        query.left_join(
            "profiles",
            "profile",
            Filter::ColumnEquals("profile.user_id".into(), "users.id".into()),
        );
        query.and_where(Filter::Equals("users.active".into(), true.into()));

        let (sql, params) = query.to_sql(DatabaseType::PostgreSQL);
        assert_eq!(
            sql,
            "SELECT users.id AS users__id, profile.bio AS profile__bio FROM users AS users \
             LEFT JOIN profiles AS profile ON profile.user_id = users.id WHERE users.active = $1"
        );
        assert_eq!(params, vec![FilterValue::Bool(true)]);
    }

    #[test]
    fn test_join_params_numbered_before_where() {
        let mut query = SelectQuery::new("users", "users");
        query.left_join(
            "posts",
            "posts",
            Filter::and([
                Filter::ColumnEquals("posts.user_id".into(), "users.id".into()),
                Filter::Equals("posts.published".into(), true.into()),
            ]),
        );
        query.where_in("users.id", vec![1.into(), 2.into()]);

        let (sql, params) = query.to_sql(DatabaseType::PostgreSQL);
        assert!(sql.contains("posts.published = $1"));
        assert!(sql.contains("users.id IN ($2, $3)"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_where_in_accumulates() {
        let mut query = SelectQuery::new("posts", "posts");
        query.and_where(Filter::IsNull("posts.deleted_at".into()));
        query.where_in("posts.author_id", vec![7.into()]);
        assert!(matches!(query.filter(), Filter::And(v) if v.len() == 2));
    }

    #[test]
    fn test_empty_column_list_selects_star() {
        let query = SelectQuery::new("users", "u").with_database(Some("replica".into()));
        let (sql, _) = query.to_sql(DatabaseType::SQLite);
        assert_eq!(sql, "SELECT * FROM users AS u");
        assert_eq!(query.database(), Some("replica"));
    }

    #[test]
    fn test_reserved_identifiers_quoted() {
        let mut query = SelectQuery::new("order", "order");
        query.register_columns("order", &cols(&["id"]));
        let (sql, _) = query.to_sql(DatabaseType::PostgreSQL);
        assert_eq!(sql, "SELECT \"order\".id AS order__id FROM \"order\" AS \"order\"");
    }
}
