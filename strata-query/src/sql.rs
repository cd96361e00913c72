//! Statement rendering for loader queries.
//!
//! Only placeholder style and identifier quoting vary by [`DatabaseType`];
//! the statements the loader emits are plain `SELECT ... LEFT JOIN ... WHERE`.

use serde::Deserialize;

use crate::filter::FilterValue;

/// Keywords that collide with common table or relation names.
const RESERVED: &[&str] = &[
    "all", "and", "as", "by", "check", "default", "from", "group", "index", "in", "join", "key",
    "left", "limit", "not", "null", "offset", "on", "or", "order", "select", "table", "to", "user",
    "where",
];

/// Target database, selecting placeholder and quoting style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// PostgreSQL uses `$1, $2` and double-quoted identifiers.
    #[default]
    #[serde(alias = "postgres")]
    PostgreSQL,
    /// MySQL uses `?` and backtick-quoted identifiers.
    MySQL,
    /// SQLite uses `?` and double-quoted identifiers.
    SQLite,
}

impl DatabaseType {
    /// Placeholder for the parameter at 1-based `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::PostgreSQL => format!("${}", index),
            Self::MySQL | Self::SQLite => "?".to_string(),
        }
    }

    /// Parse from a driver name (`postgres`, `postgresql`, `mysql`, `sqlite`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::PostgreSQL),
            "mysql" | "mariadb" => Some(Self::MySQL),
            "sqlite" | "sqlite3" => Some(Self::SQLite),
            _ => None,
        }
    }

    /// Quote `name` when it is reserved or not a bare identifier.
    pub fn quote(&self, name: &str) -> String {
        let bare = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !RESERVED.contains(&name.to_ascii_lowercase().as_str());
        if bare {
            return name.to_string();
        }

        let q = match self {
            Self::MySQL => '`',
            Self::PostgreSQL | Self::SQLite => '"',
        };
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }
}

/// Accumulates statement text and its bound parameters.
///
/// Parameters are numbered in push order, so join predicates written before
/// the `WHERE` clause take the lower placeholders.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    db_type: DatabaseType,
    sql: String,
    params: Vec<FilterValue>,
}

impl SqlBuilder {
    /// Create an empty builder for `db_type`.
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Append literal SQL.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a placeholder and bind `value` to it.
    pub fn push_param(&mut self, value: FilterValue) -> &mut Self {
        self.params.push(value);
        let placeholder = self.db_type.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
        self
    }

    /// Append a single identifier.
    pub fn push_identifier(&mut self, name: &str) -> &mut Self {
        let quoted = self.db_type.quote(name);
        self.sql.push_str(&quoted);
        self
    }

    /// Append a possibly alias-qualified column (`alias.column`).
    pub fn push_column(&mut self, name: &str) -> &mut Self {
        for (i, part) in name.split('.').enumerate() {
            if i > 0 {
                self.sql.push('.');
            }
            self.push_identifier(part);
        }
        self
    }

    /// Finish the statement.
    pub fn build(self) -> (String, Vec<FilterValue>) {
        (self.sql, self.params)
    }
}
