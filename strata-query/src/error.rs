//! Error types for relation loading with actionable messages.
//!
//! Every failure surfaced by the loader is a [`QueryError`] carrying:
//! - An error code for programmatic handling
//! - Actionable suggestions for fixing the issue
//! - Context about which relation, alias or query failed
//!
//! # Error Codes
//!
//! Error codes follow a pattern: P{category}{number}
//! - 1xxx: Load graph errors (unknown relation, alias clash, bad schema)
//! - 3xxx: Connection errors (reported by executors)
//! - 5xxx: Execution errors (reported by executors)
//! - 6xxx: Data errors (row layout, serialization)
//! - 7xxx: Configuration errors
//!
//! ```rust
//! use strata_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::unknown_relation("comments", "post");
//! assert_eq!(err.code, ErrorCode::UnknownRelation);
//! assert!(err.to_string().contains("comments"));
//! ```
//!
//! Executor errors pass through the loader untouched, so an executor is free
//! to build whatever [`QueryError`] best describes its failure:
//!
//! ```rust
//! use strata_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::database("relation \"users\" does not exist");
//! assert_eq!(err.code, ErrorCode::DatabaseError);
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for loader operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Load graph errors (1xxx)
    /// Relation path segment is not declared in the schema (P1006).
    UnknownRelation = 1006,
    /// Two loader nodes resolved to the same query alias (P1007).
    DuplicateAlias = 1007,
    /// Entity role missing from the schema registry (P1008).
    UnknownEntity = 1008,
    /// Entity schema is inconsistent with itself (P1009).
    InvalidSchema = 1009,

    // Connection errors (3xxx)
    /// Database connection failed (P3001).
    ConnectionFailed = 3001,
    /// Connection timeout (P3003).
    ConnectionTimeout = 3003,

    // Query execution errors (5xxx)
    /// Query timeout (P5001).
    QueryTimeout = 5001,
    /// General database error (P5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Serialization error (P6002).
    SerializationError = 6002,
    /// Deserialization error (P6003).
    DeserializationError = 6003,
    /// Row is shorter than the registered column layout (P6005).
    MalformedRow = 6005,

    // Configuration errors (7xxx)
    /// Invalid configuration (P7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (P9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "P1006").
    pub fn code(&self) -> String {
        format!("P{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnknownRelation => "Unknown relation",
            Self::DuplicateAlias => "Duplicate query alias",
            Self::UnknownEntity => "Unknown entity",
            Self::InvalidSchema => "Invalid entity schema",
            Self::ConnectionFailed => "Database connection failed",
            Self::ConnectionTimeout => "Connection timeout",
            Self::QueryTimeout => "Query timeout",
            Self::DatabaseError => "Database error",
            Self::SerializationError => "Serialization error",
            Self::DeserializationError => "Deserialization error",
            Self::MalformedRow => "Malformed result row",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }

    /// Get the documentation URL for this error.
    pub fn docs_url(&self) -> String {
        format!("https://strata.rs/docs/errors/{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The entity role involved.
    pub model: Option<String>,
    /// The relation or column involved.
    pub field: Option<String>,
    /// The SQL query (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

impl ErrorContext {
    /// Create new empty context.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Errors that can occur while building or running a load.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(
        mut self,
        text: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        self.context.suggestions.push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the entity role.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the relation or column.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL query.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// A relation path segment is not declared under `container`.
    pub fn unknown_relation(relation: impl Into<String>, container: impl Into<String>) -> Self {
        let relation = relation.into();
        let container = container.into();
        Self::new(
            ErrorCode::UnknownRelation,
            format!("Undefined relation '{}' under '{}'", relation, container),
        )
        .with_model(&container)
        .with_field(&relation)
        .with_suggestion(format!(
            "Declare '{}' in the relations of '{}' or fix the relation path",
            relation, container
        ))
        .with_code_suggestion(
            "Nested relations are separated by dots",
            "loader.add_loader(\"author.profile\", LoaderOptions::new())",
        )
    }

    /// The schema registry has no entity registered under `role`.
    pub fn unknown_entity(role: impl Into<String>) -> Self {
        let role = role.into();
        Self::new(
            ErrorCode::UnknownEntity,
            format!("No schema registered for entity '{}'", role),
        )
        .with_model(&role)
        .with_suggestion("Register the entity schema before building loaders that target it")
    }

    /// The primary key of `role` is not one of its columns.
    pub fn missing_primary_key(role: impl Into<String>, key: impl Into<String>) -> Self {
        let role = role.into();
        let key = key.into();
        Self::new(
            ErrorCode::InvalidSchema,
            format!("Primary key '{}' of entity '{}' is not a declared column", key, role),
        )
        .with_model(&role)
        .with_field(&key)
        .with_suggestion("Declare the primary key column before loading the entity")
    }

    /// Two loader nodes compiled to the same alias.
    pub fn duplicate_alias(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self::new(
            ErrorCode::DuplicateAlias,
            format!("Alias '{}' is used by more than one loader", alias),
        )
        .with_field(&alias)
        .with_suggestion("Pick a distinct alias option for one of the relations")
    }

    /// A row is too short for the column range registered for `alias`.
    pub fn malformed_row(alias: impl Into<String>, needed: usize, actual: usize) -> Self {
        let alias = alias.into();
        Self::new(
            ErrorCode::MalformedRow,
            format!(
                "Row has {} columns but loader '{}' needs at least {}",
                actual, alias, needed
            ),
        )
        .with_field(&alias)
        .with_help(
            "The executor returned rows whose layout does not match the compiled column ranges",
        )
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("Query timed out after {}ms", duration_ms),
        )
        .with_suggestion("Increase the query timeout if the query is expected to be slow")
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::ConnectionFailed,
            format!("Connection error: {}", message),
        )
        .with_suggestion("Check that the database server is running")
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message.into())
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize result: {}", message),
        )
        .with_suggestion("Check that the target type matches the loaded fields and relations")
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
            .with_suggestion("Check the database logs for more details")
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::InvalidConfiguration,
            format!("Invalid loader configuration: {}", message),
        )
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
            .with_help("This is likely a bug in Strata - please report it")
    }

    // ============== Error Checks ==============

    /// Check if this is an unknown relation error.
    pub fn is_unknown_relation(&self) -> bool {
        self.code == ErrorCode::UnknownRelation
    }

    /// Check if this is a malformed row error.
    pub fn is_malformed_row(&self) -> bool {
        self.code == ErrorCode::MalformedRow
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::QueryTimeout | ErrorCode::ConnectionTimeout
        )
    }

    /// Check if a fresh load (on a reset tree) might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionTimeout | ErrorCode::ConnectionFailed | ErrorCode::QueryTimeout
        )
    }

    // ============== Display Functions ==============

    /// Get the documentation URL for this error.
    pub fn docs_url(&self) -> String {
        self.code.docs_url()
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        // SQL (truncated if too long)
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.chars().count() > 200 {
                format!("{}...", sql.chars().take(200).collect::<String>())
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output.push_str(&format!("\nMore info: {}\n", self.docs_url()));

        output
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::serialization(err.to_string()).with_source(err)
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::UnknownRelation.code(), "P1006");
        assert_eq!(ErrorCode::MalformedRow.code(), "P6005");
        assert_eq!(ErrorCode::DatabaseError.code(), "P5005");
    }

    #[test]
    fn test_unknown_relation_error() {
        let err = QueryError::unknown_relation("comments", "post");
        assert!(err.is_unknown_relation());
        assert_eq!(err.context.model, Some("post".to_string()));
        assert_eq!(err.context.field, Some("comments".to_string()));
        assert!(err.message.contains("'comments' under 'post'"));
    }

    #[test]
    fn test_missing_primary_key_error() {
        let err = QueryError::missing_primary_key("post", "uuid");
        assert_eq!(err.code, ErrorCode::InvalidSchema);
        assert_eq!(err.code.code(), "P1009");
        assert_eq!(err.context.field, Some("uuid".to_string()));
    }

    #[test]
    fn test_malformed_row_error() {
        let err = QueryError::malformed_row("author", 7, 5);
        assert!(err.is_malformed_row());
        assert!(err.message.contains("5 columns"));
        assert!(err.message.contains("at least 7"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(QueryError::timeout(1000).is_retryable());
        assert!(QueryError::connection("refused").is_retryable());
        assert!(!QueryError::unknown_relation("a", "b").is_retryable());
        assert!(!QueryError::malformed_row("a", 2, 1).is_retryable());
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::unknown_relation("profile", "user")
            .with_context("Adding loader 'author.profile'");

        let output = err.display_full();
        assert!(output.contains("P1006"));
        assert!(output.contains("While: Adding loader"));
        assert!(output.contains("Suggestions"));
        assert!(output.contains("strata.rs/docs/errors/P1006"));
    }

    #[test]
    fn test_display_full_truncates_sql() {
        let sql = format!("SELECT {}", "x, ".repeat(200));
        let err = QueryError::database("boom").with_sql(sql);
        let output = err.display_full();
        assert!(output.contains("..."));
    }

    #[test]
    fn test_error_macro() {
        let err = query_error!(
            ErrorCode::DuplicateAlias,
            "Alias 'author' is used by more than one loader",
            with_field = "author",
            with_suggestion = "Pick a distinct alias option for one of the relations"
        );

        assert_eq!(err.code, ErrorCode::DuplicateAlias);
        assert_eq!(err.context.field, Some("author".to_string()));
        assert_eq!(err.context.suggestions.len(), 1);
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: QueryError = json_err.into();
        assert_eq!(err.code, ErrorCode::SerializationError);
        assert!(std::error::Error::source(&err).is_some());
    }
}
