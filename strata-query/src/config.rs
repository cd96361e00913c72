//! Loader configuration.
//!
//! Configuration can be built in code, deserialized from TOML (or any serde
//! format as part of a larger application config), or read from the
//! environment.
//!
//! # Environment Variables
//!
//! - `STRATA_DATABASE=postgres|mysql|sqlite` - placeholder style for generated SQL
//! - `STRATA_BATCH_SIZE=<n>` - maximum keys bound into one separate query
//! - `STRATA_CONTENT_IDENTITY=true|false` - deduplicate key-less rows by content
//!
//! ```rust
//! use strata_query::{DatabaseType, LoaderConfig};
//!
//! let config = LoaderConfig::from_toml_str(r#"
//!     database = "sqlite"
//!     batch_size = 250
//! "#).unwrap();
//! assert_eq!(config.database, DatabaseType::SQLite);
//! assert_eq!(config.batch_size, 250);
//! assert!(config.content_identity);
//! ```

use std::env;

use serde::Deserialize;

use crate::error::{QueryError, QueryResult};
use crate::sql::DatabaseType;

/// Default number of keys per separate query.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Settings that shape the queries a loader builds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Placeholder style used when rendering SQL.
    pub database: DatabaseType,
    /// Maximum number of key values bound into one separate query.
    pub batch_size: usize,
    /// Deduplicate rows of key-less entities by their full content.
    pub content_identity: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            database: DatabaseType::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            content_identity: true,
        }
    }
}

impl LoaderConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder style.
    pub fn database(mut self, database: DatabaseType) -> Self {
        self.database = database;
        self
    }

    /// Set the separate-query batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable content identity for key-less entities.
    pub fn content_identity(mut self, enabled: bool) -> Self {
        self.content_identity = enabled;
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> QueryResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| {
            QueryError::invalid_configuration(e.message().to_string()).with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from `STRATA_*` environment variables, falling
    /// back to defaults for unset variables.
    pub fn from_env() -> QueryResult<Self> {
        let mut config = Self::default();

        if let Ok(name) = env::var("STRATA_DATABASE") {
            config.database = DatabaseType::from_name(&name).ok_or_else(|| {
                QueryError::invalid_configuration(format!("unknown database '{}'", name))
                    .with_field("STRATA_DATABASE")
            })?;
        }

        if let Ok(size) = env::var("STRATA_BATCH_SIZE") {
            config.batch_size = size.trim().parse().map_err(|_| {
                QueryError::invalid_configuration(format!("batch size '{}' is not a number", size))
                    .with_field("STRATA_BATCH_SIZE")
            })?;
        }

        if let Ok(flag) = env::var("STRATA_CONTENT_IDENTITY") {
            config.content_identity = match flag.to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(QueryError::invalid_configuration(format!(
                        "'{}' is not a boolean",
                        flag
                    ))
                    .with_field("STRATA_CONTENT_IDENTITY"));
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the loader cannot work with.
    pub fn validate(&self) -> QueryResult<()> {
        if self.batch_size == 0 {
            return Err(QueryError::invalid_configuration("batch_size must be at least 1")
                .with_field("batch_size"));
        }
        Ok(())
    }
}
