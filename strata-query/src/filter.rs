//! Row values and filter predicates.
//!
//! [`FilterValue`] is the cell type of every row handed to the loader and the
//! parameter type of every query it builds. [`Filter`] is the predicate tree
//! used for the primary `WHERE`, for per-relation filters, for `LEFT JOIN ... ON`
//! conditions and for the key lists of deferred queries.

use serde::{Deserialize, Serialize};

use crate::sql::{DatabaseType, SqlBuilder};

/// A filter value that can be used in comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// JSON value.
    Json(serde_json::Value),
    /// List of values.
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Canonical text form used inside reference keys and identity maps.
    ///
    /// Returns `None` for null, which never participates in a reference.
    /// Strings and numbers with the same text (`"1"` and `1`) map to the
    /// same key, matching how databases compare key columns across joins.
    pub fn key_repr(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(v) => Some(v.to_string()),
            Self::Int(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::String(v) => Some(v.clone()),
            Self::Json(v) => Some(v.to_string()),
            Self::List(values) => {
                let parts: Vec<String> = values
                    .iter()
                    .map(|v| v.key_repr().unwrap_or_default())
                    .collect();
                Some(parts.join(","))
            }
        }
    }

    /// Convert into a JSON value for materialized output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(v) => serde_json::Value::Bool(*v),
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(v) => serde_json::Value::String(v.clone()),
            Self::Json(v) => v.clone(),
            Self::List(values) => {
                serde_json::Value::Array(values.iter().map(FilterValue::to_json).collect())
            }
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<serde_json::Value> for FilterValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A complete filter that can be converted to SQL.
///
/// Column names may be qualified with a loader alias (`"author.id"`); each
/// dot-separated part is quoted independently when rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// No filter (always true).
    None,

    /// Equals comparison.
    Equals(String, FilterValue),
    /// Not equals comparison.
    NotEquals(String, FilterValue),

    /// Less than comparison.
    Lt(String, FilterValue),
    /// Less than or equal comparison.
    Lte(String, FilterValue),
    /// Greater than comparison.
    Gt(String, FilterValue),
    /// Greater than or equal comparison.
    Gte(String, FilterValue),

    /// In a list of values.
    In(String, Vec<FilterValue>),
    /// Not in a list of values.
    NotIn(String, Vec<FilterValue>),

    /// Column-to-column equality, used for join conditions.
    ColumnEquals(String, String),

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Generate SQL for this filter with placeholders for `db_type`.
    /// Returns (sql, params) where params are the values to bind.
    pub fn to_sql(&self, db_type: DatabaseType) -> (String, Vec<FilterValue>) {
        let mut builder = SqlBuilder::new(db_type);
        self.write_sql(&mut builder);
        builder.build()
    }

    /// Append this filter to an in-progress statement, continuing its
    /// parameter numbering.
    pub fn write_sql(&self, builder: &mut SqlBuilder) {
        match self {
            Self::None => {
                builder.push("TRUE");
            }

            Self::Equals(col, val) => {
                builder.push_column(col);
                if val.is_null() {
                    builder.push(" IS NULL");
                } else {
                    builder.push(" = ").push_param(val.clone());
                }
            }
            Self::NotEquals(col, val) => {
                builder.push_column(col);
                if val.is_null() {
                    builder.push(" IS NOT NULL");
                } else {
                    builder.push(" != ").push_param(val.clone());
                }
            }

            Self::Lt(col, val) => Self::write_comparison(builder, col, " < ", val),
            Self::Lte(col, val) => Self::write_comparison(builder, col, " <= ", val),
            Self::Gt(col, val) => Self::write_comparison(builder, col, " > ", val),
            Self::Gte(col, val) => Self::write_comparison(builder, col, " >= ", val),

            Self::In(col, values) => Self::write_list(builder, col, " IN (", values, "FALSE"),
            Self::NotIn(col, values) => {
                Self::write_list(builder, col, " NOT IN (", values, "TRUE")
            }

            Self::ColumnEquals(left, right) => {
                builder.push_column(left).push(" = ").push_column(right);
            }

            Self::IsNull(col) => {
                builder.push_column(col).push(" IS NULL");
            }
            Self::IsNotNull(col) => {
                builder.push_column(col).push(" IS NOT NULL");
            }

            Self::And(filters) => Self::write_group(builder, filters, " AND ", "TRUE"),
            Self::Or(filters) => Self::write_group(builder, filters, " OR ", "FALSE"),
            Self::Not(filter) => {
                builder.push("NOT (");
                filter.write_sql(builder);
                builder.push(")");
            }
        }
    }

    fn write_comparison(builder: &mut SqlBuilder, col: &str, op: &str, val: &FilterValue) {
        builder.push_column(col).push(op).push_param(val.clone());
    }

    fn write_list(
        builder: &mut SqlBuilder,
        col: &str,
        op: &str,
        values: &[FilterValue],
        empty: &str,
    ) {
        if values.is_empty() {
            builder.push(empty);
            return;
        }
        builder.push_column(col).push(op);
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push_param(value.clone());
        }
        builder.push(")");
    }

    fn write_group(builder: &mut SqlBuilder, filters: &[Filter], sep: &str, empty: &str) {
        if filters.is_empty() {
            builder.push(empty);
            return;
        }
        builder.push("(");
        for (i, filter) in filters.iter().enumerate() {
            if i > 0 {
                builder.push(sep);
            }
            filter.write_sql(builder);
        }
        builder.push(")");
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::None
    }
}
