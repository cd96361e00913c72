//! Column slicing of positional rows.

use smol_str::SmolStr;

use super::arena::Fields;
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;

/// Extract the fields a node owns from a joined row.
///
/// The node's columns occupy `row[offset..offset + columns.len()]`. A row
/// too short for that range means the query layout and the row disagree,
/// which is reported instead of truncated.
pub fn fetch_data(
    row: &[FilterValue],
    offset: usize,
    columns: &[SmolStr],
    alias: &str,
) -> QueryResult<Fields> {
    let needed = offset + columns.len();
    let values = row
        .get(offset..needed)
        .ok_or_else(|| QueryError::malformed_row(alias, needed, row.len()))?;

    Ok(columns.iter().cloned().zip(values.iter().cloned()).collect())
}
