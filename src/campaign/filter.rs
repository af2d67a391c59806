//! Audience filter evaluation.

use tracing::trace;

use super::agent::{AgentFilter, FilterOperator};
use super::table::Row;

/// Decide whether `row` belongs to the segment described by `filter`.
///
/// No filter, or one missing its column or value, matches every row.
pub fn matches(row: &Row, filter: Option<&AgentFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if !filter.is_active() {
        return true;
    }

    let cell = row.value(&filter.column).to_lowercase();
    let wanted = filter.value.to_lowercase();

    match filter.operator {
        FilterOperator::Equals => cell == wanted,
        FilterOperator::Contains => cell.contains(&wanted),
        FilterOperator::StartsWith => cell.starts_with(&wanted),
        FilterOperator::EndsWith => cell.ends_with(&wanted),
        FilterOperator::Unknown => {
            trace!(column = %filter.column, "Unknown filter operator, matching all rows");
            true
        }
    }
}
