//! Append ordering for single-entry creation.

/// Order for an item appended to a scope holding `existing` orders.
///
/// `max + 1`, or `1` for an empty scope. Gaps are never filled.
pub fn next_order(existing: impl IntoIterator<Item = i64>) -> i64 {
    existing.into_iter().max().map_or(1, |max| max + 1)
}
