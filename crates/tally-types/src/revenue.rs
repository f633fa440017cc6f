//! Aggregates derived from a collection of items.

use crate::item::Item;

/// Sum of `price * count` over all items.
pub fn total_revenue(items: &[Item]) -> u64 {
    items
        .iter()
        .fold(0u64, |acc, item| acc.saturating_add(item.revenue()))
}

/// Sum of counts over all items.
pub fn total_units(items: &[Item]) -> u64 {
    items
        .iter()
        .fold(0u64, |acc, item| acc.saturating_add(item.count))
}
