//! Encoding of the item collection into the persisted blob.
//!
//! The blob is a JSON array of `{"id","name","price","count"}` objects in
//! ledger order.

use std::collections::HashSet;

use tally_types::Item;

use crate::error::{LedgerError, LedgerResult};

/// Serialize the full item sequence.
pub fn encode_items(items: &[Item]) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec(items).map_err(|e| LedgerError::Corrupt(e.to_string()))
}

/// Decode a persisted blob, rejecting duplicate ids and blank names.
pub fn decode_items(bytes: &[u8]) -> LedgerResult<Vec<Item>> {
    let items: Vec<Item> =
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Corrupt(e.to_string()))?;

    let mut seen = HashSet::with_capacity(items.len());
    for item in &items {
        if !seen.insert(&item.id) {
            return Err(LedgerError::Corrupt(format!("duplicate item id {}", item.id)));
        }
        if item.name.trim().is_empty() {
            return Err(LedgerError::Corrupt(format!("item {} has an empty name", item.id)));
        }
    }
    Ok(items)
}
