//! Foundation types for Tally.
//!
//! This crate provides the value types shared by every other Tally crate:
//! the item record kept in the ledger, its identifier, the validation rules
//! applied to caller input, and the revenue aggregates derived from a
//! collection of items.
//!
//! # Key Types
//!
//! - [`ItemId`] — Opaque, immutable item identifier (UUID v7 for fresh items)
//! - [`Item`] — A named, priced item with a running sale count
//! - [`TypeError`] — Input and decoding failures for the above
//!
//! Aggregates ([`total_revenue`], [`total_units`]) are always recomputed from
//! the items passed in; nothing here caches derived values.

pub mod error;
pub mod id;
pub mod input;
pub mod item;
pub mod revenue;

pub use error::TypeError;
pub use id::ItemId;
pub use input::{parse_price, validate_name};
pub use item::Item;
pub use revenue::{total_revenue, total_units};
