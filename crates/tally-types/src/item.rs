use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::ItemId;
use crate::input::validate_name;

/// A tracked item: a named, priced entry with a running sale count.
///
/// Items are values. Every change produces a new `Item` that replaces the
/// old one in the ledger; only `id` carries identity across changes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub price: u64,
    /// Records written by older clients may omit the count.
    #[serde(default)]
    pub count: u64,
}

impl Item {
    /// Create a fresh item with a new id and a zero count.
    ///
    /// The name is validated and stored trimmed.
    pub fn new(name: &str, price: u64) -> Result<Self, TypeError> {
        Ok(Self {
            id: ItemId::generate(),
            name: validate_name(name)?,
            price,
            count: 0,
        })
    }

    /// Copy with a new name and price; id and count are preserved.
    pub fn with_details(&self, name: String, price: u64) -> Self {
        Self {
            name,
            price,
            ..self.clone()
        }
    }

    /// Copy with the count raised by one.
    pub fn incremented(&self) -> Self {
        Self {
            count: self.count.saturating_add(1),
            ..self.clone()
        }
    }

    /// Copy with the count lowered by one, floored at zero.
    pub fn decremented(&self) -> Self {
        Self {
            count: self.count.saturating_sub(1),
            ..self.clone()
        }
    }

    /// Revenue attributed to this item: `price * count`.
    pub fn revenue(&self) -> u64 {
        self.price.saturating_mul(self.count)
    }
}
