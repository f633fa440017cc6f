use tally_types::ItemId;

/// The mutation behind a [`LedgerEvent::Changed`] notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Added(ItemId),
    Updated(ItemId),
    Incremented(ItemId),
    Decremented(ItemId),
    Removed(ItemId),
}

/// Notifications broadcast to ledger subscribers.
///
/// Presentation collaborators re-render on `Loaded` and `Changed`; the
/// persistence events report the durable side of the same mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// `load()` replaced the in-memory collection.
    Loaded { items: usize, degraded: bool },
    /// A mutation was applied to memory.
    Changed { revision: u64, change: Change },
    /// The write queued for `revision` finished; `serialized` is the revision
    /// whose state it actually stored.
    Persisted { revision: u64, serialized: u64 },
    /// The write queued for `revision` exhausted its retries.
    WriteFailed { revision: u64, reason: String },
}
