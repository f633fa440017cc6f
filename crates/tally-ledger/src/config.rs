use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`LedgerStore`](crate::LedgerStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Key under which the item blob is stored.
    pub storage_key: String,
    /// Extra attempts after a failed write before it is reported.
    pub write_retries: u32,
    /// Pause between a failed write attempt and its retry.
    pub retry_backoff: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            storage_key: "items".into(),
            write_retries: 1,
            retry_backoff: Duration::from_millis(50),
            event_capacity: 256,
        }
    }
}

impl LedgerConfig {
    /// Defaults with no pause between retries, for tests and embedding.
    pub fn no_backoff() -> Self {
        Self {
            retry_backoff: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Total attempts a single write position gets.
    pub fn write_attempts(&self) -> u32 {
        self.write_retries.saturating_add(1)
    }
}
