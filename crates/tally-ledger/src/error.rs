use std::fmt;

use tally_types::{ItemId, TypeError};

/// Caller-supplied field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Price,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => f.write_str("id"),
            Self::Name => f.write_str("name"),
            Self::Price => f.write_str("price"),
        }
    }
}

/// Errors produced by ledger operations.
///
/// None of these are fatal: memory stays authoritative and the ledger keeps
/// accepting operations after any of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Caller input was malformed. Reported before any state changes.
    #[error("invalid {field}: {reason}")]
    Validation { field: Field, reason: String },

    #[error("item not found: {id}")]
    NotFound { id: ItemId },

    /// The initial load failed; the ledger runs in degraded mode.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// A durable write exhausted its retries. The mutation is still applied
    /// in memory and will be carried by the next successful write.
    #[error("write for revision {revision} failed after {attempts} attempt(s): {reason}")]
    PersistenceWriteFailed {
        revision: u64,
        attempts: u32,
        reason: String,
    },

    /// The persisted blob could not be decoded.
    #[error("corrupt ledger data: {0}")]
    Corrupt(String),

    /// The write worker is not running.
    #[error("write worker has shut down")]
    Shutdown,
}

impl LedgerError {
    /// Whether this error only degrades durability, leaving memory correct.
    pub fn is_durability_warning(&self) -> bool {
        matches!(
            self,
            Self::PersistenceUnavailable(_) | Self::PersistenceWriteFailed { .. }
        )
    }
}

impl From<TypeError> for LedgerError {
    fn from(err: TypeError) -> Self {
        let field = match err {
            TypeError::EmptyName => Field::Name,
            TypeError::InvalidPrice(_) => Field::Price,
            TypeError::EmptyId => Field::Id,
        };
        Self::Validation {
            field,
            reason: err.to_string(),
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
