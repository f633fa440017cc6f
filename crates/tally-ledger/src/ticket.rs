use std::future::{Future, IntoFuture};
use std::pin::Pin;

use tokio::sync::oneshot;

use crate::error::{LedgerError, LedgerResult};
use crate::queue::WriteOutcome;

/// Handle for a mutation that has been applied in memory and queued for a
/// durable write.
///
/// The mutation's result is available immediately through
/// [`value`](Self::value). Awaiting the ticket waits for the queued write and
/// yields the value, or [`LedgerError::PersistenceWriteFailed`] if the write
/// exhausted its retries. Dropping the ticket does not cancel the write.
#[must_use = "the write is still pending; await the ticket to observe durability"]
pub struct WriteTicket<T> {
    value: T,
    revision: u64,
    ack: oneshot::Receiver<WriteOutcome>,
}

impl<T> WriteTicket<T> {
    pub(crate) fn new(value: T, revision: u64, ack: oneshot::Receiver<WriteOutcome>) -> Self {
        Self {
            value,
            revision,
            ack,
        }
    }

    /// The mutation's in-memory result.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Ledger revision produced by this mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Detach from the pending write and keep only the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Wait for the durable write.
    pub async fn durable(self) -> LedgerResult<T> {
        match self.ack.await {
            Ok(Ok(_)) => Ok(self.value),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(LedgerError::Shutdown),
        }
    }
}

impl<T: Send + 'static> IntoFuture for WriteTicket<T> {
    type Output = LedgerResult<T>;
    type IntoFuture = Pin<Box<dyn Future<Output = LedgerResult<T>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.durable())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for WriteTicket<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTicket")
            .field("value", &self.value)
            .field("revision", &self.revision)
            .finish()
    }
}
