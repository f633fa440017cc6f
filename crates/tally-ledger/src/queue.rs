//! Single-writer durable write queue.
//!
//! One worker task owns the receiving end of the queue and executes write
//! requests strictly one at a time, in the order mutations were applied.
//! Each write serializes the state current at execution time.

use std::sync::Arc;

use tally_store::PersistenceAdapter;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::codec::encode_items;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::event::LedgerEvent;
use crate::store::Shared;

/// Outcome of one write position: the revision actually serialized.
pub(crate) type WriteOutcome = Result<u64, LedgerError>;

pub(crate) enum WriteRequest {
    /// Persist the current state on behalf of the mutation at `revision`.
    Persist {
        revision: u64,
        ack: oneshot::Sender<WriteOutcome>,
    },
    /// Answer once every earlier request has finished, with the
    /// outstanding write failure if there is one.
    Barrier {
        ack: oneshot::Sender<Option<LedgerError>>,
    },
}

pub(crate) type WriteQueue = mpsc::UnboundedSender<WriteRequest>;

/// Drain the queue until every sender is gone.
pub(crate) async fn run_worker<A>(
    adapter: Arc<A>,
    shared: Arc<Shared>,
    config: LedgerConfig,
    mut requests: mpsc::UnboundedReceiver<WriteRequest>,
) where
    A: PersistenceAdapter + ?Sized,
{
    debug!("write worker started");
    while let Some(request) = requests.recv().await {
        match request {
            WriteRequest::Persist { revision, ack } => {
                let outcome = persist_current(&*adapter, &shared, &config, revision).await;
                match &outcome {
                    Ok(serialized) => {
                        shared.clear_write_failure();
                        shared.publish(LedgerEvent::Persisted {
                            revision,
                            serialized: *serialized,
                        });
                    }
                    Err(err) => {
                        shared.record_write_failure(err.clone());
                        shared.publish(LedgerEvent::WriteFailed {
                            revision,
                            reason: err.to_string(),
                        });
                    }
                }
                if let Err(Err(err)) = ack.send(outcome) {
                    warn!(revision, error = %err, "write failed with no caller waiting");
                }
            }
            WriteRequest::Barrier { ack } => {
                let _ = ack.send(shared.write_failure());
            }
        }
    }
    debug!("write worker stopped");
}

/// Write the current state, retrying per config.
async fn persist_current<A>(
    adapter: &A,
    shared: &Shared,
    config: &LedgerConfig,
    revision: u64,
) -> Result<u64, LedgerError>
where
    A: PersistenceAdapter + ?Sized,
{
    let attempts = config.write_attempts();
    let mut last_reason = String::new();

    for attempt in 1..=attempts {
        let (serialized, bytes) = {
            let state = shared.state.read().expect("lock poisoned");
            (state.revision, encode_items(&state.items))
        };
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(err) => {
                last_reason = err.to_string();
                break;
            }
        };
        let len = bytes.len();

        match adapter.write(bytes).await {
            Ok(()) => {
                debug!(revision, serialized, bytes = len, attempt, "write persisted");
                return Ok(serialized);
            }
            Err(err) => {
                warn!(revision, attempt, attempts, error = %err, "write attempt failed");
                last_reason = err.to_string();
                if attempt < attempts && !config.retry_backoff.is_zero() {
                    tokio::time::sleep(config.retry_backoff).await;
                }
            }
        }
    }

    Err(LedgerError::PersistenceWriteFailed {
        revision,
        attempts,
        reason: last_reason,
    })
}
