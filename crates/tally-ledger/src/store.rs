use std::sync::{Arc, Mutex, RwLock};

use tally_store::PersistenceAdapter;
use tally_types::{parse_price, total_revenue, total_units, validate_name, Item, ItemId};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::decode_items;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::event::{Change, LedgerEvent};
use crate::queue::{run_worker, WriteQueue, WriteRequest};
use crate::ticket::WriteTicket;

/// Authoritative in-memory state.
#[derive(Default)]
pub(crate) struct LedgerState {
    pub(crate) items: Vec<Item>,
    pub(crate) revision: u64,
    pub(crate) degraded: bool,
}

/// State shared between the store handle and its write worker.
pub(crate) struct Shared {
    pub(crate) state: RwLock<LedgerState>,
    events: broadcast::Sender<LedgerEvent>,
    write_failure: Mutex<Option<LedgerError>>,
}

impl Shared {
    pub(crate) fn publish(&self, event: LedgerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn record_write_failure(&self, err: LedgerError) {
        *self.write_failure.lock().expect("lock poisoned") = Some(err);
    }

    pub(crate) fn clear_write_failure(&self) {
        *self.write_failure.lock().expect("lock poisoned") = None;
    }

    pub(crate) fn write_failure(&self) -> Option<LedgerError> {
        self.write_failure.lock().expect("lock poisoned").clone()
    }

    fn take_write_failure(&self) -> Option<LedgerError> {
        self.write_failure.lock().expect("lock poisoned").take()
    }
}

/// The persistent item ledger.
///
/// Owns the item collection and is the only thing that mutates it. Callers
/// share one instance by reference (or `Arc`) and only ever receive copies
/// of items.
///
/// Mutations apply to memory before they return and hand back a
/// [`WriteTicket`] for the queued durable write. See the crate docs for the
/// write discipline.
pub struct LedgerStore<A: PersistenceAdapter + ?Sized + 'static> {
    adapter: Arc<A>,
    shared: Arc<Shared>,
    queue: WriteQueue,
    worker: JoinHandle<()>,
}

impl<A: PersistenceAdapter + ?Sized + 'static> LedgerStore<A> {
    /// Create an empty ledger over `adapter` and start its write worker.
    ///
    /// Must be called from within a Tokio runtime. Call [`load`](Self::load)
    /// to pull in previously persisted items.
    pub fn new(adapter: Arc<A>, config: LedgerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let shared = Arc::new(Shared {
            state: RwLock::new(LedgerState::default()),
            events,
            write_failure: Mutex::new(None),
        });

        let (queue, requests) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(
            Arc::clone(&adapter),
            Arc::clone(&shared),
            config,
            requests,
        ));

        Self {
            adapter,
            shared,
            queue,
            worker,
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Replace memory with the persisted collection.
    ///
    /// Waits for queued writes first so it never reads underneath one. With
    /// no persisted data the ledger is empty. If the read fails or the blob
    /// cannot be decoded, the ledger is emptied, marked degraded, and
    /// [`LedgerError::PersistenceUnavailable`] is returned; later writes are
    /// still attempted.
    pub async fn load(&self) -> LedgerResult<usize> {
        if let Err(err) = self.flush().await {
            debug!(error = %err, "outstanding write failure before load");
        }

        let loaded = match self.adapter.read().await {
            Ok(Some(bytes)) => decode_items(&bytes),
            Ok(None) => Ok(Vec::new()),
            Err(err) => Err(LedgerError::PersistenceUnavailable(err.to_string())),
        };

        let mut state = self.shared.state.write().expect("lock poisoned");
        match loaded {
            Ok(items) => {
                let count = items.len();
                state.items = items;
                state.degraded = false;
                drop(state);
                info!(items = count, "ledger loaded");
                self.shared.publish(LedgerEvent::Loaded {
                    items: count,
                    degraded: false,
                });
                Ok(count)
            }
            Err(err) => {
                let err = match err {
                    LedgerError::Corrupt(reason) => {
                        LedgerError::PersistenceUnavailable(format!("corrupt ledger data: {reason}"))
                    }
                    other => other,
                };
                state.items.clear();
                state.degraded = true;
                drop(state);
                warn!(error = %err, "ledger load failed; running in memory only");
                self.shared.publish(LedgerEvent::Loaded {
                    items: 0,
                    degraded: true,
                });
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append a new item with a fresh id and a zero count.
    pub fn add(&self, name: &str, price: u64) -> LedgerResult<WriteTicket<Item>> {
        let item = Item::new(name, price)?;
        self.mutate(move |items| {
            items.push(item.clone());
            Ok((Change::Added(item.id.clone()), item))
        })
    }

    /// [`add`](Self::add) with the price given as text input.
    pub fn add_from_text(&self, name: &str, price: &str) -> LedgerResult<WriteTicket<Item>> {
        validate_name(name)?;
        self.add(name, parse_price(price)?)
    }

    /// Replace an item's name and price, keeping its id, count, and position.
    pub fn update(&self, id: &ItemId, name: &str, price: u64) -> LedgerResult<WriteTicket<Item>> {
        let name = validate_name(name)?;
        self.mutate(|items| {
            let idx = position(items, id)?;
            items[idx] = items[idx].with_details(name, price);
            Ok((Change::Updated(id.clone()), items[idx].clone()))
        })
    }

    /// [`update`](Self::update) with the price given as text input.
    pub fn update_from_text(
        &self,
        id: &ItemId,
        name: &str,
        price: &str,
    ) -> LedgerResult<WriteTicket<Item>> {
        validate_name(name)?;
        self.update(id, name, parse_price(price)?)
    }

    /// Raise an item's count by one.
    pub fn increment(&self, id: &ItemId) -> LedgerResult<WriteTicket<Item>> {
        self.mutate(|items| {
            let idx = position(items, id)?;
            items[idx] = items[idx].incremented();
            Ok((Change::Incremented(id.clone()), items[idx].clone()))
        })
    }

    /// Lower an item's count by one. At zero this is a successful no-op.
    pub fn decrement(&self, id: &ItemId) -> LedgerResult<WriteTicket<Item>> {
        self.mutate(|items| {
            let idx = position(items, id)?;
            items[idx] = items[idx].decremented();
            Ok((Change::Decremented(id.clone()), items[idx].clone()))
        })
    }

    /// Remove an item, keeping the relative order of the rest.
    pub fn remove(&self, id: &ItemId) -> LedgerResult<WriteTicket<Item>> {
        self.mutate(|items| {
            let idx = position(items, id)?;
            let removed = items.remove(idx);
            Ok((Change::Removed(id.clone()), removed))
        })
    }

    /// Apply `f` under the state lock and queue a write for the result.
    ///
    /// `Changed` is published and the request queued before the lock is
    /// released, so queue order is mutation order and a `Persisted` event
    /// never precedes the `Changed` event for the same revision.
    fn mutate<T, F>(&self, f: F) -> LedgerResult<WriteTicket<T>>
    where
        F: FnOnce(&mut Vec<Item>) -> LedgerResult<(Change, T)>,
    {
        let mut state = self.shared.state.write().expect("lock poisoned");
        let (change, value) = f(&mut state.items)?;
        state.revision += 1;
        let revision = state.revision;

        debug!(revision, change = ?change, "mutation applied");
        self.shared
            .publish(LedgerEvent::Changed { revision, change });

        let (ack, pending) = oneshot::channel();
        if self
            .queue
            .send(WriteRequest::Persist { revision, ack })
            .is_err()
        {
            // The dropped ack resolves the ticket to `Shutdown`.
            warn!(revision, "write worker gone; change kept in memory only");
        }
        drop(state);

        Ok(WriteTicket::new(value, revision, pending))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Copy of the current ordered item sequence.
    pub fn snapshot(&self) -> Vec<Item> {
        self.shared.state.read().expect("lock poisoned").items.clone()
    }

    /// Copy of a single item.
    pub fn get(&self, id: &ItemId) -> Option<Item> {
        let state = self.shared.state.read().expect("lock poisoned");
        state.items.iter().find(|item| &item.id == id).cloned()
    }

    /// Sum of `price * count` over the current items.
    pub fn total_revenue(&self) -> u64 {
        total_revenue(&self.shared.state.read().expect("lock poisoned").items)
    }

    /// Sum of counts over the current items.
    pub fn total_units(&self) -> u64 {
        total_units(&self.shared.state.read().expect("lock poisoned").items)
    }

    pub fn len(&self) -> usize {
        self.shared.state.read().expect("lock poisoned").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of mutations applied so far.
    pub fn revision(&self) -> u64 {
        self.shared.state.read().expect("lock poisoned").revision
    }

    /// Whether the last `load()` failed and the ledger is memory-only.
    pub fn is_degraded(&self) -> bool {
        self.shared.state.read().expect("lock poisoned").degraded
    }

    /// Receive notifications for loads, mutations, and writes.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.shared.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Durability
    // -----------------------------------------------------------------------

    /// Wait until every write queued before this call has finished.
    ///
    /// Returns the failure of the most recent write if no later write has
    /// succeeded since.
    pub async fn flush(&self) -> LedgerResult<()> {
        let (ack, done) = oneshot::channel();
        self.queue
            .send(WriteRequest::Barrier { ack })
            .map_err(|_| LedgerError::Shutdown)?;
        match done.await {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(err),
            Err(_) => Err(LedgerError::Shutdown),
        }
    }

    /// Take the outstanding write failure, if any.
    ///
    /// Cleared automatically by the next successful write.
    pub fn take_write_failure(&self) -> Option<LedgerError> {
        self.shared.take_write_failure()
    }

    /// Stop accepting work, drain the queue, and wait for the worker.
    pub async fn close(self) -> LedgerResult<()> {
        let Self {
            shared,
            queue,
            worker,
            ..
        } = self;
        drop(queue);
        worker.await.map_err(|_| LedgerError::Shutdown)?;
        match shared.write_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<A: PersistenceAdapter + ?Sized + 'static> std::fmt::Debug for LedgerStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.read().expect("lock poisoned");
        f.debug_struct("LedgerStore")
            .field("items", &state.items.len())
            .field("revision", &state.revision)
            .field("degraded", &state.degraded)
            .finish()
    }
}

fn position(items: &[Item], id: &ItemId) -> LedgerResult<usize> {
    items
        .iter()
        .position(|item| &item.id == id)
        .ok_or_else(|| LedgerError::NotFound { id: id.clone() })
}
