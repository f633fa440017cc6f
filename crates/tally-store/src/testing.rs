//! Fault-injecting adapter for exercising callers against slow and failing
//! storage.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{StoreError, StoreResult};
use crate::traits::PersistenceAdapter;

/// In-memory adapter with controllable latency and failures.
///
/// - `set_write_delay` applies a fixed delay to every write.
/// - `push_write_delays` queues per-write delays consumed in call order,
///   taking precedence over the fixed delay.
/// - `pause_writes` / `resume_writes` hold every write until released.
/// - `fail_next_writes(n)` makes the next `n` write attempts fail.
/// - `set_fail_reads(true)` makes every read fail.
///
/// Successful writes are recorded in order and can be inspected with
/// [`history`](Self::history).
pub struct ControlledAdapter {
    blob: RwLock<Option<Vec<u8>>>,
    history: Mutex<Vec<Vec<u8>>>,
    write_delay: Mutex<Duration>,
    delay_schedule: Mutex<VecDeque<Duration>>,
    paused: watch::Sender<bool>,
    failing_writes: AtomicU32,
    fail_reads: AtomicBool,
    write_attempts: AtomicU64,
}

impl ControlledAdapter {
    pub fn new() -> Self {
        Self {
            blob: RwLock::new(None),
            history: Mutex::new(Vec::new()),
            write_delay: Mutex::new(Duration::ZERO),
            delay_schedule: Mutex::new(VecDeque::new()),
            paused: watch::Sender::new(false),
            failing_writes: AtomicU32::new(0),
            fail_reads: AtomicBool::new(false),
            write_attempts: AtomicU64::new(0),
        }
    }

    /// Create an adapter pre-seeded with a blob.
    pub fn with_blob(bytes: impl Into<Vec<u8>>) -> Self {
        let adapter = Self::new();
        *adapter.blob.write().expect("lock poisoned") = Some(bytes.into());
        adapter
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().expect("lock poisoned") = delay;
    }

    pub fn push_write_delays(&self, delays: impl IntoIterator<Item = Duration>) {
        self.delay_schedule
            .lock()
            .expect("lock poisoned")
            .extend(delays);
    }

    pub fn pause_writes(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume_writes(&self) {
        self.paused.send_replace(false);
    }

    pub fn fail_next_writes(&self, n: u32) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Current blob, if any.
    pub fn blob(&self) -> Option<Vec<u8>> {
        self.blob.read().expect("lock poisoned").clone()
    }

    /// Every successfully written blob, oldest first.
    pub fn history(&self) -> Vec<Vec<u8>> {
        self.history.lock().expect("lock poisoned").clone()
    }

    /// Number of write calls started, including failed ones.
    pub fn write_attempts(&self) -> u64 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn next_delay(&self) -> Duration {
        let scheduled = self
            .delay_schedule
            .lock()
            .expect("lock poisoned")
            .pop_front();
        scheduled.unwrap_or_else(|| *self.write_delay.lock().expect("lock poisoned"))
    }

    fn take_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for ControlledAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceAdapter for ControlledAdapter {
    async fn read(&self) -> StoreResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Injected("read failure".into()));
        }
        Ok(self.blob())
    }

    async fn write(&self, bytes: Vec<u8>) -> StoreResult<()> {
        let attempt = self.write_attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let mut paused = self.paused.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = paused.wait_for(|p| !*p).await;

        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.take_failure() {
            return Err(StoreError::Injected(format!("write attempt {attempt} failed")));
        }

        *self.blob.write().expect("lock poisoned") = Some(bytes.clone());
        self.history.lock().expect("lock poisoned").push(bytes);
        Ok(())
    }
}

impl std::fmt::Debug for ControlledAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlledAdapter")
            .field("write_attempts", &self.write_attempts())
            .field("failing_writes", &self.failing_writes.load(Ordering::SeqCst))
            .field("paused", &*self.paused.borrow())
            .finish()
    }
}
