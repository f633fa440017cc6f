use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::traits::PersistenceAdapter;

/// In-memory, single-blob adapter.
///
/// Intended for tests and embedding. The blob is held behind a `RwLock` and
/// cloned on read/write.
pub struct InMemoryAdapter {
    blob: RwLock<Option<Vec<u8>>>,
    writes: AtomicU64,
}

impl InMemoryAdapter {
    /// Create an adapter with no stored blob.
    pub fn new() -> Self {
        Self {
            blob: RwLock::new(None),
            writes: AtomicU64::new(0),
        }
    }

    /// Create an adapter pre-seeded with a blob.
    pub fn with_blob(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: RwLock::new(Some(bytes.into())),
            writes: AtomicU64::new(0),
        }
    }

    /// Current blob, if any.
    pub fn blob(&self) -> Option<Vec<u8>> {
        self.blob.read().expect("lock poisoned").clone()
    }

    /// Number of completed writes.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Drop the stored blob.
    pub fn clear(&self) {
        *self.blob.write().expect("lock poisoned") = None;
    }
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceAdapter for InMemoryAdapter {
    async fn read(&self) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.blob())
    }

    async fn write(&self, bytes: Vec<u8>) -> StoreResult<()> {
        *self.blob.write().expect("lock poisoned") = Some(bytes);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = self
            .blob
            .read()
            .expect("lock poisoned")
            .as_ref()
            .map(Vec::len);
        f.debug_struct("InMemoryAdapter")
            .field("blob_len", &size)
            .field("write_count", &self.write_count())
            .finish()
    }
}
