use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Durable storage for a single named blob.
///
/// An adapter is bound to one key when it is constructed. All
/// implementations must satisfy these invariants:
/// - `write` replaces the blob wholesale; a reader never observes a mix of
///   two writes.
/// - `read` after a successful `write` returns exactly the written bytes.
/// - Both operations may be slow and may fail; callers own retry policy.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Read the stored blob.
    ///
    /// Returns `Ok(None)` if nothing has been written yet.
    async fn read(&self) -> StoreResult<Option<Vec<u8>>>;

    /// Replace the stored blob.
    async fn write(&self, bytes: Vec<u8>) -> StoreResult<()>;
}

#[async_trait]
impl<A: PersistenceAdapter + ?Sized> PersistenceAdapter for Arc<A> {
    async fn read(&self) -> StoreResult<Option<Vec<u8>>> {
        (**self).read().await
    }

    async fn write(&self, bytes: Vec<u8>) -> StoreResult<()> {
        (**self).write(bytes).await
    }
}
