//! Persistence adapters for Tally.
//!
//! The ledger keeps its whole item collection as one serialized blob under a
//! single fixed key. This crate defines the contract for reading and
//! replacing that blob and ships the backends that implement it.
//!
//! # Storage Backends
//!
//! All backends implement the [`PersistenceAdapter`] trait:
//!
//! - [`InMemoryAdapter`] -- `RwLock`-held blob for tests and embedding
//! - [`FileAdapter`] -- one JSON file per key, replaced atomically via rename
//! - [`testing::ControlledAdapter`] -- in-memory backend with injectable
//!   latency, pauses, and failures
//!
//! # Design Rules
//!
//! 1. A write replaces the blob wholesale; there are no partial or delta writes.
//! 2. A read returns the last fully written blob, or `None` if none exists.
//! 3. The adapter never interprets blob contents.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod testing;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileAdapter;
pub use memory::InMemoryAdapter;
pub use traits::PersistenceAdapter;
