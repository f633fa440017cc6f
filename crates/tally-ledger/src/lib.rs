//! Persistent item ledger for Tally.
//!
//! This crate is the heart of Tally. It provides:
//! - [`LedgerStore`], the single owner of the in-memory item collection
//! - A single-writer durable write queue that always serializes the freshest
//!   state, so overlapping mutations never lose an update
//! - [`WriteTicket`]s that let callers observe a mutation immediately and
//!   await its durable write separately
//! - [`LedgerEvent`] notifications for presentation collaborators
//! - The JSON codec for the persisted item blob
//!
//! # Write discipline
//!
//! Every mutation is applied to memory under the state lock and, while that
//! lock is still held, a write request is pushed onto an unbounded queue.
//! A single worker task drains the queue strictly in order. Each write
//! re-reads the current state when it executes rather than carrying a copy
//! captured at enqueue time, so a slow write can never overwrite a newer
//! change with stale data. A failed write is retried per
//! [`LedgerConfig::write_retries`]; memory is never rolled back.

pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod store;
pub mod ticket;

mod queue;

pub use config::LedgerConfig;
pub use error::{Field, LedgerError, LedgerResult};
pub use event::{Change, LedgerEvent};
pub use store::LedgerStore;
pub use ticket::WriteTicket;
