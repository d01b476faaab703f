//! Ledger storage for the UFA record engine.
//!
//! The ledger itself is an external collaborator that only offers
//! single-key reads and writes. This crate models that contract and builds
//! the engine's storage vocabulary on top of it.
//!
//! # Components
//!
//! - [`LedgerStore`]: single-key get/put plus a versioned compare-and-swap
//! - [`InMemoryLedgerStore`]: `HashMap`-backed store with JSON snapshots
//! - [`codec`]: record envelopes, legacy flat documents, submitted payloads
//! - [`Sequence`]: append-only string sequences (registry, indices, audit logs)
//!
//! # Design Rules
//!
//! 1. The store never interprets values; it holds opaque bytes.
//! 2. Every key carries a version that advances on each write.
//! 3. Read-modify-write cycles go through `compare_and_swap`, so concurrent
//!    appends to one key are never lost.
//! 4. Absence (`Ok(None)`) and undecodable bytes (`Err`) are distinct outcomes.

pub mod codec;
pub mod error;
pub mod memory;
pub mod sequence;
pub mod traits;

pub use codec::{Payload, StoredRecord};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryLedgerStore;
pub use sequence::Sequence;
pub use traits::{LedgerStore, Versioned};
