use tracing::{debug, warn};
use ufa_types::keys;

use crate::codec::{decode_sequence, encode_sequence};
use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

/// An append-only ordered sequence of strings held under one ledger key.
///
/// Used for the agreement registry, the invoice indices, and audit logs.
/// Every append is a full read-decode-append-encode cycle against the key,
/// committed with compare-and-swap and retried when another writer got
/// there first. A key that was never written is an empty sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
    key: String,
}

impl Sequence {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Ids of every agreement, in creation order.
    pub fn agreement_registry() -> Self {
        Self::new(keys::AGREEMENT_REGISTRY)
    }

    /// Ids of every invoice, pair by pair.
    pub fn invoice_master_index() -> Self {
        Self::new(keys::INVOICE_MASTER_INDEX)
    }

    /// Ids of the invoices raised against one agreement.
    pub fn invoice_index(agreement_id: &str) -> Self {
        Self::new(keys::invoice_index(agreement_id))
    }

    /// Raw payloads submitted against an agreement or line item.
    pub fn audit_log(id: &str) -> Self {
        Self::new(keys::audit_log(id))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the whole sequence.
    pub fn read<S: LedgerStore + ?Sized>(&self, store: &S) -> StoreResult<Vec<String>> {
        match store.get(&self.key)? {
            Some(bytes) => decode_sequence(&self.key, &bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Append `items` in one write. Returns the new length.
    ///
    /// Gives up with [`StoreError::Contention`] after `max_attempts` lost
    /// compare-and-swap rounds.
    pub fn append<S: LedgerStore + ?Sized>(
        &self,
        store: &S,
        items: &[String],
        max_attempts: u32,
    ) -> StoreResult<usize> {
        let attempts = max_attempts.max(1);
        for attempt in 1..=attempts {
            let current = store.get_versioned(&self.key)?;
            let (version, mut list) = match current {
                Some(v) => (Some(v.version), decode_sequence(&self.key, &v.value)?),
                None => (None, Vec::new()),
            };
            list.extend_from_slice(items);
            let encoded = encode_sequence(&self.key, &list)?;

            if store.compare_and_swap(&self.key, version, &encoded)? {
                debug!(key = %self.key, appended = items.len(), len = list.len(), "sequence append");
                return Ok(list.len());
            }
            warn!(key = %self.key, attempt, "sequence append lost a write race; retrying");
        }
        Err(StoreError::Contention {
            key: self.key.clone(),
            attempts,
        })
    }
}
