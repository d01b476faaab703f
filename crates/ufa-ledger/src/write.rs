use tracing::{debug, warn};
use ufa_store::{LedgerStore, StoreError};

use crate::error::LedgerResult;

/// Run a read-modify-compare-and-swap round until it lands.
///
/// `round` returns `Ok(None)` when its swap lost to a concurrent writer;
/// the round is then re-run from a fresh read, up to `attempts` times.
pub(crate) fn retry_on_conflict<T>(
    key: &str,
    attempts: u32,
    mut round: impl FnMut() -> LedgerResult<Option<T>>,
) -> LedgerResult<T> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(value) = round()? {
            return Ok(value);
        }
        warn!(key, attempt, "write lost a compare-and-swap race; retrying");
    }
    Err(StoreError::Contention {
        key: key.to_string(),
        attempts,
    }
    .into())
}

/// Write each entry into a key that must still be absent.
///
/// Either every key is claimed or none is. On the first occupied key the
/// earlier claims are released and that key is returned.
pub(crate) fn claim_all<S: LedgerStore + ?Sized>(
    store: &S,
    entries: &[(String, Vec<u8>)],
) -> LedgerResult<Option<String>> {
    let mut claimed = Vec::with_capacity(entries.len());
    for (key, bytes) in entries {
        match store.compare_and_swap(key, None, bytes) {
            Ok(true) => claimed.push(key.clone()),
            Ok(false) => {
                release(store, &claimed);
                return Ok(Some(key.clone()));
            }
            Err(e) => {
                release(store, &claimed);
                return Err(e.into());
            }
        }
    }
    Ok(None)
}

/// Remove keys written by [`claim_all`].
///
/// A key written again since it was claimed is left in place.
pub(crate) fn release<S: LedgerStore + ?Sized>(store: &S, keys: &[String]) {
    for key in keys {
        match store.compare_and_delete(key, 1) {
            Ok(true) => debug!(key = %key, "claim released"),
            Ok(false) => warn!(key = %key, "claimed key changed before release; left in place"),
            Err(e) => warn!(key = %key, error = %e, "failed to release claim"),
        }
    }
}
