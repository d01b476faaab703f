use crate::error::StoreResult;

/// A value together with the version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned {
    pub version: u64,
    pub value: Vec<u8>,
}

/// Single-key ledger store.
///
/// All implementations must satisfy these invariants:
/// - `get`/`put` are atomic per key; there is no cross-key transaction.
/// - Each successful write advances the key's version by one. A key that was
///   never written has no version.
/// - `compare_and_swap` writes only if the key is still at
///   `expected_version` (`None` meaning "absent") and reports whether it did.
/// - `compare_and_delete` removes the key only if it is still at
///   `expected_version`. A removed key has no version again.
/// - The store never interprets values.
pub trait LedgerStore: Send + Sync {
    /// Read the value at `key`.
    ///
    /// Returns `Ok(None)` if the key was never written.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.get_versioned(key)?.map(|v| v.value))
    }

    /// Unconditionally write `value` at `key`.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read the value at `key` along with its current version.
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>>;

    /// Write `value` only if `key` is still at `expected_version`.
    fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
    ) -> StoreResult<bool>;

    /// Remove `key` only if it is still at `expected_version`.
    fn compare_and_delete(&self, key: &str, expected_version: u64) -> StoreResult<bool>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        (**self).get_versioned(key)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
    ) -> StoreResult<bool> {
        (**self).compare_and_swap(key, expected_version, value)
    }

    fn compare_and_delete(&self, key: &str, expected_version: u64) -> StoreResult<bool> {
        (**self).compare_and_delete(key, expected_version)
    }
}
