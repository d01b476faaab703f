//! Ledger key layout.
//!
//! Agreements, line items, and invoices live under their own ids in one flat
//! namespace. Sequences live under the fixed keys and prefixes below.

/// Key of the agreement registry.
pub const AGREEMENT_REGISTRY: &str = "ALL_RECS";

/// Key of the global invoice index.
pub const INVOICE_MASTER_INDEX: &str = "ALL_INVOICES";

/// Prefix of per-agreement and per-line-item audit logs.
pub const AUDIT_LOG_PREFIX: &str = "UFA_TRXN_HISTORY_";

/// Prefix of per-agreement invoice indices.
pub const INVOICE_INDEX_PREFIX: &str = "UFA_INVOICE_PREFIX_";

pub fn audit_log(id: &str) -> String {
    format!("{AUDIT_LOG_PREFIX}{id}")
}

pub fn invoice_index(agreement_id: &str) -> String {
    format!("{INVOICE_INDEX_PREFIX}{agreement_id}")
}

/// Whether `id` would land on a sequence key rather than a record key.
pub fn is_reserved(id: &str) -> bool {
    id == AGREEMENT_REGISTRY
        || id == INVOICE_MASTER_INDEX
        || id.starts_with(AUDIT_LOG_PREFIX)
        || id.starts_with(INVOICE_INDEX_PREFIX)
}
