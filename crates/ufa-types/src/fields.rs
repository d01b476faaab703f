//! Verbatim field maps and the legacy field names carried on the wire.

use std::collections::BTreeMap;

/// Ordered string-keyed field map.
///
/// Values are kept exactly as submitted; typed views parse on access so a
/// read always returns the text that was written.
pub type Fields = BTreeMap<String, String>;

/// Field names used by agreement, line-item, and invoice documents.
pub mod field {
    pub const NET_CHARGE: &str = "netCharge";
    pub const CHARGE_TOLERANCE: &str = "chargTolrence";
    pub const RAISED_INVOICE_TOTAL: &str = "raisedInvTotal";
    pub const LINE_ITEMS: &str = "lineItems";
    /// Reference list written by older ledgers next to (not instead of) `lineItems`.
    pub const LEGACY_LINE_ITEM_IDS: &str = "lineItemsId";
    pub const CHARGE_LINE_ID: &str = "chargeLineId";

    pub const INVOICE_NUMBER: &str = "invoiceNumber";
    pub const AGREEMENT_NUMBER: &str = "ufanumber";
    pub const BILLING_PERIOD: &str = "billingPeriod";
    pub const INVOICE_AMOUNT: &str = "invoiceAmt";
    pub const RAISED_BY: &str = "raisedBy";
    pub const APPROVER_BY: &str = "approverBy";
}

/// Shallow last-write-wins merge of `update` over `existing`.
///
/// Fields absent from `update` are left untouched. Applying the same update
/// twice yields the same map as applying it once.
pub fn merge_fields(existing: &mut Fields, update: &Fields) {
    for (key, value) in update {
        existing.insert(key.clone(), value.clone());
    }
}
