//! Record engine for upfront agreements (UFAs) and the paired invoices
//! raised against them.
//!
//! This crate provides:
//! - `AgreementService`: create, merge-update, and read agreements, with
//!   line items stored as independent records
//! - `InvoiceService`: issue customer/vendor invoice pairs under the
//!   tolerance-capped raised-total invariant
//! - Pure validation predicates with structured violation codes
//! - `UfaLedger`: both services behind named-function `invoke`/`query`
//!   dispatch, plus dry-run previews and a health probe
//!
//! Every composite write is built from compare-and-swap rounds on single
//! keys, so concurrent callers cannot lose updates or overrun a cap.

pub mod agreement;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod invoice;
pub mod preview;
pub mod validation;
mod write;

pub use agreement::{AgreementService, ExpandedAgreement};
pub use config::{EngineConfig, ValidationMode};
pub use engine::UfaLedger;
pub use error::{LedgerError, LedgerResult};
pub use invoice::InvoiceService;
pub use validation::{
    validate_agreement_id, validate_invoice_pair, validate_line_item_update,
    validate_line_items, validate_new_agreement, InvoicePairContext, ValidationReport, Violation, ViolationKind,
};
