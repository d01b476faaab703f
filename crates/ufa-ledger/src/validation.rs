//! Validation engine: pure predicates over agreement and invoice data.
//!
//! Nothing here touches the ledger. Callers gather whatever facts a check
//! needs (the agreement, whether a period was already invoiced) and pass
//! them in.

use std::collections::HashSet;
use std::fmt;

use rust_decimal::Decimal;
use ufa_types::{field, keys, Agreement, Fields, Invoice, LineItem, SubmitterRole};

use crate::config::{EngineConfig, ValidationMode};

/// Structured code of a failed check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    UnauthorizedSubmitter,
    InvalidNetCharge,
    ToleranceOutOfRange,
    MissingChargeLineId,
    DuplicateChargeLineId,
    ReservedKey,
    MissingInvoice,
    MissingInvoiceNumber,
    UnknownAgreement,
    PeriodAlreadyInvoiced,
    InvoiceNumberTaken,
    AmountMismatch,
    InvalidInvoiceAmount,
    ChargeCapExceeded,
}

/// A single failed check and its caller-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of a validation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violation messages joined by newlines. Empty when valid.
    pub fn message(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    fn push(&mut self, kind: ViolationKind, message: impl Into<String>) {
        self.violations.push(Violation::new(kind, message));
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

// ---------------------------------------------------------------------------
// Agreements
// ---------------------------------------------------------------------------

/// Reject ids that would land on a sequence key (registry, indices, audit logs).
fn check_key(report: &mut ValidationReport, what: &str, id: &str) {
    if keys::is_reserved(id) {
        report.push(
            ViolationKind::ReservedKey,
            format!("{what} {id} is a reserved ledger key"),
        );
    }
}

/// An agreement id must not collide with a sequence key.
pub fn validate_agreement_id(id: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_key(&mut report, "UFA id", id);
    report
}

/// Check a new agreement submission.
///
/// Only sellers and buyers may create agreements; for them the net charge
/// and tolerance checks are both reported.
pub fn validate_new_agreement(
    submitter: &str,
    fields: &Fields,
    config: &EngineConfig,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    if submitter.parse::<SubmitterRole>().is_err() {
        report.push(
            ViolationKind::UnauthorizedSubmitter,
            "User is not authorized to create a UFA",
        );
        return report;
    }

    let draft = Agreement::new("", fields.clone());
    if draft.net_charge() <= Decimal::ZERO {
        report.push(ViolationKind::InvalidNetCharge, "Invalid net charge");
    }
    let tolerance = draft.charge_tolerance();
    if tolerance < config.min_tolerance || tolerance > config.max_tolerance {
        report.push(
            ViolationKind::ToleranceOutOfRange,
            format!(
                "Tolerence is out of range. Should be between {} and {}",
                config.min_tolerance, config.max_tolerance
            ),
        );
    }
    report
}

/// Every line item must carry its own `chargeLineId`, the key it is stored
/// under: present, unique within the submission, distinct from the owning
/// agreement's id, and clear of the sequence keys.
pub fn validate_line_items(agreement_id: &str, items: &[LineItem]) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen = HashSet::new();
    for (index, item) in items.iter().enumerate() {
        let id = match item.charge_line_id() {
            Some(id) if !id.is_empty() => id,
            _ => {
                report.push(
                    ViolationKind::MissingChargeLineId,
                    format!("Line item {index} has no chargeLineId"),
                );
                continue;
            }
        };
        if id == agreement_id || !seen.insert(id) {
            report.push(
                ViolationKind::DuplicateChargeLineId,
                format!("Line item {index} reuses the key {id}"),
            );
        }
        check_key(&mut report, "chargeLineId", id);
    }
    report
}

/// A line-item update must name the line item it targets.
pub fn validate_line_item_update(update: &Fields) -> ValidationReport {
    let mut report = ValidationReport::default();
    match update.get(field::CHARGE_LINE_ID) {
        Some(id) if !id.is_empty() => check_key(&mut report, "chargeLineId", id),
        _ => report.push(
            ViolationKind::MissingChargeLineId,
            "chargeLineId is required to update a line item",
        ),
    }
    report
}

// ---------------------------------------------------------------------------
// Invoice pairs
// ---------------------------------------------------------------------------

/// Ledger facts an invoice-pair check depends on.
#[derive(Clone, Debug, Default)]
pub struct InvoicePairContext<'a> {
    /// The agreement named by the customer invoice, if it exists.
    pub agreement: Option<&'a Agreement>,
    /// Whether the agreement already has invoices for the pair's period.
    pub period_already_invoiced: bool,
    /// Invoice numbers from the pair that are already taken in the ledger.
    pub taken_invoice_numbers: Vec<String>,
}

/// Check a customer/vendor invoice pair.
///
/// Checks run in a fixed order: pair shape and invoice keys, agreement existence, billing
/// period, invoice number reuse, amount equality, amount sanity, charge cap.
/// In [`ValidationMode::FirstMatch`] only the first failure is reported. In
/// [`ValidationMode::Collect`] the shape and agreement checks still stop the
/// run (nothing else can be evaluated without them); the rest are all
/// reported.
pub fn validate_invoice_pair(
    pair: &[Invoice],
    context: &InvoicePairContext<'_>,
    mode: ValidationMode,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if pair.len() < 2 {
        report.push(
            ViolationKind::MissingInvoice,
            "Invoice is missing for Customer or Vendor",
        );
        return report;
    }
    if pair.len() > 2 {
        report.push(
            ViolationKind::MissingInvoice,
            format!(
                "Exactly one Customer and one Vendor invoice are required, found {}",
                pair.len()
            ),
        );
        return report;
    }

    let (customer, vendor) = (&pair[0], &pair[1]);
    if customer.invoice_number().is_empty() || vendor.invoice_number().is_empty() {
        report.push(ViolationKind::MissingInvoiceNumber, "Invoice number is missing");
        return report;
    }
    if customer.invoice_number() == vendor.invoice_number() {
        report.push(
            ViolationKind::MissingInvoiceNumber,
            "Customer and Vendor invoices must have distinct invoice numbers",
        );
        return report;
    }
    check_key(&mut report, "Invoice number", customer.invoice_number());
    check_key(&mut report, "Invoice number", vendor.invoice_number());
    if !report.is_valid() {
        return report;
    }

    let Some(agreement) = context.agreement else {
        report.push(ViolationKind::UnknownAgreement, "Invalid UFA provided");
        return report;
    };

    let stop = |report: &ValidationReport| mode == ValidationMode::FirstMatch && !report.is_valid();

    if context.period_already_invoiced {
        report.push(
            ViolationKind::PeriodAlreadyInvoiced,
            format!("Invoices are already raised for {}", customer.billing_period()),
        );
    }
    if stop(&report) {
        return report;
    }

    if !context.taken_invoice_numbers.is_empty() {
        report.push(
            ViolationKind::InvoiceNumberTaken,
            format!(
                "Invoice number already in use: {}",
                context.taken_invoice_numbers.join(", ")
            ),
        );
    }
    if stop(&report) {
        return report;
    }

    let amount = customer.amount();
    if amount != vendor.amount() {
        report.push(
            ViolationKind::AmountMismatch,
            "Customer and Vendor Invoice Amounts are not same",
        );
    }
    if stop(&report) {
        return report;
    }

    // Covers the parse sentinel too: a malformed amount would lower the total.
    if amount < Decimal::ZERO {
        report.push(
            ViolationKind::InvalidInvoiceAmount,
            "Invoice amount must be a non-negative number",
        );
    }
    if stop(&report) {
        return report;
    }

    if agreement.raised_invoice_total().saturating_add(amount) > agreement.charge_cap() {
        report.push(ViolationKind::ChargeCapExceeded, "Total invoice amount exceeded");
    }
    report
}
