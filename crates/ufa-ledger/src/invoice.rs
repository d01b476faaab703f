//! Invoice service: paired customer/vendor invoices and the running total
//! they raise on their agreement.

use std::sync::Arc;

use tracing::{debug, info, warn};
use ufa_store::codec::{decode_invoice, decode_invoice_list, encode_fields, encode_record};
use ufa_store::{LedgerStore, Sequence, StoredRecord};
use ufa_types::{field, format_amount, Agreement, Fields, Invoice};

use crate::agreement::AgreementService;
use crate::error::{LedgerError, LedgerResult};
use crate::validation::{validate_invoice_pair, InvoicePairContext, ValidationReport};
use crate::write::{claim_all, release, retry_on_conflict};

/// Issues and reads invoice pairs.
pub struct InvoiceService<S> {
    store: Arc<S>,
    agreements: AgreementService<S>,
}

impl<S> Clone for InvoiceService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            agreements: self.agreements.clone(),
        }
    }
}

impl<S: LedgerStore> InvoiceService<S> {
    pub fn new(store: Arc<S>, agreements: AgreementService<S>) -> Self {
        Self { store, agreements }
    }

    // ---- Issuance ----

    /// Validate and issue a customer/vendor invoice pair.
    ///
    /// The payload is a JSON array: customer invoice first, vendor second.
    /// Both invoice numbers are claimed as fresh keys, then the agreement's
    /// raised total is swapped in against the version that was validated.
    /// If a number was claimed first by another writer or the agreement
    /// moved, the claims are dropped and validation runs again on fresh
    /// state. Index entries are written only after the total has landed.
    /// Returns the new raised total.
    pub fn create_invoice_pair(&self, submitter: &str, payload: &str) -> LedgerResult<String> {
        let pair = decode_pair(payload)?;
        let agreement_id = pair
            .first()
            .map(|inv| inv.agreement_id().to_string())
            .unwrap_or_default();
        let attempts = self.agreements.config().max_write_attempts;

        let (mut update, numbers) = retry_on_conflict(&agreement_id, attempts, || {
            let (report, current) = self.evaluate(&pair)?;
            if !report.is_valid() {
                warn!(agreement = %agreement_id, submitter, violations = %report, "invoice pair rejected");
                return Err(LedgerError::Validation(report));
            }
            let Some((version, agreement)) = current else {
                return Err(LedgerError::NotFound(agreement_id.clone()));
            };

            let total = agreement.raised_invoice_total().saturating_add(pair[0].amount());
            let mut update = Fields::new();
            update.insert(field::RAISED_INVOICE_TOTAL.to_string(), format_amount(total));

            let mut entries = Vec::with_capacity(pair.len());
            for invoice in &pair {
                let number = invoice.invoice_number().to_string();
                let bytes = encode_record(&number, &StoredRecord::Invoice(invoice.clone()))?;
                entries.push((number, bytes));
            }
            if let Some(taken) = claim_all(&*self.store, &entries)? {
                debug!(invoice_number = %taken, "invoice number claimed concurrently");
                return Ok(None);
            }
            let numbers: Vec<String> = entries.into_iter().map(|(number, _)| number).collect();
            match self.agreements.commit_merge(&agreement, version, &update) {
                Ok(Some(_)) => Ok(Some((update, numbers))),
                Ok(None) => {
                    release(&*self.store, &numbers);
                    Ok(None)
                }
                Err(e) => {
                    release(&*self.store, &numbers);
                    Err(e)
                }
            }
        })?;

        Sequence::invoice_index(&agreement_id).append(&*self.store, &numbers, attempts)?;
        Sequence::invoice_master_index().append(&*self.store, &numbers, attempts)?;
        self.agreements
            .record_audit(&agreement_id, &encode_fields(&update))?;

        let total = update
            .remove(field::RAISED_INVOICE_TOTAL)
            .unwrap_or_default();
        info!(
            agreement = %agreement_id,
            submitter,
            customer = %numbers[0],
            vendor = %numbers[1],
            raised_total = %total,
            "invoice pair issued"
        );
        Ok(total)
    }

    /// Run the invoice-pair checks against current ledger state without
    /// writing anything.
    pub fn check_invoice_pair(&self, payload: &str) -> LedgerResult<ValidationReport> {
        let pair = decode_pair(payload)?;
        Ok(self.evaluate(&pair)?.0)
    }

    /// Gather the ledger facts the pair depends on and validate it.
    ///
    /// Also returns the versioned agreement so a caller can swap against it.
    fn evaluate(
        &self,
        pair: &[Invoice],
    ) -> LedgerResult<(ValidationReport, Option<(u64, Agreement)>)> {
        let current = match pair.first().map(Invoice::agreement_id) {
            Some(id) if !id.is_empty() => self.agreements.read_versioned(id)?,
            _ => None,
        };

        let mut period_already_invoiced = false;
        let mut taken_invoice_numbers = Vec::new();
        if let (Some((_, agreement)), Some(customer)) = (&current, pair.first()) {
            period_already_invoiced =
                self.has_invoice_for_period(&agreement.id, customer.billing_period())?;
            for invoice in pair {
                let number = invoice.invoice_number();
                if !number.is_empty() && self.store.get(number)?.is_some() {
                    taken_invoice_numbers.push(number.to_string());
                }
            }
        }

        let context = InvoicePairContext {
            agreement: current.as_ref().map(|(_, agreement)| agreement),
            period_already_invoiced,
            taken_invoice_numbers,
        };
        let report =
            validate_invoice_pair(pair, &context, self.agreements.config().validation_mode);
        Ok((report, current))
    }

    // ---- Reads ----

    pub fn get_invoice(&self, invoice_number: &str) -> LedgerResult<Option<Invoice>> {
        debug!(invoice_number, "get invoice");
        match self.store.get(invoice_number)? {
            Some(bytes) => Ok(Some(decode_invoice(invoice_number, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Invoices raised against an agreement, customer/vendor interleaved in
    /// issue order.
    pub fn get_invoices_for_agreement(&self, agreement_id: &str) -> LedgerResult<Vec<Invoice>> {
        self.resolve(&Sequence::invoice_index(agreement_id))
    }

    /// Every invoice the identity raised or approves.
    pub fn get_invoices_visible_to(&self, identity: &str) -> LedgerResult<Vec<Invoice>> {
        let all = self.resolve(&Sequence::invoice_master_index())?;
        Ok(all
            .into_iter()
            .filter(|invoice| invoice.is_visible_to(identity))
            .collect())
    }

    pub fn has_invoice_for_period(&self, agreement_id: &str, period: &str) -> LedgerResult<bool> {
        Ok(self
            .get_invoices_for_agreement(agreement_id)?
            .iter()
            .any(|invoice| invoice.billing_period() == period))
    }

    fn resolve(&self, index: &Sequence) -> LedgerResult<Vec<Invoice>> {
        let numbers = index.read(&*self.store)?;
        let mut invoices = Vec::with_capacity(numbers.len());
        for number in &numbers {
            match self.get_invoice(number)? {
                Some(invoice) => invoices.push(invoice),
                None => warn!(index = index.key(), invoice_number = %number, "indexed invoice is missing"),
            }
        }
        Ok(invoices)
    }
}

fn decode_pair(payload: &str) -> LedgerResult<Vec<Invoice>> {
    Ok(decode_invoice_list(payload)?
        .into_iter()
        .map(Invoice::new)
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use ufa_store::InMemoryLedgerStore;

    use super::*;
    use crate::config::{EngineConfig, ValidationMode};
    use crate::validation::ViolationKind;

    struct Fixture {
        agreements: AgreementService<InMemoryLedgerStore>,
        invoices: InvoiceService<InMemoryLedgerStore>,
    }

    fn fixture_with(config: EngineConfig) -> Fixture {
        let store = Arc::new(InMemoryLedgerStore::new());
        let agreements = AgreementService::new(Arc::clone(&store), config);
        let invoices = InvoiceService::new(store, agreements.clone());
        agreements
            .create_agreement(
                "UFA-1",
                "SELLER",
                r#"{"netCharge":"1000","chargTolrence":"5","raisedInvTotal":"0"}"#,
            )
            .unwrap();
        Fixture {
            agreements,
            invoices,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(EngineConfig::default())
    }

    fn pair(tag: &str, period: &str, customer_amt: &str, vendor_amt: &str) -> String {
        json!([
            {
                "invoiceNumber": format!("C-{tag}"),
                "ufanumber": "UFA-1",
                "billingPeriod": period,
                "invoiceAmt": customer_amt,
                "raisedBy": "alice",
                "approverBy": "bob",
            },
            {
                "invoiceNumber": format!("V-{tag}"),
                "ufanumber": "UFA-1",
                "billingPeriod": period,
                "invoiceAmt": vendor_amt,
                "raisedBy": "carol",
                "approverBy": "alice",
            },
        ])
        .to_string()
    }

    fn raised_total(f: &Fixture) -> String {
        f.agreements.get_agreement("UFA-1").unwrap().unwrap().fields["raisedInvTotal"].clone()
    }

    fn violation(err: &LedgerError) -> String {
        err.as_validation().expect("validation failure").message()
    }

    #[test]
    fn pair_up_to_cap_then_overrun() {
        let f = fixture();
        let total = f
            .invoices
            .create_invoice_pair("alice", &pair("1", "2024-01", "1050", "1050"))
            .unwrap();
        assert_eq!(total, "1050");
        assert_eq!(raised_total(&f), "1050");

        let err = f
            .invoices
            .create_invoice_pair("alice", &pair("2", "2024-02", "1", "1"))
            .unwrap_err();
        assert!(violation(&err).contains("exceeded"));
        assert_eq!(raised_total(&f), "1050");
        assert!(f.invoices.get_invoice("C-2").unwrap().is_none());
    }

    #[test]
    fn same_period_is_rejected() {
        let f = fixture();
        f.invoices
            .create_invoice_pair("alice", &pair("1", "2024-01", "10", "10"))
            .unwrap();
        let err = f
            .invoices
            .create_invoice_pair("alice", &pair("2", "2024-01", "10", "10"))
            .unwrap_err();
        assert!(violation(&err).contains("already raised"));
        assert_eq!(raised_total(&f), "10");
    }

    #[test]
    fn unequal_amounts_are_rejected() {
        let f = fixture();
        let err = f
            .invoices
            .create_invoice_pair("alice", &pair("1", "2024-01", "10", "11"))
            .unwrap_err();
        assert!(violation(&err).contains("not same"));
        assert_eq!(raised_total(&f), "0");
    }

    #[test]
    fn unknown_agreement_is_rejected() {
        let f = fixture();
        let payload = pair("1", "2024-01", "10", "10").replace("UFA-1", "UFA-9");
        let err = f.invoices.create_invoice_pair("alice", &payload).unwrap_err();
        assert!(violation(&err).contains("Invalid UFA provided"));
    }

    #[test]
    fn reused_invoice_number_is_rejected() {
        let f = fixture();
        f.invoices
            .create_invoice_pair("alice", &pair("1", "2024-01", "10", "10"))
            .unwrap();
        let err = f
            .invoices
            .create_invoice_pair("alice", &pair("1", "2024-02", "10", "10"))
            .unwrap_err();
        assert!(err
            .as_validation()
            .unwrap()
            .has(ViolationKind::InvoiceNumberTaken));
    }

    #[test]
    fn reserved_invoice_number_writes_nothing() {
        let f = fixture();
        let payload = pair("1", "2024-01", "10", "10").replace("C-1", "ALL_INVOICES");
        let err = f.invoices.create_invoice_pair("alice", &payload).unwrap_err();
        assert!(err.as_validation().unwrap().has(ViolationKind::ReservedKey));
        assert_eq!(raised_total(&f), "0");
        assert!(f.invoices.get_invoice("V-1").unwrap().is_none());

        f.invoices
            .create_invoice_pair("alice", &pair("2", "2024-01", "10", "10"))
            .unwrap();
        assert_eq!(f.invoices.get_invoices_visible_to("alice").unwrap().len(), 2);
    }

    #[test]
    fn collect_mode_reports_every_failure() {
        let f = fixture_with(EngineConfig {
            validation_mode: ValidationMode::Collect,
            ..EngineConfig::default()
        });
        f.invoices
            .create_invoice_pair("alice", &pair("1", "2024-01", "10", "10"))
            .unwrap();
        let report = f
            .invoices
            .check_invoice_pair(&pair("2", "2024-01", "2000", "1"))
            .unwrap();
        assert!(report.has(ViolationKind::PeriodAlreadyInvoiced));
        assert!(report.has(ViolationKind::AmountMismatch));
        assert!(report.has(ViolationKind::ChargeCapExceeded));
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let f = fixture();
        let err = f
            .invoices
            .create_invoice_pair("alice", r#"{"not":"a list"}"#)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Decode(_)));
    }

    #[test]
    fn indices_and_reads() {
        let f = fixture();
        f.invoices
            .create_invoice_pair("alice", &pair("1", "2024-01", "10", "10"))
            .unwrap();
        f.invoices
            .create_invoice_pair("alice", &pair("2", "2024-02", "20", "20"))
            .unwrap();
        assert_eq!(raised_total(&f), "30");

        let numbers: Vec<_> = f
            .invoices
            .get_invoices_for_agreement("UFA-1")
            .unwrap()
            .iter()
            .map(|inv| inv.invoice_number().to_string())
            .collect();
        assert_eq!(numbers, vec!["C-1", "V-1", "C-2", "V-2"]);

        assert_eq!(f.invoices.get_invoices_visible_to("alice").unwrap().len(), 4);
        assert_eq!(f.invoices.get_invoices_visible_to("bob").unwrap().len(), 2);
        assert!(f.invoices.get_invoices_visible_to("mallory").unwrap().is_empty());

        assert!(f.invoices.has_invoice_for_period("UFA-1", "2024-02").unwrap());
        assert!(!f.invoices.has_invoice_for_period("UFA-1", "2024-03").unwrap());

        let c1 = f.invoices.get_invoice("C-1").unwrap().unwrap();
        assert_eq!(c1.billing_period(), "2024-01");
    }

    #[test]
    fn issuance_is_audited_as_a_total_update() {
        let f = fixture();
        f.invoices
            .create_invoice_pair("alice", &pair("1", "2024-01", "12.50", "12.50"))
            .unwrap();
        let trail = f.agreements.audit_trail("UFA-1").unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[1], r#"{"raisedInvTotal":"12.5"}"#);
    }

    #[test]
    fn concurrent_pairs_never_overrun_the_cap() {
        use std::thread;

        let f = fixture();
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let invoices = f.invoices.clone();
                thread::spawn(move || {
                    invoices
                        .create_invoice_pair("alice", &pair(&i.to_string(), &format!("P{i}"), "400", "400"))
                        .is_ok()
                })
            })
            .collect();
        let issued = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|ok| *ok)
            .count();
        assert_eq!(issued, 2);
        assert_eq!(raised_total(&f), "800");
        assert_eq!(f.invoices.get_invoices_for_agreement("UFA-1").unwrap().len(), 4);
    }

    #[test]
    fn concurrent_pairs_cannot_share_invoice_numbers() {
        use std::thread;

        let f = fixture();
        f.agreements
            .create_agreement(
                "UFA-2",
                "SELLER",
                r#"{"netCharge":"1000","chargTolrence":"5","raisedInvTotal":"0"}"#,
            )
            .unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let invoices = f.invoices.clone();
                let agreement = if i % 2 == 0 { "UFA-1" } else { "UFA-2" };
                thread::spawn(move || {
                    let payload = pair("X", &format!("P{i}"), "10", "10").replace("UFA-1", agreement);
                    invoices
                        .create_invoice_pair("alice", &payload)
                        .is_ok()
                        .then_some(agreement)
                })
            })
            .collect();
        let winners: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().expect("thread should not panic"))
            .collect();
        assert_eq!(winners.len(), 1);
        let winner = winners[0];

        for number in ["C-X", "V-X"] {
            let invoice = f.invoices.get_invoice(number).unwrap().unwrap();
            assert_eq!(invoice.agreement_id(), winner);
        }
        let loser = if winner == "UFA-1" { "UFA-2" } else { "UFA-1" };
        assert!(f.invoices.get_invoices_for_agreement(loser).unwrap().is_empty());
        let total = |id: &str| {
            f.agreements.get_agreement(id).unwrap().unwrap().fields["raisedInvTotal"].clone()
        };
        assert_eq!(total(winner), "10");
        assert_eq!(total(loser), "0");
    }
}
