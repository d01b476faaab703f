use std::sync::Arc;

use serde_json::Value;
use ufa_store::{LedgerStore, Payload};

use crate::agreement::AgreementService;
use crate::config::EngineConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::invoice::InvoiceService;
use crate::preview::{self, failure_document, validation_document};
use crate::validation::validate_new_agreement;

/// The record engine: both services over one shared store.
pub struct UfaLedger<S> {
    agreements: AgreementService<S>,
    invoices: InvoiceService<S>,
}

impl<S> Clone for UfaLedger<S> {
    fn clone(&self) -> Self {
        Self {
            agreements: self.agreements.clone(),
            invoices: self.invoices.clone(),
        }
    }
}

impl<S: LedgerStore> UfaLedger<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        let agreements = AgreementService::new(Arc::clone(&store), config);
        let invoices = InvoiceService::new(store, agreements.clone());
        Self {
            agreements,
            invoices,
        }
    }

    pub fn agreements(&self) -> &AgreementService<S> {
        &self.agreements
    }

    pub fn invoices(&self) -> &InvoiceService<S> {
        &self.invoices
    }

    pub fn config(&self) -> &EngineConfig {
        self.agreements.config()
    }

    // ---- Previews ----

    /// Run the new-agreement checks without writing. An undecodable payload
    /// yields a failure document carrying the decode error.
    pub fn validate_agreement_preview(&self, role: &str, payload: &str) -> Value {
        match Payload::decode(payload) {
            Ok(decoded) => validation_document(&validate_new_agreement(
                role,
                &decoded.fields,
                self.config(),
            )),
            Err(err) => failure_document(err),
        }
    }

    /// Run the invoice-pair checks against current state without writing.
    pub fn validate_invoice_pair_preview(&self, payload: &str) -> LedgerResult<Value> {
        match self.invoices.check_invoice_pair(payload) {
            Ok(report) => Ok(validation_document(&report)),
            Err(LedgerError::Decode(err)) => Ok(failure_document(err)),
            Err(err) => Err(err),
        }
    }

    pub fn health_probe(&self) -> Value {
        preview::health_probe()
    }
}
