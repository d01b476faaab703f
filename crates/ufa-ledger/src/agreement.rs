//! Agreement service: creation, partial updates, and line-item handling.

use std::sync::Arc;

use tracing::{debug, info, warn};
use ufa_store::codec::{decode_agreement, decode_line_item, encode_record};
use ufa_store::{LedgerStore, Payload, Sequence, StoredRecord};
use ufa_types::{field, merge_fields, Agreement, Fields, LineItem};

use crate::config::EngineConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::validation::{
    validate_agreement_id, validate_line_item_update, validate_line_items,
    validate_new_agreement, ValidationReport,
};
use crate::write::{claim_all, release, retry_on_conflict};

/// An agreement with its line-item references resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpandedAgreement {
    pub agreement: Agreement,
    /// Resolved line items in reference order. Dangling references are skipped.
    pub line_items: Vec<LineItem>,
}

/// Creates, updates, and reads agreements and their line items.
pub struct AgreementService<S> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S> Clone for AgreementService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

fn reject(report: ValidationReport) -> LedgerResult<()> {
    if report.is_valid() {
        Ok(())
    } else {
        Err(LedgerError::Validation(report))
    }
}

impl<S: LedgerStore> AgreementService<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- Creation ----

    /// Validate and store a new agreement exactly as submitted.
    pub fn create_agreement(&self, id: &str, submitter: &str, payload: &str) -> LedgerResult<()> {
        let decoded = Payload::decode(payload)?;
        self.check_new(id, submitter, &decoded.fields)?;
        self.swap_in(&Agreement::new(id, decoded.fields))?;
        self.register(id, payload)?;
        info!(id, submitter, "agreement created");
        Ok(())
    }

    /// Validate a new agreement, store each embedded line item under its
    /// `chargeLineId`, and keep only references to them on the agreement.
    ///
    /// Line-item keys must be free. If any key or the agreement id is taken,
    /// the line items written so far are removed again.
    pub fn create_agreement_with_line_items(
        &self,
        id: &str,
        submitter: &str,
        payload: &str,
    ) -> LedgerResult<()> {
        let mut decoded = Payload::decode(payload)?;
        self.check_new(id, submitter, &decoded.fields)?;

        let items: Vec<LineItem> = decoded
            .take_line_items()?
            .into_iter()
            .map(LineItem::new)
            .collect();
        let report = validate_line_items(id, &items);
        if !report.is_valid() {
            warn!(id, submitter, violations = %report, "line items rejected");
            return reject(report);
        }

        let mut agreement = Agreement::new(id, decoded.fields);
        let mut entries = Vec::with_capacity(items.len());
        for item in &items {
            let key = item.charge_line_id().unwrap_or_default().to_string();
            let bytes = encode_record(&key, &StoredRecord::LineItem(item.clone()))?;
            entries.push((key, bytes));
            agreement.line_items.extend(item.to_ref().ok());
        }

        if let Some(taken) = claim_all(&*self.store, &entries)? {
            warn!(id, charge_line_id = %taken, "line item key already in use");
            return Err(LedgerError::AlreadyExists(taken));
        }
        let claimed: Vec<String> = entries.into_iter().map(|(key, _)| key).collect();
        if let Err(e) = self.swap_in(&agreement) {
            release(&*self.store, &claimed);
            return Err(e);
        }
        self.register(id, payload)?;
        info!(id, submitter, line_items = items.len(), "agreement created with line items");
        Ok(())
    }

    fn check_new(&self, id: &str, submitter: &str, fields: &Fields) -> LedgerResult<()> {
        let mut report = validate_agreement_id(id);
        if report.is_valid() {
            report = validate_new_agreement(submitter, fields, &self.config);
        }
        if !report.is_valid() {
            warn!(id, submitter, violations = %report, "agreement rejected");
            return reject(report);
        }
        if self.store.get(id)?.is_some() {
            return Err(LedgerError::AlreadyExists(id.to_string()));
        }
        Ok(())
    }

    /// Write the agreement into its key, which must still be absent.
    fn swap_in(&self, agreement: &Agreement) -> LedgerResult<()> {
        let id = agreement.id.as_str();
        let bytes = encode_record(id, &StoredRecord::Agreement(agreement.clone()))?;
        if !self.store.compare_and_swap(id, None, &bytes)? {
            return Err(LedgerError::AlreadyExists(id.to_string()));
        }
        Ok(())
    }

    fn register(&self, id: &str, payload: &str) -> LedgerResult<()> {
        let attempts = self.config.max_write_attempts;
        Sequence::agreement_registry().append(&*self.store, &[id.to_string()], attempts)?;
        self.record_audit(id, payload)
    }

    // ---- Updates ----

    /// Merge the partial payload's fields over the stored agreement.
    ///
    /// Fields absent from the payload are left untouched. The audit log
    /// receives the partial payload, not the merged record.
    pub fn update_agreement(
        &self,
        id: &str,
        submitter: &str,
        partial_payload: &str,
    ) -> LedgerResult<Agreement> {
        let update = Payload::decode(partial_payload)?.fields;
        let merged = retry_on_conflict(id, self.config.max_write_attempts, || {
            let (version, agreement) = self
                .read_versioned(id)?
                .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
            self.commit_merge(&agreement, version, &update)
        })?;
        self.record_audit(id, partial_payload)?;
        info!(id, submitter, fields = update.len(), "agreement updated");
        Ok(merged)
    }

    /// Merge the partial payload over the line item it names.
    ///
    /// The audit entry is keyed by the line item id, not by any agreement.
    pub fn update_line_item(&self, partial_payload: &str) -> LedgerResult<LineItem> {
        let update = Payload::decode(partial_payload)?.fields;
        reject(validate_line_item_update(&update))?;
        let id = update
            .get(field::CHARGE_LINE_ID)
            .cloned()
            .unwrap_or_default();

        let merged = retry_on_conflict(&id, self.config.max_write_attempts, || {
            let current = self
                .store
                .get_versioned(&id)?
                .ok_or_else(|| LedgerError::NotFound(id.clone()))?;
            let mut item = decode_line_item(&id, &current.value)?;
            merge_fields(&mut item.fields, &update);
            let bytes = encode_record(&id, &StoredRecord::LineItem(item.clone()))?;
            let landed = self
                .store
                .compare_and_swap(&id, Some(current.version), &bytes)?;
            Ok(landed.then_some(item))
        })?;
        self.record_audit(&id, partial_payload)?;
        info!(charge_line_id = %id, fields = update.len(), "line item updated");
        Ok(merged)
    }

    /// Merge `update` into `agreement` and swap it in if the stored record is
    /// still at `version`. Returns `None` when another writer got there first.
    pub(crate) fn commit_merge(
        &self,
        agreement: &Agreement,
        version: u64,
        update: &Fields,
    ) -> LedgerResult<Option<Agreement>> {
        let mut merged = agreement.clone();
        merge_fields(&mut merged.fields, update);
        let bytes = encode_record(&merged.id, &StoredRecord::Agreement(merged.clone()))?;
        let landed = self
            .store
            .compare_and_swap(&merged.id, Some(version), &bytes)?;
        Ok(landed.then_some(merged))
    }

    pub(crate) fn record_audit(&self, id: &str, payload: &str) -> LedgerResult<()> {
        Sequence::audit_log(id).append(
            &*self.store,
            &[payload.to_string()],
            self.config.max_write_attempts,
        )?;
        Ok(())
    }

    // ---- Reads ----

    pub(crate) fn read_versioned(&self, id: &str) -> LedgerResult<Option<(u64, Agreement)>> {
        match self.store.get_versioned(id)? {
            Some(v) => Ok(Some((v.version, decode_agreement(id, &v.value)?))),
            None => Ok(None),
        }
    }

    pub fn get_agreement(&self, id: &str) -> LedgerResult<Option<Agreement>> {
        debug!(id, "get agreement");
        match self.store.get(id)? {
            Some(bytes) => Ok(Some(decode_agreement(id, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Every registered agreement, in creation order.
    pub fn get_all_agreements(&self) -> LedgerResult<Vec<Agreement>> {
        let ids = Sequence::agreement_registry().read(&*self.store)?;
        let mut agreements = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.get_agreement(id)? {
                Some(agreement) => agreements.push(agreement),
                None => warn!(id = %id, "registered agreement is missing from the ledger"),
            }
        }
        Ok(agreements)
    }

    pub fn get_agreement_expanded(&self, id: &str) -> LedgerResult<Option<ExpandedAgreement>> {
        match self.get_agreement(id)? {
            Some(agreement) => Ok(Some(self.expand(agreement)?)),
            None => Ok(None),
        }
    }

    pub fn get_all_agreements_expanded(&self) -> LedgerResult<Vec<ExpandedAgreement>> {
        self.get_all_agreements()?
            .into_iter()
            .map(|agreement| self.expand(agreement))
            .collect()
    }

    fn expand(&self, agreement: Agreement) -> LedgerResult<ExpandedAgreement> {
        let mut line_items = Vec::with_capacity(agreement.line_items.len());
        for reference in &agreement.line_items {
            let key = reference.charge_line_id.as_str();
            match self.store.get(key)? {
                Some(bytes) => line_items.push(decode_line_item(key, &bytes)?),
                None => debug!(
                    agreement = %agreement.id,
                    charge_line_id = key,
                    "skipping unresolved line item reference"
                ),
            }
        }
        Ok(ExpandedAgreement {
            agreement,
            line_items,
        })
    }

    /// Raw payloads submitted against an agreement or line item, oldest first.
    pub fn audit_trail(&self, id: &str) -> LedgerResult<Vec<String>> {
        Ok(Sequence::audit_log(id).read(&*self.store)?)
    }
}
