//! Named-function entry points over positional string arguments.
//!
//! `invoke` runs mutating functions, `query` runs reads and previews. Both
//! accept the function names existing callers already send.

use serde_json::Value;
use tracing::debug;
use ufa_store::codec::{agreement_document, expanded_agreement_document, fields_document};
use ufa_store::LedgerStore;
use ufa_types::Invoice;

use crate::agreement::ExpandedAgreement;
use crate::engine::UfaLedger;
use crate::error::{LedgerError, LedgerResult};

fn arg<'a>(
    function: &str,
    args: &'a [String],
    index: usize,
    argument: &'static str,
) -> LedgerResult<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| LedgerError::MissingArgument {
            function: function.to_string(),
            argument,
        })
}

fn invoice_documents(invoices: &[Invoice]) -> Value {
    invoices
        .iter()
        .map(|inv| fields_document(&inv.fields))
        .collect()
}

fn expanded_document(expanded: &ExpandedAgreement) -> Value {
    expanded_agreement_document(&expanded.agreement, &expanded.line_items)
}

impl<S: LedgerStore> UfaLedger<S> {
    /// Run a mutating function.
    ///
    /// | function            | args                       |
    /// |---------------------|----------------------------|
    /// | `createUFA`         | id, submitter, payload     |
    /// | `createNewUFA`      | id, submitter, payload     |
    /// | `updateUFA`         | id, submitter, payload     |
    /// | `updateLineItem`    | ..., payload (last)        |
    /// | `createNewInvoices` | submitter, payload         |
    pub fn invoke(&self, function: &str, args: &[String]) -> LedgerResult<()> {
        debug!(function, argc = args.len(), "invoke");
        match function {
            "createUFA" => self.agreements().create_agreement(
                arg(function, args, 0, "id")?,
                arg(function, args, 1, "submitter")?,
                arg(function, args, 2, "payload")?,
            ),
            "createNewUFA" => self.agreements().create_agreement_with_line_items(
                arg(function, args, 0, "id")?,
                arg(function, args, 1, "submitter")?,
                arg(function, args, 2, "payload")?,
            ),
            "updateUFA" => self
                .agreements()
                .update_agreement(
                    arg(function, args, 0, "id")?,
                    arg(function, args, 1, "submitter")?,
                    arg(function, args, 2, "payload")?,
                )
                .map(drop),
            "updateLineItem" => {
                let payload = args.last().ok_or_else(|| LedgerError::MissingArgument {
                    function: function.to_string(),
                    argument: "payload",
                })?;
                self.agreements().update_line_item(payload).map(drop)
            }
            "createNewInvoices" => self
                .invoices()
                .create_invoice_pair(
                    arg(function, args, 0, "submitter")?,
                    arg(function, args, 1, "payload")?,
                )
                .map(drop),
            other => Err(LedgerError::UnknownFunction(other.to_string())),
        }
    }

    /// Run a read or preview and return its JSON document.
    pub fn query(&self, function: &str, args: &[String]) -> LedgerResult<Value> {
        debug!(function, argc = args.len(), "query");
        match function {
            "getAllUFA" => Ok(self
                .agreements()
                .get_all_agreements()?
                .iter()
                .map(agreement_document)
                .collect()),
            "getUFADetails" => {
                let id = arg(function, args, 0, "id")?;
                let agreement = self
                    .agreements()
                    .get_agreement(id)?
                    .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
                Ok(agreement_document(&agreement))
            }
            "getNewUFA" => {
                let id = arg(function, args, 0, "id")?;
                let expanded = self
                    .agreements()
                    .get_agreement_expanded(id)?
                    .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
                Ok(expanded_document(&expanded))
            }
            "getNewAllUFA" => Ok(self
                .agreements()
                .get_all_agreements_expanded()?
                .iter()
                .map(expanded_document)
                .collect()),
            "getInvoiceDetails" => {
                let number = arg(function, args, 0, "invoice number")?;
                let invoice = self
                    .invoices()
                    .get_invoice(number)?
                    .ok_or_else(|| LedgerError::NotFound(number.to_string()))?;
                Ok(fields_document(&invoice.fields))
            }
            "getInvoices" => {
                let id = arg(function, args, 0, "id")?;
                Ok(invoice_documents(
                    &self.invoices().get_invoices_for_agreement(id)?,
                ))
            }
            "getAllInvoicesForUsr" => {
                let identity = arg(function, args, 0, "identity")?;
                Ok(invoice_documents(
                    &self.invoices().get_invoices_visible_to(identity)?,
                ))
            }
            "validateNewUFA" => Ok(self.validate_agreement_preview(
                arg(function, args, 0, "role")?,
                arg(function, args, 1, "payload")?,
            )),
            "validateNewInvoideData" => {
                arg(function, args, 0, "submitter")?;
                self.validate_invoice_pair_preview(arg(function, args, 1, "payload")?)
            }
            "probe" => Ok(self.health_probe()),
            "getAuditTrail" => {
                let id = arg(function, args, 0, "id")?;
                Ok(self.agreements().audit_trail(id)?.into())
            }
            other => Err(LedgerError::UnknownFunction(other.to_string())),
        }
    }
}
