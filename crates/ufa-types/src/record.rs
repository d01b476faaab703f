use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::fields::{field, Fields};
use crate::number::parse_number;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// ---------------------------------------------------------------------------
// Agreement
// ---------------------------------------------------------------------------

/// An upfront agreement capping what may be invoiced between two parties.
///
/// All submitted fields are kept verbatim in `fields`. Line items are stored
/// as independent records; the agreement only holds pointers to them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: String,
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItemRef>,
}

impl Agreement {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
            line_items: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Base charge the agreement was struck at.
    pub fn net_charge(&self) -> Decimal {
        parse_number(self.field(field::NET_CHARGE).unwrap_or_default())
    }

    /// Percentage allowance above the net charge.
    pub fn charge_tolerance(&self) -> Decimal {
        parse_number(self.field(field::CHARGE_TOLERANCE).unwrap_or_default())
    }

    /// Running sum of invoice amounts issued so far.
    ///
    /// An agreement that never recorded a total has invoiced nothing, so an
    /// absent or blank field reads as zero rather than the parse sentinel.
    pub fn raised_invoice_total(&self) -> Decimal {
        match self.field(field::RAISED_INVOICE_TOTAL) {
            None | Some("") => Decimal::ZERO,
            Some(text) => parse_number(text),
        }
    }

    /// `netCharge × (1 + tolerance / 100)`.
    pub fn charge_cap(&self) -> Decimal {
        let net = self.net_charge();
        let allowance = net
            .saturating_mul(self.charge_tolerance())
            .checked_div(ONE_HUNDRED)
            .unwrap_or(Decimal::MAX);
        net.saturating_add(allowance)
    }
}

// ---------------------------------------------------------------------------
// Line items
// ---------------------------------------------------------------------------

/// Pointer from an agreement to an independently stored line item.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemRef {
    #[serde(rename = "chargeLineId")]
    pub charge_line_id: String,
}

impl LineItemRef {
    pub fn new(charge_line_id: impl Into<String>) -> Self {
        Self {
            charge_line_id: charge_line_id.into(),
        }
    }
}

/// Individually addressable pricing component of an agreement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub fields: Fields,
}

impl LineItem {
    pub fn new(fields: Fields) -> Self {
        Self { fields }
    }

    pub fn charge_line_id(&self) -> Option<&str> {
        self.fields.get(field::CHARGE_LINE_ID).map(String::as_str)
    }

    /// Build the reference an agreement stores for this line item.
    pub fn to_ref(&self) -> Result<LineItemRef, TypeError> {
        self.charge_line_id()
            .map(LineItemRef::new)
            .ok_or(TypeError::MissingField(field::CHARGE_LINE_ID))
    }
}

// ---------------------------------------------------------------------------
// Invoice
// ---------------------------------------------------------------------------

/// One side (customer or vendor) of an invoice pair. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub fields: Fields,
}

impl Invoice {
    pub fn new(fields: Fields) -> Self {
        Self { fields }
    }

    fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn invoice_number(&self) -> &str {
        self.text(field::INVOICE_NUMBER)
    }

    /// Id of the agreement this invoice was raised against.
    pub fn agreement_id(&self) -> &str {
        self.text(field::AGREEMENT_NUMBER)
    }

    pub fn billing_period(&self) -> &str {
        self.text(field::BILLING_PERIOD)
    }

    pub fn amount(&self) -> Decimal {
        parse_number(self.text(field::INVOICE_AMOUNT))
    }

    pub fn raised_by(&self) -> &str {
        self.text(field::RAISED_BY)
    }

    pub fn approver_by(&self) -> &str {
        self.text(field::APPROVER_BY)
    }

    /// Whether `identity` raised or approves this invoice.
    pub fn is_visible_to(&self, identity: &str) -> bool {
        self.raised_by() == identity || self.approver_by() == identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::NUMBER_SENTINEL;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn agreement_cap_includes_tolerance() {
        let ufa = Agreement::new(
            "UFA-1",
            fields(&[("netCharge", "1000"), ("chargTolrence", "5")]),
        );
        assert_eq!(ufa.net_charge(), Decimal::from(1000));
        assert_eq!(ufa.charge_cap(), Decimal::from(1050));
    }

    #[test]
    fn missing_total_reads_as_zero() {
        let ufa = Agreement::new("UFA-1", fields(&[("netCharge", "1000")]));
        assert_eq!(ufa.raised_invoice_total(), Decimal::ZERO);
    }

    #[test]
    fn malformed_total_reads_as_sentinel() {
        let ufa = Agreement::new("UFA-1", fields(&[("raisedInvTotal", "lots")]));
        assert_eq!(ufa.raised_invoice_total(), NUMBER_SENTINEL);
    }

    #[test]
    fn line_item_ref_requires_charge_line_id() {
        let item = LineItem::new(fields(&[("chargeLineId", "L-1"), ("desc", "freight")]));
        assert_eq!(item.to_ref().unwrap(), LineItemRef::new("L-1"));

        let orphan = LineItem::new(fields(&[("desc", "freight")]));
        assert_eq!(
            orphan.to_ref(),
            Err(TypeError::MissingField("chargeLineId"))
        );
    }

    #[test]
    fn line_item_ref_serializes_with_legacy_name() {
        let json = serde_json::to_string(&LineItemRef::new("L-9")).unwrap();
        assert_eq!(json, r#"{"chargeLineId":"L-9"}"#);
    }

    #[test]
    fn invoice_visibility_matches_either_party() {
        let invoice = Invoice::new(fields(&[("raisedBy", "alice"), ("approverBy", "bob")]));
        assert!(invoice.is_visible_to("alice"));
        assert!(invoice.is_visible_to("bob"));
        assert!(!invoice.is_visible_to("carol"));
    }

    #[test]
    fn invoice_accessors_default_to_empty() {
        let invoice = Invoice::new(Fields::new());
        assert_eq!(invoice.invoice_number(), "");
        assert_eq!(invoice.amount(), NUMBER_SENTINEL);
    }
}
