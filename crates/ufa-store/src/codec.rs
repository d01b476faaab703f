//! Record codec: the byte format of everything the engine keeps in the ledger.
//!
//! Records are written as schema-tagged envelopes:
//!
//! ```json
//! {"schema":2,"kind":"agreement","id":"UFA-1","fields":{...},"line_items":[...]}
//! ```
//!
//! Older ledgers hold flat documents whose values are all strings, with line
//! item references embedded as a JSON string. Those still decode; the
//! adapter lifts embedded references into native [`LineItemRef`]s.
//!
//! Submitted payloads and returned documents keep the flat legacy shape on
//! the outside; nesting is native everywhere else.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ufa_types::{field, Agreement, Fields, Invoice, LineItem, LineItemRef};

use crate::error::{StoreError, StoreResult};

/// Envelope schema written by this codec.
pub const SCHEMA_VERSION: u64 = 2;

const PAYLOAD_KEY: &str = "<payload>";

/// A record as stored under its own id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredRecord {
    Agreement(Agreement),
    LineItem(LineItem),
    Invoice(Invoice),
}

impl StoredRecord {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Agreement(_) => "agreement",
            Self::LineItem(_) => "line_item",
            Self::Invoice(_) => "invoice",
        }
    }
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// Encode a record envelope.
pub fn encode_record(key: &str, record: &StoredRecord) -> StoreResult<Vec<u8>> {
    let mut value = serde_json::to_value(record).map_err(|e| StoreError::codec(key, e))?;
    if let Value::Object(map) = &mut value {
        map.insert("schema".into(), Value::from(SCHEMA_VERSION));
    }
    serde_json::to_vec(&value).map_err(|e| StoreError::codec(key, e))
}

fn is_envelope(map: &Map<String, Value>) -> bool {
    map.get("schema").is_some_and(Value::is_number)
}

fn decode_envelope(key: &str, value: Value) -> StoreResult<StoredRecord> {
    serde_json::from_value(value).map_err(|e| StoreError::codec(key, e))
}

fn decode_object(key: &str, bytes: &[u8]) -> StoreResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::codec(
            key,
            format!("expected a JSON object, found {}", json_type(&other)),
        )),
        Err(e) => Err(StoreError::codec(key, e)),
    }
}

/// Decode the agreement stored at `key`.
pub fn decode_agreement(key: &str, bytes: &[u8]) -> StoreResult<Agreement> {
    let map = decode_object(key, bytes)?;
    if is_envelope(&map) {
        return match decode_envelope(key, Value::Object(map))? {
            StoredRecord::Agreement(agreement) => Ok(agreement),
            other => Err(kind_mismatch(key, "agreement", &other)),
        };
    }

    let mut fields = flat_fields(key, map)?;
    let mut agreement = Agreement::new(key, Fields::new());
    if let Some(embedded) = fields.remove(field::LEGACY_LINE_ITEM_IDS) {
        agreement.line_items = decode_field_list(key, &embedded)?
            .into_iter()
            .filter_map(|item| item.get(field::CHARGE_LINE_ID).map(LineItemRef::new))
            .collect();
    }
    agreement.fields = fields;
    Ok(agreement)
}

/// Decode the line item stored at `key`.
pub fn decode_line_item(key: &str, bytes: &[u8]) -> StoreResult<LineItem> {
    let map = decode_object(key, bytes)?;
    if is_envelope(&map) {
        return match decode_envelope(key, Value::Object(map))? {
            StoredRecord::LineItem(item) => Ok(item),
            other => Err(kind_mismatch(key, "line_item", &other)),
        };
    }
    Ok(LineItem::new(flat_fields(key, map)?))
}

/// Decode the invoice stored at `key`.
pub fn decode_invoice(key: &str, bytes: &[u8]) -> StoreResult<Invoice> {
    let map = decode_object(key, bytes)?;
    if is_envelope(&map) {
        return match decode_envelope(key, Value::Object(map))? {
            StoredRecord::Invoice(invoice) => Ok(invoice),
            other => Err(kind_mismatch(key, "invoice", &other)),
        };
    }
    Ok(Invoice::new(flat_fields(key, map)?))
}

fn kind_mismatch(key: &str, expected: &'static str, found: &StoredRecord) -> StoreError {
    StoreError::KindMismatch {
        key: key.to_string(),
        expected,
        found: found.kind_name(),
    }
}

// ---------------------------------------------------------------------------
// Flat documents
// ---------------------------------------------------------------------------

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_text(key: &str, name: &str, value: Value) -> StoreResult<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(StoreError::codec(
            key,
            format!("field {name} must be a scalar, found {}", json_type(&other)),
        )),
    }
}

fn flat_fields(key: &str, map: Map<String, Value>) -> StoreResult<Fields> {
    map.into_iter()
        .map(|(name, value)| {
            let text = scalar_text(key, &name, value)?;
            Ok((name, text))
        })
        .collect()
}

/// Decode a JSON array of flat objects: an invoice pair, or a line item list
/// embedded in a string field.
pub fn decode_field_list(key: &str, text: &str) -> StoreResult<Vec<Fields>> {
    let value: Value = serde_json::from_str(text).map_err(|e| StoreError::codec(key, e))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(StoreError::codec(
                key,
                format!("expected a JSON array, found {}", json_type(&other)),
            ))
        }
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => flat_fields(key, map),
            other => Err(StoreError::codec(
                key,
                format!("element {i} must be an object, found {}", json_type(&other)),
            )),
        })
        .collect()
}

/// Encode flat fields as a JSON object.
pub fn encode_fields(fields: &Fields) -> String {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
    .to_string()
}

// ---------------------------------------------------------------------------
// Submitted payloads
// ---------------------------------------------------------------------------

/// A decoded caller payload.
///
/// Scalar values are kept as text. `lineItems` may arrive as a native array
/// or as an embedded JSON string; either way it is held as text in `fields`
/// until [`Payload::take_line_items`] decodes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    pub fields: Fields,
}

impl Payload {
    /// Decode a JSON object payload.
    pub fn decode(text: &str) -> StoreResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| StoreError::codec(PAYLOAD_KEY, e))?;
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::codec(
                    PAYLOAD_KEY,
                    format!("expected a JSON object, found {}", json_type(&other)),
                ))
            }
        };

        let mut fields = Fields::new();
        for (name, value) in map {
            let text = match value {
                Value::Array(_) if name == field::LINE_ITEMS => value.to_string(),
                other => scalar_text(PAYLOAD_KEY, &name, other)?,
            };
            fields.insert(name, text);
        }
        Ok(Self { fields })
    }

    /// Remove `lineItems` from the payload and decode it.
    ///
    /// A payload without line items yields an empty list.
    pub fn take_line_items(&mut self) -> StoreResult<Vec<Fields>> {
        match self.fields.remove(field::LINE_ITEMS) {
            Some(text) if !text.trim().is_empty() => decode_field_list(PAYLOAD_KEY, &text),
            _ => Ok(Vec::new()),
        }
    }
}

/// Decode an invoice-pair payload (a JSON array of flat invoice objects).
pub fn decode_invoice_list(text: &str) -> StoreResult<Vec<Fields>> {
    decode_field_list(PAYLOAD_KEY, text)
}

// ---------------------------------------------------------------------------
// Returned documents
// ---------------------------------------------------------------------------

fn fields_object(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// Flat document of a record's fields.
pub fn fields_document(fields: &Fields) -> Value {
    Value::Object(fields_object(fields))
}

/// Agreement as returned to callers. Line item references, when present,
/// are rendered natively under `lineItems`.
pub fn agreement_document(agreement: &Agreement) -> Value {
    let mut map = fields_object(&agreement.fields);
    if !agreement.line_items.is_empty() {
        let refs = agreement
            .line_items
            .iter()
            .map(|r| {
                let mut obj = Map::new();
                obj.insert(
                    field::CHARGE_LINE_ID.into(),
                    Value::String(r.charge_line_id.clone()),
                );
                Value::Object(obj)
            })
            .collect();
        map.insert(field::LINE_ITEMS.into(), Value::Array(refs));
    }
    Value::Object(map)
}

/// Agreement with its line items resolved and inlined under `lineItems`.
pub fn expanded_agreement_document(agreement: &Agreement, items: &[LineItem]) -> Value {
    let mut map = fields_object(&agreement.fields);
    if !agreement.line_items.is_empty() {
        let resolved = items.iter().map(|item| fields_document(&item.fields)).collect();
        map.insert(field::LINE_ITEMS.into(), Value::Array(resolved));
    }
    Value::Object(map)
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

/// Encode an ordered string sequence.
pub fn encode_sequence(key: &str, items: &[String]) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(items).map_err(|e| StoreError::codec(key, e))
}

/// Decode an ordered string sequence. A JSON `null` is an empty sequence.
pub fn decode_sequence(key: &str, bytes: &[u8]) -> StoreResult<Vec<String>> {
    let items: Option<Vec<String>> =
        serde_json::from_slice(bytes).map_err(|e| StoreError::codec(key, e))?;
    Ok(items.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Envelopes
    // -----------------------------------------------------------------------

    #[test]
    fn agreement_envelope_round_trip() {
        let mut agreement = Agreement::new("UFA-1", fields(&[("netCharge", "1000")]));
        agreement.line_items = vec![LineItemRef::new("L-1"), LineItemRef::new("L-2")];
        let bytes = encode_record("UFA-1", &StoredRecord::Agreement(agreement.clone())).unwrap();

        let raw: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(raw["schema"], json!(2));
        assert_eq!(raw["kind"], json!("agreement"));

        assert_eq!(decode_agreement("UFA-1", &bytes).unwrap(), agreement);
    }

    #[test]
    fn decoding_wrong_kind_is_an_error() {
        let invoice = Invoice::new(fields(&[("invoiceNumber", "INV-1")]));
        let bytes = encode_record("INV-1", &StoredRecord::Invoice(invoice)).unwrap();
        let err = decode_agreement("INV-1", &bytes).unwrap_err();
        assert!(matches!(
            err,
            StoreError::KindMismatch { expected: "agreement", found: "invoice", .. }
        ));
    }

    #[test]
    fn garbage_bytes_are_a_codec_error() {
        assert!(matches!(
            decode_invoice("INV-1", b"\x00\x01"),
            Err(StoreError::Codec { .. })
        ));
        assert!(matches!(
            decode_invoice("INV-1", b"[1,2]"),
            Err(StoreError::Codec { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Legacy adapter
    // -----------------------------------------------------------------------

    #[test]
    fn legacy_flat_agreement_decodes() {
        let legacy = br#"{"netCharge":"1000","chargTolrence":"5","raisedInvTotal":"0"}"#;
        let agreement = decode_agreement("UFA-1", legacy).unwrap();
        assert_eq!(agreement.id, "UFA-1");
        assert_eq!(agreement.fields["chargTolrence"], "5");
        assert!(agreement.line_items.is_empty());
    }

    #[test]
    fn legacy_embedded_line_item_ids_are_lifted() {
        let legacy = json!({
            "netCharge": "1000",
            "lineItemsId": r#"[{"chargeLineId":"L-1"},{"chargeLineId":"L-2"}]"#,
        });
        let agreement =
            decode_agreement("UFA-1", legacy.to_string().as_bytes()).unwrap();
        assert_eq!(
            agreement.line_items,
            vec![LineItemRef::new("L-1"), LineItemRef::new("L-2")]
        );
        assert!(!agreement.fields.contains_key("lineItemsId"));
    }

    // -----------------------------------------------------------------------
    // Payloads
    // -----------------------------------------------------------------------

    #[test]
    fn payload_keeps_scalars_as_text() {
        let payload = Payload::decode(r#"{"netCharge":1000,"chargTolrence":"5","active":true}"#)
            .unwrap();
        assert_eq!(
            payload.fields,
            fields(&[("netCharge", "1000"), ("chargTolrence", "5"), ("active", "true")])
        );
    }

    #[test]
    fn payload_rejects_nested_values() {
        assert!(Payload::decode(r#"{"buyer":{"name":"acme"}}"#).is_err());
        assert!(Payload::decode(r#"{"buyer":null}"#).is_err());
        assert!(Payload::decode(r#"["not","an","object"]"#).is_err());
        assert!(Payload::decode("{broken").is_err());
    }

    #[test]
    fn line_items_accepted_native_or_embedded() {
        let native = r#"{"netCharge":"1","lineItems":[{"chargeLineId":"L-1","rate":"4"}]}"#;
        let embedded =
            r#"{"netCharge":"1","lineItems":"[{\"chargeLineId\":\"L-1\",\"rate\":\"4\"}]"}"#;
        for text in [native, embedded] {
            let mut payload = Payload::decode(text).unwrap();
            let items = payload.take_line_items().unwrap();
            assert_eq!(items, vec![fields(&[("chargeLineId", "L-1"), ("rate", "4")])]);
            assert!(!payload.fields.contains_key("lineItems"));
        }
    }

    #[test]
    fn missing_line_items_yield_empty_list() {
        let mut payload = Payload::decode(r#"{"netCharge":"1"}"#).unwrap();
        assert!(payload.take_line_items().unwrap().is_empty());
    }

    #[test]
    fn invoice_list_requires_objects() {
        assert_eq!(
            decode_invoice_list(r#"[{"invoiceNumber":"A"},{"invoiceNumber":"B"}]"#)
                .unwrap()
                .len(),
            2
        );
        assert!(decode_invoice_list(r#"["A","B"]"#).is_err());
        assert!(decode_invoice_list(r#"{"invoiceNumber":"A"}"#).is_err());
    }

    // -----------------------------------------------------------------------
    // Documents and sequences
    // -----------------------------------------------------------------------

    #[test]
    fn agreement_document_is_flat_without_line_items() {
        let agreement = Agreement::new(
            "UFA-1",
            fields(&[("netCharge", "1000"), ("chargTolrence", "5"), ("raisedInvTotal", "0")]),
        );
        assert_eq!(
            agreement_document(&agreement),
            json!({"netCharge":"1000","chargTolrence":"5","raisedInvTotal":"0"})
        );
    }

    #[test]
    fn expanded_document_inlines_items() {
        let mut agreement = Agreement::new("UFA-1", fields(&[("netCharge", "10")]));
        agreement.line_items = vec![LineItemRef::new("L-1")];
        let items = vec![LineItem::new(fields(&[("chargeLineId", "L-1"), ("rate", "4")]))];
        assert_eq!(
            expanded_agreement_document(&agreement, &items),
            json!({"netCharge":"10","lineItems":[{"chargeLineId":"L-1","rate":"4"}]})
        );
        assert_eq!(
            agreement_document(&agreement),
            json!({"netCharge":"10","lineItems":[{"chargeLineId":"L-1"}]})
        );
    }

    #[test]
    fn sequence_null_is_empty() {
        assert!(decode_sequence("ALL_RECS", b"null").unwrap().is_empty());
        let bytes = encode_sequence("ALL_RECS", &["a".into(), "b".into()]).unwrap();
        assert_eq!(decode_sequence("ALL_RECS", &bytes).unwrap(), vec!["a", "b"]);
    }
}
