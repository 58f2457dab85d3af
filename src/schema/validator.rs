//! Permissive structural validation of API payloads
//!
//! Validation never blocks the pipeline. A payload that does not match its
//! expected shape is still handed back as usable data together with the
//! list of diagnostics, so drift in the upstream API degrades to warnings.

use serde_json::Value;

/// Application-level code the API returns in a 200 response when the
/// requested resource does not exist (e.g. a cancelled order without any
/// charges or refunds)
pub const RESOURCE_NOT_FOUND_CODE: i64 = 102;

/// The payload kinds checked by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    OrderHistory,
    InvoiceOverview,
    InvoiceDetail,
    OrderAggregations,
}

impl PayloadKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderHistory => "order history",
            Self::InvoiceOverview => "invoice overview",
            Self::InvoiceDetail => "invoice detail",
            Self::OrderAggregations => "order aggregations",
        }
    }

    fn shape(&self) -> &'static Shape {
        match self {
            Self::OrderHistory => &ORDER_HISTORY,
            Self::InvoiceOverview => &INVOICE_OVERVIEW,
            Self::InvoiceDetail => &INVOICE_DETAIL,
            Self::OrderAggregations => &ANY_OBJECT,
        }
    }
}

/// Outcome of validating one payload
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    /// The payload matches its expected shape
    Valid(T),

    /// The API reported that the resource does not exist
    Empty { reason: String },

    /// The payload does not match, but is still passed on
    Mismatch { data: T, diagnostics: Vec<String> },
}

impl<T> Validation<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    pub fn diagnostics(&self) -> &[String] {
        match self {
            Self::Mismatch { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }

    /// Returns the data for valid and mismatched payloads
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Valid(data) | Self::Mismatch { data, .. } => Some(data),
            Self::Empty { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Validation<U> {
        match self {
            Self::Valid(data) => Validation::Valid(f(data)),
            Self::Empty { reason } => Validation::Empty { reason },
            Self::Mismatch { data, diagnostics } => Validation::Mismatch {
                data: f(data),
                diagnostics,
            },
        }
    }

    /// Logs the outcome; mismatches are logged with every diagnostic
    pub fn log(&self, kind: PayloadKind, subject: &str) {
        match self {
            Self::Valid(_) => {
                tracing::debug!("{} payload for {} is valid", kind.name(), subject);
            }
            Self::Empty { reason } => {
                tracing::info!("{} for {} is empty: {}", kind.name(), subject, reason);
            }
            Self::Mismatch { diagnostics, .. } => {
                tracing::warn!(
                    "{} payload for {} does not match the expected schema ({} issue(s)); using it anyway",
                    kind.name(),
                    subject,
                    diagnostics.len()
                );
                for diagnostic in diagnostics {
                    tracing::warn!("  {}", diagnostic);
                }
            }
        }
    }
}

/// Validates a payload against the shape for its kind
///
/// This is a pure function of its input.
pub fn validate(kind: PayloadKind, payload: &Value) -> Validation<Value> {
    if let Some(code) = payload.get("code").and_then(Value::as_i64) {
        if code == RESOURCE_NOT_FOUND_CODE {
            return Validation::Empty {
                reason: format!("resource not found (code {})", code),
            };
        }
    }

    let mut diagnostics = Vec::new();
    check(kind.shape(), payload, "$", &mut diagnostics);

    if diagnostics.is_empty() {
        Validation::Valid(payload.clone())
    } else {
        Validation::Mismatch {
            data: payload.clone(),
            diagnostics,
        }
    }
}

/// Expected structure of a JSON value; extra object keys are always allowed
enum Shape {
    String,
    Number,
    AnyObject,
    Object(&'static [Field]),
    ArrayOf(&'static Shape),
}

struct Field {
    name: &'static str,
    shape: Shape,
    optional: bool,
}

const fn required(name: &'static str, shape: Shape) -> Field {
    Field {
        name,
        shape,
        optional: false,
    }
}

const fn optional(name: &'static str, shape: Shape) -> Field {
    Field {
        name,
        shape,
        optional: true,
    }
}

static ANY_OBJECT: Shape = Shape::AnyObject;

static ITEM_FIELDS: [Field; 2] = [
    required("description", Shape::String),
    required("tcin", Shape::String),
];

static ORDER_LINE_FIELDS: [Field; 4] = [
    required("order_line_id", Shape::String),
    required("original_quantity", Shape::Number),
    optional("line_type", Shape::String),
    required("item", Shape::Object(&ITEM_FIELDS)),
];

static ORDER_LINE: Shape = Shape::Object(&ORDER_LINE_FIELDS);

static SUMMARY_FIELDS: [Field; 1] = [required("grand_total", Shape::String)];

static ORDER_HISTORY_ITEM_FIELDS: [Field; 5] = [
    required("order_number", Shape::String),
    required("placed_date", Shape::String),
    required("order_purchase_type", Shape::String),
    required("summary", Shape::Object(&SUMMARY_FIELDS)),
    required("order_lines", Shape::ArrayOf(&ORDER_LINE)),
];

static ORDER_HISTORY_ITEM: Shape = Shape::Object(&ORDER_HISTORY_ITEM_FIELDS);

static ORDER_HISTORY: Shape = Shape::ArrayOf(&ORDER_HISTORY_ITEM);

static INVOICE_OVERVIEW_ITEM_FIELDS: [Field; 5] = [
    required("id", Shape::String),
    required("date", Shape::String),
    required("amount", Shape::Number),
    required("type", Shape::String),
    optional("receipt_id", Shape::String),
];

static INVOICE_OVERVIEW_ITEM: Shape = Shape::Object(&INVOICE_OVERVIEW_ITEM_FIELDS);

static INVOICE_OVERVIEW_FIELDS: [Field; 1] =
    [required("invoices", Shape::ArrayOf(&INVOICE_OVERVIEW_ITEM))];

static INVOICE_OVERVIEW: Shape = Shape::Object(&INVOICE_OVERVIEW_FIELDS);

static INVOICE_LINE_FIELDS: [Field; 5] = [
    required("id", Shape::String),
    required("quantity", Shape::Number),
    required("unit_price", Shape::Number),
    required("effective_amount", Shape::Number),
    optional("item", Shape::Object(&ITEM_FIELDS)),
];

static INVOICE_LINE: Shape = Shape::Object(&INVOICE_LINE_FIELDS);

static PAYMENT_FIELDS: [Field; 2] = [
    required("type", Shape::String),
    required("total_charged", Shape::Number),
];

static PAYMENT: Shape = Shape::Object(&PAYMENT_FIELDS);

static INVOICE_DETAIL_FIELDS: [Field; 6] = [
    required("id", Shape::String),
    required("date", Shape::String),
    required("type", Shape::String),
    required("total_amount", Shape::Number),
    required("lines", Shape::ArrayOf(&INVOICE_LINE)),
    required("payments", Shape::ArrayOf(&PAYMENT)),
];

static INVOICE_DETAIL: Shape = Shape::Object(&INVOICE_DETAIL_FIELDS);

fn check(shape: &Shape, value: &Value, path: &str, diagnostics: &mut Vec<String>) {
    match shape {
        Shape::String => {
            if !value.is_string() {
                diagnostics.push(mismatch(path, "string", value));
            }
        }
        Shape::Number => {
            if !value.is_number() {
                diagnostics.push(mismatch(path, "number", value));
            }
        }
        Shape::AnyObject => {
            if !value.is_object() {
                diagnostics.push(mismatch(path, "object", value));
            }
        }
        Shape::Object(fields) => {
            let Some(object) = value.as_object() else {
                diagnostics.push(mismatch(path, "object", value));
                return;
            };
            for field in fields.iter() {
                let field_path = format!("{}.{}", path, field.name);
                match object.get(field.name) {
                    None | Some(Value::Null) if field.optional => {}
                    None => diagnostics.push(format!("{}: required field is missing", field_path)),
                    Some(child) => check(&field.shape, child, &field_path, diagnostics),
                }
            }
        }
        Shape::ArrayOf(element) => {
            let Some(items) = value.as_array() else {
                diagnostics.push(mismatch(path, "array", value));
                return;
            };
            for (index, item) in items.iter().enumerate() {
                check(element, item, &format!("{}[{}]", path, index), diagnostics);
            }
        }
    }
}

fn mismatch(path: &str, expected: &str, found: &Value) -> String {
    format!("{}: expected {}, found {}", path, expected, json_type(found))
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_order(number: &str) -> Value {
        json!({
            "order_number": number,
            "placed_date": "2024-08-17T12:58:39-05:00",
            "order_purchase_type": "ONLINE",
            "summary": {"grand_total": "13.19"},
            "order_lines": [{
                "order_line_id": "aef6fb40",
                "original_quantity": 1,
                "item": {"description": "Organic Bananas", "tcin": "24010659"}
            }],
            "address": {"city": "Somewhere"}
        })
    }

    #[test]
    fn test_valid_order_history() {
        let payload = json!([create_order("100"), create_order("101")]);
        let result = validate(PayloadKind::OrderHistory, &payload);
        assert!(result.is_valid(), "{:?}", result.diagnostics());
    }

    #[test]
    fn test_mismatch_keeps_data_and_reports_path() {
        let mut order = create_order("100");
        order["summary"]["grand_total"] = json!(13.19);
        let payload = json!([create_order("99"), order]);

        let result = validate(PayloadKind::OrderHistory, &payload);
        assert_eq!(
            result.diagnostics(),
            &["$[1].summary.grand_total: expected string, found number".to_string()]
        );
        assert_eq!(result.into_data(), Some(payload));
    }

    #[test]
    fn test_missing_field_diagnostic() {
        let mut order = create_order("100");
        order.as_object_mut().unwrap().remove("order_number");

        let result = validate(PayloadKind::OrderHistory, &json!([order]));
        assert_eq!(
            result.diagnostics(),
            &["$[0].order_number: required field is missing".to_string()]
        );
    }

    #[test]
    fn test_optional_field_may_be_absent_or_null() {
        let mut order = create_order("100");
        order["order_lines"][0]["line_type"] = Value::Null;
        assert!(validate(PayloadKind::OrderHistory, &json!([order])).is_valid());
    }

    #[test]
    fn test_order_history_must_be_array() {
        let result = validate(PayloadKind::OrderHistory, &json!({"orders": []}));
        assert_eq!(
            result.diagnostics(),
            &["$: expected array, found object".to_string()]
        );
    }

    #[test]
    fn test_resource_not_found_is_empty() {
        let payload = json!({"code": 102, "message": "Resource not found"});
        let result = validate(PayloadKind::InvoiceOverview, &payload);
        assert!(result.is_empty());
        assert!(result.diagnostics().is_empty());
        assert_eq!(result.into_data(), None);
    }

    #[test]
    fn test_other_codes_are_not_empty() {
        let result = validate(PayloadKind::InvoiceOverview, &json!({"code": 500}));
        assert!(!result.is_empty());
        assert!(!result.is_valid());
    }

    #[test]
    fn test_valid_invoice_overview() {
        let payload = json!({"invoices": [
            {"id": "1", "date": "2024-08-17T19:05:52.000Z", "amount": 13.19, "type": "SHIPMENT", "receipt_id": "r1"}
        ]});
        assert!(validate(PayloadKind::InvoiceOverview, &payload).is_valid());
    }

    #[test]
    fn test_valid_invoice_detail() {
        let payload = json!({
            "id": "1",
            "date": "2024-08-17T19:05:52.000Z",
            "type": "SHIPMENT",
            "total_amount": 13.19,
            "lines": [{"id": "l1", "quantity": 1, "unit_price": 12.99, "effective_amount": 13.19}],
            "payments": [{"type": "CARD", "total_charged": 13.19}]
        });
        assert!(validate(PayloadKind::InvoiceDetail, &payload).is_valid());
    }

    #[test]
    fn test_aggregations_any_object() {
        assert!(validate(PayloadKind::OrderAggregations, &json!({"x": 1})).is_valid());
        assert!(!validate(PayloadKind::OrderAggregations, &json!([1])).is_valid());
    }

    #[test]
    fn test_validation_is_pure() {
        let payload = json!([create_order("100")]);
        let first = validate(PayloadKind::OrderHistory, &payload);
        let second = validate(PayloadKind::OrderHistory, &first.clone().into_data().unwrap());
        assert_eq!(first, second);
        assert!(second.is_valid());
    }

    #[test]
    fn test_map_preserves_variant() {
        let result = validate(PayloadKind::OrderHistory, &json!({})).map(|_| 1);
        assert!(matches!(result, Validation::Mismatch { data: 1, .. }));
    }
}
