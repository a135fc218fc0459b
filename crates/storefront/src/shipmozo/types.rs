//! `ShipMozo` request and response types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Every `ShipMozo` response: `{result, message, data}`. `result` is `"1"`
/// (sometimes the number `1`) on success.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(deserialize_with = "flag")]
    pub result: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim() == "1",
        Value::Number(n) => n.as_i64() == Some(1),
        Value::Bool(b) => b,
        _ => false,
    })
}

/// Body for `push-order`.
#[derive(Debug, Clone, Serialize)]
pub struct PushOrder {
    pub order_id: String,
    /// `YYYY-MM-DD`
    pub order_date: String,
    pub order_type: &'static str,
    pub consignee_name: String,
    pub consignee_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignee_email: Option<String>,
    pub consignee_address_line_one: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignee_address_line_two: Option<String>,
    pub consignee_pin_code: String,
    pub consignee_city: String,
    pub consignee_state: String,
    pub product_detail: Vec<ProductDetail>,
    /// `COD` or `PREPAID`
    pub payment_type: &'static str,
    pub cod_amount: String,
    /// Grams.
    pub weight: u32,
    /// Centimetres.
    pub length: u32,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
}

/// One product line in a pushed order.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub name: String,
    pub sku_number: String,
    pub quantity: i32,
    pub unit_price: String,
    pub product_category: String,
}

/// `data` of a successful `push-order`.
#[derive(Debug, Clone, Deserialize)]
pub struct PushOrderData {
    #[serde(deserialize_with = "stringly")]
    pub order_id: String,
    #[serde(default)]
    pub reference_id: Option<String>,
}

/// `data` of a courier assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct CourierAssignment {
    pub awb_number: String,
    #[serde(default, alias = "courier_company", alias = "courier")]
    pub courier_name: Option<String>,
}

/// `data` of `track-order`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingInfo {
    pub awb_number: String,
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub expected_delivery_date: Option<String>,
    #[serde(default)]
    pub scan_detail: Vec<Value>,
}

fn stringly<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_result_flag() {
        let ok: Envelope<PushOrderData> = serde_json::from_str(
            r#"{"result": "1", "message": "Success", "data": {"order_id": 8812345, "reference_id": "AQ261016000042"}}"#,
        )
        .unwrap();
        assert!(ok.result);
        assert_eq!(ok.data.unwrap().order_id, "8812345");

        let failed: Envelope<PushOrderData> = serde_json::from_str(
            r#"{"result": "0", "message": "Invalid pincode", "data": null}"#,
        )
        .unwrap();
        assert!(!failed.result);
        assert_eq!(failed.message, "Invalid pincode");

        let numeric: Envelope<Value> =
            serde_json::from_str(r#"{"result": 1, "data": {}}"#).unwrap();
        assert!(numeric.result);
    }

    #[test]
    fn test_courier_assignment_aliases() {
        let a: CourierAssignment = serde_json::from_str(
            r#"{"awb_number": "1234567890", "courier_company": "Delhivery Surface"}"#,
        )
        .unwrap();
        assert_eq!(a.courier_name.as_deref(), Some("Delhivery Surface"));
    }
}
