use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// One purchasable line, in the gateway's field naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub itemid: String,
    pub itemname: String,
    /// Unit price in the smallest currency unit
    pub itemprice: i64,
    pub itemquantity: i64,
}

/// A signed order, serialized as the gateway's create form.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub app_id: String,
    pub app_trans_id: String,
    pub app_user: String,
    /// Creation time, milliseconds since the epoch
    pub app_time: i64,
    /// JSON-encoded item list
    pub item: String,
    /// JSON-encoded metadata echoed back on redirect
    pub embed_data: String,
    pub amount: i64,
    pub description: String,
    pub bank_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub mac: String,
}

impl Order {
    /// Pipe-joined fields covered by the order MAC, in gateway order.
    pub fn mac_input(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.app_id,
            self.app_trans_id,
            self.app_user,
            self.amount,
            self.app_time,
            self.embed_data,
            self.item
        )
    }
}

/// Sum of `price × quantity`, rejecting empty lists, negative prices,
/// non-positive quantities and overflow.
pub fn total_amount(items: &[OrderItem]) -> Result<i64, PaymentError> {
    if items.is_empty() {
        return Err(PaymentError::InvalidOrder("order has no items".to_string()));
    }

    items.iter().try_fold(0i64, |acc, item| {
        if item.itemprice < 0 {
            return Err(PaymentError::InvalidOrder(format!(
                "item {} has a negative price",
                item.itemid
            )));
        }
        if item.itemquantity <= 0 {
            return Err(PaymentError::InvalidOrder(format!(
                "item {} has a non-positive quantity",
                item.itemid
            )));
        }
        item.itemprice
            .checked_mul(item.itemquantity)
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(|| PaymentError::InvalidOrder("order amount overflows".to_string()))
    })
}

/// Lowercase hex HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256_hex(key: &str, data: &str) -> Result<String, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| PaymentError::Signing(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex MAC. Malformed hex never matches.
pub fn verify_hmac_sha256(key: &str, data: &str, expected_hex: &str) -> Result<bool, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| PaymentError::Signing(e.to_string()))?;
    mac.update(data.as_bytes());
    let Ok(expected) = hex::decode(expected_hex) else {
        return Ok(false);
    };
    Ok(mac.verify_slice(&expected).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: i64, quantity: i64) -> OrderItem {
        OrderItem {
            itemid: id.to_string(),
            itemname: format!("Item {id}"),
            itemprice: price,
            itemquantity: quantity,
        }
    }

    #[test]
    fn test_total_amount_sums_lines() {
        let items = vec![item("a", 10_000, 2), item("b", 5_000, 3)];
        assert_eq!(total_amount(&items).unwrap(), 35_000);
    }

    #[test]
    fn test_total_amount_rejects_empty() {
        assert!(matches!(total_amount(&[]), Err(PaymentError::InvalidOrder(_))));
    }

    #[test]
    fn test_total_amount_rejects_zero_quantity() {
        let err = total_amount(&[item("a", 100, 0)]).unwrap_err();
        assert!(err.to_string().contains("non-positive quantity"));
    }

    #[test]
    fn test_total_amount_rejects_overflow() {
        let err = total_amount(&[item("a", i64::MAX, 2)]).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_mac_input_field_order() {
        let order = Order {
            app_id: "2553".into(),
            app_trans_id: "250101_1".into(),
            app_user: "user-1".into(),
            app_time: 1_700_000_000_000,
            item: "[]".into(),
            embed_data: "{}".into(),
            amount: 50_000,
            description: "d".into(),
            bank_code: String::new(),
            callback_url: None,
            mac: String::new(),
        };
        assert_eq!(
            order.mac_input(),
            "2553|250101_1|user-1|50000|1700000000000|{}|[]"
        );
    }

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2
        let mac = hmac_sha256_hex("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            mac,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_accepts_matching_mac() {
        let mac = hmac_sha256_hex("key2", "payload").unwrap();
        assert!(verify_hmac_sha256("key2", "payload", &mac).unwrap());
    }

    #[test]
    fn test_verify_rejects_other_key_and_garbage() {
        let mac = hmac_sha256_hex("key1", "payload").unwrap();
        assert!(!verify_hmac_sha256("key2", "payload", &mac).unwrap());
        assert!(!verify_hmac_sha256("key2", "payload", "not-hex").unwrap());
        assert!(!verify_hmac_sha256("key2", "payload", "").unwrap());
    }
}
