use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use melodia_payment::{CallbackResult, OrderItem, OrderResponse};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub items: Vec<OrderItem>,
}

/// Callback body posted by the gateway. `data` is kept as the raw string
/// the MAC was computed over.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub data: String,
    pub mac: String,
}

/// POST /api/payments/orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.payments.create_order(&req.user_id, &req.items).await?;
    Ok(Json(order))
}

/// POST /api/payments/callback
///
/// Always answers 200; the outcome is carried by `return_code`.
pub async fn payment_callback(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CallbackRequest>, JsonRejection>,
) -> Json<CallbackResult> {
    match body {
        Ok(Json(req)) => Json(state.payments.receive_callback(&req.data, &req.mac)),
        Err(rejection) => {
            tracing::warn!("malformed payment callback: {rejection}");
            Json(CallbackResult {
                return_code: CallbackResult::ERROR,
                return_message: rejection.body_text(),
            })
        }
    }
}

/// GET /api/payments/orders/{app_trans_id}
pub async fn order_status(
    State(state): State<Arc<AppState>>,
    Path(app_trans_id): Path<String>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let status = state.payments.order_status(&app_trans_id).await?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_request_deserialization() {
        let json = r#"{
            "user_id": "user-42",
            "items": [{"itemid": "premium", "itemname": "Premium", "itemprice": 49000, "itemquantity": 1}]
        }"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.user_id, "user-42");
        assert_eq!(req.items[0].itemprice, 49000);
    }

    #[test]
    fn test_callback_request_keeps_raw_data() {
        let json = r#"{"data": "{\"app_trans_id\":\"250101_1\"}", "mac": "ab"}"#;
        let req: CallbackRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.data, r#"{"app_trans_id":"250101_1"}"#);
    }
}
