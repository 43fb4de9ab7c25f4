use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PaymentError;
use crate::order::{hmac_sha256_hex, total_amount, verify_hmac_sha256, Order, OrderItem};
use crate::sequence::TransactionSequence;

/// Upper bound for the status query round trip.
pub const STATUS_TIMEOUT_MS: u64 = 5_000;

/// Default upper bound for an order submission.
pub const ORDER_TIMEOUT_MS: u64 = 10_000;

/// Public sandbox credentials published by the gateway for integration tests.
const SANDBOX_APP_ID: &str = "2553";
const SANDBOX_KEY1: &str = "PcY4iZIKFCIdgZvA6ueMcMHHUbRLYjPL";
const SANDBOX_KEY2: &str = "kLtgPl8HHhfvMuDHPwKfgfsY4Ydm9eIz";
const SANDBOX_CREATE_ENDPOINT: &str = "https://sb-openapi.zalopay.vn/v2/create";
const SANDBOX_QUERY_ENDPOINT: &str = "https://sb-openapi.zalopay.vn/v2/query";

/// The gateway dates transaction ids in Vietnam time (UTC+7).
const GATEWAY_UTC_OFFSET_SECS: i32 = 7 * 3600;

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub app_id: String,
    /// Signs outgoing orders and status queries
    pub key1: String,
    /// Authenticates gateway callbacks
    pub key2: String,
    pub create_endpoint: String,
    pub query_endpoint: String,
    pub redirect_url: String,
    pub callback_url: Option<String>,
    pub order_timeout_ms: u64,
}

impl PaymentConfig {
    pub fn from_env() -> Self {
        Self {
            app_id: std::env::var("PAYMENT_APP_ID").unwrap_or_else(|_| SANDBOX_APP_ID.to_string()),
            key1: std::env::var("PAYMENT_KEY1").unwrap_or_else(|_| SANDBOX_KEY1.to_string()),
            key2: std::env::var("PAYMENT_KEY2").unwrap_or_else(|_| SANDBOX_KEY2.to_string()),
            create_endpoint: std::env::var("PAYMENT_CREATE_ENDPOINT")
                .unwrap_or_else(|_| SANDBOX_CREATE_ENDPOINT.to_string()),
            query_endpoint: std::env::var("PAYMENT_QUERY_ENDPOINT")
                .unwrap_or_else(|_| SANDBOX_QUERY_ENDPOINT.to_string()),
            redirect_url: std::env::var("PAYMENT_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:3000/payment/result".to_string()),
            callback_url: std::env::var("PAYMENT_CALLBACK_URL")
                .ok()
                .filter(|u| !u.is_empty()),
            order_timeout_ms: std::env::var("PAYMENT_ORDER_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(ORDER_TIMEOUT_MS),
        }
    }

    pub fn uses_sandbox_keys(&self) -> bool {
        self.key1 == SANDBOX_KEY1 || self.key2 == SANDBOX_KEY2
    }
}

/// Gateway reply to an order creation, plus the locally generated
/// transaction id (the gateway does not reliably echo it).
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub app_trans_id: String,
    #[serde(flatten)]
    pub gateway: serde_json::Map<String, serde_json::Value>,
}

/// Body returned to the gateway after a callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackResult {
    pub return_code: i32,
    pub return_message: String,
}

impl CallbackResult {
    pub const SUCCESS: i32 = 1;
    pub const ERROR: i32 = 0;
    pub const MAC_MISMATCH: i32 = -1;

    pub fn is_success(&self) -> bool {
        self.return_code == Self::SUCCESS
    }
}

#[derive(Serialize)]
struct StatusQuery<'a> {
    app_id: &'a str,
    app_trans_id: &'a str,
    mac: String,
}

pub struct PaymentClient {
    http: reqwest::Client,
    config: PaymentConfig,
    sequence: TransactionSequence,
}

impl PaymentClient {
    pub fn new(config: PaymentConfig) -> Result<Self, PaymentError> {
        Self::with_sequence(config, TransactionSequence::seeded_from_clock())
    }

    pub fn with_sequence(
        config: PaymentConfig,
        sequence: TransactionSequence,
    ) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(STATUS_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            http,
            config,
            sequence,
        })
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Build and sign an order without submitting it.
    pub fn build_order(&self, user_id: &str, items: &[OrderItem]) -> Result<Order, PaymentError> {
        if user_id.trim().is_empty() {
            return Err(PaymentError::InvalidOrder("user id is required".to_string()));
        }
        let amount = total_amount(items)?;
        let sequence = self.sequence.next();

        let offset = FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECS)
            .ok_or_else(|| PaymentError::Signing("invalid gateway offset".to_string()))?;
        let now = Utc::now();
        let app_trans_id = format!(
            "{}_{}",
            now.with_timezone(&offset).format("%y%m%d"),
            sequence
        );

        let embed_data = serde_json::json!({ "redirecturl": &self.config.redirect_url });

        let mut order = Order {
            app_id: self.config.app_id.clone(),
            app_trans_id,
            app_user: user_id.to_string(),
            app_time: now.timestamp_millis(),
            item: serde_json::to_string(items)?,
            embed_data: embed_data.to_string(),
            amount,
            description: format!("Melodia - Payment for the order #{sequence}"),
            bank_code: String::new(),
            callback_url: self.config.callback_url.clone(),
            mac: String::new(),
        };
        order.mac = hmac_sha256_hex(&self.config.key1, &order.mac_input())?;
        Ok(order)
    }

    /// Sign an order for `user_id` and submit it to the gateway.
    pub async fn create_order(
        &self,
        user_id: &str,
        items: &[OrderItem],
    ) -> Result<OrderResponse, PaymentError> {
        let order = self.build_order(user_id, items)?;
        tracing::info!(
            app_trans_id = %order.app_trans_id,
            amount = order.amount,
            "submitting payment order"
        );

        let resp = self
            .http
            .post(&self.config.create_endpoint)
            .timeout(Duration::from_millis(self.config.order_timeout_ms))
            .form(&order)
            .send()
            .await
            .map_err(|e| timed_out(e, self.config.order_timeout_ms))?;
        let gateway = read_gateway_json(resp)
            .await
            .map_err(|e| gateway_timed_out(e, self.config.order_timeout_ms))?;

        Ok(OrderResponse {
            app_trans_id: order.app_trans_id,
            gateway,
        })
    }

    /// Authenticate a gateway callback. Never fails: problems are reported
    /// through the result code.
    pub fn receive_callback(&self, data: &str, req_mac: &str) -> CallbackResult {
        match verify_hmac_sha256(&self.config.key2, data, req_mac) {
            Ok(true) => {
                let app_trans_id = serde_json::from_str::<serde_json::Value>(data)
                    .ok()
                    .and_then(|v| v.get("app_trans_id").and_then(|t| t.as_str()).map(String::from));
                tracing::info!(?app_trans_id, "payment callback verified");
                CallbackResult {
                    return_code: CallbackResult::SUCCESS,
                    return_message: "success".to_string(),
                }
            }
            Ok(false) => {
                tracing::warn!("payment callback rejected: mac mismatch");
                CallbackResult {
                    return_code: CallbackResult::MAC_MISMATCH,
                    return_message: "mac not equal".to_string(),
                }
            }
            Err(e) => {
                tracing::error!("payment callback verification failed: {e}");
                CallbackResult {
                    return_code: CallbackResult::ERROR,
                    return_message: e.to_string(),
                }
            }
        }
    }

    /// Ask the gateway for the current state of an order.
    pub async fn order_status(
        &self,
        app_trans_id: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, PaymentError> {
        let mac_input = format!("{}|{}|{}", self.config.app_id, app_trans_id, self.config.key1);
        let query = StatusQuery {
            app_id: &self.config.app_id,
            app_trans_id,
            mac: hmac_sha256_hex(&self.config.key1, &mac_input)?,
        };

        let resp = self
            .http
            .post(&self.config.query_endpoint)
            .timeout(Duration::from_millis(STATUS_TIMEOUT_MS))
            .form(&query)
            .send()
            .await
            .map_err(|e| timed_out(e, STATUS_TIMEOUT_MS))?;

        read_gateway_json(resp)
            .await
            .map_err(|e| gateway_timed_out(e, STATUS_TIMEOUT_MS))
    }
}

/// Reports a client-side timeout as [`PaymentError::Timeout`].
fn timed_out(e: reqwest::Error, limit_ms: u64) -> PaymentError {
    if e.is_timeout() {
        PaymentError::Timeout(limit_ms)
    } else {
        PaymentError::Http(e)
    }
}

fn gateway_timed_out(e: PaymentError, limit_ms: u64) -> PaymentError {
    match e {
        PaymentError::Http(inner) => timed_out(inner, limit_ms),
        other => other,
    }
}

async fn read_gateway_json(
    resp: reqwest::Response,
) -> Result<serde_json::Map<String, serde_json::Value>, PaymentError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(PaymentError::Gateway {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}
