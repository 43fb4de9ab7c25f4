use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("payment gateway timed out after {0} ms")]
    Timeout(u64),

    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment gateway returned {status}: {body}")]
    Gateway { status: u16, body: String },

    #[error("invalid gateway response: {0}")]
    Decode(#[from] serde_json::Error),
}
