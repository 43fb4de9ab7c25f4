//! Payment gateway client (ZaloPay v2 order protocol).
//!
//! Orders are signed with `key1`; gateway callbacks are authenticated with
//! `key2`. Nothing here is persisted: callback verification recomputes the
//! MAC from the raw payload.

pub mod client;
pub mod error;
pub mod order;
pub mod sequence;

pub use client::{CallbackResult, OrderResponse, PaymentClient, PaymentConfig};
pub use error::PaymentError;
pub use order::{Order, OrderItem};
pub use sequence::TransactionSequence;
