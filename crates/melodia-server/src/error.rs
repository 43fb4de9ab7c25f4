use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use melodia_media::StorageError;
use melodia_payment::PaymentError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Every failure a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Store(#[from] DbErr),
    #[error("{} queries failed", .0.len())]
    Aggregate(Vec<String>),
    #[error("song {song_id} was created but {} artist link(s) failed", errors.len())]
    Link { song_id: Uuid, errors: Vec<String> },
    #[error("{0}")]
    Gateway(String),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_)
            | ApiError::Aggregate(_)
            | ApiError::Link { .. }
            | ApiError::Gateway(_)
            | ApiError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Payment(PaymentError::InvalidOrder(_)) => StatusCode::BAD_REQUEST,
            ApiError::Payment(PaymentError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Payment(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Gateway(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, "request failed: {}", self);
        }

        let body = match self {
            ApiError::Aggregate(errors) => json!({ "error": errors }),
            ApiError::Link { song_id, errors } => json!({ "error": errors, "song_id": song_id }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_is_bad_request() {
        let (status, body) = body_of(ApiError::Validation("title is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "title is required");
    }

    #[tokio::test]
    async fn test_store_error_message_is_verbatim() {
        let (status, body) = body_of(ApiError::Store(DbErr::Custom("boom".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], DbErr::Custom("boom".into()).to_string());
    }

    #[tokio::test]
    async fn test_aggregate_lists_every_message() {
        let (status, body) =
            body_of(ApiError::Aggregate(vec!["songs: a".into(), "users: b".into()])).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], json!(["songs: a", "users: b"]));
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_link_error_names_song() {
        let song_id = Uuid::new_v4();
        let (status, body) = body_of(ApiError::Link {
            song_id,
            errors: vec!["artist x: fk violation".into()],
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["song_id"], song_id.to_string());
        assert_eq!(body["error"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_payment_status_mapping() {
        assert_eq!(
            ApiError::Payment(PaymentError::InvalidOrder("empty".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Payment(PaymentError::Timeout(5000)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::Payment(PaymentError::Gateway {
                status: 500,
                body: String::new()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_storage_error_is_gateway() {
        let err = ApiError::from(StorageError::S3("presign failed".into()));
        assert!(matches!(err, ApiError::Gateway(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
