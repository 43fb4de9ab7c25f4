//! Image CDN client for thumbnails and avatars.
//!
//! Assets are addressed by `(kind, id)` so the delivery URL can be derived
//! before the upload finishes. Requests are signed with SHA-256 over the
//! sorted parameters followed by the API secret.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_DELIVERY_BASE: &str = "https://res.cloudinary.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("CDN request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CDN rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Entity owning an image asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Song,
    Artist,
    Playlist,
    User,
}

impl AssetKind {
    pub fn folder(&self) -> &'static str {
        match self {
            AssetKind::Song => "songs",
            AssetKind::Artist => "artists",
            AssetKind::Playlist => "playlists",
            AssetKind::User => "users",
        }
    }

    pub fn public_id(&self, id: Uuid) -> String {
        format!("{}/{}", self.folder(), id)
    }
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// URL the asset will be served from once uploaded.
    fn delivery_url(&self, kind: AssetKind, id: Uuid) -> String;

    async fn upload(
        &self,
        kind: AssetKind,
        id: Uuid,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AssetError>;

    async fn delete(&self, kind: AssetKind, id: Uuid) -> Result<(), AssetError>;
}

#[derive(Debug, Clone)]
pub struct CdnConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
    pub delivery_base: String,
    /// Upper bound for a whole upload or destroy request
    pub timeout: Duration,
}

impl CdnConfig {
    /// Read `CDN_*` variables. Returns `None` when no cloud name is configured.
    pub fn from_env() -> Option<Self> {
        let cloud_name = std::env::var("CDN_CLOUD_NAME").ok().filter(|c| !c.is_empty())?;
        Some(Self {
            cloud_name,
            api_key: std::env::var("CDN_API_KEY").unwrap_or_default(),
            api_secret: std::env::var("CDN_API_SECRET").unwrap_or_default(),
            api_base: std::env::var("CDN_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            delivery_base: std::env::var("CDN_DELIVERY_BASE")
                .unwrap_or_else(|_| DEFAULT_DELIVERY_BASE.to_string()),
            timeout: Duration::from_secs(
                std::env::var("CDN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryAssets {
    client: reqwest::Client,
    config: CdnConfig,
}

impl CloudinaryAssets {
    pub fn new(config: CdnConfig) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{action}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// Adds `timestamp`, `api_key` and `signature` to the signed parameters.
    fn signed_form(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        params.push(("timestamp", chrono::Utc::now().timestamp().to_string()));
        let signature = sign_params(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }

    async fn post_form(
        &self,
        action: &str,
        form: &[(&'static str, String)],
    ) -> Result<reqwest::Response, AssetError> {
        let resp = self
            .client
            .post(self.endpoint(action))
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AssetError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl AssetStore for CloudinaryAssets {
    fn delivery_url(&self, kind: AssetKind, id: Uuid) -> String {
        format!(
            "{}/{}/image/upload/{}",
            self.config.delivery_base.trim_end_matches('/'),
            self.config.cloud_name,
            kind.public_id(id)
        )
    }

    async fn upload(
        &self,
        kind: AssetKind,
        id: Uuid,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AssetError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        let mut form = self.signed_form(vec![
            ("overwrite", "true".to_string()),
            ("public_id", kind.public_id(id)),
        ]);
        form.push(("file", format!("data:{content_type};base64,{encoded}")));

        self.post_form("upload", &form).await?;
        tracing::debug!(public_id = %kind.public_id(id), bytes = data.len(), "asset uploaded");
        Ok(())
    }

    async fn delete(&self, kind: AssetKind, id: Uuid) -> Result<(), AssetError> {
        let form = self.signed_form(vec![("public_id", kind.public_id(id))]);
        let resp = self.post_form("destroy", &form).await?;
        let body: DestroyResponse = resp.json().await?;
        if body.result != "ok" {
            return Err(AssetError::Rejected {
                status: 200,
                message: format!("destroy {}: {}", kind.public_id(id), body.result),
            });
        }
        Ok(())
    }
}

/// Hex SHA-256 of `k1=v1&k2=v2...` (keys sorted) with the secret appended.
pub fn sign_params(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let hash = Sha256::digest(format!("{joined}{secret}").as_bytes());
    format!("{:x}", hash)
}
