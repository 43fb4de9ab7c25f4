use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Operations the blob store must provide. Object bytes never pass through
/// the API server: clients upload and download with pre-signed URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn presign_download(&self, key: &str, expires_in: Duration)
        -> Result<String, StorageError>;

    async fn presign_upload(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;

    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub prefix: String,
}

impl S3Config {
    /// Read `S3_*` variables. Returns `None` when no bucket is configured.
    pub fn from_env() -> Option<Self> {
        let bucket = std::env::var("S3_BUCKET").ok().filter(|b| !b.is_empty())?;
        Some(Self {
            endpoint: std::env::var("S3_ENDPOINT").ok().filter(|e| !e.is_empty()),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key: std::env::var("S3_ACCESS_KEY").unwrap_or_default(),
            secret_key: std::env::var("S3_SECRET_KEY").unwrap_or_default(),
            bucket,
            prefix: std::env::var("S3_PREFIX").unwrap_or_default(),
        })
    }
}

// ─── S3 Backend ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3BlobStore {
    pub fn from_config(config: &S3Config) -> Result<Self, StorageError> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(StorageError::Config(
                "S3_ACCESS_KEY and S3_SECRET_KEY are required".to_string(),
            ));
        }

        let creds = aws_sdk_s3::config::Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "melodia",
        );

        let mut config_builder = aws_sdk_s3::Config::builder()
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .credentials_provider(creds)
            .behavior_version_latest();

        if let Some(ep) = &config.endpoint {
            config_builder = config_builder.endpoint_url(ep).force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(config_builder.build());

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
        })
    }

    fn s3_key(&self, relative_path: &str) -> String {
        if self.prefix.is_empty() {
            relative_path.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), relative_path)
        }
    }
}

fn presigning_config(expires_in: Duration) -> Result<PresigningConfig, StorageError> {
    PresigningConfig::expires_in(expires_in)
        .map_err(|e| StorageError::Config(format!("invalid presign expiry: {e}")))
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn presign_download(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.s3_key(key))
            .presigned(presigning_config(expires_in)?)
            .await
            .map_err(|e| StorageError::S3(format!("presign GetObject failed: {e}")))?;
        Ok(request.uri().to_string())
    }

    async fn presign_upload(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(self.s3_key(key))
            .content_type("audio/mpeg")
            .presigned(presigning_config(expires_in)?)
            .await
            .map_err(|e| StorageError::S3(format!("presign PutObject failed: {e}")))?;
        Ok(request.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.s3_key(key))
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("DeleteObject failed: {e}")))?;
        Ok(())
    }
}

// ─── Helpers ───────────────────────────────────────────────────────

/// Canonical object key of a song's audio file: `<Artist>/<Title>.mp3`.
pub fn song_object_key(artist_name: &str, song_title: &str) -> String {
    format!(
        "{}/{}.mp3",
        sanitize_filename(artist_name),
        sanitize_filename(song_title)
    )
}

pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string();
    // SECURITY: reject path traversal sequences
    if sanitized.contains("..") {
        return sanitized.replace("..", "__");
    }
    sanitized
}
