// Shared test utilities for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Duration as TokenTtl;
use melodia_db::{CacheStore, MemoryCache};
use melodia_media::{AssetError, AssetKind, AssetStore, BlobStore, StorageError};
use melodia_payment::{PaymentClient, PaymentConfig, TransactionSequence};
use melodia_server::api::artists::ArtistSummary;
use melodia_server::api::playlists::PlaylistSummary;
use melodia_server::api::songs::SongSummary;
use melodia_server::api::users::ProfileSummary;
use melodia_server::api::Page;
use melodia_server::search::{CatalogSearch, SearchCategory};
use melodia_server::side_effects::SideEffects;
use melodia_server::AppState;
use sea_orm::{DatabaseConnection, DbErr, MockDatabaseTrait, Transaction};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-testing-only";
pub const TEST_KEY1: &str = "test-key1";
pub const TEST_KEY2: &str = "test-key2";

/// Rows each fake category holds.
const STOCK: u64 = 100;

// ─── Catalog fake ──────────────────────────────────────────────────

/// Counts every query and records the window it was asked for.
#[derive(Default)]
pub struct CountingCatalog {
    calls: AtomicUsize,
    requests: Mutex<Vec<(SearchCategory, Page)>>,
    failing: Vec<SearchCategory>,
}

impl CountingCatalog {
    pub fn failing_on(categories: &[SearchCategory]) -> Self {
        Self {
            failing: categories.to_vec(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(SearchCategory, Page)> {
        self.requests.lock().unwrap().clone()
    }

    fn hit<T>(
        &self,
        category: SearchCategory,
        page: Page,
        make: impl Fn(u64) -> T,
    ) -> Result<Vec<T>, DbErr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((category, page));
        if self.failing.contains(&category) {
            return Err(DbErr::Custom(format!("{category} index unavailable")));
        }
        let end = (page.offset() + page.limit).min(STOCK);
        Ok((page.offset()..end).map(make).collect())
    }
}

#[async_trait]
impl CatalogSearch for CountingCatalog {
    async fn songs(&self, term: &str, page: Page) -> Result<Vec<SongSummary>, DbErr> {
        self.hit(SearchCategory::Songs, page, |n| SongSummary {
            id: Uuid::from_u128(n as u128),
            title: format!("{term} song {n}"),
            thumbnail: None,
            duration: Some(180),
            release_date: None,
            genre: None,
            views: n as i64,
        })
    }

    async fn artists(&self, term: &str, page: Page) -> Result<Vec<ArtistSummary>, DbErr> {
        self.hit(SearchCategory::Artists, page, |n| ArtistSummary {
            id: Uuid::from_u128(n as u128),
            name: format!("{term} artist {n}"),
            avatar: None,
            country: None,
        })
    }

    async fn albums(&self, term: &str, page: Page) -> Result<Vec<PlaylistSummary>, DbErr> {
        self.hit(SearchCategory::Albums, page, |n| PlaylistSummary {
            id: Uuid::from_u128(n as u128),
            title: format!("{term} album {n}"),
            thumbnail: None,
            user_id: None,
            kind: melodia_db::entities::playlist::PlaylistKind::Album,
        })
    }

    async fn playlists(&self, term: &str, page: Page) -> Result<Vec<PlaylistSummary>, DbErr> {
        self.hit(SearchCategory::Playlists, page, |n| PlaylistSummary {
            id: Uuid::from_u128(n as u128),
            title: format!("{term} playlist {n}"),
            thumbnail: None,
            user_id: None,
            kind: melodia_db::entities::playlist::PlaylistKind::Playlist,
        })
    }

    async fn users(&self, term: &str, page: Page) -> Result<Vec<ProfileSummary>, DbErr> {
        self.hit(SearchCategory::Users, page, |n| ProfileSummary {
            id: Uuid::from_u128(n as u128),
            username: format!("{term}{n}"),
            avatar: None,
        })
    }
}

// ─── Blob / asset fakes ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingBlobs {
    deleted: Mutex<Vec<String>>,
    fail_deletes: bool,
}

impl RecordingBlobs {
    pub fn failing() -> Self {
        Self {
            fail_deletes: true,
            ..Default::default()
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for RecordingBlobs {
    async fn presign_download(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "https://blobs.test/{key}?op=get&X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }

    async fn presign_upload(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        Ok(format!(
            "https://blobs.test/{key}?op=put&X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.deleted.lock().unwrap().push(key.to_string());
        if self.fail_deletes {
            return Err(StorageError::S3("connection reset".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAssets {
    calls: Mutex<Vec<String>>,
}

impl RecordingAssets {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for RecordingAssets {
    fn delivery_url(&self, kind: AssetKind, id: Uuid) -> String {
        format!("https://cdn.test/{}", kind.public_id(id))
    }

    async fn upload(
        &self,
        kind: AssetKind,
        id: Uuid,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), AssetError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("upload {}", kind.public_id(id)));
        Ok(())
    }

    async fn delete(&self, kind: AssetKind, id: Uuid) -> Result<(), AssetError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete {}", kind.public_id(id)));
        Ok(())
    }
}

// ─── State ─────────────────────────────────────────────────────────

pub struct TestContext {
    pub app: Router,
    pub state: Arc<AppState>,
    pub catalog: Arc<CountingCatalog>,
    pub blobs: Arc<RecordingBlobs>,
    pub assets: Arc<RecordingAssets>,
}

pub fn payment_config(endpoint: &str) -> PaymentConfig {
    PaymentConfig {
        app_id: "2553".to_string(),
        key1: TEST_KEY1.to_string(),
        key2: TEST_KEY2.to_string(),
        create_endpoint: format!("{endpoint}/v2/create"),
        query_endpoint: format!("{endpoint}/v2/query"),
        redirect_url: "http://localhost:3000/payment/result".to_string(),
        callback_url: None,
        order_timeout_ms: melodia_payment::client::ORDER_TIMEOUT_MS,
    }
}

pub struct ContextBuilder {
    db: DatabaseConnection,
    catalog: CountingCatalog,
    blobs: RecordingBlobs,
    cache: Arc<dyn CacheStore>,
    payment_endpoint: String,
}

impl ContextBuilder {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            catalog: CountingCatalog::default(),
            blobs: RecordingBlobs::default(),
            cache: Arc::new(MemoryCache::new()),
            payment_endpoint: "http://127.0.0.1:9".to_string(),
        }
    }

    pub fn catalog(mut self, catalog: CountingCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn blobs(mut self, blobs: RecordingBlobs) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn payment_endpoint(mut self, endpoint: &str) -> Self {
        self.payment_endpoint = endpoint.to_string();
        self
    }

    /// Must run inside a tokio runtime: the side-effect worker is spawned here.
    pub fn build(self) -> TestContext {
        let catalog = Arc::new(self.catalog);
        let blobs = Arc::new(self.blobs);
        let assets = Arc::new(RecordingAssets::default());
        let (side_effects, _worker) = SideEffects::spawn(blobs.clone(), assets.clone());
        let payments = PaymentClient::with_sequence(
            payment_config(&self.payment_endpoint),
            TransactionSequence::starting_after(0),
        )
        .unwrap();

        let state = Arc::new(AppState {
            db: Arc::new(self.db),
            jwt_secret: TEST_JWT_SECRET.to_string(),
            cache: self.cache,
            catalog: catalog.clone(),
            blobs: blobs.clone(),
            assets: assets.clone(),
            payments: Arc::new(payments),
            side_effects,
        });

        TestContext {
            app: melodia_server::app(state.clone()),
            state,
            catalog,
            blobs,
            assets,
        }
    }
}

/// A context with no store behind it, for routes that never reach the database.
pub fn offline_context() -> TestContext {
    ContextBuilder::new(DatabaseConnection::Disconnected).build()
}

/// Drain the statements a mock connection has recorded so far.
pub fn transaction_log(db: &DatabaseConnection) -> Vec<Transaction> {
    db.as_mock_connection()
        .get_mocker_mutex()
        .lock()
        .unwrap()
        .drain_transaction_log()
}

// ─── Requests ──────────────────────────────────────────────────────

pub fn bearer(role: &str) -> String {
    let token = melodia_server::auth::jwt::issue_token(
        "test-user",
        role,
        TEST_JWT_SECRET,
        TokenTtl::minutes(15),
    )
    .unwrap();
    format!("Bearer {token}")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_as(uri: &str, role: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(role))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const BOUNDARY: &str = "melodia-test-boundary";

/// `multipart/form-data` request carrying text fields only.
pub fn multipart_request(method: &str, uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.bytes).unwrap()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        bytes,
    }
}

/// Wait for the side-effect worker to catch up.
pub async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
