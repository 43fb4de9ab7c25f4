//! Melodia HTTP API: catalog CRUD, federated search and payments.

pub mod api;
pub mod auth;
pub mod cache;
pub mod error;
pub mod search;
pub mod side_effects;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

/// Largest accepted request body (image uploads included).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Serialize)]
struct ApiStatus {
    status: &'static str,
    version: &'static str,
}

async fn healthz() -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Payment routes, kept separate so the binary can rate-limit them.
pub fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(api::payments::create_order))
        .route("/orders/{app_trans_id}", get(api::payments::order_status))
        .route("/callback", post(api::payments::payment_callback))
}

/// Catalog and search routes, mounted under `/api`.
pub fn catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/songs",
            get(api::songs::list_songs).post(api::songs::create_song),
        )
        .route(
            "/songs/{id}",
            get(api::songs::get_song)
                .put(api::songs::update_song)
                .patch(api::songs::update_song)
                .delete(api::songs::delete_song),
        )
        .route("/songs/{id}/url", get(api::songs::download_url))
        .route("/songs/{id}/upload-url", get(api::songs::upload_url))
        .route(
            "/artists",
            get(api::artists::list_artists).post(api::artists::create_artist),
        )
        .route(
            "/artists/{id}",
            get(api::artists::get_artist)
                .put(api::artists::update_artist)
                .patch(api::artists::update_artist)
                .delete(api::artists::delete_artist),
        )
        .route(
            "/playlists",
            get(api::playlists::list_playlists).post(api::playlists::create_playlist),
        )
        .route(
            "/playlists/{id}",
            get(api::playlists::get_playlist)
                .put(api::playlists::update_playlist)
                .patch(api::playlists::update_playlist)
                .delete(api::playlists::delete_playlist),
        )
        .route("/albums", get(api::albums::list_albums))
        .route("/albums/{id}", get(api::albums::get_album))
        .route(
            "/users",
            get(api::users::list_users).post(api::users::create_user),
        )
        .route(
            "/users/{id}",
            get(api::users::get_user)
                .put(api::users::update_user)
                .patch(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .route("/search/{term}", get(api::search::search_all))
        .route(
            "/search/{category}/{term}",
            get(api::search::search_category),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Assemble the application around `payments`, which the caller may have
/// wrapped in extra layers.
pub fn app_with(state: Arc<AppState>, payments: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", catalog_routes().nest("/payments", payments))
        .layer(TraceLayer::new_for_http())
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

/// The full application without rate limiting.
pub fn app(state: Arc<AppState>) -> Router {
    app_with(state, payment_routes())
}
