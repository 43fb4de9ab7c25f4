mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::*;
use melodia_db::{CacheError, CacheStore, MemoryCache};
use melodia_server::api::Page;
use melodia_server::search::SearchCategory;
use std::sync::Arc;
use std::time::Duration;

struct UnreachableCache;

#[async_trait]
impl CacheStore for UnreachableCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Connection("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Connection("connection refused".into()))
    }
}

#[tokio::test]
async fn test_repeated_search_is_served_from_cache() {
    let ctx = offline_context();

    let first = send(&ctx.app, get("/api/search/daft")).await;
    let second = send(&ctx.app, get("/api/search/daft")).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(ctx.catalog.calls(), 5);
}

#[tokio::test]
async fn test_user_token_still_uses_cache() {
    let ctx = offline_context();

    send(&ctx.app, get_as("/api/search/daft", "user")).await;
    send(&ctx.app, get_as("/api/search/daft", "user")).await;

    assert_eq!(ctx.catalog.calls(), 5);
}

#[tokio::test]
async fn test_admin_always_queries_the_store() {
    let cache = Arc::new(MemoryCache::new());
    let ctx = ContextBuilder::new(sea_orm::DatabaseConnection::Disconnected)
        .cache(cache.clone())
        .build();

    let first = send(&ctx.app, get_as("/api/search/daft", "admin")).await;
    let second = send(&ctx.app, get_as("/api/search/daft", "admin")).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(ctx.catalog.calls(), 10);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_invalid_token_is_treated_as_anonymous() {
    let ctx = offline_context();
    let request = axum::http::Request::builder()
        .uri("/api/search/daft")
        .header("Authorization", "Bearer not-a-jwt")
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = send(&ctx.app, request).await;
    send(&ctx.app, get("/api/search/daft")).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(ctx.catalog.calls(), 5);
}

#[tokio::test]
async fn test_equivalent_terms_share_an_entry() {
    let ctx = offline_context();

    send(&ctx.app, get("/api/search/Daft%20Punk")).await;
    send(&ctx.app, get("/api/search/%20daft%20punk%20")).await;

    assert_eq!(ctx.catalog.calls(), 5);
}

#[tokio::test]
async fn test_default_search_respects_category_limits() {
    let ctx = offline_context();

    let resp = send(&ctx.app, get("/api/search/love")).await;
    assert_eq!(resp.status, StatusCode::OK);

    let data = &resp.json()["data"];
    assert_eq!(data["songs"].as_array().unwrap().len(), 20);
    for category in ["artists", "albums", "playlists", "users"] {
        assert_eq!(data[category].as_array().unwrap().len(), 30, "{category}");
    }

    let mut requests = ctx.catalog.requests();
    requests.sort_by_key(|(category, _)| category.as_str());
    assert!(requests
        .iter()
        .all(|(category, page)| *page == Page::first(category.default_limit())));
}

#[tokio::test]
async fn test_one_failing_query_fails_the_whole_search() {
    let ctx = ContextBuilder::new(sea_orm::DatabaseConnection::Disconnected)
        .catalog(CountingCatalog::failing_on(&[SearchCategory::Users]))
        .build();

    let resp = send(&ctx.app, get("/api/search/love")).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);

    let body = resp.json();
    let errors = body["error"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with("users:"));
    assert!(body.get("data").is_none());
    assert_eq!(ctx.catalog.calls(), 5);
}

#[tokio::test]
async fn test_every_failure_is_reported() {
    let ctx = ContextBuilder::new(sea_orm::DatabaseConnection::Disconnected)
        .catalog(CountingCatalog::failing_on(&[
            SearchCategory::Songs,
            SearchCategory::Albums,
        ]))
        .build();

    let resp = send(&ctx.app, get("/api/search/love")).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.json()["error"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_search_is_not_cached() {
    let cache = Arc::new(MemoryCache::new());
    let ctx = ContextBuilder::new(sea_orm::DatabaseConnection::Disconnected)
        .catalog(CountingCatalog::failing_on(&[SearchCategory::Artists]))
        .cache(cache.clone())
        .build();

    send(&ctx.app, get("/api/search/love")).await;
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_blank_term_is_rejected() {
    let ctx = offline_context();

    let resp = send(&ctx.app, get("/api/search/%20%20")).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.catalog.calls(), 0);

    let resp = send(&ctx.app, get("/api/search/songs/%20")).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cache_outage_degrades_to_store_reads() {
    let ctx = ContextBuilder::new(sea_orm::DatabaseConnection::Disconnected)
        .cache(Arc::new(UnreachableCache))
        .build();

    let first = send(&ctx.app, get("/api/search/daft")).await;
    let second = send(&ctx.app, get("/api/search/daft")).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(ctx.catalog.calls(), 10);
}

// ─── Category search ───────────────────────────────────────────────

#[tokio::test]
async fn test_category_search_pages() {
    let ctx = offline_context();

    let resp = send(&ctx.app, get("/api/search/artists/love?page=3&limit=5")).await;
    assert_eq!(resp.status, StatusCode::OK);

    let data = resp.json()["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 5);
    assert_eq!(data[0]["name"], "love artist 10");
    assert_eq!(
        ctx.catalog.requests(),
        vec![(SearchCategory::Artists, Page { page: 3, limit: 5 })]
    );
}

#[tokio::test]
async fn test_category_search_defaults_and_clamping() {
    let ctx = offline_context();

    send(&ctx.app, get("/api/search/songs/love")).await;
    send(&ctx.app, get("/api/search/users/love")).await;
    send(&ctx.app, get("/api/search/albums/love?page=0&limit=500")).await;

    assert_eq!(
        ctx.catalog.requests(),
        vec![
            (SearchCategory::Songs, Page { page: 1, limit: 20 }),
            (SearchCategory::Users, Page { page: 1, limit: 30 }),
            (SearchCategory::Albums, Page { page: 1, limit: 100 }),
        ]
    );
}

#[tokio::test]
async fn test_category_search_is_cached_per_page() {
    let ctx = offline_context();

    send(&ctx.app, get("/api/search/playlists/chill?page=1")).await;
    send(&ctx.app, get("/api/search/playlists/chill?page=1")).await;
    send(&ctx.app, get("/api/search/playlists/chill?page=2")).await;

    assert_eq!(ctx.catalog.calls(), 2);
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let ctx = offline_context();

    let resp = send(&ctx.app, get("/api/search/podcasts/love")).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.json()["error"]
        .as_str()
        .unwrap()
        .contains("unknown search category"));
    assert_eq!(ctx.catalog.calls(), 0);
}
