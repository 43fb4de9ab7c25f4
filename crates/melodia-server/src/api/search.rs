use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::PaginationParams;
use crate::auth::CallerRole;
use crate::cache::{CachePolicy, ResponseCache};
use crate::error::ApiError;
use crate::search::{self, SearchCategory};
use crate::state::AppState;

/// GET /api/search/{term}
pub async fn search_all(
    State(state): State<Arc<AppState>>,
    CallerRole(role): CallerRole,
    Path(term): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let cache = ResponseCache::new(state.cache.as_ref(), CachePolicy::for_role(role));
    let data = search::search_all(state.catalog.as_ref(), &cache, &term).await?;
    Ok(Json(json!({ "data": data })))
}

/// GET /api/search/{category}/{term}?page=&limit=
pub async fn search_category(
    State(state): State<Arc<AppState>>,
    CallerRole(role): CallerRole,
    Path((category, term)): Path<(String, String)>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    let category: SearchCategory = category.parse()?;
    let cache = ResponseCache::new(state.cache.as_ref(), CachePolicy::for_role(role));
    let data = search::search_category(
        state.catalog.as_ref(),
        &cache,
        category,
        &term,
        params.page,
        params.limit,
    )
    .await?;
    Ok(Json(json!({ "data": data })))
}
