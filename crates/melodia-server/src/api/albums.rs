//! Albums are playlists of an album-like type, exposed read-only.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use melodia_db::entities::playlist::{self, PlaylistKind};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::playlists::{list_of_kinds, DEFAULT_PAGE_SIZE};
use super::PaginationParams;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/albums
pub async fn list_albums(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    let page = params.resolve(DEFAULT_PAGE_SIZE);
    let albums = list_of_kinds(&state.db, &PlaylistKind::ALBUM_LIKE, page).await?;
    Ok(Json(json!({ "data": albums })))
}

/// GET /api/albums/{id}
pub async fn get_album(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let album = playlist::Entity::find_by_id(id)
        .filter(playlist::Column::Kind.is_in(PlaylistKind::ALBUM_LIKE))
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Album not found".into()))?;
    Ok(Json(json!({ "data": album })))
}
