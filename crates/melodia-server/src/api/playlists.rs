use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use melodia_db::entities::playlist::{self, PlaylistKind};
use melodia_media::AssetKind;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::form::FormData;
use super::{Page, PaginationParams};
use crate::error::ApiError;
use crate::side_effects::SideEffect;
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Projection shared by playlist listings, album listings and search.
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult)]
pub struct PlaylistSummary {
    pub id: Uuid,
    pub title: String,
    pub thumbnail: Option<String>,
    pub user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: PlaylistKind,
}

impl PlaylistSummary {
    /// Narrow a playlist query to the summary columns.
    pub fn select(query: Select<playlist::Entity>) -> Select<playlist::Entity> {
        query
            .select_only()
            .columns([
                playlist::Column::Id,
                playlist::Column::Title,
                playlist::Column::Thumbnail,
                playlist::Column::UserId,
            ])
            .column_as(playlist::Column::Kind, "kind")
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlaylistChanges {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub user_id: Option<Uuid>,
    pub kind: Option<PlaylistKind>,
}

impl PlaylistChanges {
    pub fn from_form(form: &FormData) -> Result<Self, ApiError> {
        Ok(Self {
            title: form.text("title"),
            thumbnail: None,
            user_id: form.parse::<Uuid>("user_id")?,
            kind: form.parse::<PlaylistKind>("type")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, active: &mut playlist::ActiveModel) {
        if let Some(title) = self.title {
            active.title = Set(title);
        }
        if let Some(thumbnail) = self.thumbnail {
            active.thumbnail = Set(Some(thumbnail));
        }
        if let Some(user_id) = self.user_id {
            active.user_id = Set(Some(user_id));
        }
        if let Some(kind) = self.kind {
            active.kind = Set(kind);
        }
    }
}

/// One page of playlists whose type is in `kinds`, newest first.
pub async fn list_of_kinds(
    db: &DatabaseConnection,
    kinds: &[PlaylistKind],
    page: Page,
) -> Result<Vec<PlaylistSummary>, ApiError> {
    Ok(PlaylistSummary::select(playlist::Entity::find())
        .filter(playlist::Column::Kind.is_in(kinds.iter().copied()))
        .order_by_desc(playlist::Column::CreatedAt)
        .offset(page.offset())
        .limit(page.limit)
        .into_model::<PlaylistSummary>()
        .all(db)
        .await?)
}

async fn find_playlist(db: &DatabaseConnection, id: Uuid) -> Result<playlist::Model, ApiError> {
    playlist::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".into()))
}

/// GET /api/playlists
pub async fn list_playlists(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    let page = params.resolve(DEFAULT_PAGE_SIZE);
    let playlists = list_of_kinds(&state.db, &[PlaylistKind::Playlist], page).await?;
    Ok(Json(json!({ "data": playlists })))
}

/// GET /api/playlists/{id}
pub async fn get_playlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let playlist = find_playlist(&state.db, id).await?;
    Ok(Json(json!({ "data": playlist })))
}

/// POST /api/playlists (multipart)
pub async fn create_playlist(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = FormData::from_multipart(multipart, "thumbnail").await?;
    let title = form.required("title")?;
    let mut changes = PlaylistChanges::from_form(&form)?;
    changes.title = Some(title);

    let id = Uuid::new_v4();
    if form.image.is_some() {
        changes.thumbnail = Some(state.assets.delivery_url(AssetKind::Playlist, id));
    }

    let mut active = playlist::ActiveModel {
        id: Set(id),
        kind: Set(PlaylistKind::Playlist),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };
    changes.apply(&mut active);
    playlist::Entity::insert(active)
        .exec_without_returning(state.db.as_ref())
        .await?;
    tracing::info!(playlist_id = %id, "playlist created");

    if let Some(image) = form.image {
        state.side_effects.submit(SideEffect::UploadAsset {
            kind: AssetKind::Playlist,
            id,
            data: image.data,
            content_type: image.content_type,
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Playlist created successfully", "id": id })),
    ))
}

/// PUT/PATCH /api/playlists/{id} (multipart)
pub async fn update_playlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = FormData::from_multipart(multipart, "thumbnail").await?;
    let mut changes = PlaylistChanges::from_form(&form)?;
    if form.image.is_some() {
        changes.thumbnail = Some(state.assets.delivery_url(AssetKind::Playlist, id));
    }
    if changes.is_empty() {
        return Err(ApiError::Validation("no fields to update".into()));
    }

    let mut active = playlist::ActiveModel::default();
    changes.apply(&mut active);
    let result = playlist::Entity::update_many()
        .set(active)
        .filter(playlist::Column::Id.eq(id))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Playlist not found".into()));
    }

    if let Some(image) = form.image {
        state.side_effects.submit(SideEffect::UploadAsset {
            kind: AssetKind::Playlist,
            id,
            data: image.data,
            content_type: image.content_type,
        });
    }

    Ok(Json(json!({ "message": "Playlist updated successfully" })))
}

/// DELETE /api/playlists/{id}
pub async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let playlist = find_playlist(&state.db, id).await?;
    let result = playlist::Entity::delete_by_id(id).exec(state.db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Playlist not found".into()));
    }
    tracing::info!(playlist_id = %id, kind = playlist.kind.as_str(), "playlist deleted");

    if playlist.thumbnail.is_some() {
        state.side_effects.submit(SideEffect::DeleteAsset {
            kind: AssetKind::Playlist,
            id,
        });
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Playlist deleted successfully" })),
    ))
}
