use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use melodia_db::entities::{artist, artist_song, song};
use melodia_media::AssetKind;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::form::FormData;
use super::songs::SongSummary;
use super::PaginationParams;
use crate::error::ApiError;
use crate::side_effects::SideEffect;
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult)]
pub struct ArtistSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub country: Option<String>,
}

impl ArtistSummary {
    pub const COLUMNS: [artist::Column; 4] = [
        artist::Column::Id,
        artist::Column::Name,
        artist::Column::Avatar,
        artist::Column::Country,
    ];
}

#[derive(Debug, Serialize)]
pub struct ArtistDetail {
    #[serde(flatten)]
    pub artist: artist::Model,
    pub songs: Vec<SongSummary>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArtistChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub country: Option<String>,
}

impl ArtistChanges {
    pub fn from_form(form: &FormData) -> Self {
        Self {
            name: form.text("name"),
            description: form.text("description"),
            avatar: None,
            country: form.text("country"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, active: &mut artist::ActiveModel) {
        if let Some(name) = self.name {
            active.name = Set(name);
        }
        if let Some(description) = self.description {
            active.description = Set(Some(description));
        }
        if let Some(avatar) = self.avatar {
            active.avatar = Set(Some(avatar));
        }
        if let Some(country) = self.country {
            active.country = Set(Some(country));
        }
    }
}

async fn find_artist(db: &DatabaseConnection, id: Uuid) -> Result<artist::Model, ApiError> {
    artist::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Artist not found".into()))
}

/// GET /api/artists
pub async fn list_artists(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    let page = params.resolve(DEFAULT_PAGE_SIZE);
    let artists = artist::Entity::find()
        .select_only()
        .columns(ArtistSummary::COLUMNS)
        .order_by_asc(artist::Column::Name)
        .offset(page.offset())
        .limit(page.limit)
        .into_model::<ArtistSummary>()
        .all(state.db.as_ref())
        .await?;
    Ok(Json(json!({ "data": artists })))
}

/// GET /api/artists/{id}
pub async fn get_artist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let artist = find_artist(&state.db, id).await?;
    let songs = song::Entity::find()
        .select_only()
        .columns(SongSummary::COLUMNS)
        .inner_join(artist_song::Entity)
        .filter(artist_song::Column::ArtistId.eq(id))
        .order_by_desc(song::Column::ReleaseDate)
        .into_model::<SongSummary>()
        .all(state.db.as_ref())
        .await?;
    Ok(Json(json!({ "data": ArtistDetail { artist, songs } })))
}

/// POST /api/artists (multipart)
pub async fn create_artist(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = FormData::from_multipart(multipart, "avatar").await?;
    let mut changes = ArtistChanges::from_form(&form);
    changes.name = Some(form.required("name")?);

    let id = Uuid::new_v4();
    if form.image.is_some() {
        changes.avatar = Some(state.assets.delivery_url(AssetKind::Artist, id));
    }

    let mut active = artist::ActiveModel {
        id: Set(id),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };
    changes.apply(&mut active);
    artist::Entity::insert(active)
        .exec_without_returning(state.db.as_ref())
        .await?;
    tracing::info!(artist_id = %id, "artist created");

    if let Some(image) = form.image {
        state.side_effects.submit(SideEffect::UploadAsset {
            kind: AssetKind::Artist,
            id,
            data: image.data,
            content_type: image.content_type,
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Artist created successfully", "id": id })),
    ))
}

/// PUT/PATCH /api/artists/{id} (multipart)
pub async fn update_artist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = FormData::from_multipart(multipart, "avatar").await?;
    let mut changes = ArtistChanges::from_form(&form);
    if form.image.is_some() {
        changes.avatar = Some(state.assets.delivery_url(AssetKind::Artist, id));
    }
    if changes.is_empty() {
        return Err(ApiError::Validation("no fields to update".into()));
    }

    let mut active = artist::ActiveModel::default();
    changes.apply(&mut active);
    let result = artist::Entity::update_many()
        .set(active)
        .filter(artist::Column::Id.eq(id))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Artist not found".into()));
    }

    if let Some(image) = form.image {
        state.side_effects.submit(SideEffect::UploadAsset {
            kind: AssetKind::Artist,
            id,
            data: image.data,
            content_type: image.content_type,
        });
    }

    Ok(Json(json!({ "message": "Artist updated successfully" })))
}

/// DELETE /api/artists/{id}
pub async fn delete_artist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let artist = find_artist(&state.db, id).await?;
    let result = artist::Entity::delete_by_id(id).exec(state.db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Artist not found".into()));
    }
    tracing::info!(artist_id = %id, "artist deleted");

    if artist.avatar.is_some() {
        state.side_effects.submit(SideEffect::DeleteAsset {
            kind: AssetKind::Artist,
            id,
        });
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Artist deleted successfully" })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_changes_from_form() {
        let form = FormData::from_pairs([("name", "Daft Punk"), ("country", "FR")]);
        let changes = ArtistChanges::from_form(&form);
        assert_eq!(changes.name.as_deref(), Some("Daft Punk"));
        assert_eq!(changes.country.as_deref(), Some("FR"));
        assert!(changes.description.is_none());
    }

    #[test]
    fn test_apply_leaves_unsupplied_columns_unset() {
        let mut active = artist::ActiveModel::default();
        ArtistChanges {
            country: Some("JP".into()),
            ..Default::default()
        }
        .apply(&mut active);
        assert!(active.country.is_set());
        assert!(!active.name.is_set());
        assert!(!active.description.is_set());
    }

    #[test]
    fn test_detail_flattens_artist() {
        let detail = ArtistDetail {
            artist: artist::Model {
                id: Uuid::nil(),
                name: "Justice".into(),
                description: None,
                avatar: None,
                country: Some("FR".into()),
                created_at: Utc::now().fixed_offset(),
            },
            songs: vec![SongSummary {
                id: Uuid::nil(),
                title: "D.A.N.C.E.".into(),
                thumbnail: None,
                duration: Some(242),
                release_date: NaiveDate::from_ymd_opt(2007, 4, 30),
                genre: None,
                views: 0,
            }],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["name"], "Justice");
        assert_eq!(json["songs"][0]["title"], "D.A.N.C.E.");
    }
}
