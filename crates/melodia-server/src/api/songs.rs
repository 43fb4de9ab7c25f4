use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use melodia_db::entities::artist_song::{self, ArtistRelation};
use melodia_db::entities::{artist, song};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use melodia_media::{song_object_key, AssetKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::form::FormData;
use super::{Page, PaginationParams};
use crate::auth::CallerRole;
use crate::cache::{CachePolicy, ResponseCache};
use crate::error::ApiError;
use crate::side_effects::SideEffect;
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(1800);
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(900);

/// Projection used by song listings and search.
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult)]
pub struct SongSummary {
    pub id: Uuid,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub genre: Option<String>,
    pub views: i64,
}

impl SongSummary {
    pub const COLUMNS: [song::Column; 7] = [
        song::Column::Id,
        song::Column::Title,
        song::Column::Thumbnail,
        song::Column::Duration,
        song::Column::ReleaseDate,
        song::Column::Genre,
        song::Column::Views,
    ];
}

#[derive(Debug, Serialize)]
pub struct CreditedArtist {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub relation: ArtistRelation,
}

#[derive(Debug, Serialize)]
pub struct SongDetail {
    #[serde(flatten)]
    pub song: song::Model,
    /// Primary artist first
    pub artists: Vec<CreditedArtist>,
}

// ─── Change sets ───────────────────────────────────────────────────

/// Columns supplied by a create or update request. `None` leaves the column
/// untouched.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SongChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub genre: Option<String>,
}

impl SongChanges {
    pub fn from_form(form: &FormData) -> Result<Self, ApiError> {
        let duration = form.parse::<i32>("duration")?;
        if matches!(duration, Some(d) if d < 0) {
            return Err(ApiError::Validation("duration must not be negative".into()));
        }
        Ok(Self {
            title: form.text("title"),
            description: form.text("description"),
            thumbnail: None,
            duration,
            release_date: form.parse::<NaiveDate>("release_date")?,
            genre: form.text("genre"),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, active: &mut song::ActiveModel) {
        if let Some(title) = self.title {
            active.title = Set(title);
        }
        if let Some(description) = self.description {
            active.description = Set(Some(description));
        }
        if let Some(thumbnail) = self.thumbnail {
            active.thumbnail = Set(Some(thumbnail));
        }
        if let Some(duration) = self.duration {
            active.duration = Set(Some(duration));
        }
        if let Some(release_date) = self.release_date {
            active.release_date = Set(Some(release_date));
        }
        if let Some(genre) = self.genre {
            active.genre = Set(Some(genre));
        }
    }
}

// ─── Store operations ──────────────────────────────────────────────

/// Link rows for `artist_ids` in credit order: the first artist is
/// `Primary`, the rest `Featured`. Repeated ids keep their first position.
pub fn credit_links(song_id: Uuid, artist_ids: &[Uuid]) -> Vec<artist_song::Model> {
    let mut seen = std::collections::HashSet::new();
    artist_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .enumerate()
        .map(|(position, artist_id)| artist_song::Model {
            song_id,
            artist_id,
            relation: ArtistRelation::for_position(position),
        })
        .collect()
}

pub async fn insert_song(
    db: &DatabaseConnection,
    id: Uuid,
    changes: SongChanges,
) -> Result<(), DbErr> {
    let mut active = song::ActiveModel {
        id: Set(id),
        views: Set(0),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };
    changes.apply(&mut active);
    song::Entity::insert(active).exec_without_returning(db).await?;
    Ok(())
}

/// Insert every credit link concurrently. All inserts run to completion;
/// failures are collected and nothing is rolled back.
pub async fn link_artists(
    db: &Arc<DatabaseConnection>,
    song_id: Uuid,
    artist_ids: &[Uuid],
) -> Result<(), ApiError> {
    let mut tasks = JoinSet::new();
    for link in credit_links(song_id, artist_ids) {
        let db = Arc::clone(db);
        tasks.spawn(async move {
            let artist_id = link.artist_id;
            artist_song::Entity::insert(artist_song::ActiveModel {
                song_id: Set(link.song_id),
                artist_id: Set(link.artist_id),
                relation: Set(link.relation),
            })
            .exec_without_returning(db.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| format!("artist {artist_id}: {e}"))
        });
    }

    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => errors.push(e),
            Err(e) => errors.push(format!("link task aborted: {e}")),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::error!(%song_id, failed = errors.len(), "artist links failed");
        Err(ApiError::Link { song_id, errors })
    }
}

/// Single `UPDATE ... WHERE id` over the supplied columns only.
pub async fn update_song_row(
    db: &DatabaseConnection,
    id: Uuid,
    changes: SongChanges,
) -> Result<(), ApiError> {
    if changes.is_empty() {
        return Err(ApiError::Validation("no fields to update".into()));
    }
    let mut active = song::ActiveModel::default();
    changes.apply(&mut active);

    let result = song::Entity::update_many()
        .set(active)
        .filter(song::Column::Id.eq(id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Song not found".into()));
    }
    Ok(())
}

async fn find_song(db: &DatabaseConnection, id: Uuid) -> Result<song::Model, ApiError> {
    song::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Song not found".into()))
}

pub async fn primary_artist(
    db: &DatabaseConnection,
    song_id: Uuid,
) -> Result<Option<artist::Model>, DbErr> {
    artist::Entity::find()
        .inner_join(artist_song::Entity)
        .filter(artist_song::Column::SongId.eq(song_id))
        .filter(artist_song::Column::Relation.eq(ArtistRelation::Primary))
        .one(db)
        .await
}

/// Blob key of the song's audio, derived from its primary artist.
async fn audio_object_key(db: &DatabaseConnection, id: Uuid) -> Result<String, ApiError> {
    let song = find_song(db, id).await?;
    let artist = primary_artist(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Primary artist not found for song".into()))?;
    Ok(song_object_key(&artist.name, &song.title))
}

async fn load_song_list(db: &DatabaseConnection, page: Page) -> Result<Value, ApiError> {
    let songs = song::Entity::find()
        .select_only()
        .columns(SongSummary::COLUMNS)
        .order_by_desc(song::Column::CreatedAt)
        .offset(page.offset())
        .limit(page.limit)
        .into_model::<SongSummary>()
        .all(db)
        .await?;
    Ok(serde_json::to_value(songs)?)
}

async fn load_song_detail(db: &DatabaseConnection, id: Uuid) -> Result<Value, ApiError> {
    let song = find_song(db, id).await?;
    let mut artists: Vec<CreditedArtist> = artist_song::Entity::find()
        .filter(artist_song::Column::SongId.eq(id))
        .find_also_related(artist::Entity)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(link, artist)| {
            artist.map(|a| CreditedArtist {
                id: a.id,
                name: a.name,
                avatar: a.avatar,
                relation: link.relation,
            })
        })
        .collect();
    artists.sort_by(|a, b| {
        (a.relation != ArtistRelation::Primary, &a.name)
            .cmp(&(b.relation != ArtistRelation::Primary, &b.name))
    });
    Ok(serde_json::to_value(SongDetail { song, artists })?)
}

// ─── Handlers ──────────────────────────────────────────────────────

/// GET /api/songs
pub async fn list_songs(
    State(state): State<Arc<AppState>>,
    CallerRole(role): CallerRole,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    let page = params.resolve(DEFAULT_PAGE_SIZE);
    let cache = ResponseCache::new(state.cache.as_ref(), CachePolicy::for_role(role));
    let key = format!("songs:list:{}:{}", page.page, page.limit);
    let data = cache
        .read_through(&key, || load_song_list(&state.db, page))
        .await?;
    Ok(Json(json!({ "data": data })))
}

/// GET /api/songs/{id}
pub async fn get_song(
    State(state): State<Arc<AppState>>,
    CallerRole(role): CallerRole,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let cache = ResponseCache::new(state.cache.as_ref(), CachePolicy::for_role(role));
    let data = cache
        .read_through(&format!("songs:{id}"), || load_song_detail(&state.db, id))
        .await?;
    Ok(Json(json!({ "data": data })))
}

/// POST /api/songs (multipart)
pub async fn create_song(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = FormData::from_multipart(multipart, "thumbnail").await?;
    let title = form.required("title")?;
    let artist_ids = form.uuid_list("artist_ids")?;
    let mut changes = SongChanges::from_form(&form)?;
    changes.title = Some(title);

    let id = Uuid::new_v4();
    if form.image.is_some() {
        changes.thumbnail = Some(state.assets.delivery_url(AssetKind::Song, id));
    }

    insert_song(&state.db, id, changes).await?;
    tracing::info!(song_id = %id, artists = artist_ids.len(), "song created");

    if let Some(image) = form.image {
        state.side_effects.submit(SideEffect::UploadAsset {
            kind: AssetKind::Song,
            id,
            data: image.data,
            content_type: image.content_type,
        });
    }

    link_artists(&state.db, id, &artist_ids).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Song created successfully", "id": id })),
    ))
}

/// PUT/PATCH /api/songs/{id} (multipart)
pub async fn update_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = FormData::from_multipart(multipart, "thumbnail").await?;
    let mut changes = SongChanges::from_form(&form)?;
    if form.image.is_some() {
        changes.thumbnail = Some(state.assets.delivery_url(AssetKind::Song, id));
    }

    update_song_row(&state.db, id, changes).await?;

    if let Some(image) = form.image {
        state.side_effects.submit(SideEffect::UploadAsset {
            kind: AssetKind::Song,
            id,
            data: image.data,
            content_type: image.content_type,
        });
    }

    Ok(Json(json!({ "message": "Song updated successfully" })))
}

/// DELETE /api/songs/{id}
///
/// Cleanup targets are resolved before the row goes away since the link
/// rows cascade with it. A failed artist lookup only skips the audio cleanup.
pub async fn delete_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let song = find_song(&state.db, id).await?;
    let primary = primary_artist(&state.db, id).await.unwrap_or_else(|e| {
        tracing::warn!(song_id = %id, "primary artist lookup failed, skipping audio cleanup: {e}");
        None
    });

    let result = song::Entity::delete_by_id(id).exec(state.db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Song not found".into()));
    }
    tracing::info!(song_id = %id, "song deleted");

    match primary {
        Some(artist) => state.side_effects.submit(SideEffect::DeleteBlob {
            key: song_object_key(&artist.name, &song.title),
        }),
        None => tracing::warn!(song_id = %id, "no primary artist, skipping audio cleanup"),
    }
    if song.thumbnail.is_some() {
        state.side_effects.submit(SideEffect::DeleteAsset {
            kind: AssetKind::Song,
            id,
        });
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Song deleted successfully" })),
    ))
}

/// GET /api/songs/{id}/url
pub async fn download_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let key = audio_object_key(&state.db, id).await?;
    let url = state.blobs.presign_download(&key, DOWNLOAD_URL_TTL).await?;
    Ok(Json(json!({ "url": url })))
}

/// GET /api/songs/{id}/upload-url
pub async fn upload_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let key = audio_object_key(&state.db, id).await?;
    let url = state.blobs.presign_upload(&key, UPLOAD_URL_TTL).await?;
    Ok(Json(json!({ "url": url })))
}
