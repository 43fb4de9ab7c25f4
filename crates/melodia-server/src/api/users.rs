use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use melodia_db::entities::profile::{self, UserRole};
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
use super::PaginationParams;
use crate::error::ApiError;
use crate::side_effects::SideEffect;
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
}

impl ProfileSummary {
    pub const COLUMNS: [profile::Column; 3] = [
        profile::Column::Id,
        profile::Column::Username,
        profile::Column::Avatar,
    ];
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileChanges {
    pub fn from_form(form: &FormData) -> Self {
        Self {
            username: form.text("username"),
            avatar: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, active: &mut profile::ActiveModel) {
        if let Some(username) = self.username {
            active.username = Set(username);
        }
        if let Some(avatar) = self.avatar {
            active.avatar = Set(Some(avatar));
        }
    }
}

async fn find_profile(db: &DatabaseConnection, id: Uuid) -> Result<profile::Model, ApiError> {
    profile::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    let page = params.resolve(DEFAULT_PAGE_SIZE);
    let users = profile::Entity::find()
        .select_only()
        .columns(ProfileSummary::COLUMNS)
        .order_by_asc(profile::Column::Username)
        .offset(page.offset())
        .limit(page.limit)
        .into_model::<ProfileSummary>()
        .all(state.db.as_ref())
        .await?;
    Ok(Json(json!({ "data": users })))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = find_profile(&state.db, id).await?;
    Ok(Json(json!({ "data": user })))
}

/// POST /api/users (multipart)
///
/// An `id` field reuses the identity provider's user id; otherwise one is
/// generated. New profiles always get the `user` role.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = FormData::from_multipart(multipart, "avatar").await?;
    let mut changes = ProfileChanges::from_form(&form);
    changes.username = Some(form.required("username")?);
    let id = form.parse::<Uuid>("id")?.unwrap_or_else(Uuid::new_v4);

    if form.image.is_some() {
        changes.avatar = Some(state.assets.delivery_url(AssetKind::User, id));
    }

    let mut active = profile::ActiveModel {
        id: Set(id),
        role: Set(UserRole::User),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };
    changes.apply(&mut active);
    profile::Entity::insert(active)
        .exec_without_returning(state.db.as_ref())
        .await?;
    tracing::info!(user_id = %id, "profile created");

    if let Some(image) = form.image {
        state.side_effects.submit(SideEffect::UploadAsset {
            kind: AssetKind::User,
            id,
            data: image.data,
            content_type: image.content_type,
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "id": id })),
    ))
}

/// PUT/PATCH /api/users/{id} (multipart)
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = FormData::from_multipart(multipart, "avatar").await?;
    let mut changes = ProfileChanges::from_form(&form);
    if form.image.is_some() {
        changes.avatar = Some(state.assets.delivery_url(AssetKind::User, id));
    }
    if changes.is_empty() {
        return Err(ApiError::Validation("no fields to update".into()));
    }

    let mut active = profile::ActiveModel::default();
    changes.apply(&mut active);
    let result = profile::Entity::update_many()
        .set(active)
        .filter(profile::Column::Id.eq(id))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }

    if let Some(image) = form.image {
        state.side_effects.submit(SideEffect::UploadAsset {
            kind: AssetKind::User,
            id,
            data: image.data,
            content_type: image.content_type,
        });
    }

    Ok(Json(json!({ "message": "User updated successfully" })))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = find_profile(&state.db, id).await?;
    let result = profile::Entity::delete_by_id(id).exec(state.db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %id, "profile deleted");

    if user.avatar.is_some() {
        state.side_effects.submit(SideEffect::DeleteAsset {
            kind: AssetKind::User,
            id,
        });
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "User deleted successfully" })),
    ))
}
