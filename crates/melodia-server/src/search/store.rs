use async_trait::async_trait;
use melodia_db::entities::{artist, playlist, playlist::PlaylistKind, profile, song};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use melodia_db::search::text_search;
use std::sync::Arc;

use super::CatalogSearch;
use crate::api::artists::ArtistSummary;
use crate::api::playlists::PlaylistSummary;
use crate::api::songs::SongSummary;
use crate::api::users::ProfileSummary;
use crate::api::Page;

/// [`CatalogSearch`] backed by the PostgreSQL full-text indexes.
#[derive(Debug, Clone)]
pub struct SeaOrmCatalog {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCatalog {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn playlists_of(
        &self,
        kinds: &[PlaylistKind],
        term: &str,
        page: Page,
    ) -> Result<Vec<PlaylistSummary>, DbErr> {
        PlaylistSummary::select(playlist::Entity::find())
            .filter(playlist::Column::Kind.is_in(kinds.iter().copied()))
            .filter(text_search("playlists", "title", term))
            .order_by_asc(playlist::Column::Title)
            .offset(page.offset())
            .limit(page.limit)
            .into_model::<PlaylistSummary>()
            .all(self.db.as_ref())
            .await
    }
}

#[async_trait]
impl CatalogSearch for SeaOrmCatalog {
    async fn songs(&self, term: &str, page: Page) -> Result<Vec<SongSummary>, DbErr> {
        song::Entity::find()
            .select_only()
            .columns(SongSummary::COLUMNS)
            .filter(text_search("songs", "title", term))
            .order_by_desc(song::Column::Views)
            .offset(page.offset())
            .limit(page.limit)
            .into_model::<SongSummary>()
            .all(self.db.as_ref())
            .await
    }

    async fn artists(&self, term: &str, page: Page) -> Result<Vec<ArtistSummary>, DbErr> {
        artist::Entity::find()
            .select_only()
            .columns(ArtistSummary::COLUMNS)
            .filter(text_search("artists", "name", term))
            .order_by_asc(artist::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .into_model::<ArtistSummary>()
            .all(self.db.as_ref())
            .await
    }

    async fn albums(&self, term: &str, page: Page) -> Result<Vec<PlaylistSummary>, DbErr> {
        self.playlists_of(&PlaylistKind::ALBUM_LIKE, term, page).await
    }

    async fn playlists(&self, term: &str, page: Page) -> Result<Vec<PlaylistSummary>, DbErr> {
        self.playlists_of(&[PlaylistKind::Playlist], term, page).await
    }

    async fn users(&self, term: &str, page: Page) -> Result<Vec<ProfileSummary>, DbErr> {
        profile::Entity::find()
            .select_only()
            .columns(ProfileSummary::COLUMNS)
            .filter(text_search("profiles", "username", term))
            .order_by_asc(profile::Column::Username)
            .offset(page.offset())
            .limit(page.limit)
            .into_model::<ProfileSummary>()
            .all(self.db.as_ref())
            .await
    }
}
