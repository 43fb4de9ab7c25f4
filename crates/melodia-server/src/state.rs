use sea_orm::DatabaseConnection;
use melodia_db::CacheStore;
use melodia_media::{AssetStore, BlobStore};
use melodia_payment::PaymentClient;
use std::sync::Arc;

use crate::search::CatalogSearch;
use crate::side_effects::SideEffects;

/// Shared application state, handed to every handler behind an `Arc`.
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub jwt_secret: String,
    pub cache: Arc<dyn CacheStore>,
    /// Full-text queries used by search. Kept separate from `db` so search
    /// can run against any implementation.
    pub catalog: Arc<dyn CatalogSearch>,
    pub blobs: Arc<dyn BlobStore>,
    pub assets: Arc<dyn AssetStore>,
    pub payments: Arc<PaymentClient>,
    pub side_effects: SideEffects,
}
