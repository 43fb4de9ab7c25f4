//! Federated search over songs, artists, albums, playlists and users.
//!
//! The default search fans out one query per category and fails as a whole
//! when any of them fails. Category search pages through a single category.
//! Both are read through the response cache.

mod store;

pub use store::SeaOrmCatalog;

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::api::artists::ArtistSummary;
use crate::api::playlists::PlaylistSummary;
use crate::api::songs::SongSummary;
use crate::api::users::ProfileSummary;
use crate::api::Page;
use crate::cache::ResponseCache;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCategory {
    Songs,
    Artists,
    Albums,
    Playlists,
    Users,
}

impl SearchCategory {
    pub const ALL: [SearchCategory; 5] = [
        SearchCategory::Songs,
        SearchCategory::Artists,
        SearchCategory::Albums,
        SearchCategory::Playlists,
        SearchCategory::Users,
    ];

    /// Rows per category in the default search, and the default page size
    /// of category search.
    pub fn default_limit(self) -> u64 {
        match self {
            SearchCategory::Songs => 20,
            _ => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchCategory::Songs => "songs",
            SearchCategory::Artists => "artists",
            SearchCategory::Albums => "albums",
            SearchCategory::Playlists => "playlists",
            SearchCategory::Users => "users",
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchCategory {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ApiError::Validation(format!("unknown search category: {s}")))
    }
}

/// Full-text lookups, one per category. Ranking is up to the implementation.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn songs(&self, term: &str, page: Page) -> Result<Vec<SongSummary>, DbErr>;

    async fn artists(&self, term: &str, page: Page) -> Result<Vec<ArtistSummary>, DbErr>;

    /// Playlists of an album-like type.
    async fn albums(&self, term: &str, page: Page) -> Result<Vec<PlaylistSummary>, DbErr>;

    /// Playlists of type `Playlist` only.
    async fn playlists(&self, term: &str, page: Page) -> Result<Vec<PlaylistSummary>, DbErr>;

    async fn users(&self, term: &str, page: Page) -> Result<Vec<ProfileSummary>, DbErr>;
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub songs: Vec<SongSummary>,
    pub artists: Vec<ArtistSummary>,
    pub albums: Vec<PlaylistSummary>,
    pub playlists: Vec<PlaylistSummary>,
    pub users: Vec<ProfileSummary>,
}

/// Trim and lowercase a raw term. Blank terms are rejected.
pub fn normalize_term(raw: &str) -> Result<String, ApiError> {
    let term = raw.trim();
    if term.is_empty() {
        return Err(ApiError::Validation(
            "search term must not be empty".to_string(),
        ));
    }
    Ok(term.to_lowercase())
}

pub fn default_cache_key(term: &str) -> String {
    format!("search:all:{term}")
}

pub fn category_cache_key(category: SearchCategory, term: &str, page: Page) -> String {
    format!("search:{category}:{term}:{}:{}", page.page, page.limit)
}

/// Search every category at once.
pub async fn search_all(
    catalog: &dyn CatalogSearch,
    cache: &ResponseCache<'_>,
    raw_term: &str,
) -> Result<Value, ApiError> {
    let term = normalize_term(raw_term)?;
    cache
        .read_through(&default_cache_key(&term), || fetch_all(catalog, &term))
        .await
}

/// Search one category, one page at a time.
pub async fn search_category(
    catalog: &dyn CatalogSearch,
    cache: &ResponseCache<'_>,
    category: SearchCategory,
    raw_term: &str,
    page: Option<u64>,
    limit: Option<u64>,
) -> Result<Value, ApiError> {
    let term = normalize_term(raw_term)?;
    let page = Page::new(page, limit, category.default_limit());
    cache
        .read_through(&category_cache_key(category, &term, page), || {
            fetch_category(catalog, category, &term, page)
        })
        .await
}

async fn fetch_all(catalog: &dyn CatalogSearch, term: &str) -> Result<Value, ApiError> {
    let results = fan_out(catalog, term).await?;
    Ok(serde_json::to_value(results)?)
}

/// Run all five queries concurrently. Any failure fails the whole search
/// and every failure message is reported.
pub async fn fan_out(catalog: &dyn CatalogSearch, term: &str) -> Result<SearchResults, ApiError> {
    let window = |category: SearchCategory| Page::first(category.default_limit());

    let (songs, artists, albums, playlists, users) = tokio::join!(
        catalog.songs(term, window(SearchCategory::Songs)),
        catalog.artists(term, window(SearchCategory::Artists)),
        catalog.albums(term, window(SearchCategory::Albums)),
        catalog.playlists(term, window(SearchCategory::Playlists)),
        catalog.users(term, window(SearchCategory::Users)),
    );

    let mut errors = Vec::new();
    let results = SearchResults {
        songs: collect(SearchCategory::Songs, songs, &mut errors),
        artists: collect(SearchCategory::Artists, artists, &mut errors),
        albums: collect(SearchCategory::Albums, albums, &mut errors),
        playlists: collect(SearchCategory::Playlists, playlists, &mut errors),
        users: collect(SearchCategory::Users, users, &mut errors),
    };

    if errors.is_empty() {
        Ok(results)
    } else {
        tracing::warn!(term, failed = errors.len(), "search fan-out failed");
        Err(ApiError::Aggregate(errors))
    }
}

fn collect<T>(
    category: SearchCategory,
    result: Result<Vec<T>, DbErr>,
    errors: &mut Vec<String>,
) -> Vec<T> {
    result.unwrap_or_else(|e| {
        errors.push(format!("{category}: {e}"));
        Vec::new()
    })
}

async fn fetch_category(
    catalog: &dyn CatalogSearch,
    category: SearchCategory,
    term: &str,
    page: Page,
) -> Result<Value, ApiError> {
    let value = match category {
        SearchCategory::Songs => serde_json::to_value(catalog.songs(term, page).await?)?,
        SearchCategory::Artists => serde_json::to_value(catalog.artists(term, page).await?)?,
        SearchCategory::Albums => serde_json::to_value(catalog.albums(term, page).await?)?,
        SearchCategory::Playlists => serde_json::to_value(catalog.playlists(term, page).await?)?,
        SearchCategory::Users => serde_json::to_value(catalog.users(term, page).await?)?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("  Daft PUNK ").unwrap(), "daft punk");
        assert!(matches!(normalize_term("   "), Err(ApiError::Validation(_))));
        assert!(matches!(normalize_term(""), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_category_round_trip_names() {
        for category in SearchCategory::ALL {
            assert_eq!(category.as_str().parse::<SearchCategory>().unwrap(), category);
        }
        assert!("tracks".parse::<SearchCategory>().is_err());
        assert!("Songs".parse::<SearchCategory>().is_err());
    }

    #[test]
    fn test_default_limits() {
        assert_eq!(SearchCategory::Songs.default_limit(), 20);
        assert_eq!(SearchCategory::Artists.default_limit(), 30);
        assert_eq!(SearchCategory::Users.default_limit(), 30);
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(default_cache_key("love"), "search:all:love");
        assert_eq!(
            category_cache_key(SearchCategory::Albums, "love", Page { page: 2, limit: 30 }),
            "search:albums:love:2:30"
        );
    }
}
