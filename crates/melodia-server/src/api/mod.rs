pub mod albums;
pub mod artists;
pub mod form;
pub mod payments;
pub mod playlists;
pub mod search;
pub mod songs;
pub mod users;

use serde::Deserialize;

/// Upper bound for any page size.
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PaginationParams {
    pub fn resolve(&self, default_limit: u64) -> Page {
        Page::new(self.page, self.limit, default_limit)
    }
}

/// A resolved, 1-indexed page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    /// Page defaults to 1 and is at least 1; limit is clamped to
    /// `1..=MAX_PAGE_SIZE`.
    pub fn new(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// The first page of `limit` rows.
    pub fn first(limit: u64) -> Self {
        Self { page: 1, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}
