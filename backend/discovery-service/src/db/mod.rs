//! Storage collaborator
//!
//! The engine never talks to a database directly. Everything it needs from the
//! catalog goes through [`CatalogStore`]: filtered/sorted/paginated pack queries,
//! uniform sampling, counts, viewer history, view counter increments and the
//! category aggregates behind the trending-search panel.

pub mod catalog_repo;
pub mod memory;

pub use catalog_repo::PgCatalogStore;
pub use memory::InMemoryCatalogStore;

use crate::error::Result;
use crate::models::{CandidateItem, CategoryStats, InteractionHistory, StickerPreview};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Order in which the store returns packs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PackSort {
    /// Newest first
    #[default]
    Newest,
    /// Downloads, then favorites, then recency
    Popular,
}

/// Predicate pushed down to the store. Visibility (public + authorized) is
/// always implied and cannot be switched off.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackQuery {
    pub exclude_ids: HashSet<String>,
    /// Packs by this creator are left out (the viewer's own catalog)
    pub exclude_creator_id: Option<String>,
    pub category_id: Option<String>,
    pub animated: Option<bool>,
    pub created_after: Option<DateTime<Utc>>,
    pub sort: PackSort,
    pub offset: usize,
    pub limit: usize,
}

impl PackQuery {
    pub fn with_window(mut self, created_after: Option<DateTime<Utc>>) -> Self {
        self.created_after = created_after;
        self
    }

    pub fn with_sort(mut self, sort: PackSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Tests one item against every condition except paging and sorting
    pub fn matches(&self, item: &CandidateItem) -> bool {
        item.visibility.is_presentable()
            && !self.exclude_ids.contains(&item.id)
            && self
                .exclude_creator_id
                .as_ref()
                .map_or(true, |creator| item.creator_id != *creator)
            && self
                .category_id
                .as_ref()
                .map_or(true, |category| item.category_ids.contains(category))
            && self.animated.map_or(true, |animated| item.is_animated == animated)
            && self
                .created_after
                .map_or(true, |after| item.created_at >= after)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Packs matching `query`, sorted and paginated
    async fn find_packs(&self, query: &PackQuery) -> Result<Vec<CandidateItem>>;

    /// Up to `size` packs matching `query`, drawn uniformly at random
    async fn sample_packs(&self, query: &PackQuery, size: usize) -> Result<Vec<CandidateItem>>;

    /// Number of packs matching `query`, ignoring paging
    async fn count_packs(&self, query: &PackQuery) -> Result<u64>;

    /// Bounded history of the viewer; `None` when the viewer does not exist
    async fn interaction_history(
        &self,
        viewer_id: &str,
        limit: usize,
    ) -> Result<Option<InteractionHistory>>;

    /// Adds one view to every listed pack, returns the number of packs updated
    async fn increment_views(&self, pack_ids: &[String], viewer_id: Option<String>)
        -> Result<u64>;

    /// Active categories ordered by search count then pack count
    async fn active_categories(&self, limit: usize) -> Result<Vec<CategoryStats>>;

    /// Most engaged sticker among visible packs of the category
    async fn top_sticker_in_category(&self, category_id: &str) -> Result<Option<StickerPreview>>;
}
