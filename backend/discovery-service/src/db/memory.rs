//! In-memory catalog
//!
//! Implements [`CatalogStore`] over plain vectors. Used by the test-suite and
//! for running the service without a database.

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::HashMap;

use super::{CatalogStore, PackQuery, PackSort};
use crate::error::Result;
use crate::models::{
    CandidateItem, CategoryStats, InteractionHistory, StickerPreview,
};

#[derive(Debug, Clone)]
pub struct StickerRecord {
    pub id: String,
    pub pack_id: String,
    pub image_url: String,
    pub engagement: u64,
}

#[derive(Debug, Clone)]
struct CategoryRecord {
    stats: CategoryStats,
    is_active: bool,
}

#[derive(Default)]
struct Catalog {
    packs: Vec<CandidateItem>,
    histories: HashMap<String, InteractionHistory>,
    categories: Vec<CategoryRecord>,
    stickers: Vec<StickerRecord>,
}

#[derive(Default)]
pub struct InMemoryCatalogStore {
    catalog: RwLock<Catalog>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packs(packs: Vec<CandidateItem>) -> Self {
        let store = Self::new();
        store.catalog.write().packs = packs;
        store
    }

    pub fn insert_pack(&self, pack: CandidateItem) {
        self.catalog.write().packs.push(pack);
    }

    /// Registers a viewer; viewers without a history are unknown to the store
    pub fn set_history(&self, viewer_id: impl Into<String>, history: InteractionHistory) {
        self.catalog.write().histories.insert(viewer_id.into(), history);
    }

    pub fn insert_category(&self, stats: CategoryStats, is_active: bool) {
        self.catalog
            .write()
            .categories
            .push(CategoryRecord { stats, is_active });
    }

    pub fn insert_sticker(&self, sticker: StickerRecord) {
        self.catalog.write().stickers.push(sticker);
    }

    pub fn pack(&self, pack_id: &str) -> Option<CandidateItem> {
        self.catalog
            .read()
            .packs
            .iter()
            .find(|pack| pack.id == pack_id)
            .cloned()
    }

    fn matching(&self, query: &PackQuery) -> Vec<CandidateItem> {
        self.catalog
            .read()
            .packs
            .iter()
            .filter(|pack| query.matches(pack))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_packs(&self, query: &PackQuery) -> Result<Vec<CandidateItem>> {
        let mut packs = self.matching(query);

        match query.sort {
            PackSort::Newest => packs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            PackSort::Popular => packs.sort_by(|a, b| {
                b.engagement
                    .downloads
                    .cmp(&a.engagement.downloads)
                    .then(b.engagement.favorites.cmp(&a.engagement.favorites))
                    .then(b.created_at.cmp(&a.created_at))
            }),
        }

        Ok(packs
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn sample_packs(&self, query: &PackQuery, size: usize) -> Result<Vec<CandidateItem>> {
        let mut packs = self.matching(query);
        packs.shuffle(&mut rand::thread_rng());
        packs.truncate(size);
        Ok(packs)
    }

    async fn count_packs(&self, query: &PackQuery) -> Result<u64> {
        Ok(self.matching(query).len() as u64)
    }

    async fn interaction_history(
        &self,
        viewer_id: &str,
        limit: usize,
    ) -> Result<Option<InteractionHistory>> {
        Ok(self
            .catalog
            .read()
            .histories
            .get(viewer_id)
            .map(|history| InteractionHistory {
                owned_packs: history.owned_packs.iter().take(limit).cloned().collect(),
                favorite_packs: history.favorite_packs.iter().take(limit).cloned().collect(),
                favorite_stickers: history
                    .favorite_stickers
                    .iter()
                    .take(limit)
                    .cloned()
                    .collect(),
            }))
    }

    async fn increment_views(
        &self,
        pack_ids: &[String],
        _viewer_id: Option<String>,
    ) -> Result<u64> {
        let mut catalog = self.catalog.write();
        let mut updated = 0;
        for pack in catalog.packs.iter_mut() {
            if pack_ids.contains(&pack.id) {
                pack.engagement.views += 1;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn active_categories(&self, limit: usize) -> Result<Vec<CategoryStats>> {
        let mut categories: Vec<CategoryStats> = self
            .catalog
            .read()
            .categories
            .iter()
            .filter(|record| record.is_active)
            .map(|record| record.stats.clone())
            .collect();

        categories.sort_by(|a, b| {
            b.search_count
                .cmp(&a.search_count)
                .then(b.pack_count.cmp(&a.pack_count))
        });
        categories.truncate(limit);
        Ok(categories)
    }

    async fn top_sticker_in_category(&self, category_id: &str) -> Result<Option<StickerPreview>> {
        let catalog = self.catalog.read();
        let visible_packs: Vec<&str> = catalog
            .packs
            .iter()
            .filter(|pack| {
                pack.visibility.is_presentable()
                    && pack.category_ids.iter().any(|c| c == category_id)
            })
            .map(|pack| pack.id.as_str())
            .collect();

        Ok(catalog
            .stickers
            .iter()
            .filter(|sticker| visible_packs.contains(&sticker.pack_id.as_str()))
            .max_by_key(|sticker| sticker.engagement)
            .map(|sticker| StickerPreview {
                sticker_id: Some(sticker.id.clone()),
                pack_id: Some(sticker.pack_id.clone()),
                image_url: sticker.image_url.clone(),
                is_placeholder: false,
            }))
    }
}
