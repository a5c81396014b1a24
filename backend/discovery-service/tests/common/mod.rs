use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

use discovery_service::config::EngineConfig;
use discovery_service::db::{CatalogStore, InMemoryCatalogStore, PackQuery};
use discovery_service::error::{AppError, Result};
use discovery_service::models::{
    CandidateItem, CategoryStats, EngagementCounters, InteractionHistory, StickerPreview,
    VisibilityFlags,
};
use discovery_service::services::{FeedComposer, FixedWeightSampler, WeightSampler};
use discovery_service::utils::ManualClock;

#[allow(dead_code)]
pub fn pack(id: &str, age_days: i64) -> CandidateItem {
    CandidateItem {
        id: id.to_string(),
        creator_id: format!("creator-{id}"),
        name: format!("{id} stickers"),
        description: String::new(),
        category_ids: vec!["memes".to_string()],
        created_at: Utc::now() - Duration::days(age_days),
        is_animated: false,
        sticker_count: 12,
        tray_image_url: None,
        engagement: EngagementCounters {
            downloads: 10,
            views: 100,
            favorites: 1,
        },
        visibility: VisibilityFlags::public(),
    }
}

#[allow(dead_code)]
pub fn private_pack(id: &str, age_days: i64) -> CandidateItem {
    let mut pack = pack(id, age_days);
    pack.visibility.is_private = true;
    pack
}

#[allow(dead_code)]
pub fn unauthorized_pack(id: &str, age_days: i64) -> CandidateItem {
    let mut pack = pack(id, age_days);
    pack.visibility.is_authorized = false;
    pack
}

#[allow(dead_code)]
pub fn composer_with(store: Arc<dyn CatalogStore>, sampler: Arc<dyn WeightSampler>) -> FeedComposer {
    FeedComposer::from_config(
        store,
        &EngineConfig::default(),
        sampler,
        Arc::new(ManualClock::new(Utc::now())),
    )
}

#[allow(dead_code)]
pub fn composer(store: Arc<dyn CatalogStore>) -> FeedComposer {
    composer_with(store, Arc::new(FixedWeightSampler::lower()))
}

#[allow(dead_code)]
pub fn memory_store(packs: Vec<CandidateItem>) -> Arc<InMemoryCatalogStore> {
    Arc::new(InMemoryCatalogStore::with_packs(packs))
}

/// Store whose every call fails
#[allow(dead_code)]
pub struct FailingStore;

fn unavailable<T>() -> Result<T> {
    Err(AppError::ServiceUnavailable("catalog offline".to_string()))
}

#[async_trait]
impl CatalogStore for FailingStore {
    async fn find_packs(&self, _query: &PackQuery) -> Result<Vec<CandidateItem>> {
        unavailable()
    }

    async fn sample_packs(&self, _query: &PackQuery, _size: usize) -> Result<Vec<CandidateItem>> {
        unavailable()
    }

    async fn count_packs(&self, _query: &PackQuery) -> Result<u64> {
        unavailable()
    }

    async fn interaction_history(
        &self,
        _viewer_id: &str,
        _limit: usize,
    ) -> Result<Option<InteractionHistory>> {
        unavailable()
    }

    async fn increment_views(
        &self,
        _pack_ids: &[String],
        _viewer_id: Option<String>,
    ) -> Result<u64> {
        unavailable()
    }

    async fn active_categories(&self, _limit: usize) -> Result<Vec<CategoryStats>> {
        unavailable()
    }

    async fn top_sticker_in_category(&self, _category_id: &str) -> Result<Option<StickerPreview>> {
        unavailable()
    }
}
