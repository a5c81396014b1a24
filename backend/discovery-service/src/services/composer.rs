//! Home feed assembly
//!
//! Resolves the viewer profile once, then runs the recommended, trending and
//! suggested sections concurrently. Recommended and trending go through the
//! [`FallbackChain`]; suggested is a paginated popular listing rescored within
//! the page. View recording is scheduled after assembly and never awaited.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::diversity::DiversityShuffler;
use super::fallback_chain::{FallbackChain, FallbackTier};
use super::profile::{InteractionProfile, InteractionProfileBuilder, PreferenceCache, ProfileService};
use super::scorer::CandidateScorer;
use super::view_recorder::ViewRecorder;
use super::visibility::VisibilityFilter;
use super::weights::{SectionProfile, WeightSampler};
use crate::config::EngineConfig;
use crate::db::{CatalogStore, PackSort};
use crate::metrics;
use crate::models::{
    CandidateItem, FeedFilters, PackView, PageRequest, Pagination, ViewerContext,
};
use crate::utils::Clock;

/// Candidate to presentation model
pub trait PackViewMapper: Send + Sync {
    fn to_view(&self, item: &CandidateItem, viewer: &ViewerContext) -> PackView;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPackViewMapper;

impl PackViewMapper for DefaultPackViewMapper {
    fn to_view(&self, item: &CandidateItem, viewer: &ViewerContext) -> PackView {
        PackView {
            id: item.id.clone(),
            name: item.name.clone(),
            creator_id: item.creator_id.clone(),
            category_ids: item.category_ids.clone(),
            is_animated: item.is_animated,
            sticker_count: item.sticker_count,
            tray_image_url: item.tray_image_url.clone(),
            downloads: item.engagement.downloads,
            views: item.engagement.views,
            favorites: item.engagement.favorites,
            created_at: item.created_at,
            is_owner: viewer.viewer_id.as_deref() == Some(item.creator_id.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub viewer: ViewerContext,
    pub filters: FeedFilters,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeFeed {
    pub recommended: Vec<PackView>,
    pub trending: Vec<PackView>,
    pub suggested: Vec<PackView>,
    pub pagination: Pagination,
}

/// One fallback-chain section
#[derive(Debug, Clone, Serialize)]
pub struct SectionFeed {
    pub packs: Vec<PackView>,
    pub tier: Option<FallbackTier>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestedPage {
    pub packs: Vec<PackView>,
    pub total: u64,
    pub pagination: Pagination,
}

pub struct FeedComposer {
    store: Arc<dyn CatalogStore>,
    profiles: Arc<ProfileService>,
    chain: Arc<FallbackChain>,
    scorer: Arc<CandidateScorer>,
    shuffler: Arc<DiversityShuffler>,
    recorder: Arc<ViewRecorder>,
    mapper: Arc<dyn PackViewMapper>,
    recommended: SectionProfile,
    trending: SectionProfile,
    suggested: SectionProfile,
}

impl FeedComposer {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        profiles: Arc<ProfileService>,
        chain: Arc<FallbackChain>,
        scorer: Arc<CandidateScorer>,
        shuffler: Arc<DiversityShuffler>,
        recorder: Arc<ViewRecorder>,
    ) -> Self {
        Self {
            store,
            profiles,
            chain,
            scorer,
            shuffler,
            recorder,
            mapper: Arc::new(DefaultPackViewMapper),
            recommended: SectionProfile::recommended(),
            trending: SectionProfile::trending(),
            suggested: SectionProfile::suggested(),
        }
    }

    /// Wires every engine component over one store, sampler and clock
    pub fn from_config(
        store: Arc<dyn CatalogStore>,
        config: &EngineConfig,
        sampler: Arc<dyn WeightSampler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(PreferenceCache::new(config.preference_cache_capacity));
        let profiles = Arc::new(ProfileService::new(
            Arc::clone(&store),
            InteractionProfileBuilder::new(Arc::clone(&sampler)),
            cache,
            config.history_limit,
        ));
        let scorer = Arc::new(CandidateScorer::new(Arc::clone(&sampler), Arc::clone(&clock)));
        let shuffler = Arc::new(DiversityShuffler::new(sampler));
        let chain = Arc::new(FallbackChain::new(
            Arc::clone(&store),
            Arc::clone(&scorer),
            Arc::clone(&shuffler),
            clock,
            config.candidate_pool_size,
        ));
        let recorder = Arc::new(ViewRecorder::new(Arc::clone(&store)));

        Self::new(store, profiles, chain, scorer, shuffler, recorder)
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn PackViewMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn profiles(&self) -> &Arc<ProfileService> {
        &self.profiles
    }

    pub async fn home(&self, request: FeedRequest) -> HomeFeed {
        let started = Instant::now();
        let (viewer, profile) = self.prepare(request.viewer).await;
        let filter = VisibilityFilter::new(request.filters);
        let profile = profile.as_deref();

        let (recommended, trending, suggested) = tokio::join!(
            self.chain.run(&self.recommended, &viewer, &filter, profile),
            self.chain.run(&self.trending, &viewer, &filter, profile),
            self.suggested_page(&viewer, &filter, profile, request.page),
        );

        let feed = HomeFeed {
            recommended: self.to_views(&recommended.items, &viewer),
            trending: self.to_views(&trending.items, &viewer),
            suggested: suggested.packs,
            pagination: suggested.pagination,
        };

        self.record_views(
            feed.recommended
                .iter()
                .chain(feed.trending.iter())
                .chain(feed.suggested.iter()),
            &viewer,
        );

        metrics::observe_home_feed_duration(started.elapsed());
        debug!(
            recommended_tier = ?recommended.tier,
            trending_tier = ?trending.tier,
            recommended = feed.recommended.len(),
            trending = feed.trending.len(),
            suggested = feed.suggested.len(),
            "Composed home feed"
        );
        feed
    }

    pub async fn recommended(&self, request: FeedRequest) -> SectionFeed {
        self.section(&self.recommended, request).await
    }

    pub async fn trending(&self, request: FeedRequest) -> SectionFeed {
        self.section(&self.trending, request).await
    }

    pub async fn suggested(&self, request: FeedRequest) -> SuggestedPage {
        let (viewer, profile) = self.prepare(request.viewer).await;
        let filter = VisibilityFilter::new(request.filters);
        let page = self
            .suggested_page(&viewer, &filter, profile.as_deref(), request.page)
            .await;
        self.record_views(page.packs.iter(), &viewer);
        page
    }

    async fn section(&self, section: &SectionProfile, request: FeedRequest) -> SectionFeed {
        let (viewer, profile) = self.prepare(request.viewer).await;
        let filter = VisibilityFilter::new(request.filters);
        let outcome = self
            .chain
            .run(section, &viewer, &filter, profile.as_deref())
            .await;

        let packs = self.to_views(&outcome.items, &viewer);
        self.record_views(packs.iter(), &viewer);
        SectionFeed {
            packs,
            tier: outcome.tier,
        }
    }

    /// Resolves the profile and folds the viewer's own packs into the exclusions
    async fn prepare(
        &self,
        mut viewer: ViewerContext,
    ) -> (ViewerContext, Option<Arc<InteractionProfile>>) {
        let profile = self.profiles.resolve(viewer.viewer_id.as_deref()).await;
        if let Some(profile) = &profile {
            viewer
                .own_ids
                .extend(profile.owned_pack_ids.iter().cloned());
        }
        (viewer, profile)
    }

    async fn suggested_page(
        &self,
        viewer: &ViewerContext,
        filter: &VisibilityFilter,
        profile: Option<&InteractionProfile>,
        page: PageRequest,
    ) -> SuggestedPage {
        let query = filter
            .to_query(viewer, None)
            .with_sort(PackSort::Popular)
            .with_page(page.offset(), page.limit);

        let (items, total) = tokio::join!(
            self.store.find_packs(&query),
            self.store.count_packs(&query)
        );

        let items = items.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load suggested page");
            Vec::new()
        });
        let total = total.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to count suggested packs");
            (page.offset() + items.len()) as u64
        });

        let eligible = filter.apply(items, viewer);
        let scored = self
            .scorer
            .score(eligible, profile, &self.suggested.ranges);
        let items: Vec<CandidateItem> = self
            .shuffler
            .shuffle(scored)
            .into_iter()
            .map(|candidate| candidate.item)
            .collect();

        SuggestedPage {
            packs: self.to_views(&items, viewer),
            total,
            pagination: Pagination::new(page, total),
        }
    }

    fn to_views(&self, items: &[CandidateItem], viewer: &ViewerContext) -> Vec<PackView> {
        items
            .iter()
            .map(|item| self.mapper.to_view(item, viewer))
            .collect()
    }

    fn record_views<'a>(&self, packs: impl Iterator<Item = &'a PackView>, viewer: &ViewerContext) {
        let ids: Vec<String> = packs.map(|pack| pack.id.clone()).collect();
        if ids.is_empty() {
            return;
        }
        // detached; the handle is dropped on purpose
        drop(self.recorder.record(ids, viewer.viewer_id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryCatalogStore, MockCatalogStore};
    use crate::error::AppError;
    use crate::models::{
        EngagementCounters, InteractionHistory, PackSummary, VisibilityFlags,
    };
    use crate::services::weights::FixedWeightSampler;
    use crate::utils::ManualClock;
    use chrono::{Duration, Utc};

    fn pack(id: &str, creator: &str, downloads: u64, age_days: i64) -> CandidateItem {
        CandidateItem {
            id: id.to_string(),
            creator_id: creator.to_string(),
            name: id.to_string(),
            description: String::new(),
            category_ids: vec!["cats".to_string()],
            created_at: Utc::now() - Duration::days(age_days),
            is_animated: false,
            sticker_count: 10,
            tray_image_url: None,
            engagement: EngagementCounters {
                downloads,
                views: 0,
                favorites: 0,
            },
            visibility: VisibilityFlags::public(),
        }
    }

    fn composer(store: Arc<dyn CatalogStore>) -> FeedComposer {
        FeedComposer::from_config(
            store,
            &EngineConfig::default(),
            Arc::new(FixedWeightSampler::lower()),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    fn request(viewer: ViewerContext, page: usize, limit: usize) -> FeedRequest {
        FeedRequest {
            viewer,
            filters: FeedFilters::default(),
            page: PageRequest::new(page, limit, 50),
        }
    }

    #[tokio::test]
    async fn test_home_fills_every_section() {
        let store = Arc::new(InMemoryCatalogStore::with_packs(
            (0..8).map(|i| pack(&format!("p{i}"), "c", i * 10, i as i64)).collect(),
        ));
        let feed = composer(store)
            .home(request(ViewerContext::anonymous(), 1, 3))
            .await;

        assert_eq!(feed.recommended.len(), 5);
        assert_eq!(feed.trending.len(), 5);
        assert_eq!(feed.suggested.len(), 3);
        assert_eq!(feed.pagination.total_items, 8);
        assert_eq!(feed.pagination.total_pages, 3);
        assert!(feed.pagination.has_next_page);
    }

    #[tokio::test]
    async fn test_suggested_pages_do_not_overlap() {
        let store = Arc::new(InMemoryCatalogStore::with_packs(
            (0..6).map(|i| pack(&format!("p{i}"), "c", i * 100, 1)).collect(),
        ));
        let composer = composer(store);

        let first = composer
            .suggested(request(ViewerContext::anonymous(), 1, 3))
            .await;
        let second = composer
            .suggested(request(ViewerContext::anonymous(), 2, 3))
            .await;

        assert_eq!(first.total, 6);
        assert!(!second.pagination.has_next_page);
        for view in &second.packs {
            assert!(first.packs.iter().all(|p| p.id != view.id));
        }
    }

    #[tokio::test]
    async fn test_owned_packs_never_returned() {
        let store = Arc::new(InMemoryCatalogStore::with_packs(vec![
            pack("mine", "u1", 1000, 1),
            pack("theirs", "alice", 1, 1),
        ]));
        store.set_history(
            "u1",
            InteractionHistory {
                owned_packs: vec![PackSummary {
                    id: "mine".to_string(),
                    creator_id: "u1".to_string(),
                    name: "mine".to_string(),
                    description: String::new(),
                    category_ids: vec!["cats".to_string()],
                    is_animated: false,
                }],
                favorite_packs: vec![],
                favorite_stickers: vec![],
            },
        );

        let feed = composer(store)
            .home(request(ViewerContext::for_viewer("u1"), 1, 10))
            .await;

        for section in [&feed.recommended, &feed.trending, &feed.suggested] {
            assert_eq!(section.len(), 1);
            assert_eq!(section[0].id, "theirs");
        }
    }

    #[test]
    fn test_is_owner_flag() {
        let mapper = DefaultPackViewMapper;
        let item = pack("p", "u1", 0, 0);
        assert!(mapper.to_view(&item, &ViewerContext::for_viewer("u1")).is_owner);
        assert!(!mapper.to_view(&item, &ViewerContext::anonymous()).is_owner);
    }

    struct ShoutingMapper;

    impl PackViewMapper for ShoutingMapper {
        fn to_view(&self, item: &CandidateItem, viewer: &ViewerContext) -> PackView {
            let mut view = DefaultPackViewMapper.to_view(item, viewer);
            view.name = view.name.to_uppercase();
            view
        }
    }

    #[tokio::test]
    async fn test_custom_mapper() {
        let store = Arc::new(InMemoryCatalogStore::with_packs(vec![pack("cats", "c", 1, 1)]));
        let section = composer(store)
            .with_mapper(Arc::new(ShoutingMapper))
            .recommended(request(ViewerContext::anonymous(), 1, 10))
            .await;
        assert_eq!(section.packs[0].name, "CATS");
        assert_eq!(section.tier, Some(FallbackTier::Scored));
    }

    #[tokio::test]
    async fn test_suggested_survives_count_failure() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_packs()
            .returning(|_| Ok(vec![pack("a", "c", 1, 1), pack("b", "c", 1, 1)]));
        store
            .expect_count_packs()
            .returning(|_| Err(AppError::Database("timeout".to_string())));
        store.expect_increment_views().returning(|_, _| Ok(0));

        let page = composer(Arc::new(store))
            .suggested(request(ViewerContext::anonymous(), 1, 10))
            .await;
        assert_eq!(page.packs.len(), 2);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_empty_catalog_yields_empty_sections() {
        let store = Arc::new(InMemoryCatalogStore::new());
        let feed = composer(store)
            .home(request(ViewerContext::anonymous(), 1, 10))
            .await;
        assert!(feed.recommended.is_empty());
        assert!(feed.trending.is_empty());
        assert!(feed.suggested.is_empty());
        assert_eq!(feed.pagination.total_items, 0);
    }
}
