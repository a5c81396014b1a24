//! Tiered candidate selection
//!
//! Tiers run in strict order and the first one that yields anything wins:
//!
//! 1. `Scored`: pool inside a randomly sized recency window, scored, shuffled
//! 2. `ExtendedWindow`: the same pipeline over the extended window
//! 3. `RandomSample`: unscored uniform sample of the extended window
//! 4. `EmergencyAny`: uniform sample of every visible pack, no window and no
//!    animated narrowing
//!
//! A failing tier counts as an empty one. When the last tier is empty too the
//! chain returns an empty outcome; it never errors.

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::diversity::DiversityShuffler;
use super::profile::InteractionProfile;
use super::scorer::CandidateScorer;
use super::visibility::VisibilityFilter;
use super::weights::SectionProfile;
use crate::db::{CatalogStore, PackQuery};
use crate::error::Result;
use crate::metrics;
use crate::models::{CandidateItem, ViewerContext};
use crate::utils::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackTier {
    Scored,
    ExtendedWindow,
    RandomSample,
    EmergencyAny,
}

impl FallbackTier {
    pub const ALL: [FallbackTier; 4] = [
        FallbackTier::Scored,
        FallbackTier::ExtendedWindow,
        FallbackTier::RandomSample,
        FallbackTier::EmergencyAny,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackTier::Scored => "scored",
            FallbackTier::ExtendedWindow => "extended_window",
            FallbackTier::RandomSample => "random_sample",
            FallbackTier::EmergencyAny => "emergency_any",
        }
    }
}

impl std::fmt::Display for FallbackTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    pub items: Vec<CandidateItem>,
    /// Tier that produced `items`; `None` when every tier came back empty
    pub tier: Option<FallbackTier>,
}

/// Per-call parameters, drawn once before the first tier
struct TierPlan<'a> {
    section: &'a SectionProfile,
    viewer: &'a ViewerContext,
    filter: &'a VisibilityFilter,
    profile: Option<&'a InteractionProfile>,
    window_days: usize,
    size: usize,
}

pub struct FallbackChain {
    store: Arc<dyn CatalogStore>,
    scorer: Arc<CandidateScorer>,
    shuffler: Arc<DiversityShuffler>,
    clock: Arc<dyn Clock>,
    pool_size: usize,
}

impl FallbackChain {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        scorer: Arc<CandidateScorer>,
        shuffler: Arc<DiversityShuffler>,
        clock: Arc<dyn Clock>,
        pool_size: usize,
    ) -> Self {
        Self {
            store,
            scorer,
            shuffler,
            clock,
            pool_size: pool_size.max(1),
        }
    }

    pub async fn run(
        &self,
        section: &SectionProfile,
        viewer: &ViewerContext,
        filter: &VisibilityFilter,
        profile: Option<&InteractionProfile>,
    ) -> ChainOutcome {
        let sampler = self.scorer.sampler();
        let plan = TierPlan {
            section,
            viewer,
            filter,
            profile,
            window_days: sampler.sample_count(section.window.min_days, section.window.max_days),
            size: sampler.sample_count(section.window.min_items, section.window.max_items),
        };

        for tier in FallbackTier::ALL {
            match self.run_tier(tier, &plan).await {
                Ok(items) if !items.is_empty() => {
                    info!(
                        section = section.name,
                        tier = %tier,
                        count = items.len(),
                        "Fallback chain resolved"
                    );
                    metrics::record_fallback_tier(section.name, tier.as_str());
                    return ChainOutcome {
                        items,
                        tier: Some(tier),
                    };
                }
                Ok(_) => {
                    info!(section = section.name, tier = %tier, "Tier empty, falling back");
                }
                Err(e) => {
                    warn!(
                        section = section.name,
                        tier = %tier,
                        error = %e,
                        "Tier failed, falling back"
                    );
                }
            }
        }

        warn!(section = section.name, "Every fallback tier came back empty");
        metrics::record_fallback_tier(section.name, "none");
        ChainOutcome::default()
    }

    async fn run_tier(&self, tier: FallbackTier, plan: &TierPlan<'_>) -> Result<Vec<CandidateItem>> {
        let now = self.clock.now();
        let extended = now - Duration::days(plan.section.window.extended_days as i64);

        match tier {
            FallbackTier::Scored => {
                let window = now - Duration::days(plan.window_days as i64);
                debug!(window_days = plan.window_days, "Scoring within window");
                self.scored(plan, plan.filter.to_query(plan.viewer, Some(window)))
                    .await
            }
            FallbackTier::ExtendedWindow => {
                self.scored(plan, plan.filter.to_query(plan.viewer, Some(extended)))
                    .await
            }
            FallbackTier::RandomSample => {
                let query = plan.filter.to_query(plan.viewer, Some(extended));
                let sample = self.store.sample_packs(&query, plan.size).await?;
                Ok(plan.filter.apply(sample, plan.viewer))
            }
            FallbackTier::EmergencyAny => {
                let filter = plan.filter.without_animated();
                let query = filter.to_query(plan.viewer, None);
                let sample = self.store.sample_packs(&query, plan.size).await?;
                Ok(filter.apply(sample, plan.viewer))
            }
        }
    }

    async fn scored(&self, plan: &TierPlan<'_>, query: PackQuery) -> Result<Vec<CandidateItem>> {
        let query = query
            .with_sort(plan.section.pool_sort)
            .with_page(0, self.pool_size);
        let pool = plan
            .filter
            .apply(self.store.find_packs(&query).await?, plan.viewer);

        let scored = self.scorer.score(pool, plan.profile, &plan.section.ranges);
        Ok(self
            .shuffler
            .shuffle(scored)
            .into_iter()
            .take(plan.size)
            .map(|candidate| candidate.item)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockCatalogStore;
    use crate::error::AppError;
    use crate::models::{EngagementCounters, FeedFilters, VisibilityFlags};
    use crate::services::weights::FixedWeightSampler;
    use crate::utils::ManualClock;
    use chrono::Utc;

    fn pack(id: &str) -> CandidateItem {
        CandidateItem {
            id: id.to_string(),
            creator_id: "c".to_string(),
            name: id.to_string(),
            description: String::new(),
            category_ids: vec!["cats".to_string()],
            created_at: Utc::now(),
            is_animated: false,
            sticker_count: 4,
            tray_image_url: None,
            engagement: EngagementCounters::default(),
            visibility: VisibilityFlags::public(),
        }
    }

    fn chain(store: MockCatalogStore) -> FallbackChain {
        let sampler = Arc::new(FixedWeightSampler::lower());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        FallbackChain::new(
            Arc::new(store),
            Arc::new(CandidateScorer::new(sampler.clone(), clock.clone())),
            Arc::new(DiversityShuffler::new(sampler)),
            clock,
            100,
        )
    }

    async fn run(chain: &FallbackChain, filter: &VisibilityFilter) -> ChainOutcome {
        chain
            .run(
                &SectionProfile::recommended(),
                &ViewerContext::anonymous(),
                filter,
                None,
            )
            .await
    }

    #[tokio::test]
    async fn test_scored_tier_stops_the_chain() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_packs()
            .times(1)
            .returning(|_| Ok(vec![pack("a"), pack("b")]));
        store.expect_sample_packs().times(0);

        let outcome = run(&chain(store), &VisibilityFilter::default()).await;
        assert_eq!(outcome.tier, Some(FallbackTier::Scored));
        assert_eq!(outcome.items.len(), 2);
    }

    #[tokio::test]
    async fn test_scored_tier_uses_sampled_window_and_size() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_packs()
            .times(1)
            .returning(|_| Ok((0..20).map(|i| pack(&format!("p{i}"))).collect()));

        let outcome = run(&chain(store), &VisibilityFilter::default()).await;
        // lower bound of the result size range
        assert_eq!(outcome.items.len(), 5);
    }

    #[tokio::test]
    async fn test_falls_through_to_extended_window() {
        let mut store = MockCatalogStore::new();
        let mut calls = 0;
        store.expect_find_packs().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(vec![])
            } else {
                Ok(vec![pack("old")])
            }
        });
        store.expect_sample_packs().times(0);

        let outcome = run(&chain(store), &VisibilityFilter::default()).await;
        assert_eq!(outcome.tier, Some(FallbackTier::ExtendedWindow));
    }

    #[tokio::test]
    async fn test_failures_degrade_to_emergency_any() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_packs()
            .times(2)
            .returning(|_| Err(AppError::Database("timeout".to_string())));
        store.expect_sample_packs().times(2).returning(|query, _| {
            if query.created_after.is_some() {
                Ok(vec![])
            } else {
                Ok(vec![pack("ancient")])
            }
        });

        let outcome = run(&chain(store), &VisibilityFilter::default()).await;
        assert_eq!(outcome.tier, Some(FallbackTier::EmergencyAny));
        assert_eq!(outcome.items[0].id, "ancient");
    }

    #[tokio::test]
    async fn test_emergency_drops_animated_but_keeps_category() {
        let mut store = MockCatalogStore::new();
        store.expect_find_packs().returning(|_| Ok(vec![]));
        store
            .expect_sample_packs()
            .withf(|query, _| query.created_after.is_some())
            .returning(|_, _| Ok(vec![]));
        store
            .expect_sample_packs()
            .withf(|query, _| {
                query.created_after.is_none()
                    && query.animated.is_none()
                    && query.category_id.as_deref() == Some("cats")
            })
            .times(1)
            .returning(|_, _| Ok(vec![pack("static")]));

        let filter = VisibilityFilter::new(FeedFilters {
            category_id: Some("cats".to_string()),
            animated: Some(true),
        });
        let outcome = run(&chain(store), &filter).await;
        assert_eq!(outcome.tier, Some(FallbackTier::EmergencyAny));
        assert_eq!(outcome.items[0].id, "static");
    }

    #[tokio::test]
    async fn test_every_tier_failing_yields_empty() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_packs()
            .returning(|_| Err(AppError::Database("down".to_string())));
        store
            .expect_sample_packs()
            .returning(|_, _| Err(AppError::Database("down".to_string())));

        let outcome = run(&chain(store), &VisibilityFilter::default()).await;
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.tier, None);
    }

    #[tokio::test]
    async fn test_store_results_are_refiltered() {
        let mut private = pack("private");
        private.visibility.is_private = true;

        let mut store = MockCatalogStore::new();
        store
            .expect_find_packs()
            .returning(move |_| Ok(vec![private.clone()]));
        store.expect_sample_packs().returning(|_, _| Ok(vec![]));

        let outcome = run(&chain(store), &VisibilityFilter::default()).await;
        assert!(outcome.items.is_empty());
    }

    #[tokio::test]
    async fn test_exclusions_pushed_down() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_packs()
            .withf(|query| query.exclude_ids.contains("seen") && query.exclude_ids.contains("mine"))
            .returning(|_| Ok(vec![pack("fresh")]));

        let mut viewer = ViewerContext::for_viewer("u1");
        viewer.shown_ids.insert("seen".to_string());
        viewer.own_ids.insert("mine".to_string());

        let outcome = chain(store)
            .run(
                &SectionProfile::trending(),
                &viewer,
                &VisibilityFilter::default(),
                None,
            )
            .await;
        assert_eq!(outcome.items[0].id, "fresh");
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(FallbackTier::EmergencyAny.to_string(), "emergency_any");
        assert_eq!(
            serde_json::to_value(FallbackTier::ExtendedWindow).unwrap(),
            "EXTENDED_WINDOW"
        );
    }
}
