//! Viewer preference inference
//!
//! Owned packs, favorited packs and favorited stickers are folded into an
//! [`InteractionProfile`]: weighted category affinities, liked creators,
//! keyword tokens and an animated/static preference. Built profiles are kept in
//! the [`PreferenceCache`].

pub mod cache;

pub use cache::PreferenceCache;

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use super::weights::{ProfileWeightRanges, WeightSampler};
use crate::db::CatalogStore;
use crate::metrics;
use crate::models::{InteractionHistory, PackSummary};
use crate::utils::tokenize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InteractionProfile {
    pub category_affinity: HashMap<String, f64>,
    pub liked_creators: HashSet<String>,
    pub keywords: HashSet<String>,
    pub prefers_animated: bool,
    /// Packs the viewer owns; never recommended back to them
    pub owned_pack_ids: HashSet<String>,
}

impl InteractionProfile {
    pub fn affinity(&self, category_id: &str) -> f64 {
        self.category_affinity
            .get(category_id)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Derives a profile from a bounded history. Weights are drawn once per build,
/// the occurrence jitter once per category occurrence.
pub struct InteractionProfileBuilder {
    ranges: ProfileWeightRanges,
    sampler: Arc<dyn WeightSampler>,
}

impl InteractionProfileBuilder {
    pub fn new(sampler: Arc<dyn WeightSampler>) -> Self {
        Self::with_ranges(ProfileWeightRanges::default(), sampler)
    }

    pub fn with_ranges(ranges: ProfileWeightRanges, sampler: Arc<dyn WeightSampler>) -> Self {
        Self { ranges, sampler }
    }

    /// `None` when the history holds no interaction at all
    pub fn build(&self, history: &InteractionHistory) -> Option<InteractionProfile> {
        if history.is_empty() {
            return None;
        }

        let owned_weight = self.sampler.sample(self.ranges.owned_pack);
        let favorite_weight = self.sampler.sample(self.ranges.favorite_pack);
        let sticker_weight = self.sampler.sample(self.ranges.favorite_sticker);

        let mut profile = InteractionProfile::default();
        let mut animated = 0usize;

        for (packs, weight) in [
            (&history.owned_packs, owned_weight),
            (&history.favorite_packs, favorite_weight),
        ] {
            for pack in packs {
                self.add_categories(&mut profile, &pack.category_ids, weight);
                self.add_pack_signals(&mut profile, pack);
                if pack.is_animated {
                    animated += 1;
                }
            }
        }

        for sticker in &history.favorite_stickers {
            self.add_categories(&mut profile, &sticker.category_ids, sticker_weight);
            if sticker.is_animated {
                animated += 1;
            }
        }

        let total = history.owned_packs.len()
            + history.favorite_packs.len()
            + history.favorite_stickers.len();
        let threshold = self.sampler.sample(self.ranges.animated_threshold);
        profile.prefers_animated = animated as f64 > total as f64 * threshold;

        profile.owned_pack_ids = history
            .owned_packs
            .iter()
            .map(|pack| pack.id.clone())
            .collect();

        Some(profile)
    }

    fn add_categories(&self, profile: &mut InteractionProfile, categories: &[String], weight: f64) {
        for category in categories {
            let jitter = self.sampler.sample(self.ranges.occurrence_jitter);
            *profile
                .category_affinity
                .entry(category.clone())
                .or_insert(0.0) += weight * jitter;
        }
    }

    fn add_pack_signals(&self, profile: &mut InteractionProfile, pack: &PackSummary) {
        profile.liked_creators.insert(pack.creator_id.clone());
        profile.keywords.extend(tokenize(&pack.name));
        profile.keywords.extend(tokenize(&pack.description));
    }
}

/// Resolves viewer ids to profiles through the cache
pub struct ProfileService {
    store: Arc<dyn CatalogStore>,
    builder: InteractionProfileBuilder,
    cache: Arc<PreferenceCache>,
    history_limit: usize,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        builder: InteractionProfileBuilder,
        cache: Arc<PreferenceCache>,
        history_limit: usize,
    ) -> Self {
        Self {
            store,
            builder,
            cache,
            history_limit,
        }
    }

    pub fn cache(&self) -> &Arc<PreferenceCache> {
        &self.cache
    }

    /// Profile of the viewer, or `None` for anonymous, unknown or history-less
    /// viewers. Storage failures degrade to `None`.
    pub async fn resolve(&self, viewer_id: Option<&str>) -> Option<Arc<InteractionProfile>> {
        let viewer_id = viewer_id?;

        if let Some(profile) = self.cache.get(viewer_id) {
            debug!(viewer_id = %viewer_id, "Preference cache hit");
            metrics::record_preference_cache(true);
            return Some(profile);
        }
        metrics::record_preference_cache(false);

        let history = match self
            .store
            .interaction_history(viewer_id, self.history_limit)
            .await
        {
            Ok(Some(history)) => history,
            Ok(None) => {
                debug!(viewer_id = %viewer_id, "Viewer not found, browsing without profile");
                return None;
            }
            Err(e) => {
                warn!(viewer_id = %viewer_id, error = %e, "Failed to load interaction history");
                return None;
            }
        };

        let profile = Arc::new(self.builder.build(&history)?);
        self.cache.set(viewer_id, Arc::clone(&profile));
        debug!(
            viewer_id = %viewer_id,
            categories = profile.category_affinity.len(),
            creators = profile.liked_creators.len(),
            "Built interaction profile"
        );
        Some(profile)
    }
}
