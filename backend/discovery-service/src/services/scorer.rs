//! Composite candidate scoring
//!
//! With a profile the score combines:
//! - category overlap: sum of `affinity[c] * category` over shared categories
//! - creator bonus when the creator is liked
//! - animation bonus when the animated flag matches the preference
//! - keyword overlap: shared tokens times `keyword`
//! - raw engagement and recency decay `decay_base / (1 + age_days)`
//!
//! Without one, a completeness proxy (category and sticker counts) replaces the
//! profile terms. Either way an exploration jitter of `u * score`, with `u`
//! drawn per candidate from `[0, jitter_ratio]`, is added on top.

use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::profile::InteractionProfile;
use super::weights::{WeightProfile, WeightRange, WeightRanges, WeightSampler};
use crate::models::CandidateItem;
use crate::utils::{age_in_days, tokenize, Clock};

/// One candidate with its score for the current ranking pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub item: CandidateItem,
    pub score: f64,
}

pub struct CandidateScorer {
    sampler: Arc<dyn WeightSampler>,
    clock: Arc<dyn Clock>,
}

impl CandidateScorer {
    pub fn new(sampler: Arc<dyn WeightSampler>, clock: Arc<dyn Clock>) -> Self {
        Self { sampler, clock }
    }

    pub fn sampler(&self) -> &Arc<dyn WeightSampler> {
        &self.sampler
    }

    /// Scores every candidate with weights drawn once from `ranges`, highest first
    pub fn score(
        &self,
        candidates: Vec<CandidateItem>,
        profile: Option<&InteractionProfile>,
        ranges: &WeightRanges,
    ) -> Vec<ScoredCandidate> {
        let weights = ranges.sample(self.sampler.as_ref());
        let now = self.clock.now();
        let jitter = WeightRange::new(0.0, weights.jitter_ratio);

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|item| {
                let base = base_score(&item, profile, &weights, now);
                let score = base + self.sampler.sample(jitter) * base;
                ScoredCandidate { item, score }
            })
            .collect();

        sort_by_score(&mut scored);
        scored
    }
}

/// Stable, descending
pub fn sort_by_score(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Score without exploration jitter
pub fn base_score(
    item: &CandidateItem,
    profile: Option<&InteractionProfile>,
    weights: &WeightProfile,
    now: DateTime<Utc>,
) -> f64 {
    let engagement = item.engagement.downloads as f64 * weights.downloads
        + item.engagement.views as f64 * weights.views
        + item.engagement.favorites as f64 * weights.favorites;
    let recency = weights.decay_base / (1.0 + age_in_days(item.created_at, now));

    let signals = match profile {
        Some(profile) => profile_signals(item, profile, weights),
        None => {
            item.category_ids.len() as f64 * weights.category_count
                + item.sticker_count as f64 * weights.sticker_count
        }
    };

    signals + engagement + recency
}

fn profile_signals(item: &CandidateItem, profile: &InteractionProfile, weights: &WeightProfile) -> f64 {
    let category: f64 = item
        .category_ids
        .iter()
        .map(|c| profile.affinity(c) * weights.category)
        .sum();

    let creator = if profile.liked_creators.contains(&item.creator_id) {
        weights.creator
    } else {
        0.0
    };

    let animation = if item.is_animated == profile.prefers_animated {
        weights.animation
    } else {
        0.0
    };

    let keyword = if profile.keywords.is_empty() {
        0.0
    } else {
        let mut tokens = tokenize(&item.name);
        tokens.extend(tokenize(&item.description));
        tokens.intersection(&profile.keywords).count() as f64 * weights.keyword
    };

    category + creator + animation + keyword
}
