//! Near-tie reordering
//!
//! Clusters start at a head `h` and absorb the following items `x` while
//! `h - x <= 5% of x`. Each cluster is reordered by a random secondary key;
//! clusters themselves keep their score order, so an item more than 5% above
//! another always stays ahead of it.

use std::cmp::Ordering;
use std::sync::Arc;

use super::scorer::ScoredCandidate;
use super::weights::WeightSampler;

pub const NEAR_TIE_TOLERANCE: f64 = 0.05;

pub struct DiversityShuffler {
    sampler: Arc<dyn WeightSampler>,
    tolerance: f64,
}

impl DiversityShuffler {
    pub fn new(sampler: Arc<dyn WeightSampler>) -> Self {
        Self {
            sampler,
            tolerance: NEAR_TIE_TOLERANCE,
        }
    }

    /// Expects `scored` sorted by descending score
    pub fn shuffle(&self, scored: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        let mut output = Vec::with_capacity(scored.len());
        let mut remaining = scored.into_iter().peekable();

        while let Some(head) = remaining.next() {
            let head_score = head.score;
            let mut cluster = vec![(self.sampler.unit(), head)];

            while let Some(next) = remaining.peek() {
                if head_score - next.score > self.tolerance * next.score {
                    break;
                }
                if let Some(next) = remaining.next() {
                    cluster.push((self.sampler.unit(), next));
                }
            }

            if cluster.len() > 1 {
                cluster.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            }
            output.extend(cluster.into_iter().map(|(_, candidate)| candidate));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateItem, EngagementCounters, VisibilityFlags};
    use crate::services::weights::{FixedWeightSampler, RngWeightSampler};
    use chrono::Utc;

    fn scored(id: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            item: CandidateItem {
                id: id.to_string(),
                creator_id: "c".to_string(),
                name: id.to_string(),
                description: String::new(),
                category_ids: vec![],
                created_at: Utc::now(),
                is_animated: false,
                sticker_count: 0,
                tray_image_url: None,
                engagement: EngagementCounters::default(),
                visibility: VisibilityFlags::public(),
            },
            score,
        }
    }

    fn ids(list: &[ScoredCandidate]) -> Vec<String> {
        list.iter().map(|s| s.item.id.clone()).collect()
    }

    #[test]
    fn test_well_separated_scores_keep_order() {
        let shuffler = DiversityShuffler::new(Arc::new(RngWeightSampler::seeded(5)));
        let input = vec![scored("a", 100.0), scored("b", 50.0), scored("c", 10.0)];
        assert_eq!(ids(&shuffler.shuffle(input)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_outside_tolerance_always_precedes() {
        // 10.6 - 10.0 = 0.6 > 0.5
        for seed in 0..200 {
            let shuffler = DiversityShuffler::new(Arc::new(RngWeightSampler::seeded(seed)));
            let out = shuffler.shuffle(vec![
                scored("a", 10.6),
                scored("b", 10.0),
                scored("c", 9.9),
            ]);
            let pos = |id: &str| out.iter().position(|s| s.item.id == id).unwrap();
            assert!(pos("a") < pos("b"));
            assert!(pos("a") < pos("c"));
        }
    }

    #[test]
    fn test_near_ties_get_reordered() {
        let input = || {
            vec![
                scored("a", 10.0),
                scored("b", 9.9),
                scored("c", 9.8),
                scored("d", 9.7),
            ]
        };
        let mut seen_other_order = false;
        for seed in 0..50 {
            let shuffler = DiversityShuffler::new(Arc::new(RngWeightSampler::seeded(seed)));
            let out = shuffler.shuffle(input());
            assert_eq!(out.len(), 4);
            if ids(&out) != vec!["a", "b", "c", "d"] {
                seen_other_order = true;
            }
        }
        assert!(seen_other_order);
    }

    #[test]
    fn test_cluster_measured_from_head() {
        // b is within 5% of a, c is within 5% of b but not of a
        let shuffler = DiversityShuffler::new(Arc::new(FixedWeightSampler::midpoint()));
        let out = shuffler.shuffle(vec![
            scored("a", 10.0),
            scored("b", 9.6),
            scored("c", 9.2),
        ]);
        assert_eq!(ids(&out), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_and_single() {
        let shuffler = DiversityShuffler::new(Arc::new(FixedWeightSampler::lower()));
        assert!(shuffler.shuffle(vec![]).is_empty());
        assert_eq!(ids(&shuffler.shuffle(vec![scored("a", 1.0)])), vec!["a"]);
    }
}
