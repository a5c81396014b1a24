//! Per-call weight sampling
//!
//! Every scoring pass draws its constants fresh from documented ranges, so two
//! identical requests rank slightly differently. The randomness sits behind
//! [`WeightSampler`]: production uses an RNG, tests pin the draw to a fixed
//! position inside each range and assert exact scores.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::db::PackSort;

/// Closed interval a weight is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRange {
    pub min: f64,
    pub max: f64,
}

impl WeightRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub const fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub trait WeightSampler: Send + Sync {
    /// Draws a value in `[range.min, range.max]`
    fn sample(&self, range: WeightRange) -> f64;

    /// Draws an integer in `[min, max]`
    fn sample_count(&self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        let drawn = self
            .sample(WeightRange::new(min as f64, (max + 1) as f64))
            .floor() as usize;
        drawn.clamp(min, max)
    }

    /// Secondary key in `[0, 1]` used for tie shuffling
    fn unit(&self) -> f64 {
        self.sample(WeightRange::new(0.0, 1.0))
    }
}

/// RNG-backed sampler
pub struct RngWeightSampler {
    rng: Mutex<StdRng>,
}

impl RngWeightSampler {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl WeightSampler for RngWeightSampler {
    fn sample(&self, range: WeightRange) -> f64 {
        if range.max <= range.min {
            return range.min;
        }
        self.rng.lock().gen_range(range.min..=range.max)
    }
}

/// Always returns the same relative position inside the range
#[derive(Debug, Clone, Copy)]
pub struct FixedWeightSampler {
    position: f64,
}

impl FixedWeightSampler {
    /// `position` 0.0 yields `min`, 1.0 yields `max`
    pub fn at(position: f64) -> Self {
        Self {
            position: position.clamp(0.0, 1.0),
        }
    }

    pub fn lower() -> Self {
        Self::at(0.0)
    }

    pub fn midpoint() -> Self {
        Self::at(0.5)
    }

    pub fn upper() -> Self {
        Self::at(1.0)
    }
}

impl WeightSampler for FixedWeightSampler {
    fn sample(&self, range: WeightRange) -> f64 {
        range.min + (range.max - range.min) * self.position
    }
}

/// Ranges of every scorer constant. One preset per feed section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRanges {
    pub category: WeightRange,
    pub creator: WeightRange,
    pub animation: WeightRange,
    pub keyword: WeightRange,
    pub downloads: WeightRange,
    pub views: WeightRange,
    pub favorites: WeightRange,
    pub decay_base: WeightRange,
    /// Completeness proxy, used only without a profile
    pub category_count: WeightRange,
    pub sticker_count: WeightRange,
    /// Exploration jitter as a fraction of the deterministic score
    pub jitter_ratio: WeightRange,
}

impl WeightRanges {
    /// Default browsing: profile signals dominate
    pub fn recommended() -> Self {
        Self {
            category: WeightRange::new(1.0, 1.5),
            creator: WeightRange::new(2.0, 4.0),
            animation: WeightRange::new(0.5, 1.5),
            keyword: WeightRange::new(0.5, 1.0),
            downloads: WeightRange::new(0.01, 0.02),
            views: WeightRange::new(0.001, 0.003),
            favorites: WeightRange::new(0.05, 0.1),
            decay_base: WeightRange::new(5.0, 10.0),
            category_count: WeightRange::new(0.2, 0.5),
            sticker_count: WeightRange::new(0.02, 0.06),
            jitter_ratio: WeightRange::new(0.0, 0.03),
        }
    }

    /// Engagement and freshness skewed higher
    pub fn trending() -> Self {
        Self {
            category: WeightRange::new(0.5, 1.0),
            creator: WeightRange::new(1.0, 2.0),
            animation: WeightRange::new(0.25, 0.75),
            keyword: WeightRange::new(0.25, 0.5),
            downloads: WeightRange::new(0.03, 0.06),
            views: WeightRange::new(0.004, 0.008),
            favorites: WeightRange::new(0.15, 0.3),
            decay_base: WeightRange::new(10.0, 20.0),
            category_count: WeightRange::new(0.2, 0.5),
            sticker_count: WeightRange::new(0.02, 0.06),
            jitter_ratio: WeightRange::new(0.0, 0.05),
        }
    }

    pub fn suggested() -> Self {
        Self {
            category: WeightRange::new(1.0, 2.0),
            creator: WeightRange::new(1.5, 3.0),
            animation: WeightRange::new(0.5, 1.0),
            keyword: WeightRange::new(0.5, 1.0),
            downloads: WeightRange::new(0.015, 0.03),
            views: WeightRange::new(0.002, 0.004),
            favorites: WeightRange::new(0.08, 0.15),
            decay_base: WeightRange::new(4.0, 8.0),
            category_count: WeightRange::new(0.2, 0.5),
            sticker_count: WeightRange::new(0.02, 0.06),
            jitter_ratio: WeightRange::new(0.0, 0.03),
        }
    }

    /// Draws every constant once, independently
    pub fn sample(&self, sampler: &dyn WeightSampler) -> WeightProfile {
        WeightProfile {
            category: sampler.sample(self.category),
            creator: sampler.sample(self.creator),
            animation: sampler.sample(self.animation),
            keyword: sampler.sample(self.keyword),
            downloads: sampler.sample(self.downloads),
            views: sampler.sample(self.views),
            favorites: sampler.sample(self.favorites),
            decay_base: sampler.sample(self.decay_base),
            category_count: sampler.sample(self.category_count),
            sticker_count: sampler.sample(self.sticker_count),
            jitter_ratio: sampler.sample(self.jitter_ratio),
        }
    }
}

/// Constants of one scoring pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub category: f64,
    pub creator: f64,
    pub animation: f64,
    pub keyword: f64,
    pub downloads: f64,
    pub views: f64,
    pub favorites: f64,
    pub decay_base: f64,
    pub category_count: f64,
    pub sticker_count: f64,
    pub jitter_ratio: f64,
}

/// Ranges used when inferring a viewer profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileWeightRanges {
    pub owned_pack: WeightRange,
    pub favorite_pack: WeightRange,
    pub favorite_sticker: WeightRange,
    /// Multiplier drawn per category occurrence
    pub occurrence_jitter: WeightRange,
    pub animated_threshold: WeightRange,
}

impl Default for ProfileWeightRanges {
    fn default() -> Self {
        Self {
            owned_pack: WeightRange::new(2.0, 4.0),
            favorite_pack: WeightRange::new(1.0, 2.0),
            favorite_sticker: WeightRange::new(1.0, 2.0),
            occurrence_jitter: WeightRange::new(0.75, 1.25),
            animated_threshold: WeightRange::new(0.45, 0.55),
        }
    }
}

/// Recency windows and result size of the fallback chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Width of the scored window, drawn per call
    pub min_days: usize,
    pub max_days: usize,
    pub extended_days: usize,
    /// Result size, drawn per call
    pub min_items: usize,
    pub max_items: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            min_days: 15,
            max_days: 45,
            extended_days: 90,
            min_items: 5,
            max_items: 12,
        }
    }
}

/// Everything that differs between feed sections
#[derive(Debug, Clone, PartialEq)]
pub struct SectionProfile {
    pub name: &'static str,
    pub ranges: WeightRanges,
    pub window: WindowConfig,
    /// Order of the candidate pool fetched for the scored tiers
    pub pool_sort: PackSort,
}

impl SectionProfile {
    pub fn recommended() -> Self {
        Self {
            name: "recommended",
            ranges: WeightRanges::recommended(),
            window: WindowConfig::default(),
            pool_sort: PackSort::Newest,
        }
    }

    pub fn trending() -> Self {
        Self {
            name: "trending",
            ranges: WeightRanges::trending(),
            window: WindowConfig::default(),
            pool_sort: PackSort::Popular,
        }
    }

    /// Paginated; the window only applies when it runs through the fallback chain
    pub fn suggested() -> Self {
        Self {
            name: "suggested",
            ranges: WeightRanges::suggested(),
            window: WindowConfig::default(),
            pool_sort: PackSort::Popular,
        }
    }
}
