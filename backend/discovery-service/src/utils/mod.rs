// Utility functions for discovery-service

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Minimum token length kept by [`tokenize`]
pub const MIN_TOKEN_LEN: usize = 3;

/// Lowercased alphanumeric tokens longer than two characters
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
        .map(|token| token.to_lowercase())
        .collect()
}

/// Age in fractional days, zero for timestamps in the future
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - created_at).num_seconds().max(0) as f64;
    seconds / 86_400.0
}
