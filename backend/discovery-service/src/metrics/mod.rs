//! Prometheus metrics for discovery-service.
//!
//! Collectors for the ranking engine plus the handler behind `/metrics`.

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::time::Duration;

static FALLBACK_TIER_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "discovery_fallback_tier_total",
        "Fallback tier that produced a feed section (none when every tier came back empty)",
        &["section", "tier"]
    )
    .expect("Failed to register fallback tier metric")
});

static PREFERENCE_CACHE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "discovery_preference_cache_total",
        "Preference cache lookups (hit/miss)",
        &["result"]
    )
    .expect("Failed to register preference cache metric")
});

static PANEL_CACHE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "discovery_trending_panel_cache_total",
        "Trending search panel reads (hit/miss)",
        &["result"]
    )
    .expect("Failed to register trending panel cache metric")
});

static VIEW_RECORDING_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "discovery_view_recording_total",
        "Detached view counter updates (success/error)",
        &["status"]
    )
    .expect("Failed to register view recording metric")
});

static HOME_FEED_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "discovery_home_feed_duration_seconds",
        "Time spent composing the home feed",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register home feed duration metric")
});

fn hit_label(hit: bool) -> &'static str {
    if hit {
        "hit"
    } else {
        "miss"
    }
}

/// Record which tier served a section
pub fn record_fallback_tier(section: &str, tier: &str) {
    FALLBACK_TIER_TOTAL.with_label_values(&[section, tier]).inc();
}

pub fn record_preference_cache(hit: bool) {
    PREFERENCE_CACHE_TOTAL
        .with_label_values(&[hit_label(hit)])
        .inc();
}

pub fn record_panel_cache(hit: bool) {
    PANEL_CACHE_TOTAL.with_label_values(&[hit_label(hit)]).inc();
}

/// Record view recording result (success/error)
pub fn record_view_recording(status: &str) {
    VIEW_RECORDING_TOTAL.with_label_values(&[status]).inc();
}

pub fn observe_home_feed_duration(duration: Duration) {
    HOME_FEED_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
