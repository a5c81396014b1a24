//! Integration Tests: trending-search panel over the in-memory catalog

mod common;

use chrono::{Duration, Utc};
use std::sync::Arc;

use common::{memory_store, pack, private_pack};
use discovery_service::config::TrendingPanelConfig;
use discovery_service::db::memory::StickerRecord;
use discovery_service::db::InMemoryCatalogStore;
use discovery_service::models::CategoryStats;
use discovery_service::services::TrendingPanelService;
use discovery_service::utils::ManualClock;

fn stats(id: &str, searches: u64, packs: u64) -> CategoryStats {
    CategoryStats {
        id: id.to_string(),
        name: format!("#{id}"),
        search_count: searches,
        pack_count: packs,
    }
}

fn sticker(id: &str, pack_id: &str, engagement: u64) -> StickerRecord {
    StickerRecord {
        id: id.to_string(),
        pack_id: pack_id.to_string(),
        image_url: format!("/stickers/{id}.webp"),
        engagement,
    }
}

fn seeded_store() -> Arc<InMemoryCatalogStore> {
    let mut cat_pack = pack("cat-pack", 3);
    cat_pack.category_ids = vec!["cats".to_string()];
    let mut secret_cats = private_pack("secret-cats", 1);
    secret_cats.category_ids = vec!["cats".to_string()];

    let store = memory_store(vec![cat_pack, secret_cats]);
    store.insert_category(stats("cats", 120, 2), true);
    store.insert_category(stats("dogs", 300, 0), true);
    store.insert_category(stats("retired", 9_000, 40), false);

    store.insert_sticker(sticker("cat-1", "cat-pack", 10));
    store.insert_sticker(sticker("cat-2", "cat-pack", 25));
    store.insert_sticker(sticker("secret-1", "secret-cats", 1_000));
    store
}

fn service(store: Arc<InMemoryCatalogStore>, clock: Arc<ManualClock>) -> TrendingPanelService {
    let config = TrendingPanelConfig {
        ttl_secs: 900,
        size: 10,
        placeholder_url: "/static/placeholder.webp".to_string(),
    };
    TrendingPanelService::new(store, &config, clock)
}

#[tokio::test]
async fn test_panel_orders_active_categories_with_previews() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let response = service(seeded_store(), clock).get().await;

    let ids: Vec<&str> = response
        .panel
        .categories
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(ids, vec!["dogs", "cats"]);

    let dogs = &response.panel.categories[0];
    assert!(dogs.preview.is_placeholder);
    assert_eq!(dogs.preview.image_url, "/static/placeholder.webp");

    // the private pack's sticker is more popular but never chosen
    let cats = &response.panel.categories[1];
    assert!(!cats.preview.is_placeholder);
    assert_eq!(cats.preview.sticker_id.as_deref(), Some("cat-2"));
    assert_eq!(cats.preview.pack_id.as_deref(), Some("cat-pack"));
}

#[tokio::test]
async fn test_panel_is_cached_until_ttl_expires() {
    let store = seeded_store();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = service(Arc::clone(&store), clock.clone());

    let first = service.get().await;
    assert!(!first.from_cache);

    store.insert_category(stats("frogs", 1_000, 1), true);
    clock.advance(Duration::minutes(10));
    let cached = service.get().await;
    assert!(cached.from_cache);
    assert_eq!(cached.panel.categories.len(), 2);

    clock.advance(Duration::minutes(5));
    let refreshed = service.get().await;
    assert!(!refreshed.from_cache);
    assert_eq!(refreshed.panel.categories[0].id, "frogs");
}

#[tokio::test]
async fn test_clear_forces_recomputation() {
    let store = seeded_store();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = service(Arc::clone(&store), clock);

    service.get().await;
    store.insert_category(stats("frogs", 1_000, 1), true);
    service.clear();

    let response = service.get().await;
    assert!(!response.from_cache);
    assert_eq!(response.panel.categories.len(), 3);
}

#[tokio::test]
async fn test_empty_catalog_yields_empty_panel() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let response = service(Arc::new(InMemoryCatalogStore::new()), clock)
        .get()
        .await;
    assert!(response.panel.categories.is_empty());
    assert!(!response.from_cache);
}
