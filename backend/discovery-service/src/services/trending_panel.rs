//! Trending-search panel
//!
//! Top active categories ordered by search count then pack count, each with a
//! preview sticker. The computed panel is held for a fixed TTL; `clear()`
//! forces a recomputation on the next read.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::TrendingPanelConfig;
use crate::db::CatalogStore;
use crate::metrics;
use crate::models::{CategoryStats, StickerPreview};
use crate::utils::Clock;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingCategory {
    pub id: String,
    pub name: String,
    pub search_count: u64,
    pub pack_count: u64,
    pub preview: StickerPreview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingPanel {
    pub categories: Vec<TrendingCategory>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingPanelResponse {
    #[serde(flatten)]
    pub panel: TrendingPanel,
    pub from_cache: bool,
}

struct CachedPanel {
    panel: Arc<TrendingPanel>,
    cached_at: DateTime<Utc>,
}

/// Single-slot TTL cache
pub struct TrendingPanelCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<CachedPanel>>,
}

impl TrendingPanelCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: RwLock::new(None),
        }
    }

    /// Fresh value, if any
    pub fn get(&self) -> Option<Arc<TrendingPanel>> {
        let now = self.clock.now();
        self.slot
            .read()
            .as_ref()
            .filter(|cached| now - cached.cached_at < self.ttl)
            .map(|cached| Arc::clone(&cached.panel))
    }

    /// Value regardless of age
    pub fn get_stale(&self) -> Option<Arc<TrendingPanel>> {
        self.slot
            .read()
            .as_ref()
            .map(|cached| Arc::clone(&cached.panel))
    }

    pub fn set(&self, panel: Arc<TrendingPanel>) {
        *self.slot.write() = Some(CachedPanel {
            panel,
            cached_at: self.clock.now(),
        });
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }
}

pub struct TrendingPanelService {
    store: Arc<dyn CatalogStore>,
    cache: TrendingPanelCache,
    clock: Arc<dyn Clock>,
    size: usize,
    placeholder_url: String,
}

impl TrendingPanelService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        config: &TrendingPanelConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            cache: TrendingPanelCache::new(
                Duration::seconds(config.ttl_secs as i64),
                Arc::clone(&clock),
            ),
            clock,
            size: config.size,
            placeholder_url: config.placeholder_url.clone(),
        }
    }

    pub async fn get(&self) -> TrendingPanelResponse {
        if let Some(panel) = self.cache.get() {
            debug!("Trending panel cache hit");
            metrics::record_panel_cache(true);
            return TrendingPanelResponse {
                panel: (*panel).clone(),
                from_cache: true,
            };
        }
        metrics::record_panel_cache(false);

        match self.compute().await {
            Some(panel) => {
                info!(categories = panel.categories.len(), "Trending panel recomputed");
                self.cache.set(Arc::new(panel.clone()));
                TrendingPanelResponse {
                    panel,
                    from_cache: false,
                }
            }
            // serve the expired value rather than nothing
            None => match self.cache.get_stale() {
                Some(panel) => TrendingPanelResponse {
                    panel: (*panel).clone(),
                    from_cache: true,
                },
                None => TrendingPanelResponse {
                    panel: TrendingPanel {
                        categories: Vec::new(),
                        generated_at: self.clock.now(),
                    },
                    from_cache: false,
                },
            },
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
        info!("Trending panel cache cleared");
    }

    /// `None` when the category listing itself fails
    async fn compute(&self) -> Option<TrendingPanel> {
        let mut categories = match self.store.active_categories(self.size).await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(error = %e, "Failed to load active categories");
                return None;
            }
        };
        categories.sort_by(|a, b| {
            b.search_count
                .cmp(&a.search_count)
                .then(b.pack_count.cmp(&a.pack_count))
        });
        categories.truncate(self.size);

        let previews = join_all(categories.iter().map(|category| self.preview(category))).await;

        Some(TrendingPanel {
            categories: categories
                .into_iter()
                .zip(previews)
                .map(|(category, preview)| TrendingCategory {
                    id: category.id,
                    name: category.name,
                    search_count: category.search_count,
                    pack_count: category.pack_count,
                    preview,
                })
                .collect(),
            generated_at: self.clock.now(),
        })
    }

    async fn preview(&self, category: &CategoryStats) -> StickerPreview {
        match self.store.top_sticker_in_category(&category.id).await {
            Ok(Some(preview)) => preview,
            Ok(None) => StickerPreview::placeholder(&self.placeholder_url),
            Err(e) => {
                warn!(category_id = %category.id, error = %e, "Failed to load category preview");
                StickerPreview::placeholder(&self.placeholder_url)
            }
        }
    }
}
