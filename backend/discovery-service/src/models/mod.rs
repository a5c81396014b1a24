//! Domain models shared by the ranking engine, the storage adapters and the HTTP layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Engagement counters maintained by the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub downloads: u64,
    pub views: u64,
    pub favorites: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityFlags {
    pub is_private: bool,
    pub is_authorized: bool,
}

impl VisibilityFlags {
    pub fn public() -> Self {
        Self {
            is_private: false,
            is_authorized: true,
        }
    }

    /// Public and approved by moderation
    pub fn is_presentable(&self) -> bool {
        !self.is_private && self.is_authorized
    }
}

/// A sticker pack eligible for ranking. Read-only input owned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub id: String,
    pub creator_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub is_animated: bool,
    #[serde(default)]
    pub sticker_count: u32,
    #[serde(default)]
    pub tray_image_url: Option<String>,
    pub engagement: EngagementCounters,
    pub visibility: VisibilityFlags,
}

/// Who is asking, and what must never be shown to them
#[derive(Debug, Clone, Default)]
pub struct ViewerContext {
    pub viewer_id: Option<String>,
    /// Explicitly hidden by the caller (`exclude_ids`)
    pub hidden_ids: HashSet<String>,
    /// Already shown earlier in this session
    pub shown_ids: HashSet<String>,
    /// Packs the viewer owns according to the interaction history
    pub own_ids: HashSet<String>,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_viewer(viewer_id: impl Into<String>) -> Self {
        Self {
            viewer_id: Some(viewer_id.into()),
            ..Self::default()
        }
    }

    pub fn is_excluded(&self, pack_id: &str) -> bool {
        self.hidden_ids.contains(pack_id)
            || self.shown_ids.contains(pack_id)
            || self.own_ids.contains(pack_id)
    }

    /// Whether the viewer created a pack by `creator_id`
    pub fn owns(&self, creator_id: &str) -> bool {
        self.viewer_id.as_deref() == Some(creator_id)
    }

    /// Union of every exclusion set
    pub fn excluded_ids(&self) -> HashSet<String> {
        self.hidden_ids
            .iter()
            .chain(self.shown_ids.iter())
            .chain(self.own_ids.iter())
            .cloned()
            .collect()
    }
}

/// Optional narrowing requested by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilters {
    pub category_id: Option<String>,
    pub animated: Option<bool>,
}

/// Highest page number a request may ask for
pub const MAX_PAGE: usize = 10_000;

/// Page request for the suggested section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    /// Clamps `page` to `[1, MAX_PAGE]` and `limit` to `[1, max_limit]`
    pub fn new(page: usize, limit: usize, max_limit: usize) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            limit: limit.clamp(1, max_limit.max(1)),
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: PageRequest, total_items: u64) -> Self {
        let total_pages = (total_items as usize).div_ceil(page.limit);
        Self {
            current_page: page.page,
            page_size: page.limit,
            total_pages,
            total_items,
            has_next_page: page.page < total_pages,
            has_prev_page: page.page > 1,
        }
    }
}

/// Presentation model of a pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackView {
    pub id: String,
    pub name: String,
    pub creator_id: String,
    pub category_ids: Vec<String>,
    pub is_animated: bool,
    pub sticker_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tray_image_url: Option<String>,
    pub downloads: u64,
    pub views: u64,
    pub favorites: u64,
    pub created_at: DateTime<Utc>,
    pub is_owner: bool,
}

/// Projection of a pack the viewer owns or favorited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackSummary {
    pub id: String,
    pub creator_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_ids: Vec<String>,
    pub is_animated: bool,
}

/// Projection of a favorited sticker; categories come from its pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickerSummary {
    pub id: String,
    pub pack_id: String,
    pub category_ids: Vec<String>,
    pub is_animated: bool,
}

/// Bounded slice of a viewer's history used to infer preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionHistory {
    pub owned_packs: Vec<PackSummary>,
    pub favorite_packs: Vec<PackSummary>,
    pub favorite_stickers: Vec<StickerSummary>,
}

impl InteractionHistory {
    pub fn is_empty(&self) -> bool {
        self.owned_packs.is_empty()
            && self.favorite_packs.is_empty()
            && self.favorite_stickers.is_empty()
    }
}

/// Category with the counters the trending panel orders by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub id: String,
    pub name: String,
    pub search_count: u64,
    pub pack_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerPreview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_id: Option<String>,
    pub image_url: String,
    pub is_placeholder: bool,
}

impl StickerPreview {
    pub fn placeholder(image_url: impl Into<String>) -> Self {
        Self {
            sticker_id: None,
            pack_id: None,
            image_url: image_url.into(),
            is_placeholder: true,
        }
    }
}
