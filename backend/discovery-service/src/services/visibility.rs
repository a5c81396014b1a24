//! Eligibility predicate
//!
//! A pack may be shown only when it is public, approved by moderation and not
//! in any of the viewer's exclusion sets. The same predicate is pushed down to
//! the store as a [`PackQuery`] and re-checked here on whatever comes back.

use chrono::{DateTime, Utc};

use crate::db::PackQuery;
use crate::models::{CandidateItem, FeedFilters, ViewerContext};

#[derive(Debug, Clone, Default)]
pub struct VisibilityFilter {
    filters: FeedFilters,
}

impl VisibilityFilter {
    pub fn new(filters: FeedFilters) -> Self {
        Self { filters }
    }

    /// Same predicate with the animated narrowing dropped
    pub fn without_animated(&self) -> Self {
        Self {
            filters: FeedFilters {
                animated: None,
                ..self.filters.clone()
            },
        }
    }

    pub fn filters(&self) -> &FeedFilters {
        &self.filters
    }

    pub fn is_eligible(&self, item: &CandidateItem, viewer: &ViewerContext) -> bool {
        item.visibility.is_presentable()
            && !viewer.is_excluded(&item.id)
            && !viewer.owns(&item.creator_id)
            && self
                .filters
                .category_id
                .as_ref()
                .map_or(true, |category| item.category_ids.contains(category))
            && self
                .filters
                .animated
                .map_or(true, |animated| item.is_animated == animated)
    }

    pub fn apply(&self, items: Vec<CandidateItem>, viewer: &ViewerContext) -> Vec<CandidateItem> {
        items
            .into_iter()
            .filter(|item| self.is_eligible(item, viewer))
            .collect()
    }

    /// Storage form of the predicate, optionally bounded by a creation window
    pub fn to_query(
        &self,
        viewer: &ViewerContext,
        created_after: Option<DateTime<Utc>>,
    ) -> PackQuery {
        PackQuery {
            exclude_ids: viewer.excluded_ids(),
            exclude_creator_id: viewer.viewer_id.clone(),
            category_id: self.filters.category_id.clone(),
            animated: self.filters.animated,
            ..PackQuery::default()
        }
        .with_window(created_after)
    }
}
