use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::middleware::OptionalViewer;
use crate::models::{FeedFilters, PackView, PageRequest, ViewerContext};
use crate::services::{FeedComposer, FeedRequest};

/// Query parameters shared by every feed endpoint
#[derive(Debug, Default, Deserialize)]
pub struct FeedQueryParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub category_id: Option<String>,
    pub animated: Option<bool>,
    /// Comma-separated pack ids the viewer hid
    pub exclude_ids: Option<String>,
    /// Comma-separated pack ids already shown in this session
    pub shown_ids: Option<String>,
}

fn parse_id_list(raw: Option<&str>) -> HashSet<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

impl FeedQueryParams {
    fn into_request(self, viewer_id: Option<String>, state: &FeedHandlerState) -> FeedRequest {
        let viewer = ViewerContext {
            viewer_id,
            hidden_ids: parse_id_list(self.exclude_ids.as_deref()),
            shown_ids: parse_id_list(self.shown_ids.as_deref()),
            own_ids: HashSet::new(),
        };
        let category_id = self.category_id.filter(|id| !id.trim().is_empty());

        FeedRequest {
            viewer,
            filters: FeedFilters {
                category_id,
                animated: self.animated,
            },
            page: PageRequest::new(
                self.page.unwrap_or(1),
                self.limit.unwrap_or(state.default_page_size),
                state.max_page_size,
            ),
        }
    }
}

pub struct FeedHandlerState {
    pub composer: Arc<FeedComposer>,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub packs: Vec<PackView>,
    pub count: usize,
}

/// GET /api/v1/feed/home
#[get("/home")]
pub async fn get_home_feed(
    query: web::Query<FeedQueryParams>,
    viewer: OptionalViewer,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let request = query.into_inner().into_request(viewer.into_inner(), &state);
    debug!(viewer_id = ?request.viewer.viewer_id, page = request.page.page, "Home feed request");

    let feed = state.composer.home(request).await;
    Ok(HttpResponse::Ok().json(feed))
}

/// GET /api/v1/feed/recommended
#[get("/recommended")]
pub async fn get_recommended(
    query: web::Query<FeedQueryParams>,
    viewer: OptionalViewer,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let request = query.into_inner().into_request(viewer.into_inner(), &state);
    let section = state.composer.recommended(request).await;

    Ok(HttpResponse::Ok().json(SectionResponse {
        count: section.packs.len(),
        packs: section.packs,
    }))
}

/// GET /api/v1/feed/trending
#[get("/trending")]
pub async fn get_trending(
    query: web::Query<FeedQueryParams>,
    viewer: OptionalViewer,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let request = query.into_inner().into_request(viewer.into_inner(), &state);
    let section = state.composer.trending(request).await;

    Ok(HttpResponse::Ok().json(SectionResponse {
        count: section.packs.len(),
        packs: section.packs,
    }))
}

/// GET /api/v1/feed/suggested
#[get("/suggested")]
pub async fn get_suggested(
    query: web::Query<FeedQueryParams>,
    viewer: OptionalViewer,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let request = query.into_inner().into_request(viewer.into_inner(), &state);
    let page = state.composer.suggested(request).await;
    Ok(HttpResponse::Ok().json(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        let ids = parse_id_list(Some("a, b,,c ,"));
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("b"));
        assert!(parse_id_list(None).is_empty());
    }
}
