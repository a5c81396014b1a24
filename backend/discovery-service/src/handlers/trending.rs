/// Trending-search panel handlers
use actix_web::{get, post, web, HttpResponse};

use crate::error::Result;
use crate::services::TrendingPanelService;

/// GET /api/v1/trending/search-panel
#[get("/search-panel")]
pub async fn get_search_panel(service: web::Data<TrendingPanelService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.get().await))
}

/// POST /api/v1/trending/search-panel/clear
#[post("/search-panel/clear")]
pub async fn clear_search_panel(service: web::Data<TrendingPanelService>) -> Result<HttpResponse> {
    service.clear();
    Ok(HttpResponse::NoContent().finish())
}
