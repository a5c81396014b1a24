pub mod feed;
pub mod trending;

pub use feed::{
    get_home_feed, get_recommended, get_suggested, get_trending, FeedHandlerState,
    FeedQueryParams, SectionResponse,
};
pub use trending::{clear_search_panel, get_search_panel};

use actix_web::{web, HttpResponse};

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// Registers every route; state is expected as app data
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics))
        .service(
            web::scope("/api/v1/feed")
                .service(get_home_feed)
                .service(get_recommended)
                .service(get_trending)
                .service(get_suggested),
        )
        .service(
            web::scope("/api/v1/trending")
                .service(get_search_panel)
                .service(clear_search_panel),
        );
}
