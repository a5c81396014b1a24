use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use discovery_service::config::Config;
use discovery_service::db::{CatalogStore, PgCatalogStore};
use discovery_service::handlers::{self, FeedHandlerState};
use discovery_service::middleware::{IdentityResolver, JwtIdentityResolver};
use discovery_service::services::{
    FeedComposer, RngWeightSampler, TrendingPanelService, WeightSampler,
};
use discovery_service::utils::{Clock, SystemClock};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over LOG_LEVEL
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "{},actix_web=info",
                    config.app.log_level
                ))
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    tracing::info!("Starting discovery-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    let identity: Arc<dyn IdentityResolver> =
        match JwtIdentityResolver::from_config(&config.auth) {
            Ok(resolver) => Arc::new(resolver),
            Err(e) => {
                tracing::error!("Failed to initialize identity resolver: {}", e);
                eprintln!("ERROR: Failed to initialize identity resolver: {}", e);
                std::process::exit(1);
            }
        };
    if config.auth.jwt_public_key_pem.is_none() && config.auth.jwt_secret.is_none() {
        tracing::warn!("No JWT key configured, every request browses anonymously");
    }

    let sampler: Arc<dyn WeightSampler> = match config.engine.rng_seed {
        Some(seed) => {
            tracing::info!(seed, "Using seeded weight sampler");
            Arc::new(RngWeightSampler::seeded(seed))
        }
        None => Arc::new(RngWeightSampler::from_entropy()),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn CatalogStore> = Arc::new(PgCatalogStore::new(pool));

    let composer = Arc::new(FeedComposer::from_config(
        Arc::clone(&store),
        &config.engine,
        sampler,
        Arc::clone(&clock),
    ));
    let feed_state = web::Data::new(FeedHandlerState {
        composer,
        default_page_size: config.engine.default_page_size,
        max_page_size: config.engine.max_page_size,
    });
    let panel = web::Data::new(TrendingPanelService::new(
        store,
        &config.trending_panel,
        clock,
    ));
    let identity = web::Data::from(identity);

    tracing::info!(
        port = config.app.port,
        preference_cache_capacity = config.engine.preference_cache_capacity,
        "HTTP server starting"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(feed_state.clone())
            .app_data(panel.clone())
            .app_data(identity.clone())
            .configure(handlers::configure)
    })
    .bind(format!("0.0.0.0:{}", config.app.port))?
    .run()
    .await
}
