pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};

// Re-export the ranking engine
pub use services::{
    FallbackTier, FeedComposer, FeedRequest, HomeFeed, InteractionProfile, SuggestedPage,
    TrendingPanelService,
};
