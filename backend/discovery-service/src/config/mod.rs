use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub trending_panel: TrendingPanelConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Tuning knobs for the ranking engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Max number of viewer profiles kept in the LRU preference cache
    #[serde(default = "default_preference_cache_capacity")]
    pub preference_cache_capacity: usize,
    /// Candidates fetched per scored fallback tier
    #[serde(default = "default_candidate_pool_size")]
    pub candidate_pool_size: usize,
    /// Max owned/favorited items read per interaction type when building a profile
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Fixed RNG seed; unset means entropy-seeded
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preference_cache_capacity: default_preference_cache_capacity(),
            candidate_pool_size: default_candidate_pool_size(),
            history_limit: default_history_limit(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingPanelConfig {
    #[serde(default = "default_panel_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_panel_size")]
    pub size: usize,
    #[serde(default = "default_placeholder_url")]
    pub placeholder_url: String,
}

impl Default for TrendingPanelConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_panel_ttl_secs(),
            size: default_panel_size(),
            placeholder_url: default_placeholder_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// RS256 public key; takes precedence over `jwt_secret`
    #[serde(default)]
    pub jwt_public_key_pem: Option<String>,
    /// HS256 shared secret
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
            engine: EngineConfig {
                preference_cache_capacity: parse_or(
                    "PREFERENCE_CACHE_CAPACITY",
                    default_preference_cache_capacity,
                )?,
                candidate_pool_size: parse_or(
                    "CANDIDATE_POOL_SIZE",
                    default_candidate_pool_size,
                )?,
                history_limit: parse_or("INTERACTION_HISTORY_LIMIT", default_history_limit)?,
                default_page_size: parse_or("DEFAULT_PAGE_SIZE", default_page_size)?,
                max_page_size: parse_or("MAX_PAGE_SIZE", default_max_page_size)?,
                rng_seed: match std::env::var("RNG_SEED") {
                    Ok(seed) => Some(seed.parse()?),
                    Err(_) => None,
                },
            },
            trending_panel: TrendingPanelConfig {
                ttl_secs: parse_or("TRENDING_PANEL_TTL_SECS", default_panel_ttl_secs)?,
                size: parse_or("TRENDING_PANEL_SIZE", default_panel_size)?,
                placeholder_url: std::env::var("TRENDING_PANEL_PLACEHOLDER_URL")
                    .unwrap_or_else(|_| default_placeholder_url()),
            },
            auth: AuthConfig {
                jwt_public_key_pem: std::env::var("JWT_PUBLIC_KEY_PEM").ok(),
                jwt_secret: std::env::var("JWT_SECRET").ok(),
            },
        })
    }
}

fn parse_or<T>(key: &str, default: fn() -> T) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.parse()?),
        Err(_) => Ok(default()),
    }
}

fn default_preference_cache_capacity() -> usize {
    1000
}

fn default_candidate_pool_size() -> usize {
    200
}

fn default_history_limit() -> usize {
    50
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    50
}

fn default_panel_ttl_secs() -> u64 {
    15 * 60
}

fn default_panel_size() -> usize {
    10
}

fn default_placeholder_url() -> String {
    "/static/stickers/placeholder.webp".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.preference_cache_capacity, 1000);
        assert_eq!(engine.default_page_size, 20);
        assert!(engine.rng_seed.is_none());
    }

    #[test]
    fn test_panel_ttl_is_fifteen_minutes() {
        assert_eq!(TrendingPanelConfig::default().ttl_secs, 900);
    }

    #[test]
    fn test_parse_or_falls_back_when_unset() {
        let value: usize = parse_or("DISCOVERY_TEST_UNSET_KEY", || 7).unwrap();
        assert_eq!(value, 7);
    }
}
