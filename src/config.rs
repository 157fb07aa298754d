use anyhow::Result;
use config::{Config, Environment, File};
use moka::future::Cache;
use sea_orm::Database;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::schemas::{AppState, CachedData};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://finhub.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Application settings.
///
/// Read from an optional `finhub.{toml,yaml,json}` file and `FINHUB__*`
/// environment variables, e.g. `FINHUB__CACHE__TTL_SECS=60`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    pub cache: CacheSettings,
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub max_capacity: u64,
    pub ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            cache: CacheSettings::default(),
            metrics_enabled: true,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_capacity: 1000,
            ttl_secs: 300,
        }
    }
}

impl Settings {
    /// Loads settings from `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings: Settings = Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("cache.max_capacity", 1000_i64)?
            .set_default("cache.ttl_secs", 300_i64)?
            .set_default("metrics_enabled", true)?
            .add_source(File::with_name("finhub").required(false))
            .add_source(Environment::with_prefix("FINHUB").separator("__"))
            .build()?
            .try_deserialize()?;

        debug!(?settings, "Loaded settings");
        Ok(settings)
    }

    /// Applies command line overrides on top of the loaded values.
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        self
    }
}

/// Builds the report cache. Entries can be invalidated by key prefix.
pub fn build_cache(settings: &CacheSettings) -> Cache<String, CachedData> {
    Cache::builder()
        .max_capacity(settings.max_capacity)
        .time_to_live(Duration::from_secs(settings.ttl_secs))
        .support_invalidation_closures()
        .build()
}

/// Initialize application state from the configured database URL
pub async fn initialize_app_state(settings: &Settings) -> Result<AppState> {
    initialize_app_state_with_url(&settings.database_url, settings).await
}

/// Initialize application state for an explicit database URL
pub async fn initialize_app_state_with_url(database_url: &str, settings: &Settings) -> Result<AppState> {
    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    let cache = build_cache(&settings.cache);

    Ok(AppState { db, cache })
}
