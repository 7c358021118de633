use anyhow::{bail, Result};
use moka::future::Cache;
use moka::notification::RemovalCause;
use sea_orm::Database;
use serde::Deserialize;
use std::{path::Path, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::cache::TranscriptCache;
use crate::schemas::AppState;

/// Placeholder secret shipped in the defaults; never accepted by `serve`.
pub const DEFAULT_JWT_SECRET: &str = "change-me";

/// Shortest session-token secret the server starts with.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Runtime settings, layered from defaults, an optional TOML file and
/// `REGISTRAR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    /// HMAC secret for session tokens
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Where generated Form 137 copies are written
    pub transcript_dir: String,
    /// Lifetime of cached rendered transcripts
    pub cache_ttl_secs: u64,
    /// Printed at the top of every transcript
    pub school_name: String,
    /// Logged-out tokens remembered until they expire. Once full, the
    /// oldest entries are evicted and those tokens verify again.
    pub revoked_token_capacity: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://registrar.db?mode=rwc".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_minutes: 60 * 12,
            transcript_dir: "transcripts".to_string(),
            cache_ttl_secs: 300,
            school_name: "Senior High School".to_string(),
            revoked_token_capacity: 100_000,
        }
    }
}

impl AppConfig {
    /// Loads the configuration; `path` replaces the default `registrar.toml`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = AppConfig::default();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("registrar").required(false),
        };

        let settings = config::Config::builder()
            .set_default("database_url", defaults.database_url)?
            .set_default("bind_address", defaults.bind_address)?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("token_ttl_minutes", defaults.token_ttl_minutes)?
            .set_default("transcript_dir", defaults.transcript_dir)?
            .set_default("cache_ttl_secs", defaults.cache_ttl_secs)?
            .set_default("school_name", defaults.school_name)?
            .set_default("revoked_token_capacity", defaults.revoked_token_capacity)?
            .add_source(file)
            .add_source(config::Environment::with_prefix("REGISTRAR"))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        debug!(
            "Configuration loaded: bind_address={}, transcript_dir={}",
            config.bind_address, config.transcript_dir
        );
        Ok(config)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_minutes.max(1) as u64 * 60)
    }

    /// Refuses the shipped placeholder secret and secrets too short to resist
    /// brute force.
    pub fn ensure_secure_secret(&self) -> Result<()> {
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            bail!("jwt_secret is the built-in placeholder; set REGISTRAR_JWT_SECRET");
        }
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!(
                "jwt_secret must be at least {} bytes long, got {}",
                MIN_JWT_SECRET_LEN,
                self.jwt_secret.len()
            );
        }
        Ok(())
    }
}

/// Connects to the database and builds the shared application state
pub async fn initialize_app_state_with_url(config: AppConfig) -> Result<AppState> {
    info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;
    Ok(build_app_state(db, config))
}

/// Builds application state around an existing connection
pub fn build_app_state(db: sea_orm::DatabaseConnection, config: AppConfig) -> AppState {
    // Rendered transcripts, invalidated on every grade write
    let cache = TranscriptCache::new(1000, Duration::from_secs(config.cache_ttl_secs));

    let revoked_tokens = Cache::builder()
        .max_capacity(config.revoked_token_capacity)
        .time_to_live(config.token_ttl())
        .eviction_listener(|_token, _, cause| {
            if matches!(cause, RemovalCause::Size) {
                warn!("Revoked-token cache is full; a logged-out token was evicted before expiry");
            }
        })
        .build();

    AppState {
        db,
        cache,
        revoked_tokens,
        renderer: Arc::new(compute::default_renderer()),
        config: Arc::new(config),
    }
}
