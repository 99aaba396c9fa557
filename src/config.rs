use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{anilist as anilist_defaults, resolution as resolution_defaults};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub resolution: ResolutionConfig,

    pub anilist: AnilistConfig,

    pub sync: SyncConfig,

    pub watcher: WatcherConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `SQLite` connection string, `sqlite::memory:` for throwaway stores.
    pub database_path: String,

    pub log_level: String,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    pub event_bus_buffer_size: usize,

    /// Tokio worker threads, 0 lets the runtime decide.
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:shiori.db".to_string(),
            log_level: "info".to_string(),
            suppress_connection_errors: true,
            event_bus_buffer_size: 100,
            worker_threads: 0,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

/// Tunables of the absolute-to-season episode resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Episode count assumed for seasons whose length is unknown (airing shows).
    pub fallback_episode_count: u32,

    /// An absolute episode above this, together with a season hint of 2 or
    /// more, triggers resolution even if the matched season has no known total.
    pub absolute_episode_threshold: u32,

    /// Upper bound on relation lookups during one timeline walk.
    pub max_relation_steps: usize,

    pub search_result_limit: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            fallback_episode_count: resolution_defaults::FALLBACK_EPISODE_COUNT,
            absolute_episode_threshold: resolution_defaults::ABSOLUTE_EPISODE_THRESHOLD,
            max_relation_steps: resolution_defaults::MAX_RELATION_STEPS,
            search_result_limit: resolution_defaults::SEARCH_RESULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnilistConfig {
    pub api_url: String,

    /// `OAuth` token, required for list updates and library import.
    pub access_token: Option<String>,

    pub request_timeout_seconds: u64,

    pub cache_ttl_seconds: u64,

    pub min_request_interval_ms: u64,

    pub max_retries: u32,

    pub retry_base_delay_ms: u64,
}

impl Default for AnilistConfig {
    fn default() -> Self {
        Self {
            api_url: anilist_defaults::API_URL.to_string(),
            access_token: None,
            request_timeout_seconds: 30,
            cache_ttl_seconds: anilist_defaults::CACHE_TTL_SECONDS,
            min_request_interval_ms: anilist_defaults::MIN_REQUEST_INTERVAL_MS,
            max_retries: anilist_defaults::MAX_RETRIES,
            retry_base_delay_ms: anilist_defaults::RETRY_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Push local progress changes to the remote list.
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub enabled: bool,

    pub poll_interval_seconds: u64,

    /// Process image names (without `.exe`) treated as media players.
    pub players: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: 10,
            players: [
                "vlc",
                "mpv",
                "mpc-hc",
                "mpc-hc64",
                "mpc-be",
                "mpc-be64",
                "potplayer",
                "potplayermini",
                "potplayermini64",
                "kodi",
                "wmplayer",
                "kmplayer",
                "gom",
                "plex",
                "ffplay",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub bind: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1".to_string(),
            port: 35847,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            resolution: ResolutionConfig::default(),
            anilist: AnilistConfig::default(),
            sync: SyncConfig::default(),
            watcher: WatcherConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("shiori").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".shiori").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution.fallback_episode_count == 0 {
            anyhow::bail!("resolution.fallback_episode_count must be > 0");
        }

        if self.resolution.max_relation_steps == 0 {
            anyhow::bail!("resolution.max_relation_steps must be > 0");
        }

        if self.anilist.api_url.is_empty() {
            anyhow::bail!("anilist.api_url cannot be empty");
        }

        if self.watcher.enabled && self.watcher.poll_interval_seconds == 0 {
            anyhow::bail!("watcher.poll_interval_seconds must be > 0 when the watcher is enabled");
        }

        if self.sync.enabled && self.anilist.access_token.is_none() {
            anyhow::bail!("sync.enabled requires anilist.access_token");
        }

        if self.general.event_bus_buffer_size == 0 {
            anyhow::bail!("general.event_bus_buffer_size must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.resolution.fallback_episode_count, 25);
        assert_eq!(config.resolution.absolute_episode_threshold, 24);
        assert_eq!(config.server.port, 35847);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.watcher.poll_interval_seconds, 10);
        assert!(config.watcher.players.iter().any(|p| p == "mpv"));
        assert_eq!(config.anilist.cache_ttl_seconds, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[resolution]"));
        assert!(toml_str.contains("[watcher]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [resolution]
            absolute_episode_threshold = 26
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.resolution.absolute_episode_threshold, 26);

        assert_eq!(config.resolution.fallback_episode_count, 25);
        assert_eq!(config.anilist.api_url, "https://graphql.anilist.co");
    }

    #[test]
    fn test_validate_rejects_sync_without_token() {
        let mut config = Config::default();
        config.sync.enabled = true;
        assert!(config.validate().is_err());

        config.anilist.access_token = Some("token".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_fallback() {
        let mut config = Config::default();
        config.resolution.fallback_episode_count = 0;
        assert!(config.validate().is_err());
    }
}
