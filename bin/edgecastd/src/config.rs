use std::{path::Path, time::Duration};

use edgecast::{CacheSettings, DeliveryProtocol, GatewaySettings, StreamSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub seamless_switching: SeamlessSwitchingConfig,
    pub cdn: CdnConfig,
    pub server: ServerConfig,
    pub streams: Vec<StreamConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_total_size: usize,
    pub max_segments_per_stream: usize,
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30,
            max_total_size: 512 * 1024 * 1024,
            max_segments_per_stream: 30,
            sweep_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SeamlessSwitchingConfig {
    /// Poll the CDN playlist and fall back to CDN segments
    pub enabled: bool,
    pub truncate_cdn_playlist_segments: usize,
    pub poll_interval_ms: u64,
    pub pending_file_ttl_secs: u64,
}

impl Default for SeamlessSwitchingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            truncate_cdn_playlist_segments: 2,
            poll_interval_ms: 1000,
            pending_file_ttl_secs: 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    pub timeout_secs: u64,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self { timeout_secs: 5 }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Accept broadcast files over `PUT /ingest/...`
    pub ingest: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3020".to_string(),
            ingest: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    pub cdn_endpoint: String,
    #[serde(default = "default_protocol")]
    pub protocol: DeliveryProtocol,
    #[serde(default)]
    pub mpd_time_offset_ms: i64,
}

fn default_protocol() -> DeliveryProtocol {
    DeliveryProtocol::Hls
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)?;
        let config = toml::from_str(&data)?;
        Ok(config)
    }

    pub fn cdn_timeout(&self) -> Duration {
        Duration::from_secs(self.cdn.timeout_secs)
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            cache: CacheSettings {
                ttl: Duration::from_secs(self.cache.ttl_secs),
                max_total_size: self.cache.max_total_size,
            },
            stream: StreamSettings {
                segments_to_keep: self.cache.max_segments_per_stream,
                truncate_cdn_playlist_segments: self
                    .seamless_switching
                    .truncate_cdn_playlist_segments,
                pending_file_ttl: Duration::from_secs(
                    self.seamless_switching.pending_file_ttl_secs,
                ),
                cdn_fallback: self.seamless_switching.enabled,
            },
            sweep_interval: Duration::from_millis(self.cache.sweep_interval_ms),
            tick_interval: Duration::from_millis(self.seamless_switching.poll_interval_ms),
        }
    }
}
