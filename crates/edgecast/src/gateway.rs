use std::{collections::BTreeMap, sync::Arc, time::Duration};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::{
    cache::{CacheSettings, CacheStore},
    error::EdgeResult,
    file::BroadcastFile,
    stream::{
        ContentStream, DashStream, DeliveryProtocol, SeamlessStream, Stream, StreamSettings,
        StreamStatus,
    },
    util::{http::HttpClient, path::PlaylistLocation},
};

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub cache: CacheSettings,
    pub stream: StreamSettings,
    /// Period of the cache sweep
    pub sweep_interval: Duration,
    /// Period of the per-stream tick (CDN poll, pending file expiry)
    pub tick_interval: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            stream: StreamSettings::default(),
            sweep_interval: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub streams: BTreeMap<String, StreamStatus>,
    pub cache_items: usize,
    pub cache_size: usize,
}

#[derive(Default)]
struct Tasks {
    started: bool,
    sweeper: Option<JoinHandle<()>>,
    /// One ticker per stream, keyed like the stream registry
    tickers: BTreeMap<String, JoinHandle<()>>,
}

/// Owns the shared cache and every stream, and drives their timers.
pub struct Gateway {
    settings: GatewaySettings,
    cache: Arc<CacheStore>,
    http: HttpClient,

    streams: RwLock<BTreeMap<String, Arc<Stream>>>,
    tasks: Mutex<Tasks>,
}

impl Gateway {
    pub fn new(settings: GatewaySettings, http: HttpClient) -> Self {
        Self {
            cache: Arc::new(CacheStore::new(settings.cache.clone())),
            settings,
            http,
            streams: RwLock::new(BTreeMap::new()),
            tasks: Mutex::new(Tasks::default()),
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn stream(&self, name: &str) -> Option<Arc<Stream>> {
        self.streams.read().get(name).cloned()
    }

    /// Create a stream bound to `cdn_endpoint` and register it as `name`.
    ///
    /// A stream registered under an existing name replaces the old one: its
    /// ticker is stopped and its cache entries are removed.
    pub fn add_stream(
        &self,
        name: impl Into<String>,
        cdn_endpoint: &str,
        protocol: DeliveryProtocol,
        mpd_time_offset_ms: i64,
    ) -> EdgeResult<Arc<Stream>> {
        let name = name.into();
        // a bad endpoint must not cost the stream it would replace
        PlaylistLocation::from_endpoint(cdn_endpoint)?;

        let mut tasks = self.tasks.lock();
        if self.retire(&mut tasks, &name) {
            tracing::info!("Replacing stream {name}");
        }

        let stream = match protocol {
            DeliveryProtocol::Hls => Stream::Seamless(SeamlessStream::new(
                self.cache.clone(),
                self.http.clone(),
                self.settings.stream.clone(),
            )),
            DeliveryProtocol::Dash => {
                Stream::Dash(DashStream::new(self.cache.clone(), mpd_time_offset_ms))
            }
        };
        stream.set_cdn_endpoint(cdn_endpoint)?;
        let stream = Arc::new(stream);
        tracing::info!("Stream {name} ({protocol:?}) bound to {cdn_endpoint}");

        if tasks.started {
            let ticker = spawn_ticker(stream.clone(), self.settings.tick_interval);
            tasks.tickers.insert(name.clone(), ticker);
        }
        self.streams.write().insert(name, stream.clone());

        Ok(stream)
    }

    /// Unregister `name`, returns `false` when no such stream exists.
    pub fn remove_stream(&self, name: &str) -> bool {
        let mut tasks = self.tasks.lock();
        let removed = self.retire(&mut tasks, name);
        if removed {
            tracing::info!("Removed stream {name}");
        }
        removed
    }

    fn retire(&self, tasks: &mut Tasks, name: &str) -> bool {
        let Some(stream) = self.streams.write().remove(name) else {
            return false;
        };
        if let Some(ticker) = tasks.tickers.remove(name) {
            ticker.abort();
        }
        // a tick already in flight may still finish, closing turns it into a no-op
        stream.close();
        true
    }

    /// Route a broadcast file to the stream whose playlist directory is the
    /// longest prefix of its location.
    ///
    /// Returns `false` when no stream claims the file.
    pub fn deliver(&self, file: BroadcastFile) -> EdgeResult<bool> {
        let target = {
            let streams = self.streams.read();
            streams
                .iter()
                .filter_map(|(name, stream)| {
                    let dir = stream.location()?.dir;
                    file.content_location
                        .starts_with(&dir)
                        .then(|| (dir.len(), name.clone(), stream.clone()))
                })
                .max_by_key(|(len, _, _)| *len)
        };

        let Some((_, name, stream)) = target else {
            tracing::warn!("No stream for broadcast file {}", file.content_location);
            return Ok(false);
        };

        tracing::debug!("Delivering {} to stream {name}", file.content_location);
        stream.on_file_received(file)?;
        Ok(true)
    }

    /// Start the cache sweep and one fixed-rate tick per stream.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.started {
            return;
        }
        tasks.started = true;

        tasks.sweeper = Some(
            self.cache
                .clone()
                .spawn_sweeper(self.settings.sweep_interval),
        );
        for (name, stream) in self.streams.read().iter() {
            let ticker = spawn_ticker(stream.clone(), self.settings.tick_interval);
            tasks.tickers.insert(name.clone(), ticker);
        }
    }

    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock();
        if let Some(sweeper) = tasks.sweeper.take() {
            sweeper.abort();
        }
        for (_, ticker) in std::mem::take(&mut tasks.tickers) {
            ticker.abort();
        }
        tasks.started = false;
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            streams: self
                .streams
                .read()
                .iter()
                .map(|(name, stream)| (name.clone(), stream.status()))
                .collect(),
            cache_items: self.cache.len(),
            cache_size: self.cache.total_size(),
        }
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fixed-rate tick: every run is spawned, so a slow CDN never delays the next one.
fn spawn_ticker(stream: Arc<Stream>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let stream = stream.clone();
            tokio::spawn(async move { stream.tick().await });
        }
    })
}
