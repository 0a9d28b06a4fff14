use std::{collections::BTreeMap, sync::Arc, time::Duration};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::{
    cache::{CacheStore, ItemContent},
    cdn::CdnClient,
    error::EdgeResult,
    file::BroadcastFile,
    playlist::{HlsPlaylist, PlaylistEntry},
    segment::{ItemSource, Segment},
    util::{http::HttpClient, path::PlaylistLocation},
};

use super::{classify, ContentStream, DeliveryProtocol, FileKind, PendingFiles, StreamStatus};

#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Maximum number of segments in the window
    pub segments_to_keep: usize,
    /// Newest entries of every CDN playlist that are ignored
    pub truncate_cdn_playlist_segments: usize,
    /// Unclaimed broadcast files are dropped after this long
    pub pending_file_ttl: Duration,
    /// Poll the CDN and fetch missing segments from it
    pub cdn_fallback: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            segments_to_keep: 30,
            truncate_cdn_playlist_segments: 2,
            pending_file_ttl: Duration::from_secs(60),
            cdn_fallback: false,
        }
    }
}

#[derive(Default)]
struct StreamState {
    location: Option<PlaylistLocation>,
    cdn: Option<CdnClient>,

    segments: BTreeMap<u64, Arc<Segment>>,
    pending: PendingFiles,

    broadcast_target_duration: Option<u64>,
    cdn_target_duration: Option<u64>,

    closed: bool,
}

impl StreamState {
    fn target_duration(&self) -> u64 {
        let longest = self
            .segments
            .values()
            .map(|s| s.duration().ceil() as u64)
            .max()
            .unwrap_or(0);
        [self.broadcast_target_duration, self.cdn_target_duration]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(0)
            .max(longest)
    }
}

/// HLS stream that merges the broadcast playlist with the CDN playlist.
///
/// ```text
///   broadcast files ──► on_file_received ──┐
///                                          ├──► merge ──► window ──► cache
///   tick ──► CDN playlist ─────────────────┘
/// ```
///
/// A sequence number is owned by whichever source reports it first, later
/// reports of the same number are ignored. The window keeps the newest
/// `segments_to_keep` segments.
pub struct SeamlessStream {
    settings: StreamSettings,
    cache: Arc<CacheStore>,
    http: HttpClient,

    state: Mutex<StreamState>,
    playlist: Arc<RwLock<Bytes>>,
}

impl SeamlessStream {
    pub fn new(cache: Arc<CacheStore>, http: HttpClient, settings: StreamSettings) -> Self {
        Self {
            settings,
            cache,
            http,
            state: Mutex::new(StreamState::default()),
            playlist: Arc::new(RwLock::new(Bytes::new())),
        }
    }

    /// The synthesized playlist as last published.
    pub fn playlist(&self) -> Bytes {
        self.playlist.read().clone()
    }

    pub fn segment(&self, sequence: u64) -> Option<Arc<Segment>> {
        self.state.lock().segments.get(&sequence).cloned()
    }

    pub fn window(&self) -> Vec<u64> {
        self.state.lock().segments.keys().copied().collect()
    }

    pub fn pending_files(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Merge a playlist from either source into the window and republish it.
    ///
    /// A playlist that fails to parse leaves the window untouched.
    pub fn merge(&self, content: &[u8], source: ItemSource) -> EdgeResult<()> {
        let playlist = HlsPlaylist::parse(content)?;

        let total = playlist.segments().len();
        let count = match source {
            ItemSource::Broadcast => total,
            ItemSource::Cdn => total.saturating_sub(self.settings.truncate_cdn_playlist_segments),
        };

        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        match source {
            ItemSource::Broadcast => {
                state.broadcast_target_duration = Some(playlist.target_duration())
            }
            ItemSource::Cdn => state.cdn_target_duration = Some(playlist.target_duration()),
        }

        // segments still listed stay servable for as long as they are in the window
        for segment in state.segments.values() {
            if !self.cache.touch(segment.uri()) {
                tracing::debug!("Restoring swept cache item at {}", segment.uri());
                self.cache.add(segment.uri(), ItemContent::Lazy(segment.clone()));
            }
        }

        let mut added = 0;
        for entry in playlist.segments().iter().take(count) {
            tracing::debug!(
                "Playlist entry {} ({}s) at {}",
                entry.sequence,
                entry.duration,
                entry.uri
            );
            if state.segments.contains_key(&entry.sequence) {
                continue;
            }

            let uri = match &state.location {
                Some(location) => location.resolve(&entry.uri),
                None => entry.uri.clone(),
            };
            let mut segment = Segment::new(uri.clone(), entry.sequence, entry.duration);
            if let Some(cdn) = &state.cdn {
                segment = segment.with_cdn(cdn.clone());
            }
            if let Some(file) = state.pending.claim(&uri) {
                tracing::debug!("Claimed pending broadcast file {uri}");
                segment.set_broadcast_content(file.buffer);
            }

            let segment = Arc::new(segment);
            state.segments.insert(entry.sequence, segment.clone());
            self.cache.add(uri, ItemContent::Lazy(segment));
            added += 1;
        }

        while state.segments.len() > self.settings.segments_to_keep {
            let Some((_, segment)) = state.segments.pop_first() else {
                break;
            };
            tracing::debug!("Evicting segment {} at {}", segment.sequence(), segment.uri());
            self.cache.remove(segment.uri());
        }

        let mut synthesized = HlsPlaylist::new(state.target_duration());
        for segment in state.segments.values() {
            synthesized.add_segment(PlaylistEntry {
                uri: format!("/{}", segment.uri()),
                sequence: segment.sequence(),
                duration: segment.duration(),
            });
        }
        *self.playlist.write() = synthesized.to_bytes()?;
        if let Some(location) = &state.location {
            self.publish_playlist(&location.path);
        }

        tracing::debug!(
            "Merged {source:?} playlist: {added} new segment(s), window {:?}..{:?}",
            state.segments.keys().next(),
            state.segments.keys().next_back()
        );
        Ok(())
    }

    /// (Re)publish the live playlist entry, its content follows every merge.
    fn publish_playlist(&self, path: &str) {
        let playlist = self.playlist.clone();
        self.cache
            .add(path, ItemContent::live(move || playlist.read().clone()));
    }

    fn ingest_segment(&self, file: BroadcastFile) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        let existing = state
            .segments
            .values()
            .find(|s| s.uri() == file.content_location)
            .cloned();
        match existing {
            Some(segment) => {
                tracing::debug!("Attaching broadcast file to segment {}", segment.uri());
                segment.set_broadcast_content(file.buffer);
            }
            None => state.pending.insert(file),
        }
    }

    /// Fetch the CDN playlist once and merge it.
    pub async fn poll_cdn(&self) -> EdgeResult<()> {
        let (cdn, path) = {
            let state = self.state.lock();
            match (&state.cdn, &state.location) {
                (Some(cdn), Some(location)) => (cdn.clone(), location.path.clone()),
                _ => return Ok(()),
            }
        };

        tracing::debug!("Polling CDN playlist at {path}");
        let body = cdn.fetch(&path).await?;
        self.merge(&body, ItemSource::Cdn)
    }

    pub fn expire_pending(&self) -> usize {
        self.state
            .lock()
            .pending
            .expire(self.settings.pending_file_ttl)
    }
}

impl ContentStream for SeamlessStream {
    fn set_cdn_endpoint(&self, endpoint: &str) -> EdgeResult<()> {
        let location = PlaylistLocation::from_endpoint(endpoint)?;
        tracing::debug!(
            "Playlist location is {}, segment dir is {}",
            location.path,
            location.dir
        );

        self.publish_playlist(&location.path);

        let mut state = self.state.lock();
        if self.settings.cdn_fallback {
            tracing::info!("Using CDN origin {}", location.origin);
            state.cdn = Some(CdnClient::new(self.http.clone(), location.origin.clone()));
        }
        state.location = Some(location);
        Ok(())
    }

    fn location(&self) -> Option<PlaylistLocation> {
        self.state.lock().location.clone()
    }

    fn on_file_received(&self, file: BroadcastFile) -> EdgeResult<()> {
        tracing::debug!(
            "Broadcast file {} (transfer {}, {}) received",
            file.content_location,
            file.transfer_id,
            file.content_type
        );

        let kind = classify(self.state.lock().location.as_ref(), &file);
        match kind {
            FileKind::Playlist => {
                tracing::info!("Got playlist at {}", file.content_location);
                self.merge(&file.buffer, ItemSource::Broadcast)
            }
            FileKind::Placeholder => Ok(()),
            FileKind::Segment => {
                tracing::info!("Got segment at {}", file.content_location);
                self.ingest_segment(file);
                Ok(())
            }
        }
    }

    async fn tick(&self) {
        let expired = self.expire_pending();
        if expired > 0 {
            tracing::debug!("Dropped {expired} unclaimed broadcast file(s)");
        }

        if let Err(e) = self.poll_cdn().await {
            tracing::warn!("Failed to merge CDN playlist: {e}");
        }
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.cdn = None;
        state.pending = PendingFiles::default();
        for (_, segment) in std::mem::take(&mut state.segments) {
            self.cache.remove(segment.uri());
        }
        if let Some(location) = &state.location {
            self.cache.remove(&location.path);
        }
    }

    fn status(&self) -> StreamStatus {
        let state = self.state.lock();
        StreamStatus {
            protocol: DeliveryProtocol::Hls,
            playlist_path: state.location.as_ref().map(|l| l.path.clone()),
            window: state.segments.keys().copied().collect(),
            pending_files: state.pending.len(),
        }
    }
}
