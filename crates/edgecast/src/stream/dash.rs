use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::{
    cache::CacheStore, error::EdgeResult, file::BroadcastFile, manifest::rewrite_mpd,
    util::path::PlaylistLocation,
};

use super::{classify, ContentStream, DeliveryProtocol, FileKind, StreamStatus};

const DASH_CONTENT_TYPE: &str = "application/dash+xml";

/// DASH stream published straight from broadcast, without reconciliation.
///
/// Manifests are rewritten for local serving, every other file is cached as
/// received and left to the cache sweep.
pub struct DashStream {
    cache: Arc<CacheStore>,
    time_offset_ms: i64,
    location: RwLock<Option<PlaylistLocation>>,
}

impl DashStream {
    pub fn new(cache: Arc<CacheStore>, time_offset_ms: i64) -> Self {
        Self {
            cache,
            time_offset_ms,
            location: RwLock::new(None),
        }
    }

    fn is_manifest(kind: FileKind, file: &BroadcastFile) -> bool {
        kind == FileKind::Playlist
            || file.content_type.eq_ignore_ascii_case(DASH_CONTENT_TYPE)
            || file
                .content_location
                .split('?')
                .next()
                .is_some_and(|path| path.ends_with(".mpd"))
    }
}

impl ContentStream for DashStream {
    fn set_cdn_endpoint(&self, endpoint: &str) -> EdgeResult<()> {
        let location = PlaylistLocation::from_endpoint(endpoint)?;
        tracing::debug!("Manifest location is {}", location.path);
        *self.location.write() = Some(location);
        Ok(())
    }

    fn location(&self) -> Option<PlaylistLocation> {
        self.location.read().clone()
    }

    fn on_file_received(&self, file: BroadcastFile) -> EdgeResult<()> {
        let kind = classify(self.location.read().as_ref(), &file);
        if kind == FileKind::Placeholder {
            return Ok(());
        }

        if Self::is_manifest(kind, &file) {
            tracing::info!("Got manifest at {}", file.content_location);
            let content = std::str::from_utf8(&file.buffer)?;
            let rewritten = rewrite_mpd(content, self.time_offset_ms)?;
            self.cache.add(file.content_location, Bytes::from(rewritten));
        } else {
            tracing::debug!("Got file at {}", file.content_location);
            self.cache.add(file.content_location, file.buffer);
        }
        Ok(())
    }

    fn status(&self) -> StreamStatus {
        StreamStatus {
            protocol: DeliveryProtocol::Dash,
            playlist_path: self.location.read().as_ref().map(|l| l.path.clone()),
            window: Vec::new(),
            pending_files: 0,
        }
    }
}
