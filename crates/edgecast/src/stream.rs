mod dash;
mod seamless;

pub use dash::DashStream;
pub use seamless::{SeamlessStream, StreamSettings};

use std::{collections::HashMap, future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{error::EdgeResult, file::BroadcastFile, util::path::PlaylistLocation};

/// Pathless master manifest the broadcast core publishes next to every stream.
pub const MANIFEST_PLACEHOLDER: &str = "index.m3u8";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryProtocol {
    Hls,
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// The stream's own playlist or manifest
    Playlist,
    /// Core-generated placeholder, never served
    Placeholder,
    /// Anything else: a media segment or init segment
    Segment,
}

/// Classify a received broadcast file against the playlist location of a stream.
pub fn classify(location: Option<&PlaylistLocation>, file: &BroadcastFile) -> FileKind {
    if location.is_some_and(|l| l.path == file.content_location) {
        FileKind::Playlist
    } else if file.content_location == MANIFEST_PLACEHOLDER {
        FileKind::Placeholder
    } else {
        FileKind::Segment
    }
}

/// Broadcast files received before any playlist referenced them.
#[derive(Debug, Default)]
pub(crate) struct PendingFiles {
    files: HashMap<String, BroadcastFile>,
}

impl PendingFiles {
    pub fn insert(&mut self, file: BroadcastFile) {
        self.files.insert(file.content_location.clone(), file);
    }

    /// Take the file stored for `uri`, it can only be claimed once.
    pub fn claim(&mut self, uri: &str) -> Option<BroadcastFile> {
        self.files.remove(uri)
    }

    /// Drop files that waited longer than `max_age`.
    pub fn expire(&mut self, max_age: Duration) -> usize {
        let now = Instant::now();
        let before = self.files.len();
        self.files.retain(|uri, file| {
            let expired = now.duration_since(file.received_at) > max_age;
            if expired {
                tracing::debug!("Dropping unclaimed broadcast file {uri}");
            }
            !expired
        });
        before - self.files.len()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamStatus {
    pub protocol: DeliveryProtocol,
    pub playlist_path: Option<String>,
    /// Sequence numbers currently in the segment window
    pub window: Vec<u64>,
    pub pending_files: usize,
}

/// A stream fed by the broadcast receiver.
pub trait ContentStream: Send + Sync + 'static {
    /// Bind the stream to its unicast origin and publish its playlist.
    fn set_cdn_endpoint(&self, endpoint: &str) -> EdgeResult<()>;

    fn location(&self) -> Option<PlaylistLocation>;

    fn on_file_received(&self, file: BroadcastFile) -> EdgeResult<()>;

    /// Periodic work, driven at a fixed rate by the gateway.
    fn tick(&self) -> impl Future<Output = ()> + Send {
        async {}
    }

    fn status(&self) -> StreamStatus;

    /// Stop contributing to the cache, called when the stream is unregistered.
    fn close(&self) {}
}

pub enum Stream {
    Seamless(SeamlessStream),
    Dash(DashStream),
}

impl Stream {
    pub fn protocol(&self) -> DeliveryProtocol {
        match self {
            Stream::Seamless(_) => DeliveryProtocol::Hls,
            Stream::Dash(_) => DeliveryProtocol::Dash,
        }
    }
}

impl ContentStream for Stream {
    fn set_cdn_endpoint(&self, endpoint: &str) -> EdgeResult<()> {
        match self {
            Stream::Seamless(stream) => stream.set_cdn_endpoint(endpoint),
            Stream::Dash(stream) => stream.set_cdn_endpoint(endpoint),
        }
    }

    fn location(&self) -> Option<PlaylistLocation> {
        match self {
            Stream::Seamless(stream) => stream.location(),
            Stream::Dash(stream) => stream.location(),
        }
    }

    fn on_file_received(&self, file: BroadcastFile) -> EdgeResult<()> {
        match self {
            Stream::Seamless(stream) => stream.on_file_received(file),
            Stream::Dash(stream) => stream.on_file_received(file),
        }
    }

    async fn tick(&self) {
        match self {
            Stream::Seamless(stream) => stream.tick().await,
            Stream::Dash(stream) => stream.tick().await,
        }
    }

    fn status(&self) -> StreamStatus {
        match self {
            Stream::Seamless(stream) => stream.status(),
            Stream::Dash(stream) => stream.status(),
        }
    }

    fn close(&self) {
        match self {
            Stream::Seamless(stream) => stream.close(),
            Stream::Dash(stream) => stream.close(),
        }
    }
}
