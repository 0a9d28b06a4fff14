use bytes::Bytes;
use futures::{future::BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::{
    cache::LazyContent,
    cdn::CdnClient,
    error::{EdgeError, EdgeResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSource {
    Broadcast,
    Cdn,
}

#[derive(Debug, Clone)]
struct SegmentContent {
    bytes: Bytes,
    source: ItemSource,
}

/// One media chunk of a stream.
///
/// Identity (`uri`, `sequence`) is fixed at construction. The body is filled
/// either by a broadcast file or lazily from the CDN on first read. A
/// broadcast body always wins over a CDN body.
#[derive(Debug)]
pub struct Segment {
    uri: String,
    sequence: u64,
    duration: f32,

    content: Mutex<Option<SegmentContent>>,
    cdn: Option<CdnClient>,
    /// Held while a CDN fetch is in flight
    fetching: tokio::sync::Mutex<()>,
}

impl Segment {
    pub fn new(uri: impl Into<String>, sequence: u64, duration: f32) -> Self {
        Self {
            uri: uri.into(),
            sequence,
            duration,
            content: Mutex::new(None),
            cdn: None,
            fetching: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_cdn(mut self, cdn: CdnClient) -> Self {
        self.cdn = Some(cdn);
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn has_cdn(&self) -> bool {
        self.cdn.is_some()
    }

    pub fn content(&self) -> Option<Bytes> {
        self.content.lock().as_ref().map(|c| c.bytes.clone())
    }

    pub fn content_source(&self) -> Option<ItemSource> {
        self.content.lock().as_ref().map(|c| c.source)
    }

    /// Attach a body received over broadcast, replacing any CDN body.
    pub fn set_broadcast_content(&self, bytes: Bytes) {
        let mut content = self.content.lock();
        if let Some(existing) = content.as_ref() {
            if existing.source == ItemSource::Broadcast {
                tracing::debug!("Segment {} already has broadcast content", self.uri);
                return;
            }
            tracing::debug!("Replacing CDN content of segment {}", self.uri);
        }
        *content = Some(SegmentContent {
            bytes,
            source: ItemSource::Broadcast,
        });
    }

    /// Stores a CDN body unless one is already present, returns the body that is kept.
    fn set_cdn_content(&self, bytes: Bytes) -> Bytes {
        let mut content = self.content.lock();
        match content.as_ref() {
            Some(existing) => existing.bytes.clone(),
            None => {
                *content = Some(SegmentContent {
                    bytes: bytes.clone(),
                    source: ItemSource::Cdn,
                });
                bytes
            }
        }
    }

    /// Current body, fetched from the CDN when nothing has arrived yet.
    pub async fn load(&self) -> EdgeResult<Bytes> {
        if let Some(bytes) = self.content() {
            return Ok(bytes);
        }

        let Some(cdn) = &self.cdn else {
            return Err(EdgeError::ContentUnavailable(self.uri.clone()));
        };

        // concurrent readers wait for the fetch in flight and reuse its body
        let _fetching = self.fetching.lock().await;
        if let Some(bytes) = self.content() {
            return Ok(bytes);
        }

        tracing::debug!("Fetching segment {} from CDN", self.uri);
        let bytes = cdn.fetch(&self.uri).await?;
        Ok(self.set_cdn_content(bytes))
    }
}

impl LazyContent for Segment {
    fn load(&self) -> BoxFuture<'_, EdgeResult<Bytes>> {
        Segment::load(self).boxed()
    }

    fn size(&self) -> usize {
        self.content.lock().as_ref().map_or(0, |c| c.bytes.len())
    }
}
