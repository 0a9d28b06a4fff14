use std::{fmt, sync::Arc};

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::EdgeResult;

/// Content that is only known, or only fetched, when it is read.
pub trait LazyContent: Send + Sync {
    fn load(&self) -> BoxFuture<'_, EdgeResult<Bytes>>;

    /// Bytes currently held in memory, 0 when nothing has been loaded yet.
    fn size(&self) -> usize;
}

pub type LiveContentFn = dyn Fn() -> Bytes + Send + Sync;

/// How a cache entry produces its bytes.
#[derive(Clone)]
pub enum ItemContent {
    /// Fixed buffer.
    Buffer(Bytes),
    /// Re-evaluated on every read, the bytes may differ between two reads.
    Live(Arc<LiveContentFn>),
    /// Backed by an object that may have to fetch its body first.
    Lazy(Arc<dyn LazyContent>),
}

impl ItemContent {
    pub fn live<F>(f: F) -> Self
    where
        F: Fn() -> Bytes + Send + Sync + 'static,
    {
        Self::Live(Arc::new(f))
    }

    pub async fn read(&self) -> EdgeResult<Bytes> {
        match self {
            ItemContent::Buffer(bytes) => Ok(bytes.clone()),
            ItemContent::Live(f) => Ok(f()),
            ItemContent::Lazy(content) => content.load().await,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            ItemContent::Buffer(bytes) => bytes.len(),
            ItemContent::Live(f) => f().len(),
            ItemContent::Lazy(content) => content.size(),
        }
    }
}

impl From<Bytes> for ItemContent {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes)
    }
}

impl fmt::Debug for ItemContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemContent::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            ItemContent::Live(_) => f.write_str("Live"),
            ItemContent::Lazy(content) => write!(f, "Lazy({} bytes)", content.size()),
        }
    }
}
