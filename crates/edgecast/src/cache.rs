mod item;

pub use item::{ItemContent, LazyContent, LiveContentFn};

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{task::JoinHandle, time::Instant};

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Entries older than this are dropped by the sweep
    pub ttl: Duration,
    /// Upper bound of the summed entry sizes after a sweep
    pub max_total_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            max_total_size: 512 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    content: ItemContent,
    added: Instant,
}

/// Everything the gateway can serve, keyed by server-relative uri.
///
/// Shared by all streams. Each stream only touches keys below its own
/// playlist directory.
#[derive(Debug)]
pub struct CacheStore {
    settings: CacheSettings,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Insert or replace the entry of `key`.
    pub fn add(&self, key: impl Into<String>, content: impl Into<ItemContent>) {
        let key = key.into();
        tracing::debug!("Adding cache item at {key}");
        self.entries.lock().insert(
            key,
            CacheEntry {
                content: content.into(),
                added: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &str) -> bool {
        let removed = self.entries.lock().remove(key).is_some();
        if removed {
            tracing::debug!("Removed cache item at {key}");
        }
        removed
    }

    /// Reset the age of `key`, returns `false` when it is not cached.
    pub fn touch(&self, key: &str) -> bool {
        match self.entries.lock().get_mut(key) {
            Some(entry) => {
                entry.added = Instant::now();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<ItemContent> {
        self.entries.lock().get(key).map(|e| e.content.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn total_size(&self) -> usize {
        self.entries.lock().values().map(|e| e.content.size()).sum()
    }

    /// Drop expired entries, then the oldest ones until the size limit holds.
    ///
    /// Returns the number of removed entries.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();

        entries.retain(|key, entry| {
            let expired = now.duration_since(entry.added) > self.settings.ttl;
            if expired {
                tracing::debug!("Cache item at {key} expired");
            }
            !expired
        });

        let mut sizes: Vec<(Instant, String, usize)> = entries
            .iter()
            .map(|(key, entry)| (entry.added, key.clone(), entry.content.size()))
            .collect();
        let mut total: usize = sizes.iter().map(|(_, _, size)| size).sum();
        if total > self.settings.max_total_size {
            sizes.sort();
            for (_, key, size) in sizes {
                if total <= self.settings.max_total_size {
                    break;
                }
                tracing::debug!("Evicting cache item at {key} ({size} bytes)");
                entries.remove(&key);
                total -= size;
            }
        }

        let removed = before - entries.len();
        if removed > 0 {
            tracing::info!(
                "Cache sweep removed {removed} item(s), {} left ({total} bytes)",
                entries.len()
            );
        }
        removed
    }

    /// Run [`CacheStore::sweep`] at a fixed rate until the handle is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.sweep();
            }
        })
    }
}
