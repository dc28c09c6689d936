//! Per-panel snapshot cache with explicit invalidation handles
//!
//! Each fetch hands back a [`SnapshotHandle`]. After a mutation the owner
//! passes that handle to [`SnapshotCache::invalidate`], which marks the
//! snapshot stale so the next fetch for the same key goes back to the service.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use anyhow::Result;
use log::debug;

/// Identifies one loaded snapshot. A new handle is issued on every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotHandle(u64);

#[derive(Debug)]
struct Entry<V> {
    handle: SnapshotHandle,
    value: V,
    stale: bool,
}

#[derive(Debug)]
pub struct SnapshotCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    next_handle: u64,
}

impl<K, V> Default for SnapshotCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_handle: 0,
        }
    }
}

impl<K, V> SnapshotCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the fresh snapshot for `key`, or run `load` and store its result.
    ///
    /// A failed load leaves no entry behind.
    pub async fn fetch<F, Fut>(&mut self, key: K, load: F) -> Result<(SnapshotHandle, V)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(entry) = self.entries.get(&key) {
            if !entry.stale {
                debug!("Snapshot cache hit for {:?}", key);
                return Ok((entry.handle, entry.value.clone()));
            }
        }

        debug!("Snapshot cache miss for {:?}, loading", key);
        self.entries.remove(&key);
        let value = load().await?;

        let handle = SnapshotHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.insert(
            key,
            Entry {
                handle,
                value: value.clone(),
                stale: false,
            },
        );

        Ok((handle, value))
    }

    /// Mark the snapshot behind `handle` stale. Returns false when the handle
    /// no longer refers to a cached snapshot.
    pub fn invalidate(&mut self, handle: SnapshotHandle) -> bool {
        match self.entries.values_mut().find(|e| e.handle == handle) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fetch_reuses_fresh_snapshot() {
        let loads = AtomicUsize::new(0);
        let mut cache: SnapshotCache<String, u32> = SnapshotCache::new();

        let (h1, v1) = cache
            .fetch("a".to_string(), || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
            .unwrap();
        let (h2, v2) = cache
            .fetch("a".to_string(), || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(8)
            })
            .await
            .unwrap();

        assert_eq!((v1, v2), (7, 7));
        assert_eq!(h1, h2);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let mut cache: SnapshotCache<String, u32> = SnapshotCache::new();

        let (h1, _) = cache.fetch("a".to_string(), || async { Ok(1) }).await.unwrap();
        assert!(cache.invalidate(h1));

        let (h2, v2) = cache.fetch("a".to_string(), || async { Ok(2) }).await.unwrap();
        assert_eq!(v2, 2);
        assert_ne!(h1, h2);

        // The old handle is gone once reloaded
        assert!(!cache.invalidate(h1));
    }

    #[tokio::test]
    async fn test_failed_load_leaves_no_entry() {
        let mut cache: SnapshotCache<String, u32> = SnapshotCache::new();

        let result = cache
            .fetch("a".to_string(), || async { Err(anyhow::anyhow!("boom")) })
            .await;
        assert!(result.is_err());

        let (_, v) = cache.fetch("a".to_string(), || async { Ok(3) }).await.unwrap();
        assert_eq!(v, 3);
    }
}
