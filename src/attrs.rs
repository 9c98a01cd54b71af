//! TTL-bounded attribute cache for remote entities.
//!
//! A [`SyncedAttributes`] holds one [`FileAttributes`] snapshot and the
//! instant it expires. Reads before expiry are pure memory reads. The first
//! read after expiry (or the first read ever, unless pre-populated) calls the
//! backend's [`AttributeSource`] synchronously.
//!
//! Refresh failures never propagate: the snapshot becomes
//! [`FileAttributes::missing`] until the TTL elapses again, so a transient
//! remote hiccup shows up as "does not exist" instead of an error in the
//! middle of a listing render.
//!
//! Concurrent readers that find the snapshot stale serialize on a refresh
//! lock and re-check freshness after acquiring it, so duplicate refreshes
//! collapse into one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{trace, warn};

use crate::{FileAttributes, FileError};

/// Backend hook producing fresh attributes.
pub trait AttributeSource: Send + Sync {
    /// Fetch the current attributes from the backend.
    ///
    /// Return `Ok(FileAttributes::missing())` for "does not exist"; errors
    /// are absorbed by the cache and treated the same way.
    fn fetch_attributes(&self) -> Result<FileAttributes, FileError>;
}

struct CacheState {
    attributes: FileAttributes,
    /// `None` until the first population.
    expires_at: Option<Instant>,
}

impl CacheState {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now < at)
    }
}

/// Attribute snapshot with a time-to-live.
pub struct SyncedAttributes<S: AttributeSource> {
    source: S,
    ttl: Duration,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
    refreshes: AtomicU64,
}

impl<S: AttributeSource> SyncedAttributes<S> {
    /// Create a cache. With `update_now`, the source is queried immediately.
    pub fn new(source: S, ttl: Duration, update_now: bool) -> Self {
        let cache = Self {
            source,
            ttl,
            state: RwLock::new(CacheState {
                attributes: FileAttributes::missing(),
                expires_at: None,
            }),
            refresh_lock: Mutex::new(()),
            refreshes: AtomicU64::new(0),
        };
        if update_now {
            cache.refresh();
        }
        cache
    }

    /// Create a cache already holding `attributes`, valid for one TTL.
    ///
    /// Used when a listing returned per-child attributes.
    pub fn prepopulated(source: S, ttl: Duration, attributes: FileAttributes) -> Self {
        let cache = Self::new(source, ttl, false);
        cache.set(attributes);
        cache
    }

    /// The backend hook.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Run `f` on the current snapshot, refreshing first if it is stale.
    pub fn with<R>(&self, f: impl FnOnce(&FileAttributes) -> R) -> R {
        {
            let state = self.state.read();
            if state.is_fresh(Instant::now()) {
                return f(&state.attributes);
            }
        }
        self.refresh_if_stale();
        f(&self.state.read().attributes)
    }

    /// Clone of the current snapshot, refreshing first if it is stale.
    pub fn get(&self) -> FileAttributes {
        self.with(FileAttributes::clone)
    }

    /// The snapshot if fresh, without ever calling the source.
    pub fn peek(&self) -> Option<FileAttributes> {
        let state = self.state.read();
        state
            .is_fresh(Instant::now())
            .then(|| state.attributes.clone())
    }

    /// Replace the snapshot and restart the TTL.
    pub fn set(&self, attributes: FileAttributes) {
        let mut state = self.state.write();
        state.attributes = attributes;
        state.expires_at = Some(Instant::now() + self.ttl);
    }

    /// Apply `f` to the snapshot in place (after a local mutation whose
    /// outcome is known) without restarting the TTL.
    pub fn update(&self, f: impl FnOnce(&mut FileAttributes)) {
        f(&mut self.state.write().attributes);
    }

    /// Mark the snapshot stale so the next read refreshes.
    pub fn invalidate(&self) {
        self.state.write().expires_at = Some(Instant::now());
    }

    /// Number of times the source has been called.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    fn refresh_if_stale(&self) {
        let _guard = self.refresh_lock.lock();
        if self.state.read().is_fresh(Instant::now()) {
            // another reader refreshed while we waited
            return;
        }
        self.fetch_and_store();
    }

    /// Query the source now, regardless of freshness.
    pub fn refresh(&self) {
        let _guard = self.refresh_lock.lock();
        self.fetch_and_store();
    }

    fn fetch_and_store(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let attributes = match self.source.fetch_attributes() {
            Ok(attributes) => {
                trace!(exists = attributes.exists, "attributes refreshed");
                attributes
            }
            Err(error) => {
                warn!(%error, "attribute refresh failed, marking entity as missing");
                FileAttributes::missing()
            }
        };
        self.set(attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    struct Source {
        calls: AtomicU64,
        fail: AtomicBool,
        size: AtomicU64,
    }

    impl Source {
        fn new(size: u64) -> Self {
            Self {
                calls: AtomicU64::new(0),
                fail: AtomicBool::new(false),
                size: AtomicU64::new(size),
            }
        }
    }

    impl AttributeSource for Source {
        fn fetch_attributes(&self) -> Result<FileAttributes, FileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(FileError::protocol("size", "s3://h/b/k", "connection reset"));
            }
            Ok(FileAttributes::file(self.size.load(Ordering::SeqCst), None))
        }
    }

    impl AttributeSource for Arc<Source> {
        fn fetch_attributes(&self) -> Result<FileAttributes, FileError> {
            self.as_ref().fetch_attributes()
        }
    }

    #[test]
    fn lazy_until_first_read() {
        let cache = SyncedAttributes::new(Source::new(10), Duration::from_secs(60), false);
        assert_eq!(cache.refresh_count(), 0);
        assert!(cache.peek().is_none());
        assert_eq!(cache.get().size, Some(10));
        assert_eq!(cache.refresh_count(), 1);
    }

    #[test]
    fn update_now_refreshes_at_construction() {
        let cache = SyncedAttributes::new(Source::new(10), Duration::from_secs(60), true);
        assert_eq!(cache.refresh_count(), 1);
        assert!(cache.peek().is_some());
    }

    #[test]
    fn warm_reads_do_not_refresh() {
        let cache = SyncedAttributes::new(Source::new(7), Duration::from_secs(60), false);
        for _ in 0..100 {
            assert_eq!(cache.with(|a| a.size), Some(7));
        }
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expiry_triggers_exactly_one_refresh() {
        let cache = SyncedAttributes::new(Source::new(1), Duration::from_millis(40), false);
        cache.get();
        cache.get();
        assert_eq!(cache.refresh_count(), 1);

        cache.source().size.store(2, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get().size, Some(2));
        assert_eq!(cache.get().size, Some(2));
        assert_eq!(cache.refresh_count(), 2);
    }

    #[test]
    fn failure_is_absorbed_as_missing() {
        let source = Source::new(1);
        source.fail.store(true, Ordering::SeqCst);
        let cache = SyncedAttributes::new(source, Duration::from_secs(60), false);
        let attributes = cache.get();
        assert!(!attributes.exists);
        // stays missing until the TTL elapses again
        cache.get();
        assert_eq!(cache.refresh_count(), 1);
    }

    #[test]
    fn failure_retries_after_ttl() {
        let source = Source::new(5);
        source.fail.store(true, Ordering::SeqCst);
        let cache = SyncedAttributes::new(source, Duration::from_millis(30), false);
        assert!(!cache.get().exists);
        cache.source().fail.store(false, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        assert!(cache.get().exists);
        assert_eq!(cache.refresh_count(), 2);
    }

    #[test]
    fn prepopulated_skips_source() {
        let cache = SyncedAttributes::prepopulated(
            Source::new(0),
            Duration::from_secs(60),
            FileAttributes::file(99, None),
        );
        assert_eq!(cache.get().size, Some(99));
        assert_eq!(cache.refresh_count(), 0);
    }

    #[test]
    fn invalidate_forces_refresh() {
        let cache = SyncedAttributes::new(Source::new(3), Duration::from_secs(60), true);
        cache.invalidate();
        cache.get();
        assert_eq!(cache.refresh_count(), 2);
    }

    #[test]
    fn concurrent_stale_readers_collapse() {
        let source = Arc::new(Source::new(4));
        let cache = Arc::new(SyncedAttributes::new(
            Arc::clone(&source),
            Duration::from_secs(60),
            false,
        ));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get().size)
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(4));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
