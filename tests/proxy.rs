//! Decorators: forwarding, caching and delay injection.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyfile::*;
use common::{RecordingEntity, invoke};

#[test]
fn proxy_forwards_every_operation_exactly_once() {
    for operation in FileOperation::ALL {
        let inner = RecordingEntity::new("/file.txt");
        let proxy = ProxyEntity::new(inner.clone());
        invoke(&proxy, operation);
        assert_eq!(inner.calls(), vec![operation], "{operation:?} was not forwarded once");
    }
}

#[test]
fn proxy_is_transparent_for_location_and_kind() {
    let inner = RecordingEntity::new("/dir/file.txt");
    let proxy = ProxyEntity::new(inner.clone());
    assert_eq!(proxy.location(), inner.location());
    assert_eq!(proxy.backend_kind(), BackendKind::Other);
    assert!(Arc::ptr_eq(proxy.inner(), &(inner.clone() as EntityRef)));
}

#[test]
fn cached_getters_query_the_inner_entity_at_most_once() {
    let getters = [
        FileOperation::Exists,
        FileOperation::IsDirectory,
        FileOperation::IsSymlink,
        FileOperation::IsHidden,
        FileOperation::IsSystem,
        FileOperation::Size,
        FileOperation::Date,
        FileOperation::Permissions,
        FileOperation::ChangeablePermissions,
        FileOperation::Owner,
        FileOperation::Group,
        FileOperation::CanGetOwner,
        FileOperation::CanGetGroup,
        FileOperation::Parent,
        FileOperation::Root,
        FileOperation::IsRoot,
        FileOperation::Volume,
        FileOperation::FreeSpace,
        FileOperation::TotalSpace,
    ];
    let inner = RecordingEntity::new("/file.txt");
    let cached = CachedEntity::wrap(inner.clone(), false);
    for _ in 0..3 {
        for operation in getters {
            invoke(cached.as_ref(), operation);
        }
    }
    for operation in getters {
        assert_eq!(inner.count(operation), 1, "{operation:?} reached the backend more than once");
    }
}

#[test]
fn cached_values_stay_stale_after_backend_changes() {
    let inner = RecordingEntity::new("/file.txt");
    let cached = CachedEntity::wrap(inner.clone(), false);
    assert_eq!(cached.size(), Some(10));
    assert!(cached.exists());

    inner.size.store(99, Ordering::SeqCst);
    inner.exists.store(false, Ordering::SeqCst);
    assert_eq!(cached.size(), Some(10));
    assert!(cached.exists());

    let fresh = CachedEntity::wrap(inner.clone(), false);
    assert_eq!(fresh.size(), Some(99));
    assert!(!fresh.exists());
}

#[test]
fn cached_mutations_and_listings_are_forwarded_every_time() {
    let inner = RecordingEntity::new("/dir");
    let cached = CachedEntity::wrap(inner.clone(), false);
    cached.ls().unwrap();
    cached.ls().unwrap();
    cached.mkdir().unwrap();
    cached.mkdir().unwrap();
    assert_eq!(inner.count(FileOperation::ListChildren), 2);
    assert_eq!(inner.count(FileOperation::CreateDirectory), 2);
}

#[test]
fn recursive_cache_wraps_children_and_adopts_them() {
    let inner = RecordingEntity::new("/dir");
    let cached = CachedEntity::new(inner.clone(), true);
    let children = cached.ls().unwrap();
    assert_eq!(children.len(), 2);

    let child = &children[0];
    child.size();
    child.size();
    let parent = child.parent().unwrap();
    assert_eq!(parent.location(), cached.location());
    // the adopted parent answers from the wrapper, not a fresh lookup
    assert_eq!(inner.count(FileOperation::Parent), 0);
}

#[test]
fn shallow_cache_returns_children_unwrapped() {
    let inner = RecordingEntity::new("/dir");
    let cached = CachedEntity::new(inner, false);
    assert!(!cached.is_recursive());
    let children = cached.ls().unwrap();
    assert_eq!(children[0].location().path(), "/a");
}

#[test]
fn delayed_entity_sleeps_and_counts() {
    let inner = RecordingEntity::new("/file.txt");
    let delayed = DelayedEntity::new(inner.clone(), DelayConfig::uniform(Duration::from_millis(15)));

    let started = Instant::now();
    delayed.size();
    delayed.ls().unwrap();
    assert!(started.elapsed() >= Duration::from_millis(30));

    let metrics = delayed.metrics();
    let metrics = metrics.lock();
    assert_eq!(metrics.calls_of(FileOperation::Size), 1);
    assert_eq!(metrics.calls_of(FileOperation::ListChildren), 1);
    assert_eq!(metrics.total_calls(), 2);
    assert_eq!(inner.count(FileOperation::Size), 1);
}

#[test]
fn layers_compose_in_application_order() {
    let inner = RecordingEntity::new("/file.txt");
    let delay = DelayLayer::new(DelayConfig::none());
    let metrics = delay.metrics();

    let entity: EntityRef = (inner.clone() as EntityRef)
        .layer(delay)
        .layer(CacheLayer::shallow())
        .layer(ProxyLayer);

    entity.size();
    entity.size();
    entity.size();
    // the cache sits above the delay layer, so only the first call passes
    assert_eq!(metrics.lock().calls_of(FileOperation::Size), 1);
    assert_eq!(inner.count(FileOperation::Size), 1);
}

#[test]
fn failed_space_queries_are_not_cached() {
    let local = LocalEntity::new(std::env::temp_dir());
    let cached = CachedEntity::wrap(local, false);
    if cached.supports(FileOperation::FreeSpace) {
        let first = cached.free_space().unwrap();
        assert_eq!(cached.free_space().unwrap(), first);
    } else {
        assert!(cached.free_space().is_err());
        assert!(cached.free_space().is_err());
    }
}
