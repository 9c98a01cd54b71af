//! The realm-keyed connection pool.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::retry::retry_with_policy;
use super::{Connection, ConnectionFactory, HandlerState};
use crate::events::{ConnectionEvent, SubscriptionId, Subscribers};
use crate::{ConnectionConfig, FileError, Location, Realm};

struct HandlerInfo {
    state: HandlerState,
    users: usize,
    last_used: Instant,
    last_keep_alive: Instant,
}

struct Handler<C> {
    id: u64,
    realm: Realm,
    exclusive: bool,
    connection: C,
    info: Mutex<HandlerInfo>,
}

impl<C: Connection> Handler<C> {
    fn set_state(&self, state: HandlerState) {
        self.info.lock().state = state;
    }

    fn checkout(&self) {
        let mut info = self.info.lock();
        info.users += 1;
        info.last_used = Instant::now();
    }

    fn checkin(&self) {
        let mut info = self.info.lock();
        info.users = info.users.saturating_sub(1);
        info.last_used = Instant::now();
    }

    fn destroy(&self) {
        self.connection.disconnect();
        self.set_state(HandlerState::Closed);
    }
}

/// Handlers of one realm plus the lock serializing their connects.
struct Shard<C> {
    connect_lock: Mutex<()>,
    shared: Mutex<Option<Arc<Handler<C>>>>,
    exclusive: Mutex<Vec<Arc<Handler<C>>>>,
}

impl<C> Default for Shard<C> {
    fn default() -> Self {
        Self {
            connect_lock: Mutex::new(()),
            shared: Mutex::new(None),
            exclusive: Mutex::new(Vec::new()),
        }
    }
}

impl<C> Shard<C> {
    fn handlers(&self) -> Vec<Arc<Handler<C>>> {
        let mut all: Vec<_> = self.shared.lock().iter().cloned().collect();
        all.extend(self.exclusive.lock().iter().cloned());
        all
    }
}

struct PoolInner<F: ConnectionFactory> {
    factory: F,
    config: ConnectionConfig,
    shards: Mutex<HashMap<Realm, Arc<Shard<F::Connection>>>>,
    events: Subscribers<ConnectionEvent>,
    next_id: AtomicU64,
    shut_down: AtomicBool,
}

impl<F: ConnectionFactory> PoolInner<F> {
    /// The realm's shard, created on first use. `None` once shut down.
    fn shard(&self, realm: &Realm) -> Option<Arc<Shard<F::Connection>>> {
        let mut shards = self.shards.lock();
        if self.shut_down.load(Ordering::SeqCst) {
            return None;
        }
        Some(Arc::clone(shards.entry(realm.clone()).or_default()))
    }

    fn existing_shard(&self, realm: &Realm) -> Option<Arc<Shard<F::Connection>>> {
        self.shards.lock().get(realm).cloned()
    }

    fn is_current(&self, realm: &Realm, shard: &Arc<Shard<F::Connection>>) -> bool {
        self.shards
            .lock()
            .get(realm)
            .is_some_and(|current| Arc::ptr_eq(current, shard))
    }

    /// Remove `shard` from the map once it holds no handlers. Caller holds
    /// the shard's connect lock.
    fn forget_if_empty(&self, realm: &Realm, shard: &Arc<Shard<F::Connection>>) {
        if !shard.handlers().is_empty() {
            return;
        }
        let mut shards = self.shards.lock();
        if shards.get(realm).is_some_and(|current| Arc::ptr_eq(current, shard)) {
            shards.remove(realm);
            trace!(%realm, "dropped empty shard");
        }
    }

    fn all_shards(&self) -> Vec<(Realm, Arc<Shard<F::Connection>>)> {
        self.shards
            .lock()
            .iter()
            .map(|(realm, shard)| (realm.clone(), Arc::clone(shard)))
            .collect()
    }

    /// Create and connect a new handler. Caller holds the realm's connect lock.
    fn open_handler(&self, realm: &Realm, exclusive: bool) -> Result<Arc<Handler<F::Connection>>, FileError> {
        let connection = self.factory.create(realm)?;
        let now = Instant::now();
        let handler = Arc::new(Handler {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            realm: realm.clone(),
            exclusive,
            connection,
            info: Mutex::new(HandlerInfo {
                state: HandlerState::Connecting,
                users: 0,
                last_used: now,
                last_keep_alive: now,
            }),
        });
        match retry_with_policy(&self.config.retry, realm, |_| handler.connection.connect()) {
            Ok(()) => {
                handler.set_state(HandlerState::Connected);
                debug!(%realm, handler = handler.id, exclusive, "connected");
                self.events.publish(ConnectionEvent::Connected(realm.clone()));
                Ok(handler)
            }
            Err(error) => {
                handler.set_state(HandlerState::Closed);
                debug!(%realm, %error, "connect failed");
                Err(error)
            }
        }
    }

    /// One reconnect attempt. Caller holds the realm's connect lock.
    fn reconnect(&self, handler: &Handler<F::Connection>) -> Result<(), FileError> {
        handler.set_state(HandlerState::Connecting);
        match handler.connection.connect() {
            Ok(()) => {
                handler.set_state(HandlerState::Connected);
                info!(realm = %handler.realm, handler = handler.id, "reconnected");
                self.events
                    .publish(ConnectionEvent::Reconnected(handler.realm.clone()));
                Ok(())
            }
            Err(error) => {
                handler.set_state(HandlerState::Idle);
                warn!(realm = %handler.realm, %error, "reconnect failed");
                Err(match error {
                    FileError::AuthenticationRequired { .. } => error,
                    other => FileError::io(
                        "reconnect",
                        handler.realm.to_string(),
                        std::io::Error::other(other),
                    ),
                })
            }
        }
    }

    fn close_handler(&self, handler: &Arc<Handler<F::Connection>>) {
        if let Some(shard) = self.existing_shard(&handler.realm) {
            let _connecting = shard.connect_lock.lock();
            let mut shared = shard.shared.lock();
            if shared.as_ref().is_some_and(|h| Arc::ptr_eq(h, handler)) {
                *shared = None;
            }
            drop(shared);
            shard.exclusive.lock().retain(|h| !Arc::ptr_eq(h, handler));
            self.forget_if_empty(&handler.realm, &shard);
        }
        // already closed by shutdown
        if handler.info.lock().state == HandlerState::Closed {
            return;
        }
        handler.destroy();
        debug!(realm = %handler.realm, handler = handler.id, "closed");
        self.events
            .publish(ConnectionEvent::Closed(handler.realm.clone()));
    }

    fn close_all(&self) -> usize {
        let shards: Vec<_> = self.shards.lock().drain().map(|(_, shard)| shard).collect();
        let mut closed = 0;
        for shard in shards {
            let _connecting = shard.connect_lock.lock();
            let handlers = shard.handlers();
            *shard.shared.lock() = None;
            shard.exclusive.lock().clear();
            for handler in handlers {
                handler.destroy();
                self.events
                    .publish(ConnectionEvent::Closed(handler.realm.clone()));
                closed += 1;
            }
        }
        closed
    }
}

fn shut_down_error(realm: &Realm) -> FileError {
    FileError::io(
        "acquire",
        realm.to_string(),
        std::io::Error::other("connection pool is shut down"),
    )
}

impl<F: ConnectionFactory> Drop for PoolInner<F> {
    fn drop(&mut self) {
        for shard in self.shards.get_mut().values() {
            for handler in shard.handlers() {
                handler.connection.disconnect();
            }
        }
    }
}

/// Pool of sessions keyed by [`Realm`].
///
/// Cheap to clone; clones share the same handlers.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use anyfile::{Connection, ConnectionConfig, ConnectionFactory, ConnectionPool, FileError, Location, Realm};
///
/// struct Session(AtomicBool);
///
/// impl Connection for Session {
///     fn connect(&self) -> Result<(), FileError> {
///         self.0.store(true, Ordering::SeqCst);
///         Ok(())
///     }
///     fn is_connected(&self) -> bool {
///         self.0.load(Ordering::SeqCst)
///     }
///     fn disconnect(&self) {
///         self.0.store(false, Ordering::SeqCst);
///     }
/// }
///
/// struct Factory;
///
/// impl ConnectionFactory for Factory {
///     type Connection = Session;
///     fn create(&self, _realm: &Realm) -> Result<Session, FileError> {
///         Ok(Session(AtomicBool::new(false)))
///     }
/// }
///
/// let pool = ConnectionPool::new(Factory, ConnectionConfig::default());
/// let location = Location::parse("virt://host/").unwrap();
/// let conn = pool.acquire(&location, false).unwrap();
/// assert!(conn.is_connected());
/// conn.release();
/// assert_eq!(pool.handler_count(), 1);
/// ```
pub struct ConnectionPool<F: ConnectionFactory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: ConnectionFactory> Clone for ConnectionPool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    /// Create an empty pool.
    pub fn new(factory: F, config: ConnectionConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                factory,
                config,
                shards: Mutex::new(HashMap::new()),
                events: Subscribers::new(),
                next_id: AtomicU64::new(1),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// The session factory.
    pub fn factory(&self) -> &F {
        &self.inner.factory
    }

    /// The pool settings.
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Get a connected handler for the realm of `location`.
    ///
    /// Non-exclusive acquires share one handler per realm; the first one
    /// connects it and later ones reuse it. Exclusive acquires always get a
    /// fresh, dedicated handler. Concurrent acquirers for one realm block on
    /// the realm's connect lock instead of opening duplicate sessions.
    pub fn acquire(&self, location: &Location, exclusive: bool) -> Result<PooledConnection<F>, FileError> {
        let realm = location.realm();
        let handler = loop {
            let Some(shard) = self.inner.shard(&realm) else {
                return Err(shut_down_error(&realm));
            };
            let _connecting = shard.connect_lock.lock();
            if self.inner.shut_down.load(Ordering::SeqCst) {
                return Err(shut_down_error(&realm));
            }
            if !self.inner.is_current(&realm, &shard) {
                // pruned while this thread waited for the lock
                continue;
            }
            let opened = if exclusive {
                self.inner.open_handler(&realm, true).map(|handler| {
                    shard.exclusive.lock().push(Arc::clone(&handler));
                    handler
                })
            } else {
                let existing = shard.shared.lock().clone();
                match existing {
                    Some(handler) => {
                        trace!(%realm, handler = handler.id, "reusing pooled handler");
                        if handler.connection.is_connected() {
                            Ok(handler)
                        } else {
                            self.inner.reconnect(&handler).map(|()| handler)
                        }
                    }
                    None => self.inner.open_handler(&realm, false).map(|handler| {
                        *shard.shared.lock() = Some(Arc::clone(&handler));
                        handler
                    }),
                }
            };
            match opened {
                Ok(handler) => break handler,
                Err(error) => {
                    self.inner.forget_if_empty(&realm, &shard);
                    return Err(error);
                }
            }
        };
        handler.checkout();
        Ok(PooledConnection {
            handler: Some(handler),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Close idle non-exclusive handlers unused for longer than the idle
    /// timeout. Returns how many were evicted.
    pub fn prune_idle(&self) -> usize {
        let timeout = self.inner.config.idle_timeout;
        let mut evicted = 0;
        for (realm, shard) in self.inner.all_shards() {
            let Some(_connecting) = shard.connect_lock.try_lock() else {
                continue;
            };
            let expired = {
                let mut shared = shard.shared.lock();
                let idle = shared.as_ref().is_some_and(|handler| {
                    let info = handler.info.lock();
                    info.users == 0 && info.last_used.elapsed() >= timeout
                });
                if idle {
                    shared.take()
                } else {
                    None
                }
            };
            if let Some(handler) = expired {
                handler.destroy();
                debug!(realm = %handler.realm, handler = handler.id, "evicted idle handler");
                self.inner
                    .events
                    .publish(ConnectionEvent::Evicted(handler.realm.clone()));
                evicted += 1;
            }
            self.inner.forget_if_empty(&realm, &shard);
        }
        evicted
    }

    /// Send keep-alives on connected handlers whose keep-alive period has
    /// elapsed. Returns how many were pinged; a no-op without a period.
    pub fn keep_alive_all(&self) -> usize {
        let Some(period) = self.inner.config.keep_alive_period else {
            return 0;
        };
        let mut pinged = 0;
        for (_, shard) in self.inner.all_shards() {
            for handler in shard.handlers() {
                let due = {
                    let info = handler.info.lock();
                    info.state == HandlerState::Connected && info.last_keep_alive.elapsed() >= period
                };
                if !due {
                    continue;
                }
                match handler.connection.keep_alive() {
                    Ok(()) => {
                        handler.info.lock().last_keep_alive = Instant::now();
                        trace!(realm = %handler.realm, handler = handler.id, "keep-alive sent");
                        pinged += 1;
                    }
                    Err(error) => {
                        warn!(realm = %handler.realm, %error, "keep-alive failed");
                    }
                }
            }
        }
        pinged
    }

    /// Run [`keep_alive_all`](Self::keep_alive_all) and
    /// [`prune_idle`](Self::prune_idle) every monitor interval on a
    /// background thread until the returned monitor is stopped or dropped.
    pub fn start_monitor(&self) -> Result<PoolMonitor, FileError> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let pool: Weak<PoolInner<F>> = Arc::downgrade(&self.inner);
        let interval = self.inner.config.monitor_interval;
        let handle = thread::Builder::new()
            .name("anyfile-pool-monitor".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let Some(inner) = pool.upgrade() else {
                        break;
                    };
                    let pool = ConnectionPool { inner };
                    pool.keep_alive_all();
                    pool.prune_idle();
                }
                trace!("pool monitor stopped");
            })
            .map_err(|error| FileError::io("start_monitor", "connection pool", error))?;
        Ok(PoolMonitor {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Close every handler and refuse further acquires. Returns how many
    /// handlers were closed.
    pub fn shutdown(&self) -> usize {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        let closed = self.inner.close_all();
        info!(closed, "connection pool shut down");
        closed
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Number of live handlers across all realms.
    pub fn handler_count(&self) -> usize {
        self.inner
            .all_shards()
            .iter()
            .map(|(_, shard)| shard.handlers().len())
            .sum()
    }

    /// Number of live handlers for `realm`.
    pub fn realm_handler_count(&self, realm: &Realm) -> usize {
        let shard = self.inner.shards.lock().get(realm).cloned();
        shard.map(|shard| shard.handlers().len()).unwrap_or(0)
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> (SubscriptionId, crossbeam_channel::Receiver<ConnectionEvent>) {
        self.inner.events.subscribe()
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }
}

/// A checked-out handler.
///
/// Dropping it releases a non-exclusive handler back to the pool and closes
/// an exclusive one.
pub struct PooledConnection<F: ConnectionFactory> {
    handler: Option<Arc<Handler<F::Connection>>>,
    pool: Arc<PoolInner<F>>,
}

impl<F: ConnectionFactory> PooledConnection<F> {
    fn handler(&self) -> &Arc<Handler<F::Connection>> {
        self.handler
            .as_ref()
            .unwrap_or_else(|| unreachable!("handler is only taken on release"))
    }

    /// The session.
    pub fn connection(&self) -> &F::Connection {
        &self.handler().connection
    }

    /// The realm this handler is bound to.
    pub fn realm(&self) -> &Realm {
        &self.handler().realm
    }

    /// Handler id, stable for the handler's lifetime.
    pub fn id(&self) -> u64 {
        self.handler().id
    }

    /// Whether this is a dedicated handler.
    pub fn is_exclusive(&self) -> bool {
        self.handler().exclusive
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HandlerState {
        self.handler().info.lock().state
    }

    /// Re-validate the session, reconnecting once if it dropped.
    ///
    /// A failed reconnect surfaces as [`FileError::Io`], or as
    /// [`FileError::AuthenticationRequired`] when credentials were rejected.
    pub fn check_connection(&self) -> Result<(), FileError> {
        let handler = self.handler();
        if handler.connection.is_connected() {
            return Ok(());
        }
        let Some(shard) = self.pool.existing_shard(&handler.realm) else {
            return Err(shut_down_error(&handler.realm));
        };
        let _connecting = shard.connect_lock.lock();
        if handler.connection.is_connected() {
            return Ok(());
        }
        debug!(realm = %handler.realm, handler = handler.id, "session dropped, reconnecting");
        self.pool.reconnect(handler)
    }

    /// Return the handler. Non-exclusive handlers stay pooled; exclusive
    /// ones are closed.
    pub fn release(mut self) {
        self.finish();
    }

    /// Destroy an exclusive handler. For a shared handler this is the same
    /// as [`release`](Self::release): other users may still hold it.
    pub fn close(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        let Some(handler) = self.handler.take() else {
            return;
        };
        handler.checkin();
        if handler.exclusive {
            self.pool.close_handler(&handler);
        } else {
            trace!(realm = %handler.realm, handler = handler.id, "released to pool");
        }
    }
}

impl<F: ConnectionFactory> Deref for PooledConnection<F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        self.connection()
    }
}

impl<F: ConnectionFactory> Drop for PooledConnection<F> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Background maintenance thread started by
/// [`ConnectionPool::start_monitor`].
pub struct PoolMonitor {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PoolMonitor {
    /// Stop the thread and wait for it to exit.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("pool monitor thread panicked");
            }
        }
    }
}

impl Drop for PoolMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        disconnects: AtomicUsize,
        keep_alives: AtomicUsize,
    }

    struct Session {
        counters: Arc<Counters>,
        connected: AtomicBool,
    }

    impl Connection for Session {
        fn connect(&self) -> Result<(), FileError> {
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn disconnect(&self) {
            self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
            self.connected.store(false, Ordering::SeqCst);
        }

        fn keep_alive(&self) -> Result<(), FileError> {
            self.counters.keep_alives.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Factory(Arc<Counters>);

    impl ConnectionFactory for Factory {
        type Connection = Session;

        fn create(&self, _realm: &Realm) -> Result<Session, FileError> {
            Ok(Session {
                counters: Arc::clone(&self.0),
                connected: AtomicBool::new(false),
            })
        }
    }

    fn new_pool(config: ConnectionConfig) -> (ConnectionPool<Factory>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (ConnectionPool::new(Factory(Arc::clone(&counters)), config), counters)
    }

    fn loc() -> Location {
        Location::parse("virt://host/").unwrap()
    }

    #[test]
    fn shared_handler_is_reused() {
        let (pool, counters) = new_pool(ConnectionConfig::default());
        let first = pool.acquire(&loc(), false).unwrap();
        let id = first.id();
        first.release();
        let second = pool.acquire(&loc(), false).unwrap();
        assert_eq!(second.id(), id);
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exclusive_handler_is_closed_on_release() {
        let (pool, counters) = new_pool(ConnectionConfig::default());
        let conn = pool.acquire(&loc(), true).unwrap();
        assert!(conn.is_exclusive());
        assert_eq!(pool.handler_count(), 1);
        conn.close();
        assert_eq!(pool.handler_count(), 0);
        assert_eq!(counters.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn check_connection_reconnects_once() {
        let (pool, counters) = new_pool(ConnectionConfig::default());
        let (_, events) = pool.subscribe();
        let conn = pool.acquire(&loc(), false).unwrap();
        conn.disconnect();
        conn.check_connection().unwrap();
        assert!(conn.is_connected());
        assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
        let received: Vec<_> = events.try_iter().collect();
        assert!(matches!(received.last(), Some(ConnectionEvent::Reconnected(_))));
    }

    #[test]
    fn prune_evicts_only_idle_handlers() {
        let (pool, _) = new_pool(ConnectionConfig::default().with_idle_timeout(Duration::ZERO));
        let held = pool.acquire(&loc(), false).unwrap();
        assert_eq!(pool.prune_idle(), 0);
        held.release();
        assert_eq!(pool.prune_idle(), 1);
        assert_eq!(pool.handler_count(), 0);
    }

    #[test]
    fn keep_alive_respects_period() {
        let (pool, counters) = new_pool(ConnectionConfig::default());
        let _conn = pool.acquire(&loc(), false).unwrap();
        assert_eq!(pool.keep_alive_all(), 0);

        let (pool, counters2) = new_pool(ConnectionConfig::default().with_keep_alive(Duration::ZERO));
        let _conn = pool.acquire(&loc(), false).unwrap();
        assert_eq!(pool.keep_alive_all(), 1);
        assert_eq!(counters2.keep_alives.load(Ordering::SeqCst), 1);
        assert_eq!(counters.keep_alives.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn shutdown_closes_and_refuses() {
        let (pool, counters) = new_pool(ConnectionConfig::default());
        pool.acquire(&loc(), false).unwrap().release();
        assert_eq!(pool.shutdown(), 1);
        assert_eq!(counters.disconnects.load(Ordering::SeqCst), 1);
        assert!(pool.acquire(&loc(), false).is_err());
    }

    #[test]
    fn exclusive_dropped_after_shutdown_leaves_no_shard() {
        let (pool, counters) = new_pool(ConnectionConfig::default());
        let (_, events) = pool.subscribe();
        let conn = pool.acquire(&loc(), true).unwrap();
        assert_eq!(pool.shutdown(), 1);
        drop(conn);

        assert!(pool.inner.shards.lock().is_empty());
        assert_eq!(counters.disconnects.load(Ordering::SeqCst), 1);
        let closed = events
            .try_iter()
            .filter(|event| matches!(event, ConnectionEvent::Closed(_)))
            .count();
        assert_eq!(closed, 1);
    }

    #[test]
    fn pruning_forgets_emptied_realms() {
        let (pool, counters) = new_pool(ConnectionConfig::default().with_idle_timeout(Duration::ZERO));
        pool.acquire(&loc(), false).unwrap().release();
        assert_eq!(pool.prune_idle(), 1);
        assert!(pool.inner.shards.lock().is_empty());

        pool.acquire(&loc(), false).unwrap().release();
        assert_eq!(pool.handler_count(), 1);
        assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_connect_forgets_the_new_shard() {
        struct Refusing;

        impl ConnectionFactory for Refusing {
            type Connection = Session;

            fn create(&self, realm: &Realm) -> Result<Session, FileError> {
                Err(FileError::AuthenticationRequired { realm: realm.clone() })
            }
        }

        let pool = ConnectionPool::new(Refusing, ConnectionConfig::default());
        assert!(pool.acquire(&loc(), false).is_err());
        assert!(pool.inner.shards.lock().is_empty());
    }

    #[test]
    fn acquire_waiting_through_a_shutdown_is_refused() {
        let (pool, counters) = new_pool(ConnectionConfig::default());
        let shard = pool.inner.shard(&loc().realm()).unwrap();
        let connecting = shard.connect_lock.lock();
        let waiter = {
            let pool = pool.clone();
            thread::spawn(move || pool.acquire(&loc(), false).map(|conn| conn.id()))
        };
        thread::sleep(Duration::from_millis(20));
        // what shutdown does before it reaches this shard
        pool.inner.shut_down.store(true, Ordering::SeqCst);
        pool.inner.shards.lock().clear();
        drop(connecting);

        assert!(waiter.join().unwrap().is_err());
        assert_eq!(counters.connects.load(Ordering::SeqCst), 0);
        assert!(pool.inner.shards.lock().is_empty());
    }

    #[test]
    fn acquire_waiting_on_a_pruned_shard_uses_a_fresh_one() {
        let (pool, counters) = new_pool(ConnectionConfig::default());
        let shard = pool.inner.shard(&loc().realm()).unwrap();
        let connecting = shard.connect_lock.lock();
        let waiter = {
            let pool = pool.clone();
            thread::spawn(move || pool.acquire(&loc(), false).map(|conn| conn.id()))
        };
        thread::sleep(Duration::from_millis(20));
        pool.inner.shards.lock().clear();
        drop(connecting);

        assert!(waiter.join().unwrap().is_ok());
        assert!(shard.handlers().is_empty());
        assert_eq!(pool.handler_count(), 1);
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn monitor_prunes_in_background() {
        let config = ConnectionConfig::default()
            .with_idle_timeout(Duration::ZERO)
            .with_monitor_interval(Duration::from_millis(10));
        let (pool, _) = new_pool(config);
        pool.acquire(&loc(), false).unwrap().release();
        let mut monitor = pool.start_monitor().unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while pool.handler_count() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        monitor.stop();
        assert_eq!(pool.handler_count(), 0);
    }
}
