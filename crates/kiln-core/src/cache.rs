use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::id::{ComponentId, SessionId};

/// Time source for idle expiry. Abstracted for testability.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    /// A clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}

/// Composite cache key: one live instance per `(session, component)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub session: SessionId,
    pub component: ComponentId,
}

impl CacheKey {
    pub fn new(session: SessionId, component: ComponentId) -> Self {
        Self { session, component }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.session, self.component)
    }
}

struct Slot<V> {
    value: V,
    last_access: Instant,
    tick: u64,
}

struct Inner<V> {
    entries: HashMap<CacheKey, Slot<V>>,
    /// access tick -> key, oldest first
    recency: BTreeMap<u64, CacheKey>,
    next_tick: u64,
}

impl<V> Inner<V> {
    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn remove(&mut self, key: &CacheKey) -> Option<V> {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&slot.tick);
        Some(slot.value)
    }

    /// Drop entries idle for `ttl` or longer. Recency order is access
    /// order, so the scan stops at the first live entry.
    fn purge_expired(&mut self, now: Instant, ttl: Duration) -> usize {
        let mut purged = 0;
        while let Some((_, key)) = self.recency.first_key_value() {
            let expired = self
                .entries
                .get(key)
                .is_none_or(|slot| now.saturating_duration_since(slot.last_access) >= ttl);
            if !expired {
                break;
            }
            if let Some((_, key)) = self.recency.pop_first() {
                self.entries.remove(&key);
                purged += 1;
            }
        }
        purged
    }
}

/// Session-scoped store of live values, bounded by entry count and by idle
/// time since last access.
///
/// Expiry is lazy: expired entries are dropped when looked up, on writes,
/// and by [`InstanceCache::purge_expired`]. An expired key is never
/// returned. When full, the least recently accessed entry is evicted.
///
/// The index sits behind one mutex held only for map operations; values are
/// cloned out (typically an `Arc`) so callers never hold the cache lock
/// while working with an entry.
pub struct InstanceCache<V> {
    inner: Mutex<Inner<V>>,
    max_entries: usize,
    idle_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> InstanceCache<V> {
    /// A cache driven by the system clock.
    pub fn new(max_entries: usize, idle_ttl: Duration) -> Self {
        Self::with_clock(max_entries, idle_ttl, Arc::new(SystemClock))
    }

    /// A system-clock cache sized from `[cache]` settings.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.idle_ttl())
    }

    /// A cache reading time from `clock`. `max_entries` is clamped to 1.
    pub fn with_clock(max_entries: usize, idle_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                next_tick: 0,
            }),
            max_entries: max_entries.max(1),
            idle_ttl,
            clock,
        }
    }

    /// Insert or replace the value under `key`.
    pub fn put(&self, key: CacheKey, value: V) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        inner.purge_expired(now, self.idle_ttl);
        inner.remove(&key);

        let tick = inner.tick();
        inner.recency.insert(tick, key.clone());
        inner.entries.insert(
            key,
            Slot {
                value,
                last_access: now,
                tick,
            },
        );

        while inner.entries.len() > self.max_entries {
            let Some((_, evicted)) = inner.recency.pop_first() else {
                break;
            };
            inner.entries.remove(&evicted);
            tracing::debug!(key = %evicted, "Evicted least recently used component");
        }
    }

    /// The value under `key`, refreshing its idle timer; `None` if absent
    /// or expired.
    pub fn get_if_present(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = {
            let slot = inner.entries.get(key)?;
            now.saturating_duration_since(slot.last_access) >= self.idle_ttl
        };
        if expired {
            inner.remove(key);
            tracing::debug!(key = %key, "Component expired");
            return None;
        }

        let tick = inner.tick();
        let slot = inner.entries.get_mut(key)?;
        let old_tick = std::mem::replace(&mut slot.tick, tick);
        slot.last_access = now;
        let value = slot.value.clone();
        inner.recency.remove(&old_tick);
        inner.recency.insert(tick, key.clone());
        Some(value)
    }

    /// Remove and return the value under `key`, expired or not.
    pub fn remove(&self, key: &CacheKey) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Remove every entry belonging to `session`. Returns how many went.
    pub fn remove_session(&self, session: &SessionId) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| key.session != *session);
        inner.recency.retain(|_, key| key.session != *session);
        before - inner.entries.len()
    }

    /// Drop all expired entries now.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.inner.lock().purge_expired(now, self.idle_ttl)
    }

    /// Entry count, possibly including expired entries not yet purged.
    pub fn approximate_size(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Capacity bound, at least 1.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Idle time after which an entry expires.
    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }
}
