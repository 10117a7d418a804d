use futures::future::BoxFuture;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// The cache capability the gateway and metering layers require: string get,
/// set-with-TTL, and an atomic float increment for cost counters.
///
/// Production deployments inject a Redis-backed implementation at the
/// composition root; the in-memory [`MemoryCache`] backs tests, the CLI, and
/// single-node setups.
pub trait Cache: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>>;

    fn set_with_ttl<'a>(&'a self, key: &'a str, value: String, ttl: Duration)
    -> BoxFuture<'a, ()>;

    /// Atomically adds `delta` and returns the new value. The TTL applies
    /// only when the key is created by this call.
    fn incr_f64<'a>(&'a self, key: &'a str, delta: f64, ttl: Duration) -> BoxFuture<'a, f64>;
}

enum Slot {
    Text(String),
    Number(f64),
}

/// Process-local cache with per-entry expiry. Multi-writer safe; expiry is
/// checked lazily on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<FxHashMap<String, (Slot, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut FxHashMap<String, (Slot, Instant)>) -> T) -> T {
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Cache for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            self.with_entries(|entries| {
                match entries.get(key) {
                    Some((_, expiry)) if *expiry <= Instant::now() => {
                        entries.remove(key);
                        None
                    }
                    Some((Slot::Text(value), _)) => Some(value.clone()),
                    Some((Slot::Number(value), _)) => Some(value.to_string()),
                    None => None,
                }
            })
        })
    }

    fn set_with_ttl<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Duration,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.with_entries(|entries| {
                entries.insert(key.to_string(), (Slot::Text(value), Instant::now() + ttl));
            })
        })
    }

    fn incr_f64<'a>(&'a self, key: &'a str, delta: f64, ttl: Duration) -> BoxFuture<'a, f64> {
        Box::pin(async move {
            self.with_entries(|entries| {
                let now = Instant::now();
                match entries.get_mut(key) {
                    Some((Slot::Number(value), expiry)) if *expiry > now => {
                        *value += delta;
                        *value
                    }
                    _ => {
                        entries.insert(key.to_string(), (Slot::Number(delta), now + ttl));
                        delta
                    }
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn set_then_get_round_trips() {
        let cache = MemoryCache::new();
        block_on(cache.set_with_ttl("k", "v".to_string(), Duration::from_secs(60)));
        assert_eq!(block_on(cache.get("k")), Some("v".to_string()));
    }

    #[test]
    fn zero_ttl_entries_expire_immediately() {
        let cache = MemoryCache::new();
        block_on(cache.set_with_ttl("k", "v".to_string(), Duration::ZERO));
        assert_eq!(block_on(cache.get("k")), None);
    }

    #[test]
    fn increments_accumulate() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        assert_eq!(block_on(cache.incr_f64("cost", 0.5, ttl)), 0.5);
        assert_eq!(block_on(cache.incr_f64("cost", 0.25, ttl)), 0.75);
    }
}
