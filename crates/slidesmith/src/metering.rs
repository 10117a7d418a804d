//! Admission gating and usage accounting.
//!
//! Rate-limit decisions happen before any gateway call; a GenerationRecord
//! is written at pipeline termination for success and failure alike.

use futures::future::BoxFuture;
use indexmap::IndexMap;
use slidesmith_core::{Error, GenerationRecord, PlanTier, RateLimitTable, Result};
use slidesmith_gateway::Cache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MINUTE_MS: u64 = 60 * 1000;
const DAY_MS: u64 = 24 * 3600 * 1000;

/// Sliding-window event log per key. Redis deployments back this with a
/// sorted set; the in-memory store serves tests and single-node setups.
pub trait WindowStore: Send + Sync {
    /// Records an event at `now_ms`, drops events older than `horizon_ms`,
    /// and returns the surviving timestamps in ascending order.
    fn record<'a>(&'a self, key: &'a str, now_ms: u64, horizon_ms: u64)
    -> BoxFuture<'a, Vec<u64>>;
}

#[derive(Default)]
pub struct MemoryWindowStore {
    events: Mutex<HashMap<String, Vec<u64>>>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowStore for MemoryWindowStore {
    fn record<'a>(
        &'a self,
        key: &'a str,
        now_ms: u64,
        horizon_ms: u64,
    ) -> BoxFuture<'a, Vec<u64>> {
        Box::pin(async move {
            let mut guard = match self.events.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let log = guard.entry(key.to_string()).or_default();
            let cutoff = now_ms.saturating_sub(horizon_ms);
            log.retain(|&t| t > cutoff);
            log.push(now_ms);
            log.clone()
        })
    }
}

/// Per-caller sliding-window limiter with per-minute and per-day bounds from
/// the plan's rate table. Rejected requests still count toward the window.
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    table: RateLimitTable,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn WindowStore>, table: RateLimitTable) -> Self {
        Self { store, table }
    }

    pub async fn check(&self, caller: &str, plan: PlanTier) -> Result<()> {
        self.check_at(caller, plan, chrono::Utc::now().timestamp_millis() as u64)
            .await
    }

    pub async fn check_at(&self, caller: &str, plan: PlanTier, now_ms: u64) -> Result<()> {
        let limits = self.table.get(plan);
        let key = format!("rl:{caller}");
        let events = self.store.record(&key, now_ms, DAY_MS).await;

        let minute_count = events
            .iter()
            .filter(|&&t| t > now_ms.saturating_sub(MINUTE_MS))
            .count() as u32;
        let day_count = events.len() as u32;

        if minute_count > limits.per_minute {
            let oldest = events
                .iter()
                .copied()
                .find(|&t| t > now_ms.saturating_sub(MINUTE_MS))
                .unwrap_or(now_ms);
            let retry_after_secs = (oldest + MINUTE_MS).saturating_sub(now_ms).div_ceil(1000);
            tracing::debug!(caller, plan = %plan, minute_count, "per-minute rate limit breached");
            return Err(Error::RateLimited { retry_after_secs });
        }
        if day_count > limits.per_day {
            let oldest = events.first().copied().unwrap_or(now_ms);
            let retry_after_secs = (oldest + DAY_MS).saturating_sub(now_ms).div_ceil(1000);
            tracing::debug!(caller, plan = %plan, day_count, "per-day rate limit breached");
            return Err(Error::RateLimited { retry_after_secs });
        }
        Ok(())
    }
}

/// Monthly generation counter over the cache capability. Incremented exactly
/// once per successful generation.
pub struct MonthlyQuota {
    cache: Arc<dyn Cache>,
}

impl MonthlyQuota {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    fn key(caller: &str) -> String {
        let month = chrono::Utc::now().format("%Y-%m");
        format!("gen:{caller}:{month}")
    }

    pub async fn used(&self, caller: &str) -> u64 {
        self.cache
            .get(&Self::key(caller))
            .await
            .and_then(|v| v.parse::<f64>().ok())
            .map(|v| v.max(0.0) as u64)
            .unwrap_or(0)
    }

    pub async fn increment(&self, caller: &str) -> u64 {
        // Counters outlive the month they describe by a few days for
        // reporting, then expire on their own.
        let ttl = Duration::from_secs(40 * 24 * 3600);
        self.cache.incr_f64(&Self::key(caller), 1.0, ttl).await.max(0.0) as u64
    }
}

/// Append-only persistence for generation records, idempotent on the record
/// id so re-delivery never double-counts.
pub trait RecordStore: Send + Sync {
    fn append<'a>(&'a self, record: &'a GenerationRecord) -> BoxFuture<'a, ()>;

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<GenerationRecord>>;

    fn len(&self) -> BoxFuture<'_, usize>;

    fn is_empty(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.len().await == 0 })
    }
}

/// Insertion-ordered so `all()` reads back in append order.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<IndexMap<String, GenerationRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<GenerationRecord> {
        match self.records.lock() {
            Ok(guard) => guard.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn append<'a>(&'a self, record: &'a GenerationRecord) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut guard = match self.records.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.entry(record.id.clone()).or_insert_with(|| record.clone());
        })
    }

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<GenerationRecord>> {
        Box::pin(async move {
            match self.records.lock() {
                Ok(guard) => guard.get(id).cloned(),
                Err(poisoned) => poisoned.into_inner().get(id).cloned(),
            }
        })
    }

    fn len(&self) -> BoxFuture<'_, usize> {
        Box::pin(async move {
            match self.records.lock() {
                Ok(guard) => guard.len(),
                Err(poisoned) => poisoned.into_inner().len(),
            }
        })
    }
}
