use crate::cache::Cache;
use crate::clock::{Clock, SystemClock};
use crate::provider::{ChatRequest, ProviderError, ProviderTable, split_model_id};
use crate::rates::RateTable;
use serde::{Deserialize, Serialize};
use slidesmith_core::model::artifact::sha256_hex;
use slidesmith_core::{Config, Error, ModelMap, Result, Tier, Warning};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Exponential backoff schedule for rate-limited tries.
const BACKOFF_SECS: [u64; 3] = [1, 2, 4];
/// Tries per model before moving down the chain.
const MAX_TRIES_PER_MODEL: usize = 3;
/// Rolling retention for per-caller daily cost counters.
const COST_COUNTER_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// The outcome of one gateway call, successful or cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    /// Always one of the tier chain's identifiers.
    pub model_used: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Monotone non-negative; zero for cache hits.
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

#[derive(Debug, Clone)]
pub struct CompleteOptions {
    pub json_response: bool,
    pub images: Vec<Vec<u8>>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub skip_cache: bool,
    pub deadline: Option<Instant>,
}

impl Default for CompleteOptions {
    fn default() -> Self {
        Self {
            json_response: false,
            images: Vec::new(),
            temperature: 0.2,
            max_tokens: 4000,
            skip_cache: false,
            deadline: None,
        }
    }
}

/// What the response cache stores; latency is measured per lookup, never
/// replayed.
#[derive(Debug, Serialize, Deserialize)]
struct CachedEntry {
    content: String,
    model_used: String,
    input_tokens: u64,
    output_tokens: u64,
}

/// Single entry point for any model call: tier selection, cache lookup,
/// provider fallback chain, retry with backoff, cost accounting.
pub struct Gateway {
    providers: ProviderTable,
    model_map: ModelMap,
    rates: RateTable,
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
    cache_ttl: Duration,
    cost_budget_daily_usd: f64,
}

impl Gateway {
    pub fn new(providers: ProviderTable, model_map: ModelMap, cache: Arc<dyn Cache>) -> Self {
        Self {
            providers,
            model_map,
            rates: RateTable::default(),
            cache,
            clock: Arc::new(SystemClock),
            cache_ttl: Duration::from_secs(3600),
            cost_budget_daily_usd: f64::INFINITY,
        }
    }

    pub fn from_config(providers: ProviderTable, config: &Config, cache: Arc<dyn Cache>) -> Self {
        Self::new(providers, config.default_model_map.clone(), cache)
            .with_cache_ttl(Duration::from_secs(config.llm_cache_ttl_seconds))
            .with_daily_budget(config.cost_budget_daily_usd)
    }

    pub fn with_rates(mut self, rates: RateTable) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_daily_budget(mut self, usd: f64) -> Self {
        self.cost_budget_daily_usd = usd;
        self
    }

    /// Today's accumulated cost for a caller, in USD.
    pub async fn daily_cost(&self, caller: &str) -> f64 {
        let key = cost_counter_key(caller);
        self.cache
            .get(&key)
            .await
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// One model call with the full gateway protocol.
    ///
    /// Retry discipline: rate limits back off {1 s, 2 s, 4 s} and retry the
    /// same model up to three tries; unavailability, transport faults, and
    /// malformed responses skip to the next model immediately. When the chain
    /// is exhausted the last underlying error surfaces inside
    /// `AllModelsFailed`.
    pub async fn complete(
        &self,
        caller: &str,
        tier: Tier,
        system: &str,
        user: &str,
        options: &CompleteOptions,
        warnings: &mut Vec<Warning>,
    ) -> Result<LlmResponse> {
        let start = self.clock.now();
        let cacheable = !options.skip_cache && options.images.is_empty();
        let cache_key = cache_key(tier, system, user);

        if cacheable {
            if let Some(raw) = self.cache.get(&cache_key).await {
                if let Ok(entry) = serde_json::from_str::<CachedEntry>(&raw) {
                    let latency_ms = elapsed_ms(start, self.clock.now());
                    tracing::debug!(tier = %tier, "llm cache hit");
                    return Ok(LlmResponse {
                        content: entry.content,
                        model_used: entry.model_used,
                        input_tokens: entry.input_tokens,
                        output_tokens: entry.output_tokens,
                        cost_usd: 0.0,
                        latency_ms,
                        cache_hit: true,
                    });
                }
            }
        }

        let chain = self.model_map.chain(tier);
        let mut last_error = format!("tier {tier} has an empty model chain");

        for model_id in chain {
            let (provider_name, model) = split_model_id(model_id);
            let Some(provider) = self.providers.get(provider_name) else {
                last_error = format!("no provider registered for {provider_name:?}");
                continue;
            };

            let prompt_cache = provider.supports_prompt_cache(model);
            if !prompt_cache {
                warnings.push(Warning::PromptCacheUnavailable {
                    model: model_id.clone(),
                });
            }

            let request = ChatRequest {
                model: model.to_string(),
                system: system.to_string(),
                user: user.to_string(),
                images: options.images.clone(),
                temperature: options.temperature,
                max_tokens: options.max_tokens,
                json_response: options.json_response,
                enable_prompt_cache: prompt_cache,
            };

            for attempt in 0..MAX_TRIES_PER_MODEL {
                if let Some(deadline) = options.deadline {
                    if self.clock.now() >= deadline {
                        return Err(Error::Timeout { stage: "gateway" });
                    }
                }

                match provider.complete(&request).await {
                    Ok(response) => {
                        let cost_usd = self.rates.cost_usd(
                            model_id,
                            response.input_tokens,
                            response.output_tokens,
                        );
                        if cacheable {
                            let entry = CachedEntry {
                                content: response.content.clone(),
                                model_used: model_id.clone(),
                                input_tokens: response.input_tokens,
                                output_tokens: response.output_tokens,
                            };
                            if let Ok(raw) = serde_json::to_string(&entry) {
                                self.cache
                                    .set_with_ttl(&cache_key, raw, self.cache_ttl)
                                    .await;
                            }
                        }
                        self.record_cost(caller, cost_usd).await;

                        let latency_ms = elapsed_ms(start, self.clock.now());
                        tracing::info!(
                            tier = %tier,
                            model = %model_id,
                            attempt,
                            cost_usd,
                            latency_ms,
                            "llm call succeeded"
                        );
                        return Ok(LlmResponse {
                            content: response.content,
                            model_used: model_id.clone(),
                            input_tokens: response.input_tokens,
                            output_tokens: response.output_tokens,
                            cost_usd,
                            latency_ms,
                            cache_hit: false,
                        });
                    }
                    Err(ProviderError::RateLimited { retry_after }) => {
                        last_error = format!("{model_id}: rate limited");
                        if attempt + 1 >= MAX_TRIES_PER_MODEL {
                            break;
                        }
                        let wait = retry_after
                            .unwrap_or_else(|| Duration::from_secs(BACKOFF_SECS[attempt]));
                        if let Some(deadline) = options.deadline {
                            if self.clock.now() + wait >= deadline {
                                return Err(Error::Timeout { stage: "gateway" });
                            }
                        }
                        tracing::debug!(model = %model_id, attempt, ?wait, "rate limited, backing off");
                        self.clock.sleep(wait).await;
                    }
                    Err(ProviderError::ServiceUnavailable(detail)) => {
                        // No retry on unavailability: skip to the next model
                        // without waiting.
                        last_error = format!("{model_id}: service unavailable: {detail}");
                        tracing::debug!(model = %model_id, "service unavailable, trying next model");
                        break;
                    }
                    Err(ProviderError::Malformed(detail)) => {
                        last_error = format!("{model_id}: malformed response: {detail}");
                        break;
                    }
                    Err(ProviderError::Transport(detail)) => {
                        last_error = format!("{model_id}: transport error: {detail}");
                        break;
                    }
                }
            }
        }

        tracing::warn!(tier = %tier, %last_error, "all models in tier failed");
        Err(Error::AllModelsFailed { tier, last_error })
    }

    async fn record_cost(&self, caller: &str, cost_usd: f64) {
        if cost_usd <= 0.0 {
            return;
        }
        let key = cost_counter_key(caller);
        let total = self.cache.incr_f64(&key, cost_usd, COST_COUNTER_TTL).await;
        if total > self.cost_budget_daily_usd {
            tracing::warn!(caller, total, budget = self.cost_budget_daily_usd, "daily cost budget exceeded");
        }
    }
}

fn cache_key(tier: Tier, system: &str, user: &str) -> String {
    let digest = sha256_hex(&[
        tier.as_str().as_bytes(),
        &[0x1f],
        system.as_bytes(),
        &[0x1f],
        user.as_bytes(),
    ]);
    format!("llm:{digest}")
}

fn cost_counter_key(caller: &str) -> String {
    let day = chrono::Utc::now().format("%Y-%m-%d");
    format!("cost:{caller}:{day}")
}

fn elapsed_ms(start: Instant, end: Instant) -> u64 {
    end.saturating_duration_since(start).as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::clock::ManualClock;
    use crate::provider::ScriptedProvider;
    use crate::rates::RateCard;
    use futures::executor::block_on;

    fn two_model_map() -> ModelMap {
        ModelMap {
            fast: vec!["alpha/small".to_string(), "beta/small".to_string()],
            standard: vec!["alpha/mid".to_string(), "beta/mid".to_string()],
            premium: vec!["alpha/big".to_string()],
            vision: vec!["alpha/vision".to_string()],
        }
    }

    fn rates() -> RateTable {
        RateTable::default()
            .with_card(
                "alpha/mid",
                RateCard {
                    input_per_mtok_usd: 1.0,
                    output_per_mtok_usd: 2.0,
                },
            )
            .with_card(
                "beta/mid",
                RateCard {
                    input_per_mtok_usd: 10.0,
                    output_per_mtok_usd: 20.0,
                },
            )
    }

    fn gateway(
        alpha: Arc<ScriptedProvider>,
        beta: Arc<ScriptedProvider>,
        clock: Arc<ManualClock>,
    ) -> Gateway {
        let table = ProviderTable::new().with(alpha).with(beta);
        Gateway::new(table, two_model_map(), Arc::new(MemoryCache::new()))
            .with_rates(rates())
            .with_clock(clock)
    }

    #[test]
    fn second_identical_call_is_a_cache_hit_with_zero_cost() {
        let alpha = Arc::new(ScriptedProvider::new("alpha"));
        alpha.push_ok("answer", 1000, 200);
        let beta = Arc::new(ScriptedProvider::new("beta"));
        let clock = Arc::new(ManualClock::new());
        let gw = gateway(alpha, beta, clock);

        let mut warnings = Vec::new();
        let first = block_on(gw.complete(
            "caller-a",
            Tier::Standard,
            "sys",
            "user",
            &CompleteOptions::default(),
            &mut warnings,
        ))
        .expect("first call");
        assert!(!first.cache_hit);
        assert!(first.cost_usd > 0.0);

        let cost_after_first = block_on(gw.daily_cost("caller-a"));

        // Different caller, same request: served from cache, counters untouched.
        let second = block_on(gw.complete(
            "caller-b",
            Tier::Standard,
            "sys",
            "user",
            &CompleteOptions::default(),
            &mut warnings,
        ))
        .expect("second call");
        assert!(second.cache_hit);
        assert_eq!(second.cost_usd, 0.0);
        assert_eq!(second.model_used, first.model_used);
        assert_eq!(block_on(gw.daily_cost("caller-b")), 0.0);
        assert_eq!(block_on(gw.daily_cost("caller-a")), cost_after_first);
    }

    #[test]
    fn unavailable_primary_falls_through_without_waiting() {
        let alpha = Arc::new(ScriptedProvider::new("alpha"));
        alpha.push_err(ProviderError::ServiceUnavailable("maintenance".to_string()));
        let beta = Arc::new(ScriptedProvider::new("beta"));
        beta.push_ok("from beta", 500, 100);
        let clock = Arc::new(ManualClock::new());
        let gw = gateway(alpha.clone(), beta.clone(), clock.clone());

        let mut warnings = Vec::new();
        let response = block_on(gw.complete(
            "c",
            Tier::Standard,
            "sys",
            "user",
            &CompleteOptions::default(),
            &mut warnings,
        ))
        .expect("fallback succeeds");

        assert_eq!(response.model_used, "beta/mid");
        assert_eq!(alpha.calls().len(), 1, "exactly one model switch");
        assert_eq!(beta.calls().len(), 1);
        assert_eq!(clock.sleeps().len(), 0, "no wait between models");
        // Cost priced from the second model's card: 500/1M*10 + 100/1M*20.
        assert!((response.cost_usd - 0.007).abs() < 1e-9);
    }

    #[test]
    fn rate_limits_back_off_then_succeed_on_the_same_model() {
        let alpha = Arc::new(ScriptedProvider::new("alpha"));
        alpha.push_err(ProviderError::RateLimited { retry_after: None });
        alpha.push_err(ProviderError::RateLimited { retry_after: None });
        alpha.push_ok("finally", 100, 10);
        let beta = Arc::new(ScriptedProvider::new("beta"));
        let clock = Arc::new(ManualClock::new());
        let gw = gateway(alpha.clone(), beta, clock.clone());

        let mut warnings = Vec::new();
        let response = block_on(gw.complete(
            "c",
            Tier::Standard,
            "sys",
            "user",
            &CompleteOptions::default(),
            &mut warnings,
        ))
        .expect("third try succeeds");

        assert_eq!(response.model_used, "alpha/mid");
        assert_eq!(alpha.calls().len(), 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)],
            "1s + 2s exponential backoff"
        );
        assert!(clock.total_slept() >= Duration::from_secs(3));
    }

    #[test]
    fn exhausted_chain_wraps_the_last_error() {
        let alpha = Arc::new(ScriptedProvider::new("alpha"));
        for _ in 0..3 {
            alpha.push_err(ProviderError::RateLimited { retry_after: None });
        }
        let beta = Arc::new(ScriptedProvider::new("beta"));
        beta.push_err(ProviderError::Transport("connection reset".to_string()));
        let clock = Arc::new(ManualClock::new());
        let gw = gateway(alpha, beta, clock);

        let mut warnings = Vec::new();
        let err = block_on(gw.complete(
            "c",
            Tier::Standard,
            "sys",
            "user",
            &CompleteOptions::default(),
            &mut warnings,
        ))
        .expect_err("everything failed");

        match err {
            Error::AllModelsFailed { tier, last_error } => {
                assert_eq!(tier, Tier::Standard);
                assert!(last_error.contains("connection reset"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn vision_requests_skip_the_cache() {
        let alpha = Arc::new(ScriptedProvider::new("alpha"));
        alpha.push_ok("vision one", 100, 10);
        alpha.push_ok("vision two", 100, 10);
        let beta = Arc::new(ScriptedProvider::new("beta"));
        let clock = Arc::new(ManualClock::new());
        let gw = gateway(alpha.clone(), beta, clock);

        let options = CompleteOptions {
            images: vec![vec![0u8; 4]],
            ..Default::default()
        };
        let mut warnings = Vec::new();
        let first = block_on(gw.complete("c", Tier::Vision, "s", "u", &options, &mut warnings))
            .expect("first");
        let second = block_on(gw.complete("c", Tier::Vision, "s", "u", &options, &mut warnings))
            .expect("second");
        assert!(!first.cache_hit && !second.cache_hit);
        assert_eq!(alpha.calls().len(), 2);
    }

    #[test]
    fn deadline_expiry_surfaces_timeout() {
        let alpha = Arc::new(ScriptedProvider::new("alpha"));
        for _ in 0..3 {
            alpha.push_err(ProviderError::RateLimited { retry_after: None });
        }
        let beta = Arc::new(ScriptedProvider::new("beta"));
        let clock = Arc::new(ManualClock::new());
        let gw = gateway(alpha, beta, clock.clone());

        let options = CompleteOptions {
            deadline: Some(clock.now() + Duration::from_millis(1500)),
            ..Default::default()
        };
        let mut warnings = Vec::new();
        let err = block_on(gw.complete("c", Tier::Standard, "s", "u", &options, &mut warnings))
            .expect_err("deadline too tight for backoff");
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn missing_prompt_cache_support_is_warned_not_fatal() {
        let alpha = Arc::new(ScriptedProvider::new("alpha").without_prompt_cache());
        alpha.push_ok("ok", 10, 10);
        let beta = Arc::new(ScriptedProvider::new("beta"));
        let clock = Arc::new(ManualClock::new());
        let gw = gateway(alpha, beta, clock);

        let mut warnings = Vec::new();
        block_on(gw.complete(
            "c",
            Tier::Standard,
            "s",
            "u",
            &CompleteOptions::default(),
            &mut warnings,
        ))
        .expect("success");
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, Warning::PromptCacheUnavailable { .. }))
        );
    }
}
