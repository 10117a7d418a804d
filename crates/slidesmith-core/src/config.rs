use crate::classify::Tier;
use crate::error::{Error, Result};
use crate::plan::PlanCatalog;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Ordered provider/model fallback chain per tier.
///
/// Identifiers use the `provider/model` convention; the gateway routes on the
/// provider segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelMap {
    pub fast: Vec<String>,
    pub standard: Vec<String>,
    pub premium: Vec<String>,
    pub vision: Vec<String>,
}

impl ModelMap {
    pub fn chain(&self, tier: Tier) -> &[String] {
        match tier {
            Tier::Fast => &self.fast,
            Tier::Standard => &self.standard,
            Tier::Premium => &self.premium,
            Tier::Vision => &self.vision,
        }
    }
}

impl Default for ModelMap {
    fn default() -> Self {
        Self {
            fast: vec![
                "openai/gpt-4o-mini".to_string(),
                "anthropic/claude-3-5-haiku".to_string(),
            ],
            standard: vec![
                "openai/gpt-4o".to_string(),
                "anthropic/claude-sonnet-4".to_string(),
            ],
            premium: vec![
                "anthropic/claude-opus-4".to_string(),
                "openai/gpt-4o".to_string(),
            ],
            vision: vec![
                "openai/gpt-4o".to_string(),
                "anthropic/claude-sonnet-4".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RateLimit {
    pub per_minute: u32,
    pub per_day: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitTable {
    pub free: RateLimit,
    pub pro: RateLimit,
    pub business: RateLimit,
    pub enterprise: RateLimit,
}

impl RateLimitTable {
    pub fn get(&self, plan: crate::model::request::PlanTier) -> RateLimit {
        use crate::model::request::PlanTier;
        match plan {
            PlanTier::Free => self.free,
            PlanTier::Pro => self.pro,
            PlanTier::Business => self.business,
            PlanTier::Enterprise => self.enterprise,
        }
    }
}

impl Default for RateLimitTable {
    fn default() -> Self {
        Self {
            free: RateLimit {
                per_minute: 2,
                per_day: 20,
            },
            pro: RateLimit {
                per_minute: 6,
                per_day: 300,
            },
            business: RateLimit {
                per_minute: 20,
                per_day: 2000,
            },
            enterprise: RateLimit {
                per_minute: 60,
                per_day: 10000,
            },
        }
    }
}

/// Closed service configuration. Unknown keys are rejected at load time so a
/// typo in a deployment file fails loudly instead of silently defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case", default)]
pub struct Config {
    pub default_model_map: ModelMap,
    pub llm_cache_ttl_seconds: u64,
    pub artifact_storage_url: Option<String>,
    /// Soft alarm threshold; breaches log a warning, they do not gate.
    pub cost_budget_daily_usd: f64,
    pub rate_limit_per_plan: RateLimitTable,
    pub plan_limits: PlanCatalog,
    /// Ordered family list: brand font first, universal fallback last.
    pub font_fallback_chain: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model_map: ModelMap::default(),
            llm_cache_ttl_seconds: 3600,
            artifact_storage_url: None,
            cost_budget_daily_usd: 250.0,
            rate_limit_per_plan: RateLimitTable::default(),
            plan_limits: PlanCatalog::default(),
            font_fallback_chain: vec![
                "Inter".to_string(),
                "Arial".to_string(),
                "Noto Sans CJK SC".to_string(),
                "Noto Naskh Arabic".to_string(),
                "Noto Sans Hebrew".to_string(),
                "Noto Sans".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| Error::invalid_input(format!("config YAML rejected: {e}")))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::invalid_input(format!("config JSON rejected: {e}")))
    }
}

/// Read-mostly handle for the live configuration.
///
/// Reload is a guarded atomic swap: readers clone an `Arc` and never observe
/// a half-applied config.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub fn get(&self) -> Arc<Config> {
        self.inner
            .read()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
    }

    pub fn swap(&self, config: Config) {
        let next = Arc::new(config);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        tracing::info!("configuration swapped");
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
