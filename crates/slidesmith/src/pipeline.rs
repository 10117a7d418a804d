//! End-to-end request orchestration.
//!
//! One request flows strictly: admission → preprocessing → reasoning →
//! measurement/layout → render fan-out → persistence. Stages after the
//! gateway are pure CPU; suspension points are the injected capabilities
//! (cache, stores) and the gateway itself. A GenerationRecord is written at
//! termination whether the pipeline succeeded or not.

use crate::metering::{MemoryRecordStore, MemoryWindowStore, MonthlyQuota, RateLimiter, RecordStore};
use crate::preprocess;
use crate::storage::{ArtifactStore, MemoryArtifactStore};
use slidesmith_core::model::artifact::sha256_hex;
use slidesmith_core::{
    Artifact, Brief, ClassifyInput, Config, ConfigHandle, Error, GenerateRequest,
    GenerationOutcome, GenerationRecord, OutputFormat, Result, Warning, classify, script,
};
use slidesmith_gateway::{
    BrandSnapshot, Cache, Clock, Gateway, MemoryCache, ProviderTable, ReasoningInput,
    ReasoningService, SystemClock,
};
use slidesmith_layout::text::{FontMetricsTextMeasurer, FontRegistry, TextMeasurer};
use slidesmith_layout::{ARCHETYPE_VERSION, PositionedLayout, solve};
use std::sync::Arc;
use std::time::Duration;

/// Soft budget for a whole request.
const TOTAL_BUDGET: Duration = Duration::from_secs(45);
/// Budget for the reasoning stage alone.
const REASONING_BUDGET: Duration = Duration::from_secs(20);

/// A persisted output reference; bytes live in the artifact store.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub format: OutputFormat,
    pub reference: String,
    pub content_hash: String,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub record: GenerationRecord,
    pub brief: Brief,
    pub layout: PositionedLayout,
    pub artifacts: Vec<StoredArtifact>,
    pub warnings: Vec<Warning>,
}

/// The façade wiring every stage together for one deployment.
pub struct Pipeline {
    config: ConfigHandle,
    reasoning: ReasoningService,
    rate_limiter: RateLimiter,
    quota: MonthlyQuota,
    records: Arc<dyn RecordStore>,
    artifacts: Arc<dyn ArtifactStore>,
    measurer: Arc<dyn TextMeasurer>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// In-memory capabilities throughout; the shape most tests and the CLI
    /// want. Production composition roots use [`Pipeline::with_parts`] to
    /// inject Redis/object-store/DB-backed implementations.
    pub fn new(config: Config, providers: ProviderTable) -> Self {
        Self::with_parts(
            config,
            providers,
            Arc::new(MemoryCache::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        config: Config,
        providers: ProviderTable,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let handle = ConfigHandle::new(config);
        let cfg = handle.get();
        let gateway = Arc::new(
            Gateway::from_config(providers, &cfg, Arc::clone(&cache)).with_clock(Arc::clone(&clock)),
        );
        Self {
            reasoning: ReasoningService::new(gateway),
            rate_limiter: RateLimiter::new(
                Arc::new(MemoryWindowStore::new()),
                cfg.rate_limit_per_plan.clone(),
            ),
            quota: MonthlyQuota::new(cache),
            records: Arc::new(MemoryRecordStore::new()),
            artifacts: Arc::new(MemoryArtifactStore::default()),
            measurer: Arc::new(FontMetricsTextMeasurer::new(FontRegistry::from_chain(
                &cfg.font_fallback_chain,
            ))),
            clock,
            config: handle,
        }
    }

    pub fn with_record_store(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = records;
        self
    }

    pub fn with_artifact_store(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn monthly_quota(&self) -> &MonthlyQuota {
        &self.quota
    }

    /// Runs one request end to end and persists its GenerationRecord no
    /// matter how it terminates.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerationResult> {
        let started = self.clock.now();
        let mut record = GenerationRecord::new(&request.caller, &request.prompt);
        let mut warnings = Vec::new();

        let result = self.run(&request, started, &mut record, &mut warnings).await;

        record.wall_ms = (self.clock.now() - started).as_millis() as u64;
        record.outcome = match &result {
            Ok(_) => GenerationOutcome::Succeeded,
            Err(error) => GenerationOutcome::Failed { kind: error.kind() },
        };
        self.records.append(&record).await;

        match result {
            Ok((brief, layout, artifacts)) => {
                tracing::info!(
                    id = %record.id,
                    diagram_type = ?record.diagram_type,
                    outputs = artifacts.len(),
                    warnings = warnings.len(),
                    "generation succeeded"
                );
                Ok(GenerationResult {
                    record,
                    brief,
                    layout,
                    artifacts,
                    warnings,
                })
            }
            Err(error) => {
                tracing::info!(id = %record.id, kind = %error.kind(), "generation failed");
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        request: &GenerateRequest,
        started: std::time::Instant,
        record: &mut GenerationRecord,
        warnings: &mut Vec<Warning>,
    ) -> Result<(Brief, PositionedLayout, Vec<StoredArtifact>)> {
        let config = self.config.get();
        let plan = config.plan_limits.get(request.plan);
        let total_deadline = started + TOTAL_BUDGET;

        // Admission: rate limit, then monthly quota, before anything costs.
        self.rate_limiter.check(&request.caller, request.plan).await?;
        if let Some(cap) = plan.monthly_cap() {
            if self.quota.used(&request.caller).await >= cap {
                return Err(Error::QuotaExceeded { plan: request.plan });
            }
        }

        // Preprocessing: opaque uploads become hints.
        let palette = preprocess::parse_palette(&request.palette)?;
        let mut brand = request
            .template
            .as_deref()
            .and_then(preprocess::extract_template_theme);
        if let Some(logo) = &request.logo {
            let logo_colors = preprocess::extract_logo_palette(logo)?;
            let snapshot = brand.get_or_insert_with(BrandSnapshot::default);
            for color in logo_colors {
                if !snapshot.colors.contains(&color) {
                    snapshot.colors.push(color);
                }
            }
        }

        let language = request
            .language
            .clone()
            .unwrap_or_else(|| script::detect_language_tag(&request.prompt).to_string());
        record.language = Some(language);

        // Classification decides the tier; plan policy gates it before any
        // gateway call so forbidden tiers never accrue cost.
        let tier = classify(&ClassifyInput {
            prompt: &request.prompt,
            diagram_type_hint: request.diagram_type_hint,
            entity_count_hint: None,
            has_images: request.has_images(),
        });
        record.tier = Some(tier);
        if !plan.allows_tier(tier) {
            return Err(Error::PlanForbidsTier {
                plan: request.plan,
                tier,
            });
        }

        let reasoning_deadline = (started + REASONING_BUDGET).min(total_deadline);
        let images: Vec<Vec<u8>> = request.reference_image.iter().cloned().collect();
        let outcome = self
            .reasoning
            .generate_brief(&ReasoningInput {
                prompt: &request.prompt,
                caller: &request.caller,
                tier,
                palette: &palette,
                brand: brand.as_ref(),
                images: &images,
                deadline: Some(reasoning_deadline),
            })
            .await?;
        warnings.extend(outcome.warnings);

        let brief = outcome.brief;
        record.diagram_type = Some(brief.diagram_type);
        record.entity_count = brief.entities.len();
        record.model_used = Some(outcome.response.model_used.clone());
        record.input_tokens = outcome.response.input_tokens;
        record.output_tokens = outcome.response.output_tokens;
        record.cost_usd = outcome.response.cost_usd;
        record.cache_hit = outcome.response.cache_hit;

        if brief.entities.len() > plan.max_entities_per_diagram {
            return Err(Error::PlanLimitExceeded {
                message: format!(
                    "{} entities exceed the plan cap of {}",
                    brief.entities.len(),
                    plan.max_entities_per_diagram
                ),
            });
        }

        if self.clock.now() >= total_deadline {
            return Err(Error::Timeout { stage: "layout" });
        }

        // Measurement runs inside the solver's shared pre-step; both are pure
        // CPU and never suspend.
        let solved = solve(&brief, self.measurer.as_ref())?;
        warnings.extend(solved.warnings);
        let layout = solved.layout;

        if self.clock.now() >= total_deadline {
            return Err(Error::Timeout { stage: "render" });
        }

        // Render fan-out, plan-filtered. Formats outside the plan are simply
        // not invoked.
        let brief_json = serde_json::to_string(&brief)
            .map_err(|e| Error::internal(format!("brief serialization failed: {e}")))?;
        let ttl = Duration::from_secs(plan.artifact_ttl_hours * 3600);

        let mut produced = Vec::new();
        for format in requested_formats(request) {
            if !plan.allows_format(format) {
                tracing::debug!(%format, plan = %request.plan, "format not in plan, skipped");
                continue;
            }
            let bytes = match slidesmith_render::render(&layout, format) {
                Ok(bytes) => bytes,
                Err(slidesmith_render::Error::RasterUnavailable) => {
                    tracing::warn!("raster output requested but not built in; skipped");
                    continue;
                }
                Err(e) => return Err(Error::internal(format!("renderer failed: {e}"))),
            };

            let artifact = Artifact::new(bytes, format.content_type());
            let key = sha256_hex(&[
                brief_json.as_bytes(),
                &[0x1f],
                ARCHETYPE_VERSION.to_string().as_bytes(),
                &[0x1f],
                format.as_str().as_bytes(),
            ]);
            let reference = self.artifacts.put(&key, &artifact, ttl).await;
            record.outputs.push(format);
            produced.push(StoredArtifact {
                format,
                reference,
                content_hash: artifact.hash,
                content_type: format.content_type().to_string(),
            });
        }

        // Exactly one increment per successful generation.
        self.quota.increment(&request.caller).await;

        Ok((brief, layout, produced))
    }
}

fn requested_formats(request: &GenerateRequest) -> Vec<OutputFormat> {
    let mut formats = Vec::new();
    for format in &request.outputs {
        if !formats.contains(format) {
            formats.push(*format);
        }
    }
    formats
}
