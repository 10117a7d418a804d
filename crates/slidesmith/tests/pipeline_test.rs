use futures::executor::block_on;
use slidesmith::metering::MemoryRecordStore;
use slidesmith::{Pipeline, StoredArtifact};
use slidesmith_core::{
    Config, DiagramType, ErrorKind, Error, GenerateRequest, GenerationOutcome, OutputFormat,
    PlanTier,
};
use slidesmith_gateway::{ManualClock, ProviderTable, ScriptedProvider};
use std::sync::Arc;

fn marketecture_brief_json() -> String {
    let entities: Vec<String> = (0..8)
        .map(|i| format!(r#"{{"id": "bu{i}", "label": "Business Unit {i}"}}"#))
        .collect();
    format!(
        r#"{{
            "diagram-type": "marketecture",
            "title": "OpenText Business Units",
            "entities": [{}, {{"id": "myaviator", "label": "MyAviator", "emphasis": "accent"}}],
            "layers": [{{"id": "ai", "label": "AI Layer", "position": "cross-cutting", "members": ["myaviator"]}}],
            "theme": {{"primary": "0073e6", "secondary": "475569", "accent": "f59e0b", "background": "ffffff", "text": "1e293b", "font-family": "Inter", "corner-radius": 0.06, "padding": 0.12}}
        }}"#,
        entities.join(", ")
    )
}

fn flow_brief_json(n: usize) -> String {
    let entities: Vec<String> = (0..n)
        .map(|i| format!(r#"{{"id": "s{i}", "label": "Step {i}"}}"#))
        .collect();
    format!(
        r#"{{"diagram-type": "process-flow", "title": "Flow", "entities": [{}]}}"#,
        entities.join(", ")
    )
}

/// Providers registered for every provider name the default model map uses.
fn providers(scripted: &Arc<ScriptedProvider>) -> ProviderTable {
    ProviderTable::new().with(scripted.clone())
}

fn config_with_single_provider() -> Config {
    let mut config = Config::default();
    config.default_model_map.fast = vec!["test/fast".to_string()];
    config.default_model_map.standard = vec!["test/standard".to_string()];
    config.default_model_map.premium = vec!["test/premium".to_string()];
    config.default_model_map.vision = vec!["test/vision".to_string()];
    config
}

fn pipeline_with(
    scripted: &Arc<ScriptedProvider>,
    records: &Arc<MemoryRecordStore>,
) -> Pipeline {
    Pipeline::with_parts(
        config_with_single_provider(),
        providers(scripted),
        Arc::new(slidesmith_gateway::MemoryCache::new()),
        Arc::new(ManualClock::new()),
    )
    .with_record_store(records.clone())
}

/// Marketecture happy path: premium classification, band behind eight
/// blocks, both output formats produced and persisted.
#[test]
fn marketecture_happy_path_produces_both_artifacts() {
    let scripted = Arc::new(ScriptedProvider::new("test"));
    scripted.push_ok(marketecture_brief_json(), 2000, 800);
    let records = Arc::new(MemoryRecordStore::new());
    let pipeline = pipeline_with(&scripted, &records);

    let request = GenerateRequest::new(
        "Build a Marketecture of OpenText Business Units with MyAviator as the AI Layer",
        "acme-corp",
        PlanTier::Business,
    )
    .with_outputs(vec![OutputFormat::Svg, OutputFormat::EditableSlide]);

    let result = block_on(pipeline.generate(request)).expect("generation succeeds");

    assert_eq!(result.record.tier, Some(slidesmith_core::Tier::Premium));
    assert_eq!(result.brief.diagram_type, DiagramType::Marketecture);
    assert_eq!(result.brief.theme.primary, "0073e6");

    let bands: Vec<_> = result
        .layout
        .elements
        .iter()
        .filter(|e| e.z < 0)
        .collect();
    assert_eq!(bands.len(), 1, "one cross-cut band behind the blocks");
    assert_eq!(
        result
            .layout
            .elements
            .iter()
            .filter(|e| e.z >= 0)
            .count(),
        8,
        "eight main blocks"
    );
    assert!(result.layout.check_invariants().is_empty());

    let formats: Vec<OutputFormat> = result.artifacts.iter().map(|a| a.format).collect();
    assert_eq!(formats, vec![OutputFormat::Svg, OutputFormat::EditableSlide]);
    for StoredArtifact { reference, .. } in &result.artifacts {
        assert!(reference.starts_with("mem://"));
    }

    assert_eq!(result.record.entity_count, 9);
    assert!(matches!(result.record.outcome, GenerationOutcome::Succeeded));
    assert_eq!(records.all().len(), 1);
    assert_eq!(block_on(pipeline.monthly_quota().used("acme-corp")), 1);
}

/// Plan enforcement fires before any gateway call and accrues no cost.
#[test]
fn free_plan_rejects_premium_tier_before_the_gateway() {
    let scripted = Arc::new(ScriptedProvider::new("test"));
    scripted.push_ok(marketecture_brief_json(), 2000, 800);
    let records = Arc::new(MemoryRecordStore::new());
    let pipeline = pipeline_with(&scripted, &records);

    let request = GenerateRequest::new(
        "Build a Marketecture of our Business Units with a cross-cutting AI platform",
        "free-rider",
        PlanTier::Free,
    )
    .with_outputs(vec![OutputFormat::EditableSlide]);

    let err = block_on(pipeline.generate(request)).expect_err("forbidden tier");
    assert_eq!(err.kind(), ErrorKind::PlanForbidsTier);
    assert!(scripted.calls().is_empty(), "no gateway call happened");

    let record = &records.all()[0];
    assert!(matches!(
        record.outcome,
        GenerationOutcome::Failed {
            kind: ErrorKind::PlanForbidsTier
        }
    ));
    assert_eq!(record.cost_usd, 0.0);
    assert_eq!(block_on(pipeline.monthly_quota().used("free-rider")), 0);
}

#[test]
fn entity_count_above_the_plan_cap_is_rejected() {
    let scripted = Arc::new(ScriptedProvider::new("test"));
    scripted.push_ok(flow_brief_json(16), 1000, 400);
    let records = Arc::new(MemoryRecordStore::new());
    let pipeline = pipeline_with(&scripted, &records);

    let request = GenerateRequest::new("a very long process", "bigco", PlanTier::Business);
    let err = block_on(pipeline.generate(request)).expect_err("too many entities");
    assert_eq!(err.kind(), ErrorKind::PlanLimitExceeded);

    // Failure still produced exactly one record, with the reasoning cost.
    let record = &records.all()[0];
    assert!(record.cost_usd > 0.0);
    assert_eq!(record.entity_count, 16);
}

#[test]
fn formats_outside_the_plan_are_not_rendered() {
    let scripted = Arc::new(ScriptedProvider::new("test"));
    scripted.push_ok(flow_brief_json(3), 500, 200);
    let records = Arc::new(MemoryRecordStore::new());
    let pipeline = pipeline_with(&scripted, &records);

    // Free plan allows SVG only; the editable slide must be skipped silently.
    let request = GenerateRequest::new("three step flow", "freebie", PlanTier::Free)
        .with_outputs(vec![OutputFormat::Svg, OutputFormat::EditableSlide]);

    let result = block_on(pipeline.generate(request)).expect("succeeds");
    let formats: Vec<OutputFormat> = result.artifacts.iter().map(|a| a.format).collect();
    assert_eq!(formats, vec![OutputFormat::Svg]);
    assert_eq!(result.record.outputs, vec![OutputFormat::Svg]);
}

#[test]
fn identical_requests_hit_the_llm_cache() {
    let scripted = Arc::new(ScriptedProvider::new("test"));
    scripted.push_ok(flow_brief_json(3), 500, 200);
    let records = Arc::new(MemoryRecordStore::new());
    let pipeline = pipeline_with(&scripted, &records);

    let make_request = |caller: &str| {
        GenerateRequest::new("three step flow", caller, PlanTier::Pro)
            .with_outputs(vec![OutputFormat::Svg])
    };

    let first = block_on(pipeline.generate(make_request("caller-one"))).expect("first");
    assert!(!first.record.cache_hit);
    assert!(first.record.cost_usd > 0.0);

    let second = block_on(pipeline.generate(make_request("caller-two"))).expect("second");
    assert!(second.record.cache_hit, "same prompt within TTL is cached");
    assert_eq!(second.record.cost_usd, 0.0);
    assert_eq!(scripted.calls().len(), 1, "only the first request paid a model call");
}

#[test]
fn rate_limit_breach_is_recorded_and_retryable() {
    let scripted = Arc::new(ScriptedProvider::new("test"));
    for _ in 0..3 {
        scripted.push_ok(flow_brief_json(2), 100, 50);
    }
    let records = Arc::new(MemoryRecordStore::new());
    let pipeline = pipeline_with(&scripted, &records);

    // Free tier: 2 per minute. Cache is dodged by varying the prompt.
    let mut outcomes = Vec::new();
    for i in 0..3 {
        let request =
            GenerateRequest::new(format!("tiny flow variant {i}"), "hasty", PlanTier::Free);
        outcomes.push(block_on(pipeline.generate(request)));
    }

    assert!(outcomes[0].is_ok());
    assert!(outcomes[1].is_ok());
    let err = outcomes[2].as_ref().expect_err("third within a minute blocked");
    assert!(matches!(err, Error::RateLimited { .. }));
    assert!(err.is_retryable());
    assert_eq!(records.all().len(), 3, "failures are recorded too");
}

#[test]
fn monthly_quota_exhaustion_stops_generation() {
    let scripted = Arc::new(ScriptedProvider::new("test"));
    for _ in 0..2 {
        scripted.push_ok(flow_brief_json(2), 100, 50);
    }
    let mut config = config_with_single_provider();
    config.plan_limits.pro.generations_per_month = 1;
    let records = Arc::new(MemoryRecordStore::new());
    let pipeline = Pipeline::with_parts(
        config,
        ProviderTable::new().with(scripted.clone()),
        Arc::new(slidesmith_gateway::MemoryCache::new()),
        Arc::new(ManualClock::new()),
    )
    .with_record_store(records.clone());

    let first = block_on(pipeline.generate(GenerateRequest::new(
        "flow one",
        "quota-caller",
        PlanTier::Pro,
    )));
    assert!(first.is_ok());

    let err = block_on(pipeline.generate(GenerateRequest::new(
        "flow two",
        "quota-caller",
        PlanTier::Pro,
    )))
    .expect_err("quota spent");
    assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
    assert_eq!(scripted.calls().len(), 1, "no model call after the cap");
}

#[test]
fn brief_rejected_after_two_bad_responses() {
    let scripted = Arc::new(ScriptedProvider::new("test"));
    scripted.push_ok("not json", 10, 5);
    scripted.push_ok("also not json", 10, 5);
    let records = Arc::new(MemoryRecordStore::new());
    let pipeline = pipeline_with(&scripted, &records);

    let err = block_on(pipeline.generate(GenerateRequest::new(
        "simple flow",
        "unlucky",
        PlanTier::Pro,
    )))
    .expect_err("rejected");
    assert_eq!(err.kind(), ErrorKind::BriefRejected);
    assert_eq!(scripted.calls().len(), 2, "exactly one corrective retry");

    let record = &records.all()[0];
    assert!(matches!(
        record.outcome,
        GenerationOutcome::Failed {
            kind: ErrorKind::BriefRejected
        }
    ));
}

#[test]
fn bad_palette_is_rejected_before_reasoning() {
    let scripted = Arc::new(ScriptedProvider::new("test"));
    let records = Arc::new(MemoryRecordStore::new());
    let pipeline = pipeline_with(&scripted, &records);

    let request = GenerateRequest::new("flow", "p", PlanTier::Pro)
        .with_palette(vec!["no-such-color".to_string()]);
    let err = block_on(pipeline.generate(request)).expect_err("invalid input");
    assert_eq!(err.kind(), ErrorKind::InputInvalid);
    assert!(scripted.calls().is_empty());
}
