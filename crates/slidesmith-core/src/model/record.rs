use crate::classify::Tier;
use crate::error::ErrorKind;
use crate::model::brief::DiagramType;
use crate::model::request::OutputFormat;
use serde::{Deserialize, Serialize};

/// Prompts are truncated before persistence so the record store never holds
/// unbounded user text.
pub const PROMPT_TRUNCATE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GenerationOutcome {
    Succeeded,
    Failed { kind: ErrorKind },
}

/// One row per pipeline termination, success or failure.
///
/// Failed generations carry the failure kind and zero token counts. Writes
/// are idempotent on `id`; re-delivery must not double-count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: String,
    pub caller: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub prompt: String,
    pub diagram_type: Option<DiagramType>,
    pub tier: Option<Tier>,
    pub model_used: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub wall_ms: u64,
    pub cache_hit: bool,
    pub outputs: Vec<OutputFormat>,
    pub entity_count: usize,
    pub language: Option<String>,
    pub outcome: GenerationOutcome,
}

impl GenerationRecord {
    pub fn new(caller: impl Into<String>, prompt: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            caller: caller.into(),
            timestamp: chrono::Utc::now(),
            prompt: truncate_prompt(prompt),
            diagram_type: None,
            tier: None,
            model_used: None,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            wall_ms: 0,
            cache_hit: false,
            outputs: Vec::new(),
            entity_count: 0,
            language: None,
            outcome: GenerationOutcome::Failed {
                kind: ErrorKind::InternalError,
            },
        }
    }
}

/// Truncates on a char boundary and appends an ellipsis when content was cut.
pub fn truncate_prompt(prompt: &str) -> String {
    if prompt.chars().count() <= PROMPT_TRUNCATE_CHARS {
        return prompt.to_string();
    }
    let mut out: String = prompt.chars().take(PROMPT_TRUNCATE_CHARS - 1).collect();
    out.push('…');
    out
}
