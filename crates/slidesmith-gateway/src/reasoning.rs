use crate::gateway::{CompleteOptions, Gateway, LlmResponse};
use slidesmith_core::{Brief, Error, Result, Tier, Warning};
use std::sync::Arc;
use std::time::Instant;

/// Theme hints extracted from uploaded brand material (logo k-means, template
/// shallow read). Everything here is advisory; the model may ignore it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrandSnapshot {
    /// Dominant colors, 6-hex lowercase, most prominent first.
    pub colors: Vec<String>,
    pub font_family: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReasoningInput<'a> {
    pub prompt: &'a str,
    pub caller: &'a str,
    pub tier: Tier,
    pub palette: &'a [String],
    pub brand: Option<&'a BrandSnapshot>,
    pub images: &'a [Vec<u8>],
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct ReasoningOutcome {
    pub brief: Brief,
    pub response: LlmResponse,
    pub warnings: Vec<Warning>,
}

/// Fixed archetype catalogue and drawing rules. Stable across requests so
/// provider-level prompt caching of the shared system prefix pays off.
const SYSTEM_CATALOGUE: &str = r##"You are the planning engine of an infographic generator. Turn the user's request into a single JSON "brief" describing one corporate diagram.

Diagram archetypes (pick exactly one as diagram-type):
- "marketecture": business units as blocks in one main row, with horizontal cross-cutting layers (platforms, AI layers) spanning behind them. Put cross-cutting items into layers with position "cross-cutting" and list their member entity ids.
- "process-flow": sequential steps left to right, arrows between adjacent steps.
- "tech-stack": horizontal layers stacked bottom-up; list entities foundation-first (infrastructure at index 0, applications last).
- "comparison": options side by side. Give each compared option's cells the option name in "group"; ungrouped entities become the criteria rows, in order.
- "timeline": dated milestones on a horizontal axis; entity label is the date caption, description is the milestone text.
- "org-structure": reporting hierarchy; express parent-child edges as connections from parent to child.
- "value-chain": sequential chevron stages, left to right.
- "hub-spoke": one central element (mark it emphasis "primary") with satellites around it.

Spatial rules: at most 15 entities; labels under 6 words; one idea per entity. Use connections only where the archetype calls for them.
Style rules: use shapes, text, and spatial relationships; never stock imagery or icons. Mark at most one entity "primary" and use "secondary"/"accent" sparingly. Colors are 6-digit lowercase hex without "#".
Language: produce all entity text in the same language as the user's prompt.

Respond with JSON only, no prose, matching:
{"diagram-type": "...", "title": "...", "subtitle": "...", "entities": [{"id": "...", "label": "...", "description": "...", "group": "...", "emphasis": "normal|primary|secondary|accent"}], "layers": [{"id": "...", "label": "...", "position": "top|middle|bottom|cross-cutting", "members": ["..."]}], "connections": [{"from": "...", "to": "...", "label": "...", "style": "arrow|dashed|bidirectional|plain"}], "theme": {"primary": "...", "secondary": "...", "accent": "...", "background": "...", "text": "...", "font-family": "...", "corner-radius": 0.06, "padding": 0.12}, "layout-hint": "..."}"##;

/// Builds the messages, invokes the gateway, and validates the returned
/// Brief. Speaks only to the gateway; no provider SDK appears here.
pub struct ReasoningService {
    gateway: Arc<Gateway>,
}

impl ReasoningService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn system_catalogue() -> &'static str {
        SYSTEM_CATALOGUE
    }

    /// One gateway call plus at most one corrective retry. After two failed
    /// validations the request surfaces `BriefRejected`.
    pub async fn generate_brief(&self, input: &ReasoningInput<'_>) -> Result<ReasoningOutcome> {
        let mut warnings = Vec::new();
        let user_message = build_user_message(input);

        let options = CompleteOptions {
            json_response: true,
            images: input.images.to_vec(),
            temperature: 0.2,
            max_tokens: 4000,
            skip_cache: false,
            deadline: input.deadline,
        };

        let first = self
            .gateway
            .complete(
                input.caller,
                input.tier,
                SYSTEM_CATALOGUE,
                &user_message,
                &options,
                &mut warnings,
            )
            .await?;

        let first_problems = match parse_brief(&first.content) {
            Ok(brief) => {
                return Ok(ReasoningOutcome {
                    brief,
                    response: first,
                    warnings,
                });
            }
            Err(problems) => problems,
        };

        tracing::debug!(problems = ?first_problems, "brief validation failed, retrying once");
        let retry_message = format!(
            "{user_message}\n\nYour previous response failed validation:\n{}\nReturn only corrected JSON matching the brief schema.",
            bullet_list(&first_problems)
        );

        // The corrective retry must reach a model, not the cached failure.
        let retry_options = CompleteOptions {
            skip_cache: true,
            ..options
        };
        let second = self
            .gateway
            .complete(
                input.caller,
                input.tier,
                SYSTEM_CATALOGUE,
                &retry_message,
                &retry_options,
                &mut warnings,
            )
            .await?;

        match parse_brief(&second.content) {
            Ok(brief) => Ok(ReasoningOutcome {
                brief,
                response: second,
                warnings,
            }),
            Err(problems) => Err(Error::BriefRejected {
                attempts: 2,
                detail: problems.join("; "),
            }),
        }
    }
}

fn build_user_message(input: &ReasoningInput<'_>) -> String {
    let mut message = input.prompt.trim().to_string();

    if !input.palette.is_empty() {
        message.push_str("\n\nBrand palette, most prominent first; use these for the theme: ");
        message.push_str(&input.palette.join(", "));
    }

    if let Some(brand) = input.brand {
        if !brand.colors.is_empty() {
            message.push_str("\nColors extracted from the uploaded brand assets: ");
            message.push_str(&brand.colors.join(", "));
        }
        if let Some(font) = &brand.font_family {
            message.push_str("\nBrand font family: ");
            message.push_str(font);
        }
    }

    if !input.images.is_empty() {
        message.push_str(
            "\nA reference image is attached; derive palette and layout mood from it where sensible.",
        );
    }

    message
}

/// Parses, normalizes, then validates model output. Mechanical issues
/// (uppercase hex, duplicate ids, code fences) are repaired silently; only
/// real schema violations trigger the corrective retry.
fn parse_brief(content: &str) -> std::result::Result<Brief, Vec<String>> {
    let cleaned = strip_code_fences(content);
    let mut brief: Brief = serde_json::from_str(cleaned)
        .map_err(|e| vec![format!("response is not valid brief JSON: {e}")])?;
    brief.normalize();
    let problems = brief.validate();
    if problems.is_empty() {
        Ok(brief)
    } else {
        Err(problems)
    }
}

/// Models wrap JSON in markdown fences often enough that stripping them here
/// is cheaper than a retry round-trip.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim).unwrap_or(trimmed)
}

fn bullet_list(problems: &[String]) -> String {
    problems
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}
