use crate::model::brief::DiagramType;
use serde::{Deserialize, Serialize};

/// Priority class controlling which model chain the gateway attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Standard,
    Premium,
    Vision,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Standard => "standard",
            Tier::Premium => "premium",
            Tier::Vision => "vision",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords whose presence marks a prompt as structurally complex.
///
/// Matching is case-folded substring search; two or more distinct hits
/// promote to PREMIUM, exactly one to STANDARD.
pub const COMPLEXITY_LEXICON: [&str; 11] = [
    "marketecture",
    "architecture",
    "ecosystem",
    "cross-cutting",
    "integration",
    "platform",
    "multi-layer",
    "hierarchy",
    "organizational",
    "value chain",
    "business units",
];

/// Brief-shaped hints available before any model call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyInput<'a> {
    pub prompt: &'a str,
    pub diagram_type_hint: Option<DiagramType>,
    pub entity_count_hint: Option<usize>,
    pub has_images: bool,
}

/// Maps request hints to a model tier. Pure and deterministic; rules apply
/// in order and the first match wins.
pub fn classify(input: &ClassifyInput<'_>) -> Tier {
    if input.has_images {
        return Tier::Vision;
    }

    if let Some(hint) = input.diagram_type_hint {
        match hint {
            DiagramType::ProcessFlow | DiagramType::Timeline | DiagramType::Comparison => {
                return if input.entity_count_hint.is_some_and(|n| n > 8) {
                    Tier::Standard
                } else {
                    Tier::Fast
                };
            }
            DiagramType::Marketecture
            | DiagramType::OrgStructure
            | DiagramType::HubSpoke
            | DiagramType::ValueChain => return Tier::Premium,
            DiagramType::TechStack => {}
        }
    }

    let folded = input.prompt.to_lowercase();
    let hits = COMPLEXITY_LEXICON
        .iter()
        .filter(|kw| folded.contains(*kw))
        .count();
    match hits {
        0 => Tier::Fast,
        1 => Tier::Standard,
        _ => Tier::Premium,
    }
}
