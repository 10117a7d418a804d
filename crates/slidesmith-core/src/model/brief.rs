use crate::color;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Version stamp that accompanies every persisted Brief.
///
/// Bump when the wire shape changes in a way readers must branch on.
pub const BRIEF_SCHEMA_VERSION: u32 = 2;

/// Closed set of diagram families the layout engine can solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagramType {
    Marketecture,
    ProcessFlow,
    TechStack,
    Comparison,
    Timeline,
    OrgStructure,
    ValueChain,
    HubSpoke,
}

impl DiagramType {
    pub const ALL: [DiagramType; 8] = [
        DiagramType::Marketecture,
        DiagramType::ProcessFlow,
        DiagramType::TechStack,
        DiagramType::Comparison,
        DiagramType::Timeline,
        DiagramType::OrgStructure,
        DiagramType::ValueChain,
        DiagramType::HubSpoke,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramType::Marketecture => "marketecture",
            DiagramType::ProcessFlow => "process-flow",
            DiagramType::TechStack => "tech-stack",
            DiagramType::Comparison => "comparison",
            DiagramType::Timeline => "timeline",
            DiagramType::OrgStructure => "org-structure",
            DiagramType::ValueChain => "value-chain",
            DiagramType::HubSpoke => "hub-spoke",
        }
    }

    pub fn parse(s: &str) -> Option<DiagramType> {
        let key = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL.iter().copied().find(|t| t.as_str() == key)
    }
}

impl std::fmt::Display for DiagramType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual weight class mapped onto theme roles by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    #[default]
    Normal,
    Primary,
    Secondary,
    Accent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub emphasis: Emphasis,
}

impl Entity {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            group: None,
            emphasis: Emphasis::Normal,
        }
    }

    pub fn with_emphasis(mut self, emphasis: Emphasis) -> Self {
        self.emphasis = emphasis;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerPosition {
    Top,
    Middle,
    Bottom,
    CrossCutting,
}

/// A horizontal band grouping entities, e.g. an "AI Layer" cutting across
/// business units in a marketecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub label: String,
    pub position: LayerPosition,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorStyle {
    #[default]
    Arrow,
    Dashed,
    Bidirectional,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(alias = "from-id", alias = "fromId")]
    pub from: String,
    #[serde(alias = "to-id", alias = "toId")]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub style: ConnectorStyle,
}

/// Visual theme for one generation. Colors are stored as 6-hex lowercase
/// without the leading `#`; lengths are inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Theme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
    #[serde(alias = "fontFamily")]
    pub font_family: String,
    #[serde(alias = "cornerRadius")]
    pub corner_radius: f64,
    pub padding: f64,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: "2563eb".to_string(),
            secondary: "475569".to_string(),
            accent: "f59e0b".to_string(),
            background: "ffffff".to_string(),
            text: "1e293b".to_string(),
            font_family: "Inter".to_string(),
            corner_radius: 0.06,
            padding: 0.12,
        }
    }
}

impl Theme {
    /// Normalizes all color fields to 6-hex lowercase, dropping any `#`.
    /// Unparseable values are left untouched so validation can report them.
    pub fn normalize_colors(&mut self) {
        for slot in [
            &mut self.primary,
            &mut self.secondary,
            &mut self.accent,
            &mut self.background,
            &mut self.text,
        ] {
            if let Some(n) = color::normalize_hex(slot) {
                *slot = n;
            }
        }
    }
}

/// The structured plan produced by the reasoning stage and consumed by the
/// layout engine. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Brief {
    #[serde(default = "default_schema_version", alias = "schemaVersion")]
    pub schema_version: u32,
    #[serde(alias = "diagramType")]
    pub diagram_type: DiagramType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default, alias = "layoutHint", skip_serializing_if = "Option::is_none")]
    pub layout_hint: Option<String>,
}

fn default_schema_version() -> u32 {
    BRIEF_SCHEMA_VERSION
}

impl Brief {
    pub fn new(diagram_type: DiagramType, title: impl Into<String>) -> Self {
        Self {
            schema_version: BRIEF_SCHEMA_VERSION,
            diagram_type,
            title: title.into(),
            subtitle: None,
            entities: Vec::new(),
            layers: Vec::new(),
            connections: Vec::new(),
            theme: Theme::default(),
            layout_hint: None,
        }
    }

    /// Checks the Brief invariants and returns every violation found.
    ///
    /// An empty vec means the Brief is acceptable. The messages are written to
    /// be echoed back to the model on a corrective retry, so they name the
    /// offending field and value.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.entities.is_empty() {
            problems.push("entities must contain at least one entry".to_string());
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for entity in &self.entities {
            if entity.id.trim().is_empty() {
                problems.push(format!("entity {:?} has an empty id", entity.label));
            }
            if !seen.insert(entity.id.as_str()) {
                problems.push(format!("duplicate entity id {:?}", entity.id));
            }
            if entity.label.trim().is_empty() {
                problems.push(format!("entity {:?} has an empty label", entity.id));
            }
        }

        let ids: HashSet<&str> = self.entities.iter().map(|e| e.id.as_str()).collect();
        for conn in &self.connections {
            if !ids.contains(conn.from.as_str()) {
                problems.push(format!(
                    "connection references unknown entity id {:?} in `from`",
                    conn.from
                ));
            }
            if !ids.contains(conn.to.as_str()) {
                problems.push(format!(
                    "connection references unknown entity id {:?} in `to`",
                    conn.to
                ));
            }
        }

        let mut layer_ids: HashSet<&str> = HashSet::new();
        for layer in &self.layers {
            if !layer_ids.insert(layer.id.as_str()) {
                problems.push(format!("duplicate layer id {:?}", layer.id));
            }
            for member in &layer.members {
                if !ids.contains(member.as_str()) {
                    problems.push(format!(
                        "layer {:?} references unknown entity id {:?}",
                        layer.id, member
                    ));
                }
            }
        }

        for (field, value) in [
            ("theme.primary", &self.theme.primary),
            ("theme.secondary", &self.theme.secondary),
            ("theme.accent", &self.theme.accent),
            ("theme.background", &self.theme.background),
            ("theme.text", &self.theme.text),
        ] {
            if !color::is_normalized_hex(value) {
                problems.push(format!(
                    "{field} must be a 6-hex lowercase color, got {value:?}"
                ));
            }
        }

        problems
    }

    /// Repairs the mechanical issues a model response commonly carries:
    /// hex colors are normalized to 6-hex lowercase and duplicate entity ids
    /// are de-duplicated by suffixing (`sales`, `sales-2`, `sales-3`, ...).
    ///
    /// Referential fixes are intentionally not attempted; connections and
    /// layer members keep pointing at the first occurrence of an id.
    pub fn normalize(&mut self) {
        self.theme.normalize_colors();

        let mut seen: HashSet<String> = HashSet::new();
        for entity in &mut self.entities {
            let base = entity.id.trim().to_string();
            let mut candidate = if base.is_empty() {
                "entity".to_string()
            } else {
                base.clone()
            };
            let mut n = 1usize;
            while !seen.insert(candidate.clone()) {
                n += 1;
                candidate = format!("{base}-{n}");
            }
            entity.id = candidate;
        }
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Layers marked cross-cutting, in declaration order.
    pub fn cross_cutting_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers
            .iter()
            .filter(|l| l.position == LayerPosition::CrossCutting)
    }
}
