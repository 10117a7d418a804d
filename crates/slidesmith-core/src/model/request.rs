use crate::model::brief::DiagramType;
use serde::{Deserialize, Serialize};

/// Output artifact families a caller may request. The plan's
/// `allowed-output-formats` filters this set before any renderer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    EditableSlide,
    Svg,
    Raster,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::EditableSlide => "editable-slide",
            OutputFormat::Svg => "svg",
            OutputFormat::Raster => "raster",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::EditableSlide => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            OutputFormat::Svg => "image/svg+xml",
            OutputFormat::Raster => "image/png",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            OutputFormat::EditableSlide => "pptx",
            OutputFormat::Svg => "svg",
            OutputFormat::Raster => "png",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of billing plans. Policy per plan lives in [`crate::plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Business,
    Enterprise,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Business => "business",
            PlanTier::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end-to-end generation request as handed to the orchestrator.
///
/// Uploaded blobs are opaque here; preprocessing extracts hints (palette,
/// theme snapshot) without deep parsing.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub diagram_type_hint: Option<DiagramType>,
    /// Ordered brand palette, at most 10 entries, any common hex spelling.
    pub palette: Vec<String>,
    pub logo: Option<Vec<u8>>,
    pub reference_image: Option<Vec<u8>>,
    pub template: Option<Vec<u8>>,
    pub outputs: Vec<OutputFormat>,
    /// BCP-47-ish language tag; detected from the prompt when absent.
    pub language: Option<String>,
    pub caller: String,
    pub plan: PlanTier,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, caller: impl Into<String>, plan: PlanTier) -> Self {
        Self {
            prompt: prompt.into(),
            diagram_type_hint: None,
            palette: Vec::new(),
            logo: None,
            reference_image: None,
            template: None,
            outputs: vec![OutputFormat::Svg],
            language: None,
            caller: caller.into(),
            plan,
        }
    }

    pub fn with_diagram_type(mut self, hint: DiagramType) -> Self {
        self.diagram_type_hint = Some(hint);
        self
    }

    pub fn with_palette(mut self, palette: Vec<String>) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<OutputFormat>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_logo(mut self, bytes: Vec<u8>) -> Self {
        self.logo = Some(bytes);
        self
    }

    pub fn with_reference_image(mut self, bytes: Vec<u8>) -> Self {
        self.reference_image = Some(bytes);
        self
    }

    pub fn with_template(mut self, bytes: Vec<u8>) -> Self {
        self.template = Some(bytes);
        self
    }

    pub fn with_language(mut self, tag: impl Into<String>) -> Self {
        self.language = Some(tag.into());
        self
    }

    pub fn has_images(&self) -> bool {
        self.reference_image.is_some()
    }
}
