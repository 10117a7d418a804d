use serde::{Deserialize, Serialize};
use slidesmith_core::ConnectorStyle;

/// Text after wrapping and size fitting. `lines` is what renderers emit as
/// pre-wrapped runs; `height_in` already includes the 1.3 line-height factor.
///
/// Invariants: `height_in > 0`, `lines.len() <= 3`, `lines` never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredText {
    pub text: String,
    pub lines: Vec<String>,
    pub font_size_pt: f64,
    pub height_in: f64,
    /// False when the fallback truncation path was taken; propagated as a
    /// warning, never an error.
    pub fits: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Block,
    Band,
    Title,
    Subtitle,
    Label,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: String,
    pub width_pt: f64,
}

/// One axis-aligned shape on the slide. All geometry is in inches relative to
/// the slide origin (top-left); conversion to renderer units happens at the
/// renderer boundary, exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedElement {
    pub id: String,
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    pub corner_radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<MeasuredText>,
    pub text_color: String,
    pub opacity: f64,
    /// Elements with `z < 0` render behind `z >= 0`.
    pub z: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
}

impl PositionedElement {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Strict interior overlap; shared edges do not count.
    pub fn overlaps(&self, other: &PositionedElement) -> bool {
        let eps = 1e-9;
        let sep_x = self.right() <= other.x + eps || other.right() <= self.x + eps;
        let sep_y = self.bottom() <= other.y + eps || other.bottom() <= self.y + eps;
        !(sep_x || sep_y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedConnector {
    pub id: String,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub style: ConnectorStyle,
    pub color: String,
    pub stroke_width_pt: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<MeasuredText>,
}

/// Render-ready geometry for one slide. The one-way contract between the
/// layout engine and every renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedLayout {
    pub slide_width: f64,
    pub slide_height: f64,
    pub background: String,
    /// Theme font family; renderers name it in text runs.
    pub font_family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<PositionedElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<PositionedElement>,
    pub elements: Vec<PositionedElement>,
    pub connectors: Vec<PositionedConnector>,
}

impl PositionedLayout {
    /// Title, subtitle, then body elements; the logical element set renderers
    /// must reproduce one-for-one.
    pub fn iter_all(&self) -> impl Iterator<Item = &PositionedElement> {
        self.title
            .iter()
            .chain(self.subtitle.iter())
            .chain(self.elements.iter())
    }

    /// Body elements in ascending z-order, the required emission order for
    /// back-to-front stacking.
    pub fn elements_by_z(&self) -> Vec<&PositionedElement> {
        let mut sorted: Vec<&PositionedElement> = self.elements.iter().collect();
        sorted.sort_by_key(|e| e.z);
        sorted
    }

    /// Checks the universal layout invariants, returning every violation.
    ///
    /// - every element fully inside the canvas
    /// - block-kind elements pairwise disjoint (bands may sit behind)
    /// - connector endpoints clear of the shapes they touch
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let eps = 1e-6;

        for element in self.iter_all() {
            if element.x < -eps
                || element.y < -eps
                || element.right() > self.slide_width + eps
                || element.bottom() > self.slide_height + eps
            {
                problems.push(format!(
                    "element {:?} escapes the canvas: x={:.3} y={:.3} w={:.3} h={:.3}",
                    element.id, element.x, element.y, element.width, element.height
                ));
            }
            if element.width <= 0.0 || element.height <= 0.0 {
                problems.push(format!("element {:?} has a degenerate rectangle", element.id));
            }
            if !(0.0..=1.0).contains(&element.opacity) {
                problems.push(format!("element {:?} opacity out of range", element.id));
            }
            if let Some(text) = &element.text {
                if text.height_in <= 0.0 || text.lines.is_empty() || text.lines.len() > 3 {
                    problems.push(format!("element {:?} has invalid measured text", element.id));
                }
            }
        }

        let blocks: Vec<&PositionedElement> = self
            .elements
            .iter()
            .filter(|e| e.kind == ElementKind::Block && e.z >= 0)
            .collect();
        for (i, a) in blocks.iter().enumerate() {
            for b in blocks.iter().skip(i + 1) {
                if a.overlaps(b) {
                    problems.push(format!("blocks {:?} and {:?} overlap", a.id, b.id));
                }
            }
        }

        for connector in &self.connectors {
            for element in &self.elements {
                if element.kind != ElementKind::Block {
                    continue;
                }
                if element.contains_point(connector.x1, connector.y1)
                    || element.contains_point(connector.x2, connector.y2)
                {
                    problems.push(format!(
                        "connector {:?} endpoint lies inside block {:?}",
                        connector.id, element.id
                    ));
                }
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, x: f64, y: f64, w: f64, h: f64) -> PositionedElement {
        PositionedElement {
            id: id.to_string(),
            kind: ElementKind::Block,
            x,
            y,
            width: w,
            height: h,
            fill: "2563eb".to_string(),
            stroke: None,
            corner_radius: 0.06,
            text: None,
            text_color: "ffffff".to_string(),
            opacity: 1.0,
            z: 0,
            layer_id: None,
        }
    }

    #[test]
    fn touching_blocks_do_not_overlap() {
        let a = block("a", 1.0, 1.0, 2.0, 1.0);
        let b = block("b", 3.0, 1.0, 2.0, 1.0);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn interior_overlap_is_detected() {
        let a = block("a", 1.0, 1.0, 2.0, 1.0);
        let b = block("b", 2.5, 1.2, 2.0, 1.0);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn invariant_check_flags_canvas_escape() {
        let layout = PositionedLayout {
            slide_width: 13.333,
            slide_height: 7.5,
            background: "ffffff".to_string(),
            font_family: "Inter".to_string(),
            title: None,
            subtitle: None,
            elements: vec![block("runaway", 12.0, 7.0, 2.0, 1.0)],
            connectors: Vec::new(),
        };
        let problems = layout.check_invariants();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("runaway"));
    }

    #[test]
    fn elements_by_z_puts_bands_first() {
        let mut band = block("band", 0.5, 0.5, 4.0, 0.6);
        band.kind = ElementKind::Band;
        band.z = -1;
        let layout = PositionedLayout {
            slide_width: 13.333,
            slide_height: 7.5,
            background: "ffffff".to_string(),
            font_family: "Inter".to_string(),
            title: None,
            subtitle: None,
            elements: vec![block("front", 1.0, 2.0, 2.0, 1.0), band],
            connectors: Vec::new(),
        };
        let order: Vec<&str> = layout.elements_by_z().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["band", "front"]);
    }
}
