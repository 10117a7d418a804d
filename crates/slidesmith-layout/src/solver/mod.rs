use crate::model::{
    ElementKind, MeasuredText, PositionedConnector, PositionedElement, PositionedLayout,
};
use crate::text::TextMeasurer;
use crate::theme;
use slidesmith_core::units::{
    BLOCK_MAX_HEIGHT_IN, BLOCK_MAX_WIDTH_IN, BLOCK_MIN_HEIGHT_IN, BLOCK_MIN_WIDTH_IN,
    CONNECTOR_INSET_IN, GUTTER_X_IN, MARGIN_SIDE_IN, MARGIN_TOP_IN, SLIDE_HEIGHT_IN,
    SLIDE_WIDTH_IN, content_area,
};
use slidesmith_core::{Brief, DiagramType, Emphasis, Error, Result, Theme, Warning};

mod comparison;
mod hub_spoke;
mod marketecture;
mod org_structure;
mod process_flow;
mod tech_stack;
mod timeline;
mod value_chain;

/// Bumped whenever any solver changes placement in a way that invalidates
/// previously stored artifacts; part of the artifact address.
pub const ARCHETYPE_VERSION: u32 = 3;

pub(crate) const LABEL_MIN_PT: f64 = 10.0;
pub(crate) const LABEL_MAX_PT: f64 = 24.0;

/// A positioned layout plus the non-fatal degradations accumulated while
/// producing it.
#[derive(Debug, Clone)]
pub struct SolvedLayout {
    pub layout: PositionedLayout,
    pub warnings: Vec<Warning>,
}

/// Chooses an archetype from the layout hint, falling back to a keyword pass
/// over the prompt. Returns `None` when nothing matches; callers decide the
/// default.
pub fn detect_archetype(layout_hint: Option<&str>, prompt: &str) -> Option<DiagramType> {
    if let Some(hint) = layout_hint {
        if let Some(t) = DiagramType::parse(hint) {
            return Some(t);
        }
    }

    const KEYWORDS: [(DiagramType, &[&str]); 8] = [
        (DiagramType::Marketecture, &["marketecture", "business units", "capability map"]),
        (DiagramType::ValueChain, &["value chain"]),
        (DiagramType::OrgStructure, &["org chart", "organization", "reporting lines", "hierarchy"]),
        (DiagramType::HubSpoke, &["hub and spoke", "hub-spoke", "ecosystem", "partners around"]),
        (DiagramType::Timeline, &["timeline", "roadmap", "milestones"]),
        (DiagramType::Comparison, &["comparison", "compare", " versus ", " vs "]),
        (DiagramType::TechStack, &["tech stack", "technology stack", "stack of", "layers of"]),
        (DiagramType::ProcessFlow, &["process", "workflow", "pipeline", "steps", "flow"]),
    ];

    let folded = prompt.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| folded.contains(w)))
        .map(|(t, _)| *t)
}

/// Solves a validated Brief into render-ready geometry.
///
/// Solvers degrade rather than fail: overflow triggers a uniform down-scaling
/// pass and text that cannot fit is truncated, both recorded as warnings. The
/// final invariant verification is a guard rail; a trip means a solver bug
/// and surfaces as `LayoutUnsatisfiable`.
pub fn solve(brief: &Brief, measurer: &dyn TextMeasurer) -> Result<SolvedLayout> {
    let mut warnings = Vec::new();

    let (mut elements, mut connectors) = match brief.diagram_type {
        DiagramType::Marketecture => marketecture::layout(brief, measurer),
        DiagramType::ProcessFlow => process_flow::layout(brief, measurer),
        DiagramType::TechStack => tech_stack::layout(brief, measurer),
        DiagramType::Comparison => comparison::layout(brief, measurer),
        DiagramType::Timeline => timeline::layout(brief, measurer),
        DiagramType::OrgStructure => org_structure::layout(brief, measurer),
        DiagramType::ValueChain => value_chain::layout(brief, measurer),
        DiagramType::HubSpoke => hub_spoke::layout(brief, measurer, &mut warnings),
    };

    enforce_content_bounds(&mut elements, &mut connectors, brief, measurer, &mut warnings);

    for element in &elements {
        if element.text.as_ref().is_some_and(|t| !t.fits) {
            warnings.push(Warning::TextDidNotFit {
                element_id: element.id.clone(),
            });
        }
    }
    for connector in &connectors {
        if connector.label.as_ref().is_some_and(|t| !t.fits) {
            warnings.push(Warning::ConnectorLabelTruncated {
                connector_id: connector.id.clone(),
            });
        }
    }

    let (title, subtitle) = title_boxes(brief, measurer);

    let layout = PositionedLayout {
        slide_width: SLIDE_WIDTH_IN,
        slide_height: SLIDE_HEIGHT_IN,
        background: brief.theme.background.clone(),
        font_family: brief.theme.font_family.clone(),
        title,
        subtitle,
        elements,
        connectors,
    };

    let problems = layout.check_invariants();
    if !problems.is_empty() {
        return Err(Error::LayoutUnsatisfiable {
            message: problems.join("; "),
        });
    }

    tracing::debug!(
        diagram_type = %brief.diagram_type,
        elements = layout.elements.len(),
        connectors = layout.connectors.len(),
        warnings = warnings.len(),
        "layout solved"
    );

    Ok(SolvedLayout { layout, warnings })
}

/// Initial estimated block width for `n` blocks sharing one row of the
/// content area, clamped to the block envelope.
pub(crate) fn block_grid_width(n: usize, content_w: f64) -> f64 {
    let n = n.max(1) as f64;
    let raw = (content_w - (n - 1.0) * GUTTER_X_IN) / n;
    raw.clamp(BLOCK_MIN_WIDTH_IN, BLOCK_MAX_WIDTH_IN)
}

/// Fits a bold label into `width` and derives the block height from the
/// measured text plus theme padding, clamped to the block envelope.
pub(crate) fn fit_block_label(
    label: &str,
    width: f64,
    theme: &Theme,
    measurer: &dyn TextMeasurer,
) -> (MeasuredText, f64) {
    let text = measurer.fit(
        label,
        width,
        &theme.font_family,
        LABEL_MIN_PT,
        LABEL_MAX_PT,
        true,
    );
    let height = (text.height_in + 2.0 * theme.padding)
        .max(BLOCK_MIN_HEIGHT_IN)
        .min(BLOCK_MAX_HEIGHT_IN);
    (text, height)
}

pub(crate) fn block(
    id: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    emphasis: Emphasis,
    text: MeasuredText,
    brief_theme: &Theme,
) -> PositionedElement {
    let fill = theme::fill_for(emphasis, brief_theme);
    let text_color = theme::text_on(&fill);
    PositionedElement {
        id: id.to_string(),
        kind: ElementKind::Block,
        x,
        y,
        width,
        height,
        fill,
        stroke: None,
        corner_radius: brief_theme.corner_radius,
        text: Some(text),
        text_color,
        opacity: 1.0,
        z: 0,
        layer_id: None,
    }
}

pub(crate) fn connector(
    id: String,
    (x1, y1): (f64, f64),
    (x2, y2): (f64, f64),
    style: slidesmith_core::ConnectorStyle,
    color: &str,
) -> PositionedConnector {
    PositionedConnector {
        id,
        x1,
        y1,
        x2,
        y2,
        style,
        color: color.to_string(),
        stroke_width_pt: 1.75,
        label: None,
    }
}

/// Point on the element's bounding box along the ray from its center in
/// direction `(dx, dy)`, pushed outward by the connector inset.
pub(crate) fn edge_point_outward(el: &PositionedElement, dx: f64, dy: f64) -> (f64, f64) {
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        return (el.center_x(), el.y - CONNECTOR_INSET_IN);
    }
    let (ux, uy) = (dx / len, dy / len);
    let tx = if ux.abs() < 1e-9 {
        f64::INFINITY
    } else {
        (el.width / 2.0) / ux.abs()
    };
    let ty = if uy.abs() < 1e-9 {
        f64::INFINITY
    } else {
        (el.height / 2.0) / uy.abs()
    };
    let t = tx.min(ty) + CONNECTOR_INSET_IN;
    (el.center_x() + ux * t, el.center_y() + uy * t)
}

fn title_boxes(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
) -> (Option<PositionedElement>, Option<PositionedElement>) {
    let content_w = SLIDE_WIDTH_IN - 2.0 * MARGIN_SIDE_IN;
    let theme = &brief.theme;

    let title = (!brief.title.trim().is_empty()).then(|| {
        let text = measurer.fit(&brief.title, content_w, &theme.font_family, 20.0, 30.0, true);
        PositionedElement {
            id: "title".to_string(),
            kind: ElementKind::Title,
            x: MARGIN_SIDE_IN,
            y: MARGIN_TOP_IN,
            width: content_w,
            height: 0.55,
            fill: theme.background.clone(),
            stroke: None,
            corner_radius: 0.0,
            text: Some(text),
            text_color: theme.text.clone(),
            opacity: 1.0,
            z: 0,
            layer_id: None,
        }
    });

    let subtitle = brief
        .subtitle
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|subtitle| {
            let text = measurer.fit(subtitle, content_w, &theme.font_family, 12.0, 16.0, false);
            PositionedElement {
                id: "subtitle".to_string(),
                kind: ElementKind::Subtitle,
                x: MARGIN_SIDE_IN,
                y: MARGIN_TOP_IN + 0.55,
                width: content_w,
                height: 0.35,
                fill: theme.background.clone(),
                stroke: None,
                corner_radius: 0.0,
                text: Some(text),
                text_color: theme.text.clone(),
                opacity: 1.0,
                z: 0,
                layer_id: None,
            }
        });

    (title, subtitle)
}

/// Uniform down-scaling fallback: when the first pass escapes the content
/// area, every element and connector is scaled about the content center until
/// the bounding box fits, then block labels are re-fitted into their reduced
/// widths. Overlap is never introduced by a uniform scale.
fn enforce_content_bounds(
    elements: &mut [PositionedElement],
    connectors: &mut [PositionedConnector],
    brief: &Brief,
    measurer: &dyn TextMeasurer,
    warnings: &mut Vec<Warning>,
) {
    let (cx, cy, cw, ch) = content_area();
    let Some((min_x, min_y, max_x, max_y)) = bounds(elements, connectors) else {
        return;
    };

    let used_w = max_x - min_x;
    let used_h = max_y - min_y;
    let scale = (cw / used_w).min(ch / used_h).min(1.0);
    let needs_scale = scale < 1.0 - 1e-9;
    let needs_shift = min_x < cx - 1e-9
        || min_y < cy - 1e-9
        || max_x > cx + cw + 1e-9
        || max_y > cy + ch + 1e-9;
    if !needs_scale && !needs_shift {
        return;
    }

    // Map the used bounding box onto the center of the content area.
    let target_cx = cx + cw / 2.0;
    let target_cy = cy + ch / 2.0;
    let used_cx = (min_x + max_x) / 2.0;
    let used_cy = (min_y + max_y) / 2.0;

    let map_x = |x: f64| target_cx + (x - used_cx) * scale;
    let map_y = |y: f64| target_cy + (y - used_cy) * scale;

    for el in elements.iter_mut() {
        let nx = map_x(el.x);
        let ny = map_y(el.y);
        el.x = nx;
        el.y = ny;
        el.width *= scale;
        el.height *= scale;
        el.corner_radius *= scale;

        if el.kind == ElementKind::Block {
            if let Some(text) = &el.text {
                let max_pt = text.font_size_pt.min(LABEL_MAX_PT);
                el.text = Some(measurer.fit(
                    &text.text,
                    el.width,
                    &brief.theme.font_family,
                    LABEL_MIN_PT,
                    max_pt.max(LABEL_MIN_PT),
                    true,
                ));
            }
        }
    }
    for conn in connectors.iter_mut() {
        conn.x1 = map_x(conn.x1);
        conn.y1 = map_y(conn.y1);
        conn.x2 = map_x(conn.x2);
        conn.y2 = map_y(conn.y2);
    }

    if needs_scale {
        warnings.push(Warning::UniformScalingApplied { scale });
        tracing::debug!(scale, "uniform scaling fallback applied");
    }
}

fn bounds(
    elements: &[PositionedElement],
    connectors: &[PositionedConnector],
) -> Option<(f64, f64, f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut any = false;

    for el in elements {
        any = true;
        min_x = min_x.min(el.x);
        min_y = min_y.min(el.y);
        max_x = max_x.max(el.right());
        max_y = max_y.max(el.bottom());
    }
    for c in connectors {
        any = true;
        min_x = min_x.min(c.x1.min(c.x2));
        min_y = min_y.min(c.y1.min(c.y2));
        max_x = max_x.max(c.x1.max(c.x2));
        max_y = max_y.max(c.y1.max(c.y2));
    }

    any.then_some((min_x, min_y, max_x, max_y))
}
