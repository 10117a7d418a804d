use super::{block, connector, edge_point_outward, fit_block_label};
use crate::model::{ElementKind, PositionedConnector, PositionedElement};
use crate::text::TextMeasurer;
use slidesmith_core::units::content_area;
use slidesmith_core::{Brief, ConnectorStyle, Emphasis, Warning};

/// Satellite circle radius as a fraction of the smaller content dimension.
const RADIUS_FACTOR: f64 = 0.35;
const SATELLITE_WIDTH_IN: f64 = 1.7;
const HUB_WIDTH_IN: f64 = 2.0;

/// Central hub with satellites on a circle, angles starting at the top
/// (270°) and advancing clockwise in even steps.
pub(super) fn layout(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
    warnings: &mut Vec<Warning>,
) -> (Vec<PositionedElement>, Vec<PositionedConnector>) {
    let (cx, cy, cw, ch) = content_area();
    if brief.entities.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let hub_idx = brief
        .entities
        .iter()
        .position(|e| e.emphasis == Emphasis::Primary)
        .unwrap_or(0);
    let hub_entity = &brief.entities[hub_idx];
    let satellites: Vec<_> = brief
        .entities
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != hub_idx)
        .map(|(_, e)| e)
        .collect();

    let center_x = cx + cw / 2.0;
    let center_y = cy + ch / 2.0;
    let radius = RADIUS_FACTOR * cw.min(ch);

    let (hub_text, hub_h) = fit_block_label(&hub_entity.label, HUB_WIDTH_IN, &brief.theme, measurer);
    let mut hub = block(
        &hub_entity.id,
        center_x - HUB_WIDTH_IN / 2.0,
        center_y - hub_h / 2.0,
        HUB_WIDTH_IN,
        hub_h,
        // The hub always reads as primary even when the model forgot to say so.
        Emphasis::Primary,
        hub_text,
        &brief.theme,
    );
    // Fully-rounded corners mark the hub; the SVG renderer draws it as an
    // ellipse, the slide renderer as a maximally rounded shape.
    hub.corner_radius = hub.height.min(hub.width) / 2.0;

    let n = satellites.len();
    let mut sats = Vec::with_capacity(n);
    for (k, entity) in satellites.iter().enumerate() {
        let angle = (270.0 + k as f64 * 360.0 / n.max(1) as f64).to_radians();
        let sx = center_x + radius * angle.cos();
        let sy = center_y + radius * angle.sin();
        let (text, h) = fit_block_label(&entity.label, SATELLITE_WIDTH_IN, &brief.theme, measurer);
        sats.push(block(
            &entity.id,
            sx - SATELLITE_WIDTH_IN / 2.0,
            sy - h / 2.0,
            SATELLITE_WIDTH_IN,
            h,
            entity.emphasis,
            text,
            &brief.theme,
        ));
    }

    shrink_satellites_until_disjoint(&hub, &mut sats, warnings);

    // Shrunk boxes get their labels re-fitted so text stays inside them.
    for sat in &mut sats {
        if sat.width < SATELLITE_WIDTH_IN - 1e-9 {
            if let Some(text) = &sat.text {
                let max_pt = text.font_size_pt.max(super::LABEL_MIN_PT);
                sat.text = Some(measurer.fit(
                    &text.text,
                    sat.width,
                    &brief.theme.font_family,
                    super::LABEL_MIN_PT,
                    max_pt,
                    true,
                ));
            }
        }
    }

    let mut connectors = Vec::with_capacity(n);
    for sat in &sats {
        let dx = sat.center_x() - hub.center_x();
        let dy = sat.center_y() - hub.center_y();
        let start = edge_point_outward(&hub, dx, dy);
        let end = edge_point_outward(sat, -dx, -dy);
        connectors.push(connector(
            format!("spoke-{}", sat.id),
            start,
            end,
            ConnectorStyle::Plain,
            &brief.theme.secondary,
        ));
    }

    let mut elements = vec![hub];
    elements.extend(sats);
    (elements, connectors)
}

/// Dense rings cannot widen the circle (the radius is fixed by contract), so
/// crowded satellites shrink in place around their centers until pairwise
/// clear. Degradation, not failure; recorded as a warning.
///
/// Clearance is checked on inset-inflated rectangles: spoke endpoints sit one
/// inset outside each shape, so shapes must keep two insets of air between
/// them for the endpoints to clear both bounding boxes.
fn shrink_satellites_until_disjoint(
    hub: &PositionedElement,
    sats: &mut [PositionedElement],
    warnings: &mut Vec<Warning>,
) {
    const STEP: f64 = 0.92;
    const MAX_ROUNDS: usize = 16;

    let mut total_scale = 1.0;
    for _ in 0..MAX_ROUNDS {
        if !has_any_crowding(hub, sats) {
            break;
        }
        total_scale *= STEP;
        for sat in sats.iter_mut() {
            let cx = sat.center_x();
            let cy = sat.center_y();
            sat.width *= STEP;
            sat.height *= STEP;
            sat.x = cx - sat.width / 2.0;
            sat.y = cy - sat.height / 2.0;
        }
    }

    if total_scale < 1.0 {
        warnings.push(Warning::UniformScalingApplied { scale: total_scale });
    }
}

fn inflated(el: &PositionedElement, d: f64) -> PositionedElement {
    let mut out = el.clone();
    out.x -= d;
    out.y -= d;
    out.width += 2.0 * d;
    out.height += 2.0 * d;
    out
}

fn has_any_crowding(hub: &PositionedElement, sats: &[PositionedElement]) -> bool {
    debug_assert_eq!(hub.kind, ElementKind::Block);
    let d = slidesmith_core::units::CONNECTOR_INSET_IN;
    let hub = inflated(hub, d);
    for (i, a) in sats.iter().enumerate() {
        let a = inflated(a, d);
        if a.overlaps(&hub) {
            return true;
        }
        for b in sats.iter().skip(i + 1) {
            if a.overlaps(&inflated(b, d)) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use crate::solver::solve;
    use crate::text::FontMetricsTextMeasurer;
    use slidesmith_core::{Brief, DiagramType, Emphasis, Entity};

    fn hub_brief(satellites: usize) -> Brief {
        let mut brief = Brief::new(DiagramType::HubSpoke, "Partner ecosystem");
        brief
            .entities
            .push(Entity::new("hub", "Core Platform").with_emphasis(Emphasis::Primary));
        for i in 0..satellites {
            brief
                .entities
                .push(Entity::new(format!("p{i}"), format!("Partner {i}")));
        }
        brief
    }

    #[test]
    fn first_satellite_starts_at_the_top() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&hub_brief(4), &measurer).expect("layout");
        let hub = solved.layout.elements.iter().find(|e| e.id == "hub").unwrap();
        let first = solved.layout.elements.iter().find(|e| e.id == "p0").unwrap();
        assert!(first.center_y() < hub.center_y());
        assert!((first.center_x() - hub.center_x()).abs() < 1e-6);
    }

    #[test]
    fn every_satellite_gets_a_spoke() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&hub_brief(5), &measurer).expect("layout");
        assert_eq!(solved.layout.connectors.len(), 5);
        assert!(solved.layout.check_invariants().is_empty());
    }

    #[test]
    fn hub_is_fully_rounded() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&hub_brief(3), &measurer).expect("layout");
        let hub = solved.layout.elements.iter().find(|e| e.id == "hub").unwrap();
        assert!((hub.corner_radius - hub.width.min(hub.height) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn dense_rings_shrink_instead_of_overlapping() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&hub_brief(10), &measurer).expect("layout");
        assert!(solved.layout.check_invariants().is_empty());
        assert!(
            solved
                .warnings
                .iter()
                .any(|w| matches!(w, slidesmith_core::Warning::UniformScalingApplied { .. })),
            "expected a scaling warning for a crowded ring"
        );
    }
}
