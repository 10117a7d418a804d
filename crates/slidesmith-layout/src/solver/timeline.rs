use super::connector;
use crate::model::{ElementKind, PositionedConnector, PositionedElement};
use crate::text::TextMeasurer;
use crate::theme;
use slidesmith_core::units::{GUTTER_X_IN, content_area};
use slidesmith_core::{Brief, ConnectorStyle};

const MARKER_SIDE_IN: f64 = 0.14;
/// Vertical clearance between the axis and description boxes.
const BRANCH_OFFSET_IN: f64 = 0.4;

/// Horizontal axis at the vertical midpoint, equally spaced markers, date
/// labels hugging the axis, descriptions alternating above/below.
pub(super) fn layout(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
) -> (Vec<PositionedElement>, Vec<PositionedConnector>) {
    let (cx, cy, cw, ch) = content_area();
    let n = brief.entities.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    let mid_y = cy + ch / 2.0;
    let slot_w = cw / n as f64;
    let box_w = (slot_w - GUTTER_X_IN).max(0.8);

    let axis = connector(
        "axis".to_string(),
        (cx + 0.1, mid_y),
        (cx + cw - 0.1, mid_y),
        ConnectorStyle::Plain,
        &brief.theme.secondary,
    );

    let mut elements = Vec::new();
    for (i, entity) in brief.entities.iter().enumerate() {
        let center_x = cx + (i as f64 + 0.5) * slot_w;
        let above = i % 2 == 0;

        let marker_fill = theme::fill_for(entity.emphasis, &brief.theme);
        elements.push(PositionedElement {
            id: format!("marker-{}", entity.id),
            kind: ElementKind::Label,
            x: center_x - MARKER_SIDE_IN / 2.0,
            y: mid_y - MARKER_SIDE_IN / 2.0,
            width: MARKER_SIDE_IN,
            height: MARKER_SIDE_IN,
            fill: marker_fill.clone(),
            stroke: None,
            corner_radius: MARKER_SIDE_IN / 2.0,
            text: None,
            text_color: theme::text_on(&marker_fill),
            opacity: 1.0,
            z: 1,
            layer_id: None,
        });

        // Date label adjacent to the marker, on the side opposite the
        // description box.
        let date_text = measurer.fit(&entity.label, box_w, &brief.theme.font_family, 9.0, 12.0, true);
        let date_h = date_text.height_in + 0.06;
        let date_y = if above {
            mid_y + MARKER_SIDE_IN / 2.0 + 0.08
        } else {
            mid_y - MARKER_SIDE_IN / 2.0 - 0.08 - date_h
        };
        elements.push(PositionedElement {
            id: format!("date-{}", entity.id),
            kind: ElementKind::Label,
            x: center_x - box_w / 2.0,
            y: date_y,
            width: box_w,
            height: date_h,
            fill: brief.theme.background.clone(),
            stroke: None,
            corner_radius: 0.0,
            text: Some(date_text),
            text_color: brief.theme.text.clone(),
            opacity: 1.0,
            z: 1,
            layer_id: None,
        });

        let body = entity.description.as_deref().unwrap_or(&entity.label);
        let body_text = measurer.fit(body, box_w, &brief.theme.font_family, 9.0, 13.0, true);
        let body_h = (body_text.height_in + 2.0 * brief.theme.padding).max(0.5);
        let body_y = if above {
            mid_y - BRANCH_OFFSET_IN - body_h
        } else {
            mid_y + BRANCH_OFFSET_IN
        };
        let fill = theme::fill_for(slidesmith_core::Emphasis::Normal, &brief.theme);
        elements.push(PositionedElement {
            id: entity.id.clone(),
            kind: ElementKind::Block,
            x: center_x - box_w / 2.0,
            y: body_y,
            width: box_w,
            height: body_h,
            fill: fill.clone(),
            stroke: None,
            corner_radius: brief.theme.corner_radius,
            text: Some(body_text),
            text_color: theme::text_on(&fill),
            opacity: 1.0,
            z: 0,
            layer_id: None,
        });
    }

    (elements, vec![axis])
}
