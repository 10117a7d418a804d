use super::{block, block_grid_width, fit_block_label};
use crate::model::{ElementKind, PositionedConnector, PositionedElement};
use crate::text::TextMeasurer;
use crate::theme;
use slidesmith_core::units::{CROSSCUT_BAND_HEIGHT_IN, GUTTER_Y_IN, content_area};
use slidesmith_core::{Brief, Layer, LayerPosition};
use std::collections::HashSet;

/// Row-weight split: cross-cut bands get a thin row, the main business-unit
/// row takes the remainder.
const BAND_ROW_WEIGHT: f64 = 1.0;
const MAIN_ROW_WEIGHT: f64 = 3.0;

pub(super) fn layout(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
) -> (Vec<PositionedElement>, Vec<PositionedConnector>) {
    let (cx, cy, cw, ch) = content_area();
    let theme = &brief.theme;

    let band_layers: Vec<&Layer> = brief.cross_cutting_layers().collect();
    let (top_bands, bottom_bands): (Vec<&Layer>, Vec<&Layer>) = band_layers
        .iter()
        .copied()
        .partition(|l| l.position != LayerPosition::Bottom);

    // Entities absorbed into a band are represented by that band, not by a
    // block in the main row.
    let banded: HashSet<&str> = band_layers
        .iter()
        .flat_map(|l| l.members.iter().map(String::as_str))
        .collect();
    let main: Vec<_> = brief
        .entities
        .iter()
        .filter(|e| !banded.contains(e.id.as_str()))
        .collect();

    let weight_units = MAIN_ROW_WEIGHT
        + if top_bands.is_empty() { 0.0 } else { BAND_ROW_WEIGHT }
        + if bottom_bands.is_empty() { 0.0 } else { BAND_ROW_WEIGHT };
    let unit_h = ch / weight_units;

    let mut elements = Vec::new();
    let mut y = cy;

    if !top_bands.is_empty() {
        let row_h = unit_h * BAND_ROW_WEIGHT;
        place_bands(&top_bands, brief, measurer, cx, y, cw, row_h, &mut elements);
        y += row_h + GUTTER_Y_IN;
    }

    let main_h = unit_h * MAIN_ROW_WEIGHT - GUTTER_Y_IN;
    place_main_row(&main, brief, measurer, cx, y, cw, main_h, &mut elements);
    y += main_h + GUTTER_Y_IN;

    if !bottom_bands.is_empty() {
        let row_h = unit_h * BAND_ROW_WEIGHT;
        place_bands(&bottom_bands, brief, measurer, cx, y, cw, row_h, &mut elements);
    }

    (elements, Vec::new())
}

fn place_main_row(
    entities: &[&slidesmith_core::Entity],
    brief: &Brief,
    measurer: &dyn TextMeasurer,
    cx: f64,
    row_y: f64,
    cw: f64,
    row_h: f64,
    out: &mut Vec<PositionedElement>,
) {
    if entities.is_empty() {
        return;
    }
    let n = entities.len();
    let cell_w = cw / n as f64;
    // Dense rows win over the minimum block width; the cell pitch is the
    // hard bound that keeps neighbors disjoint.
    let width = block_grid_width(n, cw).min(cell_w - 0.05).max(0.3);

    let mut sized = Vec::with_capacity(n);
    let mut height: f64 = 0.0;
    for entity in entities {
        let (text, h) = fit_block_label(&entity.label, width, &brief.theme, measurer);
        height = height.max(h);
        sized.push(text);
    }
    let height = height.min(row_h.max(0.5));
    let y = row_y + (row_h - height).max(0.0) / 2.0;

    for (i, (entity, text)) in entities.iter().zip(sized).enumerate() {
        let x = cx + i as f64 * cell_w + (cell_w - width) / 2.0;
        let mut el = block(&entity.id, x, y, width, height, entity.emphasis, text, &brief.theme);
        el.layer_id = entity.group.clone();
        out.push(el);
    }
}

/// A cross-cutting layer becomes one full-width band behind the blocks,
/// label centered, `z = -1`.
fn place_bands(
    layers: &[&Layer],
    brief: &Brief,
    measurer: &dyn TextMeasurer,
    cx: f64,
    row_y: f64,
    cw: f64,
    row_h: f64,
    out: &mut Vec<PositionedElement>,
) {
    let n = layers.len();
    let slot_h = (row_h - (n.saturating_sub(1)) as f64 * GUTTER_Y_IN) / n as f64;
    let band_h = CROSSCUT_BAND_HEIGHT_IN.min(slot_h);

    for (i, layer) in layers.iter().enumerate() {
        let slot_y = row_y + i as f64 * (slot_h + GUTTER_Y_IN);
        let y = slot_y + (slot_h - band_h) / 2.0;
        let fill = theme::band_fill(&brief.theme);
        let text_color = theme::text_on(&fill);
        let text = measurer.fit(&layer.label, cw, &brief.theme.font_family, 10.0, 18.0, true);
        out.push(PositionedElement {
            id: layer.id.clone(),
            kind: ElementKind::Band,
            x: cx,
            y,
            width: cw,
            height: band_h,
            fill,
            stroke: None,
            corner_radius: brief.theme.corner_radius,
            text: Some(text),
            text_color,
            opacity: 0.92,
            z: -1,
            layer_id: Some(layer.id.clone()),
        });
    }
}
