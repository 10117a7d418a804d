use super::block;
use crate::model::{PositionedConnector, PositionedElement};
use crate::text::TextMeasurer;
use slidesmith_core::units::{BLOCK_MAX_HEIGHT_IN, GUTTER_Y_IN, content_area};
use slidesmith_core::Brief;

/// Horizontal pull-in from the content edges; stack layers read better
/// slightly narrower than full width.
const STACK_SIDE_INSET_IN: f64 = 0.5;

/// Full-width rows stacked bottom-up: the first entity is the foundation
/// layer, the last is the application layer. The reasoning prompt asks the
/// model to list stack entities foundation-first.
pub(super) fn layout(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
) -> (Vec<PositionedElement>, Vec<PositionedConnector>) {
    let (cx, cy, cw, ch) = content_area();
    let n = brief.entities.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    let width = cw - 2.0 * STACK_SIDE_INSET_IN;
    let x = cx + STACK_SIDE_INSET_IN;

    let row_h = ((ch - (n - 1) as f64 * GUTTER_Y_IN) / n as f64)
        .min(BLOCK_MAX_HEIGHT_IN)
        .max(0.4);
    let total_h = n as f64 * row_h + (n - 1) as f64 * GUTTER_Y_IN;
    let top_y = cy + (ch - total_h).max(0.0) / 2.0;

    let mut elements = Vec::with_capacity(n);
    for (i, entity) in brief.entities.iter().enumerate() {
        // Bottom-up: entity 0 occupies the lowest row.
        let row_from_top = n - 1 - i;
        let y = top_y + row_from_top as f64 * (row_h + GUTTER_Y_IN);
        let text = measurer.fit(
            &entity.label,
            width,
            &brief.theme.font_family,
            super::LABEL_MIN_PT,
            super::LABEL_MAX_PT,
            true,
        );
        elements.push(block(&entity.id, x, y, width, row_h, entity.emphasis, text, &brief.theme));
    }

    (elements, Vec::new())
}
