use super::fit_block_label;
use crate::model::{ElementKind, PositionedConnector, PositionedElement};
use crate::text::TextMeasurer;
use crate::theme;
use slidesmith_core::units::{BLOCK_MAX_WIDTH_IN, content_area};
use slidesmith_core::Brief;

/// Chevron tips overlap the next segment by this fraction of the block width.
const TIP_OVERLAP_FACTOR: f64 = 0.1;

/// Horizontal chevron chain on one row.
///
/// The visual chain advances by `0.9·w` per segment; stored rectangles are
/// trimmed to the advance so block rectangles stay pairwise disjoint while
/// segments still read as a tight chain.
pub(super) fn layout(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
) -> (Vec<PositionedElement>, Vec<PositionedConnector>) {
    let (cx, cy, cw, ch) = content_area();
    let n = brief.entities.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    // Solve the nominal width so n segments with (n-1) tip overlaps span the
    // content width exactly, then clamp to the block envelope.
    let nominal = cw / (n as f64 - (n as f64 - 1.0) * TIP_OVERLAP_FACTOR);
    let width = nominal.min(BLOCK_MAX_WIDTH_IN);
    let advance = width * (1.0 - TIP_OVERLAP_FACTOR);
    let chain_w = advance * (n as f64 - 1.0) + width;
    let start_x = cx + (cw - chain_w).max(0.0) / 2.0;

    let mut height: f64 = 0.0;
    let mut texts = Vec::with_capacity(n);
    for entity in &brief.entities {
        let (text, h) = fit_block_label(&entity.label, advance, &brief.theme, measurer);
        height = height.max(h);
        texts.push(text);
    }
    let y = cy + (ch - height) / 2.0;

    let mut elements = Vec::with_capacity(n);
    for (i, (entity, text)) in brief.entities.iter().zip(texts).enumerate() {
        let x = start_x + i as f64 * advance;
        let w = if i + 1 == n { width } else { advance };
        let fill = theme::fill_for(entity.emphasis, &brief.theme);
        let text_color = theme::text_on(&fill);
        elements.push(PositionedElement {
            id: entity.id.clone(),
            kind: ElementKind::Block,
            x,
            y,
            width: w,
            height,
            fill,
            stroke: None,
            corner_radius: brief.theme.corner_radius,
            text: Some(text),
            text_color,
            opacity: 1.0,
            z: 0,
            layer_id: entity.group.clone(),
        });
    }

    (elements, Vec::new())
}
