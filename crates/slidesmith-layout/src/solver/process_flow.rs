use super::{block, block_grid_width, connector, fit_block_label};
use crate::model::{PositionedConnector, PositionedElement};
use crate::text::TextMeasurer;
use slidesmith_core::units::{CONNECTOR_INSET_IN, GUTTER_Y_IN, content_area};
use slidesmith_core::{Brief, Connection, ConnectorStyle};
use std::collections::HashMap;

/// Above this step count the flow folds into two rows with a U-turn.
const U_TURN_THRESHOLD: usize = 6;

pub(super) fn layout(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
) -> (Vec<PositionedElement>, Vec<PositionedConnector>) {
    let (cx, cy, cw, ch) = content_area();
    let n = brief.entities.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    let two_rows = n > U_TURN_THRESHOLD;
    let cols = if two_rows { n.div_ceil(2) } else { n };
    let cell_w = cw / cols as f64;
    // The cell pitch bounds the width so dense flows stay disjoint, with
    // enough air between neighbors for the connector endpoint inset.
    let width = block_grid_width(cols, cw)
        .min(cell_w - 1.5 * CONNECTOR_INSET_IN)
        .max(0.3);

    let mut height: f64 = 0.0;
    let mut texts = Vec::with_capacity(n);
    for entity in &brief.entities {
        let (text, h) = fit_block_label(&entity.label, width, &brief.theme, measurer);
        height = height.max(h);
        texts.push(text);
    }

    let rows = if two_rows { 2 } else { 1 };
    let total_h = rows as f64 * height + (rows - 1) as f64 * (GUTTER_Y_IN + 0.6);
    let top_y = cy + (ch - total_h).max(0.0) / 2.0;

    // Reading order: top row left-to-right, bottom row right-to-left so the
    // flow folds back under itself.
    let mut elements = Vec::with_capacity(n);
    for (i, (entity, text)) in brief.entities.iter().zip(texts).enumerate() {
        let (row, col) = if i < cols { (0, i) } else { (1, n - 1 - i) };
        let x = cx + col as f64 * cell_w + (cell_w - width) / 2.0;
        let y = top_y + row as f64 * (height + GUTTER_Y_IN + 0.6);
        elements.push(block(&entity.id, x, y, width, height, entity.emphasis, text, &brief.theme));
    }

    // Labels/styles from authored connections apply when they match a step
    // boundary; everything else defaults to a plain arrow.
    let authored: HashMap<(&str, &str), &Connection> = brief
        .connections
        .iter()
        .map(|c| ((c.from.as_str(), c.to.as_str()), c))
        .collect();

    let mut connectors = Vec::new();
    for i in 0..n.saturating_sub(1) {
        let a = &elements[i];
        let b = &elements[i + 1];
        let same_row = (a.y - b.y).abs() < 1e-9;

        let (start, end) = if same_row {
            let going_right = b.x > a.x;
            if going_right {
                (
                    (a.right() + CONNECTOR_INSET_IN, a.center_y()),
                    (b.x - CONNECTOR_INSET_IN, b.center_y()),
                )
            } else {
                (
                    (a.x - CONNECTOR_INSET_IN, a.center_y()),
                    (b.right() + CONNECTOR_INSET_IN, b.center_y()),
                )
            }
        } else {
            // U-turn: drop from the last top-row block to the first
            // bottom-row block in the same column.
            (
                (a.center_x(), a.bottom() + CONNECTOR_INSET_IN),
                (b.center_x(), b.y - CONNECTOR_INSET_IN),
            )
        };

        let key = (
            brief.entities[i].id.as_str(),
            brief.entities[i + 1].id.as_str(),
        );
        let (style, label) = match authored.get(&key) {
            Some(c) => (c.style, c.label.clone()),
            None => (ConnectorStyle::Arrow, None),
        };

        let mut conn = connector(
            format!("step-{}-{}", key.0, key.1),
            start,
            end,
            style,
            &brief.theme.secondary,
        );
        if let Some(label) = label {
            conn.label = Some(measurer.fit(&label, 1.2, &brief.theme.font_family, 8.0, 11.0, false));
        }
        connectors.push(conn);
    }

    (elements, connectors)
}

#[cfg(test)]
mod tests {
    use crate::solver::solve;
    use crate::text::FontMetricsTextMeasurer;
    use slidesmith_core::{Brief, DiagramType, Entity};

    fn flow(n: usize) -> Brief {
        let mut brief = Brief::new(DiagramType::ProcessFlow, "Flow");
        brief.entities = (0..n)
            .map(|i| Entity::new(format!("s{i}"), format!("Step {i}")))
            .collect();
        brief
    }

    #[test]
    fn short_flows_stay_on_one_row() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&flow(5), &measurer).expect("layout");
        let ys: Vec<i64> = solved
            .layout
            .elements
            .iter()
            .map(|e| (e.y * 1000.0) as i64)
            .collect();
        assert!(ys.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(solved.layout.connectors.len(), 4);
    }

    #[test]
    fn long_flows_fold_into_two_rows_with_a_u_turn() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&flow(8), &measurer).expect("layout");
        let layout = &solved.layout;

        let mut ys: Vec<i64> = layout.elements.iter().map(|e| (e.y * 100.0) as i64).collect();
        ys.sort();
        ys.dedup();
        assert_eq!(ys.len(), 2, "expected exactly two rows");

        // Bottom row runs right-to-left: its first block sits at the right edge.
        let bottom_y = *ys.last().unwrap();
        let bottom: Vec<_> = layout
            .elements
            .iter()
            .filter(|e| (e.y * 100.0) as i64 == bottom_y)
            .collect();
        let first_bottom = layout.elements.iter().find(|e| e.id == "s4").unwrap();
        let max_x = bottom.iter().map(|e| e.x).fold(f64::MIN, f64::max);
        assert!((first_bottom.x - max_x).abs() < 1e-6);

        assert_eq!(layout.connectors.len(), 7);
        assert!(layout.check_invariants().is_empty());
    }

    #[test]
    fn connector_endpoints_clear_their_blocks() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&flow(4), &measurer).expect("layout");
        for conn in &solved.layout.connectors {
            for el in &solved.layout.elements {
                assert!(!el.contains_point(conn.x1, conn.y1));
                assert!(!el.contains_point(conn.x2, conn.y2));
            }
        }
    }
}
