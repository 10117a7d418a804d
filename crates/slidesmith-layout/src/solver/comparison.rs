use crate::model::{ElementKind, MeasuredText, PositionedConnector, PositionedElement};
use crate::text::TextMeasurer;
use crate::theme;
use slidesmith_core::color;
use slidesmith_core::units::{GUTTER_X_IN, GUTTER_Y_IN, content_area};
use slidesmith_core::{Brief, Entity};

/// Header row/column shrink factors relative to data cells.
const HEADER_ROW_FACTOR: f64 = 0.6;
const HEADER_COL_FACTOR: f64 = 0.8;

/// Grid contract: entities with a `group` are data cells, column = group,
/// row = position within the group. Ungrouped entities are the row labels
/// (criteria) in declaration order.
pub(super) fn layout(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
) -> (Vec<PositionedElement>, Vec<PositionedConnector>) {
    let (cx, cy, cw, ch) = content_area();
    let theme_ref = &brief.theme;

    let mut groups: Vec<&str> = Vec::new();
    for entity in &brief.entities {
        if let Some(group) = entity.group.as_deref() {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
    }
    let criteria: Vec<&Entity> = brief.entities.iter().filter(|e| e.group.is_none()).collect();
    let cells_of = |group: &str| -> Vec<&Entity> {
        brief
            .entities
            .iter()
            .filter(|e| e.group.as_deref() == Some(group))
            .collect()
    };

    // Degenerate briefs without groups still render: everything becomes one
    // column of criteria-style rows.
    if groups.is_empty() {
        return single_column(brief, measurer);
    }

    let m = groups.len();
    let n = criteria
        .len()
        .max(groups.iter().map(|g| cells_of(g).len()).max().unwrap_or(0));
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    // Solve cell sizes so header + data + gutters exactly span the area.
    let data_w = (cw - m as f64 * GUTTER_X_IN) / (m as f64 + HEADER_COL_FACTOR);
    let header_w = data_w * HEADER_COL_FACTOR;
    let data_h = ((ch - n as f64 * GUTTER_Y_IN) / (n as f64 + HEADER_ROW_FACTOR)).min(1.4);
    let header_h = data_h * HEADER_ROW_FACTOR;

    let grid_h = header_h + n as f64 * (data_h + GUTTER_Y_IN);
    let top_y = cy + (ch - grid_h).max(0.0) / 2.0;

    let col_x = |c: usize| cx + header_w + GUTTER_X_IN + c as f64 * (data_w + GUTTER_X_IN);
    let row_y = |r: usize| top_y + header_h + GUTTER_Y_IN + r as f64 * (data_h + GUTTER_Y_IN);

    let mut elements = Vec::new();

    // Header row: group labels on the primary role.
    for (c, group) in groups.iter().enumerate() {
        let fill = theme_ref.primary.clone();
        let text = measurer.fit(group, data_w, &theme_ref.font_family, 10.0, 16.0, true);
        elements.push(cell(
            &format!("col-{}", slug(group)),
            col_x(c),
            top_y,
            data_w,
            header_h,
            fill,
            text,
        ));
    }

    // Header column: criteria labels on the secondary role.
    for (r, criterion) in criteria.iter().enumerate().take(n) {
        let fill = theme_ref.secondary.clone();
        let text = measurer.fit(&criterion.label, header_w, &theme_ref.font_family, 9.0, 13.0, true);
        elements.push(cell(&criterion.id, cx, row_y(r), header_w, data_h, fill, text));
    }

    // Data cells with the alternating subtle row tint.
    for (c, group) in groups.iter().enumerate() {
        for (r, entity) in cells_of(group).iter().enumerate().take(n) {
            let tint = if r % 2 == 0 { 0.22 } else { 0.30 };
            let fill = color::lighten(&theme_ref.primary, tint);
            let text = measurer.fit(&entity.label, data_w, &theme_ref.font_family, 9.0, 13.0, true);
            elements.push(cell(&entity.id, col_x(c), row_y(r), data_w, data_h, fill, text));
        }
    }

    (elements, Vec::new())
}

fn single_column(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
) -> (Vec<PositionedElement>, Vec<PositionedConnector>) {
    let (cx, cy, cw, ch) = content_area();
    let n = brief.entities.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let row_h = ((ch - (n - 1) as f64 * GUTTER_Y_IN) / n as f64).min(1.0);
    let mut elements = Vec::new();
    for (r, entity) in brief.entities.iter().enumerate() {
        let tint = if r % 2 == 0 { 0.22 } else { 0.30 };
        let fill = color::lighten(&brief.theme.primary, tint);
        let text = measurer.fit(&entity.label, cw, &brief.theme.font_family, 9.0, 13.0, true);
        elements.push(cell(
            &entity.id,
            cx,
            cy + r as f64 * (row_h + GUTTER_Y_IN),
            cw,
            row_h,
            fill,
            text,
        ));
    }
    (elements, Vec::new())
}

fn cell(
    id: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    fill: String,
    text: MeasuredText,
) -> PositionedElement {
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
        corner_radius: 0.03,
        text: Some(text),
        text_color,
        opacity: 1.0,
        z: 0,
        layer_id: None,
    }
}

fn slug(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::solver::solve;
    use crate::text::FontMetricsTextMeasurer;
    use slidesmith_core::{Brief, DiagramType, Entity};

    fn comparison_brief() -> Brief {
        let mut brief = Brief::new(DiagramType::Comparison, "Build vs buy");
        brief.entities = vec![
            Entity::new("cost", "Cost"),
            Entity::new("speed", "Time to market"),
            Entity::new("build-cost", "High upfront").with_group("Build"),
            Entity::new("build-speed", "Slow").with_group("Build"),
            Entity::new("buy-cost", "Subscription").with_group("Buy"),
            Entity::new("buy-speed", "Immediate").with_group("Buy"),
        ];
        brief
    }

    #[test]
    fn grid_has_headers_plus_cells() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&comparison_brief(), &measurer).expect("layout");
        // 2 column headers + 2 row headers + 4 data cells.
        assert_eq!(solved.layout.elements.len(), 8);
        assert!(solved.layout.check_invariants().is_empty());
    }

    #[test]
    fn header_row_is_shorter_than_data_rows() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&comparison_brief(), &measurer).expect("layout");
        let header = solved
            .layout
            .elements
            .iter()
            .find(|e| e.id.starts_with("col-"))
            .unwrap();
        let data = solved
            .layout
            .elements
            .iter()
            .find(|e| e.id == "build-cost")
            .unwrap();
        assert!(header.height < data.height);
    }

    #[test]
    fn rows_alternate_tints() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&comparison_brief(), &measurer).expect("layout");
        let row0 = solved.layout.elements.iter().find(|e| e.id == "build-cost").unwrap();
        let row1 = solved.layout.elements.iter().find(|e| e.id == "build-speed").unwrap();
        assert_ne!(row0.fill, row1.fill);
    }
}
