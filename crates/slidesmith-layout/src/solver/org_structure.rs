use super::{block, block_grid_width, connector, fit_block_label};
use crate::model::{PositionedConnector, PositionedElement};
use crate::text::TextMeasurer;
use slidesmith_core::units::{CONNECTOR_INSET_IN, content_area};
use slidesmith_core::{Brief, ConnectorStyle};
use std::collections::{HashMap, HashSet, VecDeque};

/// One row per reporting level. Parent→child edges come from the Brief's
/// connections; entities without an incoming edge are roots.
pub(super) fn layout(
    brief: &Brief,
    measurer: &dyn TextMeasurer,
) -> (Vec<PositionedElement>, Vec<PositionedConnector>) {
    let (cx, cy, cw, ch) = content_area();
    let n = brief.entities.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    let levels = assign_levels(brief);
    let rows = levels.len();

    let max_row = levels.iter().map(Vec::len).max().unwrap_or(1);
    let width = block_grid_width(max_row, cw);

    let mut height: f64 = 0.0;
    let mut texts: Vec<Option<crate::model::MeasuredText>> = Vec::with_capacity(n);
    for entity in &brief.entities {
        let (text, h) = fit_block_label(&entity.label, width, &brief.theme, measurer);
        height = height.max(h);
        texts.push(Some(text));
    }

    // Keep enough air between rows for the elbow connectors to clear both
    // shapes' bounding boxes.
    let gap = if rows > 1 {
        ((ch - rows as f64 * height) / (rows - 1) as f64).clamp(0.45, 1.2)
    } else {
        0.0
    };
    let total_h = rows as f64 * height + (rows - 1) as f64 * gap;
    let top_y = cy + (ch - total_h).max(0.0) / 2.0;

    let mut elements: Vec<Option<PositionedElement>> = vec![None; n];
    for (level, members) in levels.iter().enumerate() {
        let count = members.len();
        let cell_w = cw / count as f64;
        let y = top_y + level as f64 * (height + gap);
        for (slot, &idx) in members.iter().enumerate() {
            let entity = &brief.entities[idx];
            let w = width.min(cell_w - 0.05).max(0.6);
            let x = cx + slot as f64 * cell_w + (cell_w - w).max(0.0) / 2.0;
            let Some(text) = texts[idx].take() else {
                continue;
            };
            elements[idx] = Some(block(&entity.id, x, y, w, height, entity.emphasis, text, &brief.theme));
        }
    }
    let elements: Vec<PositionedElement> = elements.into_iter().flatten().collect();
    let by_id: HashMap<&str, usize> = elements
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.as_str(), i))
        .collect();

    // Elbow connectors: parent drops to a rail midway through the gap, the
    // rail spans the children, and a short riser reaches each child.
    let mut connectors = Vec::new();
    let mut children_of: Vec<(usize, Vec<usize>)> = Vec::new();
    {
        let mut seen_pairs = HashSet::new();
        for conn in &brief.connections {
            let (Some(&p), Some(&c)) = (by_id.get(conn.from.as_str()), by_id.get(conn.to.as_str()))
            else {
                continue;
            };
            if !seen_pairs.insert((p, c)) {
                continue;
            }
            match children_of.iter_mut().find(|(parent, _)| *parent == p) {
                Some((_, kids)) => kids.push(c),
                None => children_of.push((p, vec![c])),
            }
        }
    }

    for (parent_idx, kids) in &children_of {
        let parent = &elements[*parent_idx];
        // Only descend; a "child" on the same or higher row falls back to a
        // direct line.
        let below: Vec<&PositionedElement> = kids
            .iter()
            .map(|&k| &elements[k])
            .filter(|k| k.y > parent.bottom())
            .collect();
        if below.is_empty() {
            continue;
        }

        let rail_y = parent.bottom() + (below[0].y - parent.bottom()) / 2.0;
        connectors.push(connector(
            format!("drop-{}", parent.id),
            (parent.center_x(), parent.bottom() + CONNECTOR_INSET_IN),
            (parent.center_x(), rail_y),
            ConnectorStyle::Plain,
            &brief.theme.secondary,
        ));

        if below.len() > 1 {
            let min_x = below.iter().map(|k| k.center_x()).fold(f64::INFINITY, f64::min);
            let max_x = below.iter().map(|k| k.center_x()).fold(f64::NEG_INFINITY, f64::max);
            connectors.push(connector(
                format!("rail-{}", parent.id),
                (min_x, rail_y),
                (max_x, rail_y),
                ConnectorStyle::Plain,
                &brief.theme.secondary,
            ));
        }

        for child in below {
            connectors.push(connector(
                format!("rise-{}-{}", parent.id, child.id),
                (child.center_x(), rail_y),
                (child.center_x(), child.y - CONNECTOR_INSET_IN),
                ConnectorStyle::Plain,
                &brief.theme.secondary,
            ));
        }
    }

    (elements, connectors)
}

/// BFS level assignment. Unreachable entities (disconnected briefs) join the
/// first non-root level so nothing silently disappears.
fn assign_levels(brief: &Brief) -> Vec<Vec<usize>> {
    let index_of: HashMap<&str, usize> = brief
        .entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.as_str(), i))
        .collect();

    let mut incoming = vec![0usize; brief.entities.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); brief.entities.len()];
    for conn in &brief.connections {
        let (Some(&from), Some(&to)) = (index_of.get(conn.from.as_str()), index_of.get(conn.to.as_str()))
        else {
            continue;
        };
        if from == to {
            continue;
        }
        incoming[to] += 1;
        children[from].push(to);
    }

    let roots: Vec<usize> = (0..brief.entities.len())
        .filter(|&i| incoming[i] == 0)
        .collect();
    let roots = if roots.is_empty() { vec![0] } else { roots };

    let mut level_of: Vec<Option<usize>> = vec![None; brief.entities.len()];
    let mut queue: VecDeque<usize> = VecDeque::new();
    for &root in &roots {
        level_of[root] = Some(0);
        queue.push_back(root);
    }
    while let Some(node) = queue.pop_front() {
        let next = level_of[node].unwrap_or(0) + 1;
        for &child in &children[node] {
            if level_of[child].is_none() {
                level_of[child] = Some(next);
                queue.push_back(child);
            }
        }
    }

    let mut max_level = 0usize;
    for level in level_of.iter().flatten() {
        max_level = max_level.max(*level);
    }

    // Orphans (unreachable nodes in a cyclic brief) land one row below the
    // roots so nothing silently disappears.
    let mut levels: Vec<Vec<usize>> = vec![Vec::new(); max_level + 2];
    for (idx, level) in level_of.iter().enumerate() {
        levels[level.unwrap_or(1)].push(idx);
    }
    levels.retain(|l| !l.is_empty());
    levels
}

#[cfg(test)]
mod tests {
    use crate::solver::solve;
    use crate::text::FontMetricsTextMeasurer;
    use slidesmith_core::{Brief, Connection, ConnectorStyle, DiagramType, Entity};

    fn org_brief() -> Brief {
        let mut brief = Brief::new(DiagramType::OrgStructure, "Org");
        brief.entities = vec![
            Entity::new("ceo", "CEO"),
            Entity::new("cto", "CTO"),
            Entity::new("cfo", "CFO"),
            Entity::new("eng", "Engineering"),
            Entity::new("it", "IT"),
        ];
        let link = |from: &str, to: &str| Connection {
            from: from.to_string(),
            to: to.to_string(),
            label: None,
            style: ConnectorStyle::Plain,
        };
        brief.connections = vec![
            link("ceo", "cto"),
            link("ceo", "cfo"),
            link("cto", "eng"),
            link("cto", "it"),
        ];
        brief
    }

    #[test]
    fn levels_descend_from_the_root() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&org_brief(), &measurer).expect("layout");
        let find = |id: &str| {
            solved
                .layout
                .elements
                .iter()
                .find(|e| e.id == id)
                .unwrap()
                .y
        };
        assert!(find("ceo") < find("cto"));
        assert!(find("cto") < find("eng"));
        assert!((find("cto") - find("cfo")).abs() < 1e-9, "siblings share a row");
    }

    #[test]
    fn parent_rail_and_risers_are_emitted() {
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&org_brief(), &measurer).expect("layout");
        let ids: Vec<&str> = solved.layout.connectors.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"drop-ceo"));
        assert!(ids.contains(&"rail-ceo"));
        assert!(ids.contains(&"rise-cto-eng"));
        assert!(solved.layout.check_invariants().is_empty());
    }

    #[test]
    fn disconnected_entities_still_get_a_row() {
        let mut brief = org_brief();
        brief.entities.push(Entity::new("advisor", "Advisory Board"));
        let measurer = FontMetricsTextMeasurer::default();
        let solved = solve(&brief, &measurer).expect("layout");
        assert!(solved.layout.elements.iter().any(|e| e.id == "advisor"));
    }
}
