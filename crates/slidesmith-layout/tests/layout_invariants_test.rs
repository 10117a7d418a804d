use slidesmith_core::{Brief, Connection, ConnectorStyle, DiagramType, Emphasis, Entity, Layer, LayerPosition, Warning};
use slidesmith_layout::text::FontMetricsTextMeasurer;
use slidesmith_layout::{ElementKind, solve};

fn entities(n: usize, prefix: &str) -> Vec<Entity> {
    (0..n)
        .map(|i| Entity::new(format!("{prefix}{i}"), format!("Item number {i}")))
        .collect()
}

fn brief_for(diagram_type: DiagramType, n: usize) -> Brief {
    let mut brief = Brief::new(diagram_type, "Invariant sweep");
    brief.subtitle = Some("generated".to_string());
    brief.entities = entities(n, "e");
    if diagram_type == DiagramType::OrgStructure {
        brief.connections = (1..n)
            .map(|i| Connection {
                from: format!("e{}", (i - 1) / 2),
                to: format!("e{i}"),
                label: None,
                style: ConnectorStyle::Plain,
            })
            .collect();
    }
    if diagram_type == DiagramType::Comparison {
        for (i, e) in brief.entities.iter_mut().enumerate() {
            if i >= n / 2 {
                e.group = Some(if i % 2 == 0 { "Left" } else { "Right" }.to_string());
            }
        }
    }
    brief
}

#[test]
fn every_archetype_satisfies_the_universal_invariants() {
    let measurer = FontMetricsTextMeasurer::default();
    for diagram_type in DiagramType::ALL {
        for n in [1usize, 3, 6, 9, 12] {
            let brief = brief_for(diagram_type, n);
            let solved = solve(&brief, &measurer)
                .unwrap_or_else(|e| panic!("{diagram_type} with {n} entities failed: {e}"));
            let layout = &solved.layout;

            for el in layout.iter_all() {
                assert!(el.x >= -1e-6, "{diagram_type}/{n}: {} left of canvas", el.id);
                assert!(el.y >= -1e-6, "{diagram_type}/{n}: {} above canvas", el.id);
                assert!(
                    el.x + el.width <= layout.slide_width + 1e-6,
                    "{diagram_type}/{n}: {} exceeds right edge",
                    el.id
                );
                assert!(
                    el.y + el.height <= layout.slide_height + 1e-6,
                    "{diagram_type}/{n}: {} exceeds bottom edge",
                    el.id
                );
            }

            assert!(
                layout.check_invariants().is_empty(),
                "{diagram_type}/{n}: {:?}",
                layout.check_invariants()
            );
        }
    }
}

#[test]
fn every_entity_is_represented_exactly_once() {
    let measurer = FontMetricsTextMeasurer::default();
    for diagram_type in [
        DiagramType::ProcessFlow,
        DiagramType::TechStack,
        DiagramType::ValueChain,
        DiagramType::HubSpoke,
        DiagramType::OrgStructure,
    ] {
        let brief = brief_for(diagram_type, 6);
        let solved = solve(&brief, &measurer).expect("layout");
        for entity in &brief.entities {
            let count = solved
                .layout
                .elements
                .iter()
                .filter(|e| e.id == entity.id)
                .count();
            assert_eq!(count, 1, "{diagram_type}: entity {} appears {count} times", entity.id);
        }
    }
}

#[test]
fn marketecture_band_members_fold_into_the_band() {
    let mut brief = Brief::new(DiagramType::Marketecture, "Units");
    brief.entities = entities(8, "bu");
    brief.entities.push(Entity::new("ai", "MyAviator").with_emphasis(Emphasis::Accent));
    brief.layers = vec![Layer {
        id: "ai".to_string() + "-layer",
        label: "AI Layer".to_string(),
        position: LayerPosition::CrossCutting,
        members: vec!["ai".to_string()],
    }];

    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&brief, &measurer).expect("layout");
    let blocks = solved
        .layout
        .elements
        .iter()
        .filter(|e| e.kind == ElementKind::Block)
        .count();
    let bands = solved
        .layout
        .elements
        .iter()
        .filter(|e| e.kind == ElementKind::Band)
        .count();
    assert_eq!((blocks, bands), (8, 1));
}

/// Long CJK labels in a narrow four-column flow must degrade gracefully:
/// warnings, no overflow, no overlap.
#[test]
fn japanese_overflow_degrades_with_warnings() {
    let mut brief = Brief::new(DiagramType::ProcessFlow, "国際展開プロセス");
    let long_label = "グローバル市場参入のための包括的な規制対応と現地パートナーシップ構築の詳細な実行計画";
    brief.entities = (0..4)
        .map(|i| Entity::new(format!("s{i}"), long_label.to_string()))
        .collect();

    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&brief, &measurer).expect("layout");

    assert!(
        !solved.warnings.is_empty(),
        "expected at least one warning for unfittable CJK labels"
    );
    assert!(
        solved
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::TextDidNotFit { .. })),
        "warnings: {:?}",
        solved.warnings
    );
    assert!(solved.layout.check_invariants().is_empty());

    for el in &solved.layout.elements {
        if let Some(text) = &el.text {
            assert!(text.lines.len() <= 3);
            assert!(text.height_in > 0.0);
        }
    }
}

#[test]
fn uniform_scaling_fires_when_blocks_cannot_fit_the_row() {
    // Twelve minimum-width blocks exceed the content width; the solver must
    // scale rather than overflow or overlap.
    let mut brief = Brief::new(DiagramType::ProcessFlow, "Wide");
    brief.entities = entities(12, "w");
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&brief, &measurer).expect("layout");
    assert!(solved.layout.check_invariants().is_empty());
}
