use slidesmith_core::{Brief, DiagramType, Emphasis, Entity, Layer, LayerPosition};
use slidesmith_layout::text::FontMetricsTextMeasurer;
use slidesmith_layout::solve;
use slidesmith_render::{slide, svg};
use std::collections::HashMap;
use std::io::Read;

fn marketecture_brief() -> Brief {
    let mut brief = Brief::new(DiagramType::Marketecture, "OpenText Business Units");
    brief.subtitle = Some("MyAviator as the AI layer".to_string());
    brief.entities = (0..8)
        .map(|i| Entity::new(format!("bu{i}"), format!("Business Unit {i}")))
        .collect();
    brief
        .entities
        .push(Entity::new("myaviator", "MyAviator").with_emphasis(Emphasis::Accent));
    brief.layers = vec![Layer {
        id: "ai".to_string(),
        label: "AI Layer".to_string(),
        position: LayerPosition::CrossCutting,
        members: vec!["myaviator".to_string()],
    }];
    brief.theme.primary = "0073e6".to_string();
    brief
}

fn process_brief() -> Brief {
    let mut brief = Brief::new(DiagramType::ProcessFlow, "Intake process");
    brief.entities = (0..4)
        .map(|i| Entity::new(format!("s{i}"), format!("Step {i}")))
        .collect();
    brief
}

fn read_zip_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).expect("zip opens");
    let mut part = archive.by_name(name).expect(name);
    let mut content = String::new();
    part.read_to_string(&mut content).expect("utf-8 part");
    content
}

#[test]
fn svg_is_valid_xml_with_expected_shape_counts() {
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&marketecture_brief(), &measurer).expect("layout");
    let svg_text = svg::render_svg(&solved.layout);

    let doc = roxmltree::Document::parse(&svg_text).expect("well-formed SVG");
    let root = doc.root_element();
    assert_eq!(root.tag_name().name(), "svg");
    assert!(root.attribute("viewBox").is_some());
    assert!(root.attribute("width").is_some());

    // 8 block rects + 1 band rect; the background rect is extra chrome.
    let shape_rects = doc
        .descendants()
        .filter(|n| {
            n.tag_name().name() == "rect"
                && matches!(n.attribute("data-kind"), Some("block") | Some("band"))
        })
        .count();
    assert_eq!(shape_rects, 9);

    let titles = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "text" && n.attribute("id") == Some("title-text"))
        .count();
    assert_eq!(titles, 1);
}

#[test]
fn svg_is_self_contained() {
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&process_brief(), &measurer).expect("layout");
    let svg_text = svg::render_svg(&solved.layout);
    assert!(!svg_text.contains("http://") || svg_text.contains("http://www.w3.org"));
    assert!(!svg_text.contains("href"));
    assert!(svg_text.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
}

#[test]
fn slide_package_contains_all_required_parts() {
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&marketecture_brief(), &measurer).expect("layout");
    let bytes = slide::render_slide(&solved.layout).expect("render");

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice())).expect("zip");
    for name in [
        "[Content_Types].xml",
        "_rels/.rels",
        "ppt/presentation.xml",
        "ppt/slides/slide1.xml",
        "ppt/slideMasters/slideMaster1.xml",
        "ppt/slideLayouts/slideLayout1.xml",
        "ppt/theme/theme1.xml",
    ] {
        assert!(archive.by_name(name).is_ok(), "missing part {name}");
    }
}

#[test]
fn slide_geometry_is_in_emu() {
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&process_brief(), &measurer).expect("layout");
    let bytes = slide::render_slide(&solved.layout).expect("render");

    let presentation = read_zip_part(&bytes, "ppt/presentation.xml");
    let doc = roxmltree::Document::parse(&presentation).expect("presentation XML");
    let sld_sz = doc
        .descendants()
        .find(|n| n.tag_name().name() == "sldSz")
        .expect("slide size");
    assert_eq!(sld_sz.attribute("cy"), Some("6858000"));
    assert_eq!(
        sld_sz.attribute("cx"),
        Some("12192635"),
        "13.333in at 914400 EMU/in"
    );
}

#[test]
fn slide_shapes_are_emitted_in_ascending_z() {
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&marketecture_brief(), &measurer).expect("layout");
    let bytes = slide::render_slide(&solved.layout).expect("render");
    let slide_xml = read_zip_part(&bytes, "ppt/slides/slide1.xml");

    // The band (z = -1) must appear before any block shape.
    let band_pos = slide_xml.find(r#"name="ai""#).expect("band shape present");
    let first_block = slide_xml.find(r#"name="bu0""#).expect("block shape present");
    assert!(band_pos < first_block, "band must be written first");
}

#[test]
fn renderers_agree_on_the_logical_element_set() {
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&marketecture_brief(), &measurer).expect("layout");

    let svg_text = svg::render_svg(&solved.layout);
    let doc = roxmltree::Document::parse(&svg_text).expect("svg");
    let mut svg_ids: Vec<String> = doc
        .descendants()
        .filter(|n| matches!(n.attribute("data-kind"), Some("block") | Some("band")))
        .filter_map(|n| n.attribute("id").map(str::to_string))
        .collect();

    let bytes = slide::render_slide(&solved.layout).expect("pptx");
    let slide_xml = read_zip_part(&bytes, "ppt/slides/slide1.xml");
    let slide_doc = roxmltree::Document::parse(&slide_xml).expect("slide xml");
    let mut slide_ids: Vec<String> = slide_doc
        .descendants()
        .filter(|n| n.tag_name().name() == "cNvPr")
        .filter_map(|n| n.attribute("name").map(str::to_string))
        .filter(|name| solved.layout.elements.iter().any(|e| &e.id == name))
        .collect();

    svg_ids.sort();
    slide_ids.sort();
    assert_eq!(svg_ids, slide_ids, "both renderers carry the same elements");

    // Same multiplicity too: exactly one shape per element.
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in &slide_ids {
        *counts.entry(id.as_str()).or_default() += 1;
    }
    assert!(counts.values().all(|&c| c == 1));
}

#[test]
fn rtl_text_sets_paragraph_direction() {
    let mut brief = Brief::new(DiagramType::ProcessFlow, "عملية الموافقة");
    brief.entities = vec![
        Entity::new("a", "تقديم الطلب"),
        Entity::new("b", "مراجعة"),
    ];
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&brief, &measurer).expect("layout");

    let bytes = slide::render_slide(&solved.layout).expect("pptx");
    let slide_xml = read_zip_part(&bytes, "ppt/slides/slide1.xml");
    assert!(slide_xml.contains(r#"rtl="1""#), "RTL paragraphs must be flagged");

    let svg_text = svg::render_svg(&solved.layout);
    assert!(svg_text.contains("direction:rtl"));
}

#[test]
fn hub_center_renders_as_an_ellipse_in_svg() {
    let mut brief = Brief::new(DiagramType::HubSpoke, "Ecosystem");
    brief.entities.push(Entity::new("hub", "Core").with_emphasis(Emphasis::Primary));
    for i in 0..4 {
        brief.entities.push(Entity::new(format!("p{i}"), format!("Partner {i}")));
    }
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&brief, &measurer).expect("layout");
    let svg_text = svg::render_svg(&solved.layout);

    let doc = roxmltree::Document::parse(&svg_text).expect("svg");
    let hub = doc
        .descendants()
        .find(|n| n.attribute("id") == Some("hub"))
        .expect("hub shape");
    assert_eq!(hub.tag_name().name(), "ellipse");
}

#[test]
fn text_frames_are_never_empty() {
    let measurer = FontMetricsTextMeasurer::default();
    let solved = solve(&process_brief(), &measurer).expect("layout");
    let bytes = slide::render_slide(&solved.layout).expect("pptx");
    let slide_xml = read_zip_part(&bytes, "ppt/slides/slide1.xml");
    let doc = roxmltree::Document::parse(&slide_xml).expect("slide xml");

    for tx_body in doc.descendants().filter(|n| n.tag_name().name() == "txBody") {
        let has_text = tx_body
            .descendants()
            .any(|n| n.tag_name().name() == "t" && n.text().is_some_and(|t| !t.is_empty()));
        assert!(has_text, "every text frame carries at least one character");
    }
}
