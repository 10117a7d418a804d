//! Self-contained SVG preview renderer.
//!
//! The viewBox is inches × 96 so downstream CSS pixel math stays trivial.
//! Every shape carries a stable `id` (the element id) plus a `data-kind`
//! attribute so the browser editor can address shapes without positional
//! assumptions. Text is emitted as `<text>` nodes, never outlined paths.

use slidesmith_core::script;
use slidesmith_core::ConnectorStyle;
use slidesmith_layout::{ElementKind, MeasuredText, PositionedElement, PositionedLayout};

pub const PX_PER_INCH: f64 = 96.0;
const PX_PER_POINT: f64 = 96.0 / 72.0;

pub fn render_svg(layout: &PositionedLayout) -> String {
    let w = px(layout.slide_width);
    let h = px(layout.slide_height);

    let mut out = String::with_capacity(4096);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        fmt(w),
        fmt(h),
        fmt(w),
        fmt(h)
    ));
    out.push('\n');

    write_marker_defs(layout, &mut out);

    out.push_str(&format!(
        r#"<rect id="background" data-kind="background" x="0" y="0" width="{}" height="{}" style="fill:#{}"/>"#,
        fmt(w),
        fmt(h),
        layout.background
    ));
    out.push('\n');

    if let Some(title) = &layout.title {
        write_text_box(title, &layout.font_family, &mut out);
    }
    if let Some(subtitle) = &layout.subtitle {
        write_text_box(subtitle, &layout.font_family, &mut out);
    }

    for element in layout.elements_by_z() {
        write_element(element, &layout.font_family, &mut out);
    }

    for connector in &layout.connectors {
        write_connector(connector, &layout.font_family, &mut out);
    }

    out.push_str("</svg>\n");
    out
}

fn write_marker_defs(layout: &PositionedLayout, out: &mut String) {
    let mut colors: Vec<&str> = Vec::new();
    for connector in &layout.connectors {
        if connector.style != ConnectorStyle::Plain && !colors.contains(&connector.color.as_str()) {
            colors.push(&connector.color);
        }
    }
    if colors.is_empty() {
        return;
    }

    out.push_str("<defs>\n");
    for color in colors {
        out.push_str(&format!(
            r##"<marker id="arrow-end-{color}" viewBox="0 0 10 10" refX="9" refY="5" markerWidth="7" markerHeight="7" orient="auto-start-reverse"><path d="M 0 0 L 10 5 L 0 10 z" fill="#{color}"/></marker>"##
        ));
        out.push('\n');
    }
    out.push_str("</defs>\n");
}

fn write_element(element: &PositionedElement, font: &str, out: &mut String) {
    let kind = match element.kind {
        ElementKind::Block => "block",
        ElementKind::Band => "band",
        ElementKind::Title => "title",
        ElementKind::Subtitle => "subtitle",
        ElementKind::Label => "label",
    };

    // A fully rounded rectangle (hub centers) reads as an ellipse.
    let fully_rounded =
        element.corner_radius * 2.0 >= element.width.min(element.height) - 1e-9;

    let mut style = format!("fill:#{}", element.fill);
    if element.opacity < 1.0 {
        style.push_str(&format!(";opacity:{}", fmt(element.opacity)));
    }
    if let Some(stroke) = &element.stroke {
        style.push_str(&format!(
            ";stroke:#{};stroke-width:{}",
            stroke.color,
            fmt(stroke.width_pt * PX_PER_POINT)
        ));
    }

    if fully_rounded && element.kind == ElementKind::Block {
        out.push_str(&format!(
            r#"<ellipse id="{}" data-kind="{}" cx="{}" cy="{}" rx="{}" ry="{}" style="{}"/>"#,
            escape_xml(&element.id),
            kind,
            fmt(px(element.center_x())),
            fmt(px(element.center_y())),
            fmt(px(element.width / 2.0)),
            fmt(px(element.height / 2.0)),
            style
        ));
    } else {
        out.push_str(&format!(
            r#"<rect id="{}" data-kind="{}" x="{}" y="{}" width="{}" height="{}" rx="{}" style="{}"/>"#,
            escape_xml(&element.id),
            kind,
            fmt(px(element.x)),
            fmt(px(element.y)),
            fmt(px(element.width)),
            fmt(px(element.height)),
            fmt(px(element.corner_radius)),
            style
        ));
    }
    out.push('\n');

    if let Some(text) = &element.text {
        write_text_lines(
            text,
            element.center_x(),
            element.center_y(),
            &element.text_color,
            font,
            is_bold_kind(element.kind),
            &element.id,
            out,
        );
    }
}

fn is_bold_kind(kind: ElementKind) -> bool {
    // Everything the solvers measure bold; subtitles and connector labels
    // are the regular-weight exceptions and take their own paths.
    !matches!(kind, ElementKind::Subtitle)
}

fn write_text_box(element: &PositionedElement, font: &str, out: &mut String) {
    // Title and subtitle boxes are pure text; no shape behind them.
    if let Some(text) = &element.text {
        write_text_lines(
            text,
            element.center_x(),
            element.center_y(),
            &element.text_color,
            font,
            matches!(element.kind, ElementKind::Title),
            &element.id,
            out,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn write_text_lines(
    text: &MeasuredText,
    center_x_in: f64,
    center_y_in: f64,
    color: &str,
    font: &str,
    bold: bool,
    id: &str,
    out: &mut String,
) {
    let size_px = text.font_size_pt * PX_PER_POINT;
    let line_h = size_px * 1.3;
    let total_h = line_h * text.lines.len() as f64;
    let cx = px(center_x_in);
    let top = px(center_y_in) - total_h / 2.0;

    let rtl = script::contains_rtl(&text.text);
    let weight = if bold { ";font-weight:bold" } else { "" };
    let direction = if rtl { ";direction:rtl" } else { "" };

    out.push_str(&format!(
        r#"<text id="{}-text" data-kind="text" text-anchor="middle" style="font-family:{};font-size:{}px;fill:#{}{}{}">"#,
        escape_xml(id),
        escape_xml(font),
        fmt(size_px),
        color,
        weight,
        direction
    ));
    for (i, line) in text.lines.iter().enumerate() {
        let y = top + (i as f64 + 0.5) * line_h;
        out.push_str(&format!(
            r#"<tspan x="{}" y="{}" dominant-baseline="central">{}</tspan>"#,
            fmt(cx),
            fmt(y),
            escape_xml(line)
        ));
    }
    out.push_str("</text>\n");
}

fn write_connector(
    connector: &slidesmith_layout::PositionedConnector,
    font: &str,
    out: &mut String,
) {
    let mut style = format!(
        "stroke:#{};stroke-width:{}",
        connector.color,
        fmt(connector.stroke_width_pt * PX_PER_POINT)
    );
    if connector.style == ConnectorStyle::Dashed {
        style.push_str(";stroke-dasharray:6 4");
    }

    let mut markers = String::new();
    if connector.style != ConnectorStyle::Plain {
        markers.push_str(&format!(r#" marker-end="url(#arrow-end-{})""#, connector.color));
    }
    if connector.style == ConnectorStyle::Bidirectional {
        markers.push_str(&format!(r#" marker-start="url(#arrow-end-{})""#, connector.color));
    }

    out.push_str(&format!(
        r#"<line id="{}" data-kind="connector" x1="{}" y1="{}" x2="{}" y2="{}" style="{}"{}/>"#,
        escape_xml(&connector.id),
        fmt(px(connector.x1)),
        fmt(px(connector.y1)),
        fmt(px(connector.x2)),
        fmt(px(connector.y2)),
        style,
        markers
    ));
    out.push('\n');

    if let Some(label) = &connector.label {
        let mid_x = (connector.x1 + connector.x2) / 2.0;
        let mid_y = (connector.y1 + connector.y2) / 2.0 - 0.12;
        write_text_lines(label, mid_x, mid_y, &connector.color, font, false, &connector.id, out);
    }
}

fn px(inches: f64) -> f64 {
    inches * PX_PER_INCH
}

/// Attribute-value formatting: round-trippable decimals without float noise,
/// capped at three fractional digits the way the slide geometry is consumed.
fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut r = (v * 1000.0).round() / 1000.0;
    if r.abs() < 0.0005 {
        r = 0.0;
    }
    let mut s = format!("{r:.3}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" { "0".to_string() } else { s }
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_trims_trailing_zeros() {
        assert_eq!(fmt(1.0), "1");
        assert_eq!(fmt(1.25), "1.25");
        assert_eq!(fmt(0.12349), "0.123");
        assert_eq!(fmt(-0.0001), "0");
    }

    #[test]
    fn escape_handles_markup_characters() {
        assert_eq!(escape_xml("R&D <Core>"), "R&amp;D &lt;Core&gt;");
    }
}
