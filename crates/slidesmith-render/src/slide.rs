//! Editable-slide (PPTX) renderer.
//!
//! One slide on a blank master. Geometry converts inches → EMU exactly once,
//! here; everything upstream stays in inches. Shapes are emitted in ascending
//! z-order so back-to-front stacking is correct in any OOXML reader, and
//! connectors are plain line shapes, not auto-binding connectors, so moving a
//! block in the editor never re-routes an arrow.

use crate::svg::escape_xml;
use crate::Result;
use slidesmith_core::script;
use slidesmith_core::units::{emu_from_inches, emu_from_points};
use slidesmith_core::ConnectorStyle;
use slidesmith_layout::{ElementKind, MeasuredText, PositionedElement, PositionedLayout};
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const NS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

/// Maximum roundRect corner adjustment; matches the editor's house style.
const MAX_CORNER_ADJ: f64 = 0.15;

pub fn render_slide(layout: &PositionedLayout) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts: [(&str, String); 11] = [
        ("[Content_Types].xml", content_types_xml()),
        ("_rels/.rels", root_rels_xml()),
        ("docProps/core.xml", core_props_xml()),
        ("docProps/app.xml", app_props_xml()),
        ("ppt/presentation.xml", presentation_xml(layout)),
        ("ppt/_rels/presentation.xml.rels", presentation_rels_xml()),
        ("ppt/slideMasters/slideMaster1.xml", slide_master_xml()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            slide_master_rels_xml(),
        ),
        ("ppt/slideLayouts/slideLayout1.xml", slide_layout_xml()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            slide_layout_rels_xml(),
        ),
        ("ppt/theme/theme1.xml", theme_xml(layout)),
    ];

    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }

    zip.start_file("ppt/slides/slide1.xml", options)?;
    zip.write_all(slide_xml(layout).as_bytes())?;
    zip.start_file("ppt/slides/_rels/slide1.xml.rels", options)?;
    zip.write_all(slide_rels_xml().as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn slide_xml(layout: &PositionedLayout) -> String {
    let mut shapes = String::new();
    let mut next_id = 2u32;
    let mut id = || {
        next_id += 1;
        next_id
    };

    // Ascending z keeps bands behind blocks; title boxes and connectors go on
    // top of everything.
    for element in layout.elements_by_z() {
        write_shape(element, &layout.font_family, id(), &mut shapes);
    }
    if let Some(title) = &layout.title {
        write_text_box(title, &layout.font_family, id(), &mut shapes);
    }
    if let Some(subtitle) = &layout.subtitle {
        write_text_box(subtitle, &layout.font_family, id(), &mut shapes);
    }
    for connector in &layout.connectors {
        write_line_shape(connector, id(), &mut shapes);
        if let Some(label) = &connector.label {
            let mid_x = (connector.x1 + connector.x2) / 2.0;
            let mid_y = (connector.y1 + connector.y2) / 2.0 - 0.15;
            write_floating_text(
                label,
                &connector.id,
                &layout.font_family,
                &connector.color,
                mid_x,
                mid_y,
                id(),
                &mut shapes,
            );
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {NS}><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{bg}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>
"#,
        bg = hex_upper(&layout.background),
    )
}

fn write_shape(element: &PositionedElement, font: &str, shape_id: u32, out: &mut String) {
    let adj = if element.height > 0.0 {
        (element.corner_radius / element.height).min(MAX_CORNER_ADJ)
    } else {
        0.0
    };
    let adj_val = (adj * 100_000.0).round() as i64;

    let alpha = if element.opacity < 1.0 {
        format!(r#"<a:alpha val="{}"/>"#, (element.opacity * 100_000.0).round() as i64)
    } else {
        String::new()
    };

    let stroke = match &element.stroke {
        Some(s) => format!(
            r#"<a:ln w="{}"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:ln>"#,
            emu_from_points(s.width_pt),
            hex_upper(&s.color)
        ),
        None => r#"<a:ln><a:noFill/></a:ln>"#.to_string(),
    };

    out.push_str(&format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{shape_id}" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="roundRect"><a:avLst><a:gd name="adj" fmla="val {adj_val}"/></a:avLst></a:prstGeom><a:solidFill><a:srgbClr val="{fill}">{alpha}</a:srgbClr></a:solidFill>{stroke}</p:spPr>{body}</p:sp>"#,
        name = escape_xml(&element.id),
        x = emu_from_inches(element.x),
        y = emu_from_inches(element.y),
        cx = emu_from_inches(element.width),
        cy = emu_from_inches(element.height),
        fill = hex_upper(&element.fill),
        body = text_body(element.text.as_ref(), font, &element.text_color, true),
    ));
}

fn write_text_box(element: &PositionedElement, font: &str, shape_id: u32, out: &mut String) {
    out.push_str(&format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{shape_id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/><a:ln><a:noFill/></a:ln></p:spPr>{body}</p:sp>"#,
        name = escape_xml(&element.id),
        x = emu_from_inches(element.x),
        y = emu_from_inches(element.y),
        cx = emu_from_inches(element.width),
        cy = emu_from_inches(element.height),
        body = text_body(
            element.text.as_ref(),
            font,
            &element.text_color,
            element.kind == ElementKind::Title,
        ),
    ));
}

#[allow(clippy::too_many_arguments)]
fn write_floating_text(
    label: &MeasuredText,
    base_id: &str,
    font: &str,
    color: &str,
    center_x: f64,
    center_y: f64,
    shape_id: u32,
    out: &mut String,
) {
    let width = 1.4;
    let height = label.height_in + 0.08;
    out.push_str(&format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{shape_id}" name="{name}-label"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/><a:ln><a:noFill/></a:ln></p:spPr>{body}</p:sp>"#,
        name = escape_xml(base_id),
        x = emu_from_inches(center_x - width / 2.0),
        y = emu_from_inches(center_y - height / 2.0),
        cx = emu_from_inches(width),
        cy = emu_from_inches(height),
        body = text_body(Some(label), font, color, false),
    ));
}

/// Pre-wrapped runs, one paragraph per measured line. Word wrap stays on and
/// auto-fit stays off so the editor cannot silently resize what the layout
/// engine already sized. RTL scripts flip paragraph direction. An empty frame
/// gets a single space; readers treat truly empty frames as corruption.
fn text_body(text: Option<&MeasuredText>, font: &str, color: &str, bold: bool) -> String {
    let mut paragraphs = String::new();
    match text {
        Some(text) => {
            let b = if bold { r#" b="1""# } else { "" };
            let sz = (text.font_size_pt * 100.0).round() as i64;
            for line in &text.lines {
                let rtl = if script::contains_rtl(line) { r#" rtl="1""# } else { "" };
                let content = if line.is_empty() { " " } else { line };
                paragraphs.push_str(&format!(
                    r#"<a:p><a:pPr algn="ctr"{rtl}/><a:r><a:rPr lang="en-US" sz="{sz}"{b} dirty="0"><a:solidFill><a:srgbClr val="{color}"/></a:solidFill><a:latin typeface="{font}"/></a:rPr><a:t>{content}</a:t></a:r></a:p>"#,
                    color = hex_upper(color),
                    font = escape_xml(font),
                    content = escape_xml(content),
                ));
            }
        }
        None => {
            paragraphs.push_str(r#"<a:p><a:pPr algn="ctr"/><a:r><a:rPr lang="en-US" sz="1200" dirty="0"/><a:t> </a:t></a:r></a:p>"#);
        }
    }

    format!(
        r#"<p:txBody><a:bodyPr wrap="square" anchor="ctr"><a:noAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody>"#
    )
}

/// Plain line shape with arrowheads expressed on the stroke. Flips orient the
/// preset's TL→BR path so the tail end lands on the connector's end point.
fn write_line_shape(
    connector: &slidesmith_layout::PositionedConnector,
    shape_id: u32,
    out: &mut String,
) {
    let min_x = connector.x1.min(connector.x2);
    let min_y = connector.y1.min(connector.y2);
    let ext_x = (connector.x1 - connector.x2).abs();
    let ext_y = (connector.y1 - connector.y2).abs();

    let mut flips = String::new();
    if connector.x2 < connector.x1 {
        flips.push_str(r#" flipH="1""#);
    }
    if connector.y2 < connector.y1 {
        flips.push_str(r#" flipV="1""#);
    }

    let dash = if connector.style == ConnectorStyle::Dashed {
        r#"<a:prstDash val="dash"/>"#
    } else {
        ""
    };
    let head = if connector.style == ConnectorStyle::Bidirectional {
        r#"<a:headEnd type="triangle"/>"#
    } else {
        r#"<a:headEnd type="none"/>"#
    };
    let tail = if connector.style == ConnectorStyle::Plain {
        r#"<a:tailEnd type="none"/>"#
    } else {
        r#"<a:tailEnd type="triangle"/>"#
    };

    out.push_str(&format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{shape_id}" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm{flips}><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="line"><a:avLst/></a:prstGeom><a:ln w="{w}"><a:solidFill><a:srgbClr val="{color}"/></a:solidFill>{dash}{head}{tail}</a:ln></p:spPr></p:sp>"#,
        name = escape_xml(&connector.id),
        x = emu_from_inches(min_x),
        y = emu_from_inches(min_y),
        cx = emu_from_inches(ext_x),
        cy = emu_from_inches(ext_y),
        w = emu_from_points(connector.stroke_width_pt),
        color = hex_upper(&connector.color),
    ));
}

fn hex_upper(hex: &str) -> String {
    hex.trim_start_matches('#').to_ascii_uppercase()
}

fn content_types_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
        r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#,
        r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#,
        r#"<Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
        r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
        r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
        r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
        r#"</Types>"#,
        "\n"
    )
    .to_string()
}

fn root_rels_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>"#,
        r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
        r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>"#,
        r#"</Relationships>"#,
        "\n"
    )
    .to_string()
}

fn core_props_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">"#,
        r#"<dc:title>Generated infographic</dc:title>"#,
        r#"<dc:creator>slidesmith</dc:creator>"#,
        r#"</cp:coreProperties>"#,
        "\n"
    )
    .to_string()
}

fn app_props_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#,
        r#"<Application>slidesmith</Application>"#,
        r#"<Slides>1</Slides>"#,
        r#"</Properties>"#,
        "\n"
    )
    .to_string()
}

fn presentation_xml(layout: &PositionedLayout) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst><p:sldSz cx="{cx}" cy="{cy}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>
"#,
        cx = emu_from_inches(layout.slide_width),
        cy = emu_from_inches(layout.slide_height),
    )
}

fn presentation_rels_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
        r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/>"#,
        r#"</Relationships>"#,
        "\n"
    )
    .to_string()
}

fn slide_master_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster {NS}><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="FFFFFF"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>
"#
    )
}

fn slide_master_rels_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#,
        r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/>"#,
        r#"</Relationships>"#,
        "\n"
    )
    .to_string()
}

fn slide_layout_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout {NS} type="blank"><p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>
"#
    )
}

fn slide_layout_rels_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/>"#,
        r#"</Relationships>"#,
        "\n"
    )
    .to_string()
}

fn slide_rels_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#,
        r#"</Relationships>"#,
        "\n"
    )
    .to_string()
}

fn theme_xml(layout: &PositionedLayout) -> String {
    let font = escape_xml(&layout.font_family);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="slidesmith"><a:themeElements><a:clrScheme name="slidesmith"><a:dk1><a:srgbClr val="1E293B"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="475569"/></a:dk2><a:lt2><a:srgbClr val="F1F5F9"/></a:lt2><a:accent1><a:srgbClr val="2563EB"/></a:accent1><a:accent2><a:srgbClr val="475569"/></a:accent2><a:accent3><a:srgbClr val="F59E0B"/></a:accent3><a:accent4><a:srgbClr val="10B981"/></a:accent4><a:accent5><a:srgbClr val="8B5CF6"/></a:accent5><a:accent6><a:srgbClr val="EF4444"/></a:accent6><a:hlink><a:srgbClr val="2563EB"/></a:hlink><a:folHlink><a:srgbClr val="8B5CF6"/></a:folHlink></a:clrScheme><a:fontScheme name="slidesmith"><a:majorFont><a:latin typeface="{font}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="{font}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="slidesmith"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_upper_strips_hash_and_uppercases() {
        assert_eq!(hex_upper("#2563eb"), "2563EB");
        assert_eq!(hex_upper("ffffff"), "FFFFFF");
    }

    #[test]
    fn slide_package_has_pptx_magic() {
        let layout = PositionedLayout {
            slide_width: 13.333,
            slide_height: 7.5,
            background: "ffffff".to_string(),
            font_family: "Inter".to_string(),
            title: None,
            subtitle: None,
            elements: Vec::new(),
            connectors: Vec::new(),
        };
        let bytes = render_slide(&layout).expect("render");
        assert!(bytes.starts_with(b"PK"), "zip container signature expected");
    }
}
