//! PNG rasterization of the SVG preview.
//!
//! The raster output is a convenience export, not a fidelity target: it is
//! produced from the same positioned layout via the SVG renderer, so shapes
//! and positions match the preview exactly while font rendering follows
//! whatever the host system provides.

use crate::{Error, Result, svg};
use slidesmith_layout::PositionedLayout;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: f32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self { scale: 2.0 }
    }
}

pub fn render_png(layout: &PositionedLayout) -> Result<Vec<u8>> {
    render_png_with(layout, &RasterOptions::default())
}

pub fn render_png_with(layout: &PositionedLayout, options: &RasterOptions) -> Result<Vec<u8>> {
    let svg_text = svg::render_svg(layout);
    svg_to_png(&svg_text, options)
}

pub fn svg_to_png(svg_text: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let mut opt = usvg::Options::default();
    // Keep output stable-ish across environments while still using system fonts.
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "Arial".to_string();

    let tree = usvg::Tree::from_str(svg_text, &opt).map_err(|_| Error::SvgParse)?;
    let size = tree.size();
    let width_px = (size.width() * options.scale).ceil().max(1.0) as u32;
    let height_px = (size.height() * options.scale).ceil().max(1.0) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or(Error::PixmapAlloc)?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(options.scale, options.scale),
        &mut pixmap.as_mut(),
    );

    pixmap.encode_png().map_err(|_| Error::PngEncode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_to_png_produces_png_signature() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><rect width="10" height="10" fill="black"/></svg>"#;
        let bytes = svg_to_png(svg, &RasterOptions { scale: 1.0 }).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    }
}
