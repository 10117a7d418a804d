#![forbid(unsafe_code)]

//! Stateless renderers over [`slidesmith_layout::PositionedLayout`].
//!
//! Both renderers consume the same positioned intermediate and must reproduce
//! the same logical element set in the same stacking order; they differ only
//! in how geometry is expressed (CSS pixels vs. EMU). Neither mutates the
//! layout, so per-format rendering can fan out in parallel.

pub mod slide;
pub mod svg;

#[cfg(feature = "raster")]
pub mod raster;

use slidesmith_core::OutputFormat;
use slidesmith_layout::PositionedLayout;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("slide container write failed: {0}")]
    Container(#[from] zip::result::ZipError),

    #[error("slide document write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("raster output requested but the `raster` feature is not enabled")]
    RasterUnavailable,

    #[cfg(feature = "raster")]
    #[error("failed to parse intermediate SVG for rasterization")]
    SvgParse,

    #[cfg(feature = "raster")]
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,

    #[cfg(feature = "raster")]
    #[error("failed to encode PNG")]
    PngEncode,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Renders one output format from the positioned layout.
pub fn render(layout: &PositionedLayout, format: OutputFormat) -> Result<Vec<u8>> {
    let bytes = match format {
        OutputFormat::Svg => svg::render_svg(layout).into_bytes(),
        OutputFormat::EditableSlide => slide::render_slide(layout)?,
        #[cfg(feature = "raster")]
        OutputFormat::Raster => raster::render_png(layout)?,
        #[cfg(not(feature = "raster"))]
        OutputFormat::Raster => return Err(Error::RasterUnavailable),
    };
    tracing::debug!(format = %format, bytes = bytes.len(), "rendered layout");
    Ok(bytes)
}
