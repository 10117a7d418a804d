//! Input preprocessing: palette normalization, logo color extraction, and
//! the shallow template theme snapshot.
//!
//! Uploads are opaque blobs; nothing here parses deeply. The logo path runs
//! a small deterministic k-means over downscaled pixels, the template path
//! does a single pass over the theme part's XML text.

use slidesmith_core::{Error, Result, color};
use slidesmith_gateway::BrandSnapshot;
use std::io::Read;

pub const MAX_PALETTE_COLORS: usize = 10;
const KMEANS_K: usize = 5;
const KMEANS_ROUNDS: usize = 12;
/// Logos are downscaled so the clustering input never exceeds this edge.
const MAX_LOGO_EDGE: u32 = 500;

/// Normalizes a caller-supplied palette to 6-hex lowercase, rejecting
/// malformed colors and truncating to the documented maximum.
pub fn parse_palette(raw: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(raw.len().min(MAX_PALETTE_COLORS));
    for entry in raw.iter().take(MAX_PALETTE_COLORS) {
        let Some(normalized) = color::normalize_hex(entry) else {
            return Err(Error::invalid_input(format!(
                "palette color {entry:?} is not a hex color"
            )));
        };
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    Ok(out)
}

/// Dominant logo colors via k-means (k = 5) on downscaled pixels, most
/// populous cluster first. Deterministic: centroids seed from evenly spaced
/// pixels, never from randomness.
pub fn extract_logo_palette(bytes: &[u8]) -> Result<Vec<String>> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| Error::invalid_input(format!("logo image is unreadable: {e}")))?;
    let scaled = decoded.thumbnail(MAX_LOGO_EDGE, MAX_LOGO_EDGE).to_rgba8();

    let pixels: Vec<[f64; 3]> = scaled
        .pixels()
        .filter(|p| p.0[3] >= 128)
        .map(|p| [p.0[0] as f64, p.0[1] as f64, p.0[2] as f64])
        .collect();
    if pixels.is_empty() {
        return Err(Error::invalid_input(
            "logo image has no opaque pixels".to_string(),
        ));
    }

    let k = KMEANS_K.min(pixels.len());
    let mut centroids: Vec<[f64; 3]> = (0..k)
        .map(|i| pixels[i * (pixels.len() - 1) / k.max(1)])
        .collect();
    let mut assignment = vec![0usize; pixels.len()];

    for _ in 0..KMEANS_ROUNDS {
        for (slot, pixel) in assignment.iter_mut().zip(&pixels) {
            *slot = nearest_centroid(pixel, &centroids);
        }
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (slot, pixel) in assignment.iter().zip(&pixels) {
            counts[*slot] += 1;
            for c in 0..3 {
                sums[*slot][c] += pixel[c];
            }
        }
        for i in 0..k {
            if counts[i] > 0 {
                for c in 0..3 {
                    centroids[i][c] = sums[i][c] / counts[i] as f64;
                }
            }
        }
    }

    let mut counts = vec![0usize; k];
    for slot in &assignment {
        counts[*slot] += 1;
    }
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(counts[i]));

    Ok(order
        .into_iter()
        .filter(|&i| counts[i] > 0)
        .map(|i| {
            color::to_hex(
                centroids[i][0].round().clamp(0.0, 255.0) as u8,
                centroids[i][1].round().clamp(0.0, 255.0) as u8,
                centroids[i][2].round().clamp(0.0, 255.0) as u8,
            )
        })
        .collect())
}

fn nearest_centroid(pixel: &[f64; 3], centroids: &[[f64; 3]]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let dist = (0..3).map(|j| (pixel[j] - c[j]).powi(2)).sum::<f64>();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Shallow theme snapshot from an uploaded template: one read of the theme
/// part, colors and a font family only, no structural parsing. Anything that
/// fails simply yields no snapshot — templates are advisory.
pub fn extract_template_theme(bytes: &[u8]) -> Option<BrandSnapshot> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).ok()?;
    let mut xml = String::new();
    archive
        .by_name("ppt/theme/theme1.xml")
        .ok()?
        .read_to_string(&mut xml)
        .ok()?;

    static COLOR_RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    static FONT_RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let color_re = COLOR_RE
        .get_or_init(|| regex::Regex::new(r#"srgbClr val="([0-9A-Fa-f]{6})""#).expect("static regex"));
    let font_re =
        FONT_RE.get_or_init(|| regex::Regex::new(r#"typeface="([^"]+)""#).expect("static regex"));

    let mut colors = Vec::new();
    for captures in color_re.captures_iter(&xml) {
        let hex = captures[1].to_ascii_lowercase();
        // Theme parts open with black/white slots; skip them for the palette.
        if hex == "000000" || hex == "ffffff" {
            continue;
        }
        if !colors.contains(&hex) {
            colors.push(hex);
        }
        if colors.len() >= 6 {
            break;
        }
    }

    let font_family = font_re
        .captures_iter(&xml)
        .map(|c| c[1].to_string())
        .find(|f| !f.is_empty());

    if colors.is_empty() && font_family.is_none() {
        return None;
    }
    Some(BrandSnapshot {
        colors,
        font_family,
    })
}
