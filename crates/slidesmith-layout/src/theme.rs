use slidesmith_core::color;
use slidesmith_core::{Emphasis, Theme};

/// Lightness bump applied to the primary color for normal-emphasis blocks.
const NORMAL_TINT_LIGHTEN: f64 = 0.2;

/// Maps an entity's emphasis class onto the theme role that fills it.
pub fn fill_for(emphasis: Emphasis, theme: &Theme) -> String {
    match emphasis {
        Emphasis::Primary => theme.primary.clone(),
        Emphasis::Secondary => theme.secondary.clone(),
        Emphasis::Accent => theme.accent.clone(),
        Emphasis::Normal => color::lighten(&theme.primary, NORMAL_TINT_LIGHTEN),
    }
}

/// Cross-cutting bands take the accent role so they read as an overlay rather
/// than another block row.
pub fn band_fill(theme: &Theme) -> String {
    theme.accent.clone()
}

pub fn text_on(fill: &str) -> String {
    color::text_color_for(fill).to_string()
}
