use crate::model::MeasuredText;
use slidesmith_core::script;

/// Horizontal padding subtracted from the available width on each side before
/// any fitting decision.
pub const TEXT_SIDE_PADDING_IN: f64 = 0.15;

pub const LINE_HEIGHT_FACTOR: f64 = 1.3;

/// Hard cap for the truncation fallback, excluding the ellipsis.
pub const TRUNCATE_MAX_CHARS: usize = 30;

const POINTS_PER_INCH: f64 = 72.0;

/// Flat advance bump for bold runs. Real bold deltas are per-glyph; a flat
/// factor keeps the model deterministic across the fallback chain.
const BOLD_WIDTH_FACTOR: f64 = 1.05;

/// Width model attached to one family in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WidthProfile {
    Latin,
    Cjk,
    Arabic,
    Hebrew,
    Universal,
}

impl WidthProfile {
    fn covers(self, ch: char) -> bool {
        match self {
            WidthProfile::Latin => ch.is_ascii() || ('\u{00a0}'..='\u{024f}').contains(&ch),
            WidthProfile::Cjk => script::is_wide_cjk(ch),
            WidthProfile::Arabic => {
                matches!(ch, '\u{0600}'..='\u{06ff}' | '\u{0750}'..='\u{077f}' | '\u{fe70}'..='\u{feff}')
            }
            WidthProfile::Hebrew => {
                matches!(ch, '\u{0590}'..='\u{05ff}' | '\u{fb1d}'..='\u{fb4f}')
            }
            WidthProfile::Universal => true,
        }
    }

    fn char_em(self, ch: char) -> f64 {
        match self {
            WidthProfile::Latin | WidthProfile::Universal => latin_char_em(ch),
            WidthProfile::Cjk => 1.0,
            WidthProfile::Arabic => 0.52,
            WidthProfile::Hebrew => 0.56,
        }
    }
}

/// Per-character advance estimates for Latin text, derived from measuring a
/// common sans stack at 16 px and bucketing by glyph class.
fn latin_char_em(ch: char) -> f64 {
    if ch == ' ' {
        return 0.33;
    }
    if ch == '\t' {
        return 0.66;
    }
    if ch == '_' || ch == '-' {
        return 0.33;
    }
    if matches!(ch, '.' | ',' | ':' | ';') {
        return 0.28;
    }
    if matches!(ch, '(' | ')' | '[' | ']' | '{' | '}' | '/') {
        return 0.33;
    }
    if matches!(ch, '+' | '*' | '=' | '\\' | '^' | '|' | '~') {
        return 0.45;
    }
    if ch.is_ascii_digit() {
        return 0.56;
    }
    if ch.is_ascii_uppercase() {
        return match ch {
            'I' => 0.30,
            'W' => 0.85,
            _ => 0.60,
        };
    }
    if ch.is_ascii_lowercase() {
        return match ch {
            'i' | 'l' => 0.28,
            'm' | 'w' => 0.78,
            'k' | 'y' => 0.55,
            _ => 0.43,
        };
    }
    if script::is_wide_cjk(ch) {
        return 1.0;
    }
    // Everything else: lean on the Unicode width class. Combining marks take
    // no advance, wide glyphs a full em, the rest a generic sans advance.
    match unicode_width::UnicodeWidthChar::width(ch) {
        Some(0) => 0.0,
        Some(w) if w >= 2 => 1.0,
        _ => 0.60,
    }
}

#[derive(Debug, Clone)]
struct FontFamily {
    name: String,
    profile: WidthProfile,
}

/// Ordered family list consulted per code point when the requested family
/// lacks coverage: {configured brand font, Latin default, CJK, Arabic,
/// Hebrew, universal}. Immutable after startup load; shared read-only.
#[derive(Debug, Clone)]
pub struct FontRegistry {
    families: Vec<FontFamily>,
}

impl FontRegistry {
    /// Builds a registry from the configured chain. Profiles are inferred
    /// from the family name; the final entry always acts as the universal
    /// fallback regardless of its name.
    pub fn from_chain(chain: &[String]) -> Self {
        let last = chain.len().saturating_sub(1);
        let families = chain
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let lower = name.to_ascii_lowercase();
                let profile = if idx == last {
                    WidthProfile::Universal
                } else if lower.contains("cjk")
                    || lower.contains("jp")
                    || lower.contains("sc")
                    || lower.contains("tc")
                    || lower.contains("kr")
                {
                    WidthProfile::Cjk
                } else if lower.contains("arab") || lower.contains("naskh") {
                    WidthProfile::Arabic
                } else if lower.contains("hebrew") {
                    WidthProfile::Hebrew
                } else {
                    WidthProfile::Latin
                };
                FontFamily {
                    name: name.clone(),
                    profile,
                }
            })
            .collect();
        Self { families }
    }

    pub fn family_names(&self) -> impl Iterator<Item = &str> {
        self.families.iter().map(|f| f.name.as_str())
    }

    /// The profile that will actually render `ch` when `requested` is asked
    /// for: the requested family if it covers the code point, otherwise the
    /// first chain entry that does.
    fn resolve(&self, requested: &str, ch: char) -> WidthProfile {
        if let Some(family) = self
            .families
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(requested))
        {
            if family.profile.covers(ch) {
                return family.profile;
            }
        }
        self.families
            .iter()
            .map(|f| f.profile)
            .find(|p| p.covers(ch))
            .unwrap_or(WidthProfile::Universal)
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::from_chain(&slidesmith_core::Config::default().font_fallback_chain)
    }
}

/// Pure, thread-safe text measurement.
///
/// `measure` returns `(width_in, height_in)` for a single line; `fit` is the
/// shared sizing strategy and never errors — unfittable text degrades to a
/// truncated line with `fits = false`.
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str, family: &str, size_pt: f64, bold: bool) -> (f64, f64);

    fn fit(
        &self,
        text: &str,
        max_width_in: f64,
        family: &str,
        min_size_pt: f64,
        max_size_pt: f64,
        bold: bool,
    ) -> MeasuredText {
        let avail = (max_width_in - 2.0 * TEXT_SIDE_PADDING_IN).max(0.1);
        let text = text.trim();
        let words: Vec<&str> = text.split_whitespace().collect();

        let mut size = max_size_pt.floor().max(min_size_pt);
        while size >= min_size_pt {
            if let Some(lines) = self.try_fit_at(text, &words, avail, family, size, bold) {
                let height = line_height_in(size) * lines.len() as f64;
                return MeasuredText {
                    text: text.to_string(),
                    lines,
                    font_size_pt: size,
                    height_in: height,
                    fits: true,
                };
            }
            size -= 1.0;
        }

        // Nothing fits at the minimum size: truncate to a single capped line.
        let truncated = truncate_with_ellipsis(text);
        MeasuredText {
            text: text.to_string(),
            lines: vec![truncated],
            font_size_pt: min_size_pt,
            height_in: line_height_in(min_size_pt),
            fits: false,
        }
    }

    /// One fitting attempt at a fixed size: single line, then a balanced
    /// two-line word split, then — only at small sizes with enough words —
    /// an equal-thirds three-line split.
    fn try_fit_at(
        &self,
        text: &str,
        words: &[&str],
        avail: f64,
        family: &str,
        size_pt: f64,
        bold: bool,
    ) -> Option<Vec<String>> {
        let fits_one = |line: &str| self.measure(line, family, size_pt, bold).0 <= avail;

        if fits_one(text) {
            return Some(vec![text.to_string()]);
        }
        if words.len() < 2 {
            return None;
        }

        // Two lines: try split points nearest the character midpoint first so
        // the halves stay balanced.
        let mut splits: Vec<usize> = (1..words.len()).collect();
        let total_chars: usize = words.iter().map(|w| w.chars().count() + 1).sum();
        splits.sort_by_key(|&i| {
            let left: usize = words[..i].iter().map(|w| w.chars().count() + 1).sum();
            left.abs_diff(total_chars / 2)
        });
        for &i in &splits {
            let left = words[..i].join(" ");
            let right = words[i..].join(" ");
            if fits_one(&left) && fits_one(&right) {
                return Some(vec![left, right]);
            }
        }

        if size_pt <= 14.0 && words.len() >= 3 {
            let a = words.len().div_ceil(3);
            let b = (2 * words.len()).div_ceil(3).max(a + 1).min(words.len() - 1);
            let first = words[..a].join(" ");
            let second = words[a..b].join(" ");
            let third = words[b..].join(" ");
            if fits_one(&first) && fits_one(&second) && fits_one(&third) {
                return Some(vec![first, second, third]);
            }
        }

        None
    }
}

pub fn line_height_in(size_pt: f64) -> f64 {
    size_pt / POINTS_PER_INCH * LINE_HEIGHT_FACTOR
}

fn truncate_with_ellipsis(text: &str) -> String {
    if text.chars().count() <= TRUNCATE_MAX_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(TRUNCATE_MAX_CHARS).collect();
    out.push('…');
    out
}

/// Applies the script-aware width multiplier: CJK-heavy strings render wider
/// than their per-glyph advances suggest once real CJK fonts substitute in.
fn cjk_width_multiplier(text: &str) -> f64 {
    1.0 + 0.8 * script::cjk_ratio(text)
}

/// Registry-backed measurer: every code point is priced by the family that
/// would actually render it after fallback resolution.
#[derive(Debug, Clone, Default)]
pub struct FontMetricsTextMeasurer {
    registry: FontRegistry,
}

impl FontMetricsTextMeasurer {
    pub fn new(registry: FontRegistry) -> Self {
        Self { registry }
    }
}

impl TextMeasurer for FontMetricsTextMeasurer {
    fn measure(&self, text: &str, family: &str, size_pt: f64, bold: bool) -> (f64, f64) {
        let size_pt = size_pt.max(1.0);
        let mut em = 0.0;
        for ch in text.chars() {
            em += self.registry.resolve(family, ch).char_em(ch);
        }
        let mut width = em * size_pt / POINTS_PER_INCH * cjk_width_multiplier(text);
        if bold {
            width *= BOLD_WIDTH_FACTOR;
        }
        (width, size_pt / POINTS_PER_INCH)
    }
}

/// Chain-free estimate used where no registry is configured (tests, CLI
/// dry runs). Same glyph-class table, no per-family resolution.
#[derive(Debug, Clone, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, _family: &str, size_pt: f64, bold: bool) -> (f64, f64) {
        let size_pt = size_pt.max(1.0);
        let em: f64 = text.chars().map(latin_char_em).sum();
        let mut width = em * size_pt / POINTS_PER_INCH * cjk_width_multiplier(text);
        if bold {
            width *= BOLD_WIDTH_FACTOR;
        }
        (width, size_pt / POINTS_PER_INCH)
    }
}
