//! Unicode script heuristics used by text measurement and language fallback.
//!
//! These are deliberately range-based: the measurement path only needs to know
//! "wide ideographic vs. everything else" and "RTL vs. LTR", not full script
//! segmentation.

/// CJK ideographs plus Hiragana, Katakana, and Hangul — the code points the
/// width model treats as full-width.
pub fn is_wide_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{3040}'..='\u{309f}'   // Hiragana
        | '\u{30a0}'..='\u{30ff}' // Katakana
        | '\u{3400}'..='\u{4dbf}' // CJK Extension A
        | '\u{4e00}'..='\u{9fff}' // CJK Unified Ideographs
        | '\u{f900}'..='\u{faff}' // CJK Compatibility Ideographs
        | '\u{ac00}'..='\u{d7af}' // Hangul Syllables
        | '\u{ff00}'..='\u{ffef}' // Full/half-width forms
    )
}

pub fn is_rtl(ch: char) -> bool {
    matches!(ch,
        '\u{0590}'..='\u{05ff}'   // Hebrew
        | '\u{0600}'..='\u{06ff}' // Arabic
        | '\u{0750}'..='\u{077f}' // Arabic Supplement
        | '\u{fb1d}'..='\u{fdff}' // Hebrew/Arabic presentation forms
        | '\u{fe70}'..='\u{feff}' // Arabic presentation forms B
    )
}

/// Fraction of wide CJK code points among non-whitespace characters, in [0, 1].
///
/// Feeds the per-character width multiplier `1 + 0.8·ratio`.
pub fn cjk_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut wide = 0usize;
    for ch in text.chars() {
        if ch.is_whitespace() {
            continue;
        }
        total += 1;
        if is_wide_cjk(ch) {
            wide += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        wide as f64 / total as f64
    }
}

pub fn contains_rtl(text: &str) -> bool {
    text.chars().any(is_rtl)
}

/// Best-effort language tag from script membership, used only when the
/// request does not carry a tag. Kana wins over Han so Japanese text with
/// kanji resolves to `ja`.
pub fn detect_language_tag(text: &str) -> &'static str {
    let mut has_kana = false;
    let mut has_hangul = false;
    let mut has_han = false;
    let mut has_arabic = false;
    let mut has_hebrew = false;

    for ch in text.chars() {
        match ch {
            '\u{3040}'..='\u{30ff}' => has_kana = true,
            '\u{ac00}'..='\u{d7af}' => has_hangul = true,
            '\u{3400}'..='\u{9fff}' => has_han = true,
            '\u{0600}'..='\u{06ff}' | '\u{0750}'..='\u{077f}' => has_arabic = true,
            '\u{0590}'..='\u{05ff}' => has_hebrew = true,
            _ => {}
        }
    }

    if has_kana {
        "ja"
    } else if has_hangul {
        "ko"
    } else if has_han {
        "zh"
    } else if has_arabic {
        "ar"
    } else if has_hebrew {
        "he"
    } else {
        "en"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_has_zero_cjk_ratio() {
        assert_eq!(cjk_ratio("Sales Pipeline"), 0.0);
    }

    #[test]
    fn pure_japanese_has_full_ratio() {
        assert!((cjk_ratio("営業パイプライン") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mixed_text_ratio_is_fractional() {
        let r = cjk_ratio("AI戦略");
        assert!(r > 0.4 && r < 0.7, "got {r}");
    }

    #[test]
    fn language_detection_prefers_kana_over_han() {
        assert_eq!(detect_language_tag("経営戦略のタイムライン"), "ja");
        assert_eq!(detect_language_tag("价值链分析"), "zh");
        assert_eq!(detect_language_tag("조직 구조"), "ko");
        assert_eq!(detect_language_tag("سلسلة القيمة"), "ar");
        assert_eq!(detect_language_tag("שרשרת ערך"), "he");
        assert_eq!(detect_language_tag("value chain"), "en");
    }

    #[test]
    fn rtl_detection_covers_hebrew_and_arabic() {
        assert!(contains_rtl("مخطط"));
        assert!(contains_rtl("תרשים"));
        assert!(!contains_rtl("diagram"));
    }
}
