//! Hex color plumbing shared by the brief model, the layout engine's theme
//! mapping, and the renderers.
//!
//! Internal representation is always 6-hex lowercase without the leading `#`.

/// Accepts `#abc`, `#aabbcc`, `abc`, `AABBCC` and returns the canonical
/// 6-hex lowercase form. Returns `None` for anything else.
pub fn normalize_hex(input: &str) -> Option<String> {
    let s = input.trim().trim_start_matches('#');
    let expand = |c: char| -> Option<[char; 2]> {
        let c = c.to_ascii_lowercase();
        c.is_ascii_hexdigit().then_some([c, c])
    };

    match s.len() {
        3 => {
            let mut out = String::with_capacity(6);
            for c in s.chars() {
                let [a, b] = expand(c)?;
                out.push(a);
                out.push(b);
            }
            Some(out)
        }
        6 => {
            if s.chars().all(|c| c.is_ascii_hexdigit()) {
                Some(s.to_ascii_lowercase())
            } else {
                None
            }
        }
        _ => None,
    }
}

pub fn is_normalized_hex(s: &str) -> bool {
    s.len() == 6
        && s.chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let s = hex.trim().trim_start_matches('#');
    if s.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some((r, g, b))
}

pub fn to_hex(r: u8, g: u8, b: u8) -> String {
    format!("{r:02x}{g:02x}{b:02x}")
}

/// WCAG relative luminance in [0, 1].
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn channel(v: u8) -> f64 {
        let c = v as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * channel(r) + 0.7152 * channel(g) + 0.0722 * channel(b)
}

/// Picks a readable text color for the given fill: near-black on light
/// fills, white on dark fills, switching at 0.5 relative luminance.
pub fn text_color_for(fill_hex: &str) -> &'static str {
    match parse_hex(fill_hex) {
        Some((r, g, b)) if relative_luminance(r, g, b) < 0.5 => "ffffff",
        Some(_) => "1e293b",
        None => "1e293b",
    }
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if (max - r).abs() < f64::EPSILON {
        ((g - b) / d + if g < b { 6.0 } else { 0.0 }) / 6.0
    } else if (max - g).abs() < f64::EPSILON {
        ((b - r) / d + 2.0) / 6.0
    } else {
        ((r - g) / d + 4.0) / 6.0
    };
    (h * 360.0, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 1.0 / 2.0 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    }

    if s <= f64::EPSILON {
        let v = (l * 255.0).round().clamp(0.0, 255.0) as u8;
        return (v, v, v);
    }
    let h = (h.rem_euclid(360.0)) / 360.0;
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let r = hue_to_channel(p, q, h + 1.0 / 3.0);
    let g = hue_to_channel(p, q, h);
    let b = hue_to_channel(p, q, h - 1.0 / 3.0);
    (
        (r * 255.0).round().clamp(0.0, 255.0) as u8,
        (g * 255.0).round().clamp(0.0, 255.0) as u8,
        (b * 255.0).round().clamp(0.0, 255.0) as u8,
    )
}

/// Raises HSL lightness by `amount` (0.2 = +20 %), clamped to [0, 1].
/// Used to derive the subdued tint for normal-emphasis blocks.
pub fn lighten(hex: &str, amount: f64) -> String {
    let Some((r, g, b)) = parse_hex(hex) else {
        return hex.to_string();
    };
    let (h, s, l) = rgb_to_hsl(r, g, b);
    let (r, g, b) = hsl_to_rgb(h, s, (l + amount).clamp(0.0, 1.0));
    to_hex(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_short_and_prefixed_forms() {
        assert_eq!(normalize_hex("#0073E6").as_deref(), Some("0073e6"));
        assert_eq!(normalize_hex("abc").as_deref(), Some("aabbcc"));
        assert_eq!(normalize_hex("not-a-color"), None);
        assert_eq!(normalize_hex("#12345"), None);
    }

    #[test]
    fn luminance_threshold_picks_readable_text() {
        assert_eq!(text_color_for("0b1f44"), "ffffff");
        assert_eq!(text_color_for("f8fafc"), "1e293b");
    }

    #[test]
    fn lighten_moves_toward_white() {
        let lighter = lighten("2563eb", 0.2);
        let (r0, g0, b0) = parse_hex("2563eb").unwrap();
        let (r1, g1, b1) = parse_hex(&lighter).unwrap();
        assert!(relative_luminance(r1, g1, b1) > relative_luminance(r0, g0, b0));
    }

    #[test]
    fn lighten_keeps_gray_axis_stable() {
        assert_eq!(lighten("808080", 0.0), "808080");
    }
}
