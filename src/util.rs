// Number parsing and formatting helpers shared by the loader and renderers.
use num_format::{Locale, ToFormattedString};

/// Parse a CSV cell into `f64`, forgiving about thousands separators and
/// surrounding whitespace. Plain and exponent forms (`1e-05`) parse as-is;
/// words such as `NA`, `nan` or `inf` are text.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(v) = s.parse::<f64>().ok().filter(|v| v.is_finite()) {
        return Some(v);
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    s.replace(',', "").parse::<f64>().ok()
}

/// Fixed-decimal formatting with thousands separators, e.g. `1,234,567.89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    let s = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if n.is_sign_negative() && s.chars().any(|c| c != '0' && c != '.') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Percentage of `part` in `total`; zero when the total is zero.
pub fn share_pct(part: f64, total: f64) -> f64 {
    if total.abs() < f64::EPSILON {
        0.0
    } else {
        part / total * 100.0
    }
}

/// Horizontal bar of at most `width` cells, scaled against `max`.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "█".repeat(cells.clamp(1, width))
}

/// Bar for a value that may be negative, scaled against the largest
/// magnitude. Negative values draw with a lighter glyph after a minus sign.
pub fn signed_bar(value: f64, max_abs: f64, width: usize) -> String {
    if value < 0.0 {
        let cells = bar(-value, max_abs, width).chars().count();
        format!("-{}", "░".repeat(cells))
    } else {
        bar(value, max_abs, width)
    }
}

/// File-name friendly form of a section title.
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_with_separators() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("NA")), None);
        assert_eq!(parse_f64_safe(Some("1e-05")), Some(1e-5));
        assert_eq!(parse_f64_safe(Some("-2.5E3")), Some(-2500.0));
        assert_eq!(parse_f64_safe(Some("nan")), None);
        assert_eq!(parse_f64_safe(Some("inf")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 1), "-42.0");
        assert_eq!(format_number(12.0, 0), "12");
        assert_eq!(format_int(9855), "9,855");
    }

    #[test]
    fn bars_scale_to_width() {
        assert_eq!(bar(50.0, 100.0, 10).chars().count(), 5);
        assert_eq!(bar(0.001, 100.0, 10).chars().count(), 1);
        assert_eq!(bar(0.0, 100.0, 10), "");
    }

    #[test]
    fn signed_bars_mark_negatives() {
        assert_eq!(signed_bar(-50.0, 100.0, 10), format!("-{}", "░".repeat(5)));
        assert_eq!(signed_bar(100.0, 100.0, 10), "█".repeat(10));
    }

    #[test]
    fn slugs_titles() {
        assert_eq!(slug("Top 10 Gases"), "top-10-gases");
        assert_eq!(slug("Emissão vs. Remoção"), "emissão-vs-remoção");
    }
}
