//! Value normalizer
//!
//! Pure, idempotent rewrites over a declaration value, applied in a fixed
//! order. Running the pipeline twice yields the same output as once.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{COLOR_PROPERTIES, SHORT_COLORS, SHORT_FONT_WEIGHTS};

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static COMMA_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s+").unwrap());
static RGB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rgb\s*\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)").unwrap());
static ZERO_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|\s)0(?:%|(?:px|em|in|cm|mm|pc|pt|ex|rem)\b)").unwrap()
});
static LEADING_ZERO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(^|\s)0\.(\d+)").unwrap());
static TRAILING_DOT_ZERO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.0(\s|$)").unwrap());
static LONE_DOT_ZERO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)\.0(\s|$)").unwrap());

/// Rewrite one declaration value into its shortest equivalent form
///
/// `property` selects property-specific rules: the shorthand tables, and the
/// `filter` exemption — IE's legacy `chroma()` syntax breaks when commas are
/// tightened or colors shortened inside a filter value.
pub fn compress_value(value: &str, property: &str, short_value: bool) -> String {
    let mut value = COMMENT_RE.replace_all(value, "").into_owned();
    value = WHITESPACE_RE.replace_all(&value, " ").into_owned();

    if short_value {
        value = get_short_value(&value, property);
    }

    if !property.eq_ignore_ascii_case("filter") {
        value = COMMA_SPACE_RE.replace_all(&value, ",").into_owned();
        value = shorten_hex_colors(&value);
    }

    value = ZERO_UNIT_RE.replace_all(&value, "${1}0").into_owned();
    value = LEADING_ZERO_RE.replace_all(&value, "${1}.${2}").into_owned();
    value = TRAILING_DOT_ZERO_RE.replace_all(&value, "${1}${2}").into_owned();
    value = LONE_DOT_ZERO_RE.replace_all(&value, "${1}0${2}").into_owned();
    value.trim().to_string()
}

/// Property-specific shorthand rewrites
fn get_short_value(value: &str, property: &str) -> String {
    let property = property.to_ascii_lowercase();
    if matches!(property.as_str(), "border-color" | "border-style" | "border-width")
        && !value.contains('(')
    {
        return short_sides(value, &[]);
    }
    let value = rgb_to_hex(value);
    let lower = value.to_ascii_lowercase();
    if property == "font-weight" {
        if let Some(short) = SHORT_FONT_WEIGHTS.get(lower.as_str()) {
            return (*short).to_string();
        }
        return value;
    }
    if COLOR_PROPERTIES.contains(&property.as_str()) {
        if let Some(short) = SHORT_COLORS.get(lower.as_str()) {
            return (*short).to_string();
        }
    }
    value
}

/// `rgb(r,g,b)` to `#rrggbb`
fn rgb_to_hex(value: &str) -> String {
    RGB_RE
        .replace_all(value, |caps: &regex::Captures| {
            let r = caps[1].parse::<u32>().unwrap_or(0).min(255);
            let g = caps[2].parse::<u32>().unwrap_or(0).min(255);
            let b = caps[3].parse::<u32>().unwrap_or(0).min(255);
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        })
        .into_owned()
}

/// Collapse `#aabbcc` to `#abc` when each channel's digits pair up
///
/// Requires exactly six hex digits after `#` (an eight-digit color is left
/// alone) and compares digits case-sensitively.
fn shorten_hex_colors(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '#'
            && i + 7 <= chars.len()
            && chars[i + 1..i + 7].iter().all(|c| c.is_ascii_hexdigit())
            && (i + 7 == chars.len() || !chars[i + 7].is_ascii_hexdigit())
            && chars[i + 1] == chars[i + 2]
            && chars[i + 3] == chars[i + 4]
            && chars[i + 5] == chars[i + 6]
        {
            out.push('#');
            out.push(chars[i + 1]);
            out.push(chars[i + 3]);
            out.push(chars[i + 5]);
            i += 7;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Collapse a 1-4-value box shorthand (`top right bottom left`), dropping
/// duplicate edges right to left
///
/// `append` overrides individual sides before collapsing (used when explicit
/// side declarations follow the shorthand in source order).
pub fn short_sides(value: &str, append: &[(usize, String)]) -> String {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.is_empty() || parts.len() > 4 {
        return value.to_string();
    }
    let expand: [[usize; 4]; 4] = [[0, 0, 0, 0], [0, 1, 0, 1], [0, 1, 2, 1], [0, 1, 2, 3]];
    let indexes = expand[parts.len() - 1];
    let mut sides: Vec<String> = indexes.iter().map(|&i| parts[i].to_string()).collect();
    for (index, side) in append {
        if *index < 4 {
            sides[*index] = side.clone();
        }
    }
    if sides[1] == sides[3] {
        sides.remove(3);
    }
    if sides.len() == 3 && sides[0] == sides[2] {
        sides.remove(2);
    }
    if sides.len() == 2 && sides[0] == sides[1] {
        sides.remove(1);
    }
    sides.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(compress_value("1px   solid\n red", "border", true), "1px solid red");
    }

    #[test]
    fn test_comment_stripped() {
        assert_eq!(compress_value("red /* note */", "color", true), "red");
    }

    #[test]
    fn test_zero_units_dropped() {
        assert_eq!(compress_value("0px", "margin", true), "0");
        assert_eq!(compress_value("0PX", "margin", true), "0");
        assert_eq!(compress_value("0em 0% 0rem", "margin", true), "0 0 0");
        assert_eq!(compress_value("10px", "margin", true), "10px");
    }

    #[test]
    fn test_leading_zero_stripped() {
        assert_eq!(compress_value("0.6em", "margin", true), ".6em");
    }

    #[test]
    fn test_trailing_dot_zero_stripped() {
        assert_eq!(compress_value("1.0", "opacity", true), "1");
        assert_eq!(compress_value(".0", "opacity", true), "0");
    }

    #[test]
    fn test_hex_shortened() {
        assert_eq!(compress_value("#ffffff", "color", true), "#fff");
        assert_eq!(compress_value("#aabbcc", "color", true), "#abc");
        assert_eq!(compress_value("#aabbc1", "color", true), "#aabbc1");
        // eight-digit colors keep all channels
        assert_eq!(compress_value("#aabbccdd", "color", true), "#aabbccdd");
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(compress_value("rgb(255, 0, 0)", "color", true), "red");
        assert_eq!(compress_value("rgb(0,0,0)", "color", true), "#000");
        assert_eq!(compress_value("rgb(17, 34, 51)", "background-color", true), "#123");
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(compress_value("white", "color", true), "#fff");
        assert_eq!(compress_value("#ff0000", "color", true), "red");
        // only color-bearing properties consult the table
        assert_eq!(compress_value("white", "content", true), "white");
    }

    #[test]
    fn test_font_weight() {
        assert_eq!(compress_value("bold", "font-weight", true), "700");
        assert_eq!(compress_value("normal", "font-weight", true), "400");
    }

    #[test]
    fn test_comma_space_tightened() {
        assert_eq!(compress_value("1px, 2px, 3px", "padding", true), "1px,2px,3px");
    }

    #[test]
    fn test_filter_left_loose() {
        let value = "chroma(color=\"#FFFFFF\"), progid:x(a, b)";
        let out = compress_value(value, "filter", true);
        assert!(out.contains(", "));
        assert!(out.contains("#FFFFFF"));
    }

    #[test]
    fn test_border_width_sides() {
        assert_eq!(compress_value("1px 2px 1px 2px", "border-width", true), "1px 2px");
    }

    #[test]
    fn test_short_sides() {
        assert_eq!(short_sides("10px 20px 10px 20px", &[]), "10px 20px");
        assert_eq!(short_sides("10px 20px 30px 20px", &[]), "10px 20px 30px");
        assert_eq!(short_sides("10px 10px 10px 10px", &[]), "10px");
        assert_eq!(short_sides("10px", &[]), "10px");
    }

    #[test]
    fn test_short_sides_append() {
        // shorthand `0 26px 20px` with a later `padding-top: 20px`
        let out = short_sides("0 26px 20px", &[(0, "20px".to_string())]);
        assert_eq!(out, "20px 26px");
    }

    #[test]
    fn test_idempotent() {
        let cases = [
            ("0px", "margin"),
            ("#ffffff", "color"),
            ("rgb(255, 0, 0)", "color"),
            ("0.6em  1.0px", "margin"),
            ("white", "color"),
            ("bold", "font-weight"),
            ("1px 2px 1px 2px", "border-width"),
        ];
        for (value, property) in cases {
            let once = compress_value(value, property, true);
            let twice = compress_value(&once, property, true);
            assert_eq!(once, twice, "pipeline not idempotent for {value}");
        }
    }
}
