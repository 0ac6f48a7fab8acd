//! Static keyword and shorthand tables

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::token::TokenKind;

/// Recognized at-keywords, tried in order against the lowercased input
pub const AT_TYPES: &[(&str, TokenKind)] = &[
    ("@import", TokenKind::AtImport),
    ("@charset", TokenKind::AtCharset),
    ("@media", TokenKind::AtMedia),
    ("@supports", TokenKind::AtSupports),
    ("@namespace", TokenKind::AtNamespace),
    ("@font-face", TokenKind::AtFontFace),
    ("@page", TokenKind::AtPage),
    ("@keyframes", TokenKind::AtKeyframes),
    ("@-webkit-keyframes", TokenKind::AtKeyframes),
    ("@-moz-keyframes", TokenKind::AtKeyframes),
    ("@-ms-keyframes", TokenKind::AtKeyframes),
    ("@-o-keyframes", TokenKind::AtKeyframes),
    ("@-moz-document", TokenKind::AtDocument),
    ("@viewport", TokenKind::AtViewport),
    ("@-ms-viewport", TokenKind::AtViewport),
];

/// Characters usable as a property hack lead (`*color`, `_color`, ...)
const PROPERTY_HACK_PREFIX: &str = "*!$&*()=%+,./`[]#~?:<>|_-£¬¦";

pub fn is_hack_char(c: char) -> bool {
    PROPERTY_HACK_PREFIX.contains(c)
}

/// Characters that terminate a plain selector fragment
const SELECTOR_BREAK: &str = "#.:[>+~*,/";

pub fn is_selector_break(c: char) -> bool {
    SELECTOR_BREAK.contains(c)
}

/// Pseudo-elements from CSS 2.1 that are written with a single colon
const PSEUDO_ELEMENTS_21: &[&str] = &[":first-line", ":first-letter", ":before", ":after"];

pub fn is_pseudo_element(fragment: &str) -> bool {
    PSEUDO_ELEMENTS_21.contains(&fragment)
}

/// Color values where the other notation is strictly shorter
pub static SHORT_COLORS: LazyLock<FxHashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut m = FxHashMap::default();
    m.insert("white", "#fff");
    m.insert("black", "#000");
    m.insert("yellow", "#ff0");
    m.insert("fuchsia", "#f0f");
    m.insert("magenta", "#f0f");
    m.insert("aqua", "#0ff");
    m.insert("cyan", "#0ff");
    m.insert("#f00", "red");
    m.insert("#ff0000", "red");
    m.insert("#ffa500", "orange");
    m.insert("#808080", "gray");
    m.insert("#808000", "olive");
    m.insert("#800080", "purple");
    m.insert("#c0c0c0", "silver");
    m.insert("#008080", "teal");
    m.insert("#000080", "navy");
    m.insert("#800000", "maroon");
    m.insert("#008000", "green");
    m.insert("#a52a2a", "brown");
    m
});

/// `font-weight` keywords with shorter numeric forms
pub static SHORT_FONT_WEIGHTS: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        let mut m = FxHashMap::default();
        m.insert("normal", "400");
        m.insert("bold", "700");
        m
    });

/// Properties whose values go through the color shorthand table
pub const COLOR_PROPERTIES: &[&str] = &[
    "color",
    "border-top-color",
    "border-left-color",
    "border-right-color",
    "border-bottom-color",
    "background-color",
];

/// Properties that may legitimately repeat inside one block (fallback chains)
pub static MULTI_SAME_PROPERTIES: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    let mut s = FxHashSet::default();
    s.insert("background");
    s.insert("display");
    s.insert("src");
    s.insert("cursor");
    s
});

pub fn is_multi_same_property(property: &str, value: &str) -> bool {
    if value.contains("calc") {
        return true;
    }
    MULTI_SAME_PROPERTIES.contains(property)
}

static GRADIENT_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)gradient|progid|expression").unwrap());

/// Properties that must never be extracted into a combined rule
pub fn is_unmerge_property(property: &str, value: &str) -> bool {
    match property {
        "filter" | "-ms-filter" | "behavior" | "zoom" => true,
        "background" | "background-image" => GRADIENT_LIKE.is_match(value),
        _ => false,
    }
}

/// Shorthand families whose member order is load-bearing
const UNSORT_PROPERTIES: &[&str] = &[
    "background",
    "border",
    "margin",
    "padding",
    "font",
    "list-style",
    "outline",
    "transition",
    "animation",
    "grid",
    "flex",
];

pub fn is_unsort_property(property: &str) -> bool {
    UNSORT_PROPERTIES
        .iter()
        .any(|item| *item == property || property.contains(&format!("{}-", item)))
}

/// Side suffixes of the box shorthands, in shorthand order
pub const BOX_SIDES: &[&str] = &["top", "right", "bottom", "left"];

/// Longhand children of a box shorthand (`margin` or `padding`)
pub fn property_children(shorthand: &str) -> Vec<String> {
    BOX_SIDES
        .iter()
        .map(|side| format!("{}-{}", shorthand, side))
        .collect()
}
