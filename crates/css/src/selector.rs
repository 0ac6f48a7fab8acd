//! Selector analyzer
//!
//! Splits a selector into comma-separated alternatives, classifies each
//! fragment, and computes specificity bounds per W3C selector rules
//! (<https://www.w3.org/TR/css3-selectors/#lex>).

use smallvec::SmallVec;
use squeegee_scan::{CommentKind, MatchCharOptions, ScanResult, Scanner, TemplateConfig};

use crate::config;

/// Selector fragment classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorPartKind {
    /// Type selector (`div`) — also keyframe offsets (`0%`), which scan as
    /// plain fragments
    Type,
    /// `*`
    Universal,
    /// `#id`
    Id,
    /// `.class`
    Class,
    /// `[attr=value]`
    Attribute,
    /// `:hover`, `:not(...)`
    PseudoClass,
    /// `::before` and the single-colon CSS 2.1 forms
    PseudoElement,
    /// `>`, `+`, `~`
    Combinator,
    /// `ns|` prefix at the start of an alternative
    Namespace,
    /// Opaque template placeholder inside a selector
    Template,
}

/// One selector fragment with its source spacing
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorPart {
    pub kind: SelectorPartKind,
    pub value: String,
    /// Whitespace separated this fragment from the previous one
    pub space_before: bool,
}

/// One comma-separated branch of a selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorAlternative {
    pub parts: SmallVec<[SelectorPart; 8]>,
    pub specificity: i32,
}

/// Aggregate analysis of a full selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorAnalysis {
    pub min_specificity: i32,
    pub max_specificity: i32,
    /// All alternatives share one specificity value
    pub specificity_equal: bool,
    /// Any fragment carries a vendor-prefixed pseudo
    pub has_vendor_prefix: bool,
    /// A fragment failed validation (e.g. a bare `.`); downstream merge and
    /// sort logic must treat the rule conservatively
    pub invalid: bool,
    pub alternatives: Vec<SelectorAlternative>,
}

impl Default for SelectorAnalysis {
    fn default() -> Self {
        Self {
            min_specificity: -1,
            max_specificity: -1,
            specificity_equal: true,
            has_vendor_prefix: false,
            invalid: false,
            alternatives: Vec::new(),
        }
    }
}

enum RawPart {
    Comma,
    Part(SelectorPart),
}

/// Fragment scanner over one selector's raw text
pub struct SelectorScanner {
    scanner: Scanner,
}

impl SelectorScanner {
    pub fn new(text: &str, template: Option<TemplateConfig>) -> Self {
        let scanner = match template {
            Some(t) => Scanner::with_template(text, t),
            None => Scanner::new(text),
        };
        Self { scanner }
    }

    /// Scan all fragments and fold them into a [`SelectorAnalysis`]
    pub fn run(mut self) -> ScanResult<SelectorAnalysis> {
        let mut alternatives = Vec::new();
        let mut parts: SmallVec<[SelectorPart; 8]> = SmallVec::new();
        let mut min = -1i32;
        let mut max = -1i32;
        let mut vendor = false;
        let mut invalid = false;
        let mut at_start = true;

        while let Some(raw) = self.next_part(at_start)? {
            match raw {
                RawPart::Comma => {
                    let specificity = self.specificity_of(&parts)?;
                    if min == -1 {
                        min = specificity;
                        max = specificity;
                    } else {
                        min = min.min(specificity);
                        max = max.max(specificity);
                    }
                    alternatives.push(SelectorAlternative {
                        parts: std::mem::take(&mut parts),
                        specificity,
                    });
                    at_start = true;
                }
                RawPart::Part(part) => {
                    vendor = vendor || part_has_vendor_prefix(&part);
                    invalid = invalid || part_is_invalid(&part);
                    parts.push(part);
                    at_start = false;
                }
            }
        }
        if !parts.is_empty() {
            let specificity = self.specificity_of(&parts)?;
            if min == -1 {
                min = specificity;
                max = specificity;
            } else {
                min = min.min(specificity);
                max = max.max(specificity);
            }
            alternatives.push(SelectorAlternative { parts, specificity });
        }

        Ok(SelectorAnalysis {
            min_specificity: min,
            max_specificity: max,
            specificity_equal: min == max,
            has_vendor_prefix: vendor,
            invalid,
            alternatives,
        })
    }

    fn next_part(&mut self, at_alternative_start: bool) -> ScanResult<Option<RawPart>> {
        self.scanner.skip_whitespace();
        self.skip_comments();
        if self.scanner.is_eof() {
            return Ok(None);
        }
        let space_before = self.scanner.space_before() > 0 || self.scanner.newline_before() > 0;

        if let Some(tpl) = self.scanner.template_token()? {
            return Ok(Some(self.part(SelectorPartKind::Template, tpl.raw, space_before)));
        }
        if at_alternative_start {
            if let Some(ns) = self.namespace() {
                return Ok(Some(self.part(SelectorPartKind::Namespace, ns, space_before)));
            }
        }

        let c = match self.scanner.peek() {
            Some(c) => c,
            None => return Ok(None),
        };
        let raw = match c {
            '*' => {
                let value = self.scanner.advance().to_string();
                self.part(SelectorPartKind::Universal, value, space_before)
            }
            ',' => {
                self.scanner.advance();
                self.scanner.reset_pending();
                RawPart::Comma
            }
            '>' | '+' | '~' => {
                let value = self.scanner.advance().to_string();
                self.part(SelectorPartKind::Combinator, value, space_before)
            }
            '#' => {
                let value = self.common();
                self.part(SelectorPartKind::Id, value, space_before)
            }
            '.' => {
                let value = self.common();
                self.part(SelectorPartKind::Class, value, space_before)
            }
            '[' => {
                let value = match self.scanner.matched_char(
                    '[',
                    ']',
                    MatchCharOptions { quote: true, ..Default::default() },
                )? {
                    Some(text) => text,
                    None => self.scanner.advance().to_string(),
                };
                self.part(SelectorPartKind::Attribute, value, space_before)
            }
            ':' => {
                if self.scanner.peek_at(1) == Some(':') {
                    self.scanner.advance();
                    let value = format!(":{}", self.common());
                    self.part(SelectorPartKind::PseudoElement, value, space_before)
                } else {
                    let (kind, value) = self.pseudo_class()?;
                    self.part(kind, value, space_before)
                }
            }
            _ => {
                let value = self.common();
                self.part(SelectorPartKind::Type, value, space_before)
            }
        };
        Ok(Some(raw))
    }

    fn part(&mut self, kind: SelectorPartKind, value: String, space_before: bool) -> RawPart {
        self.scanner.reset_pending();
        RawPart::Part(SelectorPart { kind, value, space_before })
    }

    /// Consume a plain fragment up to the next break character or whitespace
    fn common(&mut self) -> String {
        let mut out = String::new();
        out.push(self.scanner.advance());
        while let Some(c) = self.scanner.peek() {
            if config::is_selector_break(c) || Scanner::is_whitespace(c) {
                break;
            }
            out.push(self.scanner.advance());
        }
        out
    }

    /// Pseudo-class fragment, including a parenthesized argument (`:not(x)`)
    fn pseudo_class(&mut self) -> ScanResult<(SelectorPartKind, String)> {
        let mut out = String::new();
        out.push(self.scanner.advance());
        while let Some(c) = self.scanner.peek() {
            if c == '(' {
                if let Some(args) = self.scanner.matched_char(
                    '(',
                    ')',
                    MatchCharOptions { nest: true, quote: true, ..Default::default() },
                )? {
                    out.push_str(&args);
                }
                continue;
            }
            if config::is_selector_break(c) || Scanner::is_whitespace(c) {
                break;
            }
            out.push(self.scanner.advance());
        }
        if config::is_pseudo_element(&out) {
            Ok((SelectorPartKind::PseudoElement, out))
        } else {
            Ok((SelectorPartKind::PseudoClass, out))
        }
    }

    /// `ns|` / `*|` prefix; rolls back when no `|` follows
    fn namespace(&mut self) -> Option<String> {
        let checkpoint = self.scanner.checkpoint();
        let mut out = String::new();
        while let Some(c) = self.scanner.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '*' {
                out.push(self.scanner.advance());
            } else {
                break;
            }
        }
        if !out.is_empty() && self.scanner.peek() == Some('|') {
            out.push(self.scanner.advance());
            Some(out)
        } else {
            self.scanner.rollback(&checkpoint);
            None
        }
    }

    fn skip_comments(&mut self) {
        while self.scanner.peek() == Some('/') && self.scanner.peek_at(1) == Some('*') {
            if self.scanner.comment_token(CommentKind::Block, true).is_none() {
                break;
            }
        }
    }

    /// id +100, class/attribute +10, type/pseudo-element +1, pseudo-class +10
    /// except `:not(...)`, which contributes its argument's own specificity
    fn specificity_of(&self, parts: &[SelectorPart]) -> ScanResult<i32> {
        let mut total = 0;
        for part in parts {
            total += match part.kind {
                SelectorPartKind::Id => 100,
                SelectorPartKind::Type | SelectorPartKind::PseudoElement => 1,
                SelectorPartKind::Class | SelectorPartKind::Attribute => 10,
                SelectorPartKind::PseudoClass => {
                    let value = &part.value;
                    if value.len() > 6
                        && value[..5].eq_ignore_ascii_case(":not(")
                        && value.ends_with(')')
                    {
                        let inner = &value[5..value.len() - 1];
                        let analysis =
                            SelectorScanner::new(inner, self.scanner.template().cloned()).run()?;
                        analysis.alternatives.first().map(|a| a.specificity).unwrap_or(0)
                    } else {
                        10
                    }
                }
                _ => 0,
            };
        }
        Ok(total)
    }
}

fn part_has_vendor_prefix(part: &SelectorPart) -> bool {
    match part.kind {
        SelectorPartKind::PseudoClass => part.value.chars().nth(1) == Some('-'),
        SelectorPartKind::PseudoElement => part.value.chars().nth(2) == Some('-'),
        _ => false,
    }
}

fn part_is_invalid(part: &SelectorPart) -> bool {
    match part.kind {
        SelectorPartKind::Class => part.value.chars().count() == 1,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> SelectorAnalysis {
        SelectorScanner::new(text, None).run().unwrap()
    }

    #[test]
    fn test_type_selector() {
        let a = analyze("div");
        assert_eq!(a.min_specificity, 1);
        assert_eq!(a.max_specificity, 1);
        assert!(a.specificity_equal);
        assert_eq!(a.alternatives.len(), 1);
        assert_eq!(a.alternatives[0].parts[0].kind, SelectorPartKind::Type);
    }

    #[test]
    fn test_id_and_class() {
        let a = analyze("#main .item");
        assert_eq!(a.min_specificity, 110);
        let parts = &a.alternatives[0].parts;
        assert_eq!(parts[0].kind, SelectorPartKind::Id);
        assert_eq!(parts[1].kind, SelectorPartKind::Class);
        assert!(parts[1].space_before);
    }

    #[test]
    fn test_compound_no_space() {
        let a = analyze("div.item");
        let parts = &a.alternatives[0].parts;
        assert_eq!(parts.len(), 2);
        assert!(!parts[1].space_before);
        assert_eq!(a.min_specificity, 11);
    }

    #[test]
    fn test_alternatives_specificity_bounds() {
        let a = analyze("a, .b");
        assert_eq!(a.alternatives.len(), 2);
        assert_eq!(a.min_specificity, 1);
        assert_eq!(a.max_specificity, 10);
        assert!(!a.specificity_equal);
    }

    #[test]
    fn test_equal_alternatives() {
        let a = analyze(".a, .b");
        assert_eq!(a.min_specificity, 10);
        assert_eq!(a.max_specificity, 10);
        assert!(a.specificity_equal);
    }

    #[test]
    fn test_attribute_selector() {
        let a = analyze("input[type=\"text\"]");
        let parts = &a.alternatives[0].parts;
        assert_eq!(parts[1].kind, SelectorPartKind::Attribute);
        assert_eq!(parts[1].value, "[type=\"text\"]");
        assert_eq!(a.min_specificity, 11);
    }

    #[test]
    fn test_pseudo_class() {
        let a = analyze("a:hover");
        let parts = &a.alternatives[0].parts;
        assert_eq!(parts[1].kind, SelectorPartKind::PseudoClass);
        assert_eq!(a.min_specificity, 11);
    }

    #[test]
    fn test_pseudo_element_double_colon() {
        let a = analyze("p::before");
        let parts = &a.alternatives[0].parts;
        assert_eq!(parts[1].kind, SelectorPartKind::PseudoElement);
        assert_eq!(parts[1].value, "::before");
        assert_eq!(a.min_specificity, 2);
    }

    #[test]
    fn test_legacy_pseudo_element() {
        let a = analyze("p:before");
        let parts = &a.alternatives[0].parts;
        assert_eq!(parts[1].kind, SelectorPartKind::PseudoElement);
        assert_eq!(a.min_specificity, 2);
    }

    #[test]
    fn test_not_uses_inner_specificity() {
        let not_class = analyze(":not(.a)");
        assert_eq!(not_class.min_specificity, 10);
        let not_id = analyze(":not(#a)");
        assert_eq!(not_id.min_specificity, 100);
        let plain = analyze(".a");
        assert_eq!(not_class.min_specificity, plain.min_specificity);
    }

    #[test]
    fn test_combinators() {
        let a = analyze("ul > li + li");
        let kinds: Vec<_> = a.alternatives[0].parts.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SelectorPartKind::Type,
                SelectorPartKind::Combinator,
                SelectorPartKind::Type,
                SelectorPartKind::Combinator,
                SelectorPartKind::Type,
            ]
        );
        assert_eq!(a.min_specificity, 3);
    }

    #[test]
    fn test_namespace() {
        let a = analyze("svg|rect");
        let parts = &a.alternatives[0].parts;
        assert_eq!(parts[0].kind, SelectorPartKind::Namespace);
        assert_eq!(parts[0].value, "svg|");
        assert_eq!(parts[1].kind, SelectorPartKind::Type);
    }

    #[test]
    fn test_invalid_single_char_class() {
        let a = analyze(". a");
        assert!(a.invalid);
    }

    #[test]
    fn test_vendor_pseudo_class() {
        let a = analyze("input:-moz-placeholder");
        assert!(a.has_vendor_prefix);
        let b = analyze("input::-webkit-input-placeholder");
        assert!(b.has_vendor_prefix);
        let c = analyze("a:hover");
        assert!(!c.has_vendor_prefix);
    }

    #[test]
    fn test_universal() {
        let a = analyze("*");
        assert_eq!(a.alternatives[0].parts[0].kind, SelectorPartKind::Universal);
        assert_eq!(a.min_specificity, 0);
    }

    #[test]
    fn test_keyframe_offset_scans_as_type() {
        let a = analyze("50%");
        assert_eq!(a.alternatives[0].parts[0].kind, SelectorPartKind::Type);
        assert_eq!(a.alternatives[0].parts[0].value, "50%");
        assert_eq!(a.min_specificity, 1);
    }

    #[test]
    fn test_empty_selector() {
        let a = analyze("");
        assert_eq!(a.min_specificity, -1);
        assert!(a.specificity_equal);
        assert!(a.alternatives.is_empty());
    }

    #[test]
    fn test_specificity_monotonic_in_ids() {
        let one = analyze("#a");
        let two = analyze("#a#b");
        assert_eq!(two.min_specificity - one.min_specificity, 100);
    }
}
