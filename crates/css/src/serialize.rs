//! Token serializer
//!
//! Walks a final token sequence back into text. Selector tokens are rebuilt
//! from their analyzed alternatives so that source space-significance is
//! preserved exactly (`a b` and `ab` are different selectors).

use crate::selector::SelectorAlternative;
use crate::token::{Token, TokenKind};

/// Serialize one selector alternative, restoring a single space wherever the
/// source had any separating whitespace between two fragments
pub fn alternative_text(alternative: &SelectorAlternative) -> String {
    let mut out = String::new();
    for (index, part) in alternative.parts.iter().enumerate() {
        if index > 0 && part.space_before {
            out.push(' ');
        }
        out.push_str(&part.value);
    }
    out
}

/// Serialize a selector token from its analysis (falling back to the raw
/// text when no analysis is attached)
pub fn selector_text(token: &Token) -> String {
    match token.selector_analysis() {
        Some(analysis) => {
            let parts: Vec<String> =
                analysis.alternatives.iter().map(alternative_text).collect();
            parts.join(",")
        }
        None => token.value.clone(),
    }
}

/// Serialize a token sequence
///
/// `delimiters` lists two-character sequences that must not be formed by
/// joining adjacent tokens (template delimiters); a space is injected when
/// the boundary would create one.
pub fn tokens_to_text(tokens: &[Token], delimiters: &[String]) -> String {
    let mut out = String::new();
    let mut prev = String::new();
    for (index, token) in tokens.iter().enumerate() {
        let mut prefix = String::new();
        for comment in &token.comments_before {
            if index > 0 && (comment.space_before > 0 || comment.newline_before > 0) {
                prefix.push(' ');
            }
            prefix.push_str(&comment.text);
        }
        let mut value = match token.kind {
            TokenKind::Selector => selector_text(token),
            TokenKind::Property => match token.property_detail() {
                Some(d) => format!("{}{}{}", d.prefix, d.value, d.suffix),
                None => token.value.clone(),
            },
            TokenKind::Value => match token.value_detail() {
                Some(d) => {
                    let mut v = format!("{}{}{}", d.prefix, d.value, d.suffix);
                    if d.important {
                        v.push_str("!important");
                    }
                    v
                }
                None => token.value.clone(),
            },
            _ => token.value.clone(),
        };
        if prefix.is_empty() && index > 0 && !delimiters.is_empty() {
            if let (Some(last), Some(first)) = (prev.chars().last(), value.chars().next()) {
                let boundary: String = [last, first].iter().collect();
                if delimiters.contains(&boundary) {
                    value.insert(0, ' ');
                }
            }
        }
        prev = format!("{}{}", prefix, value);
        out.push_str(&prev);
    }
    out
}
