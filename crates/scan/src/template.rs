//! Template placeholder overlay
//!
//! Recognizes embedded template-language spans (`{% ... %}`, `<?php ... ?>`,
//! `{$x}`) so the CSS machinery can carry them as opaque tokens. One matching
//! policy per template kind; configuration is passed explicitly into the
//! scanner, there is no global registry.

use crate::error::{ScanError, ScanResult};
use crate::scanner::DelimitedOptions;

/// Template language family, selecting the placeholder matching policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateKind {
    /// Plain span match: the first closing delimiter terminates the
    /// placeholder, which must exist for a match at all
    #[default]
    Generic,
    /// PHP-style: quote/comment aware inside the body, and a missing closing
    /// delimiter swallows the rest of the input
    PhpLike,
    /// Smarty-style: same-delimiter pairs nest; a `$`-leading body produces
    /// output, a `*`-leading body is a template comment
    SmartyLike,
}

/// Validated template delimiter configuration
///
/// `left`/`right` are parallel arrays; each pair is tried independently at
/// every position where a placeholder could start. Delimiters are matched
/// against the lowercased input, so configure them in lowercase.
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    kind: TemplateKind,
    left: Vec<String>,
    right: Vec<String>,
}

impl TemplateConfig {
    /// Build a config, dropping empty delimiters and rejecting unequal arrays
    pub fn new(kind: TemplateKind, left: Vec<String>, right: Vec<String>) -> ScanResult<Self> {
        let left: Vec<String> = left.into_iter().filter(|s| !s.is_empty()).collect();
        let right: Vec<String> = right.into_iter().filter(|s| !s.is_empty()).collect();
        if left.len() != right.len() {
            return Err(ScanError::DelimiterCountMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        Ok(Self { kind, left, right })
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Configured delimiter pairs in trial order
    pub fn pairs(&self) -> impl Iterator<Item = (&String, &String)> {
        self.left.iter().zip(self.right.iter())
    }

    /// Scanner options implementing this kind's matching policy
    pub fn match_options(&self) -> DelimitedOptions {
        match self.kind {
            TemplateKind::Generic => DelimitedOptions::default(),
            TemplateKind::PhpLike => DelimitedOptions {
                ignore_end: true,
                quote: true,
                multi_comment: true,
                ..DelimitedOptions::default()
            },
            TemplateKind::SmartyLike => DelimitedOptions {
                nest: true,
                ..DelimitedOptions::default()
            },
        }
    }

    /// Cheap whole-input test: can this text contain a placeholder at all?
    pub fn present_in(&self, text: &str) -> bool {
        self.pairs().any(|(left, right)| match self.kind {
            TemplateKind::PhpLike => text.contains(left.as_str()),
            _ => text.contains(left.as_str()) && text.contains(right.as_str()),
        })
    }

    /// Whether a placeholder body produces output when rendered
    pub fn is_output(&self, body: &str) -> bool {
        match self.kind {
            TemplateKind::SmartyLike => body.trim_start().starts_with('$'),
            _ => false,
        }
    }

    /// Whether a placeholder body is a template comment (droppable)
    pub fn is_comment(&self, body: &str) -> bool {
        match self.kind {
            TemplateKind::SmartyLike => body.starts_with('*'),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unequal_delimiters_rejected() {
        let err = TemplateConfig::new(
            TemplateKind::Generic,
            vec!["{%".to_string(), "{{".to_string()],
            vec!["%}".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::DelimiterCountMismatch { left: 2, right: 1 }));
    }

    #[test]
    fn test_empty_delimiters_filtered() {
        let config = TemplateConfig::new(
            TemplateKind::Generic,
            vec!["{%".to_string(), String::new()],
            vec!["%}".to_string(), String::new()],
        )
        .unwrap();
        assert_eq!(config.pairs().count(), 1);
    }

    #[test]
    fn test_present_in_php_needs_only_left() {
        let config = TemplateConfig::new(
            TemplateKind::PhpLike,
            vec!["<?php".to_string()],
            vec!["?>".to_string()],
        )
        .unwrap();
        assert!(config.present_in("a <?php echo 1;"));

        let generic = TemplateConfig::new(
            TemplateKind::Generic,
            vec!["{%".to_string()],
            vec!["%}".to_string()],
        )
        .unwrap();
        assert!(!generic.present_in("a {% unclosed"));
    }

    #[test]
    fn test_smarty_output_and_comment() {
        let config = TemplateConfig::new(
            TemplateKind::SmartyLike,
            vec!["{".to_string()],
            vec!["}".to_string()],
        )
        .unwrap();
        assert!(config.is_output(" $name"));
        assert!(!config.is_output("if $name"));
        assert!(config.is_comment("* note *"));
    }
}
