//! Squeegee CSS engine
//!
//! Tokenizes CSS (optionally with embedded template placeholders), analyzes
//! selector specificity, merges and reorders rules where that cannot change
//! the cascade, and re-serializes the result as shorter, equivalent CSS.
//!
//! ```
//! use squeegee_css::{compress, CompressOptions};
//!
//! let out = compress(".a{color:#ffffff}", CompressOptions::default()).unwrap();
//! assert_eq!(out, ".a{color:#fff}");
//! ```

pub mod compress;
pub mod config;
pub mod error;
pub mod selector;
pub mod serialize;
pub mod token;
pub mod tokenizer;
pub mod value;

pub use compress::{CompressOptions, Compressor, Declaration, DeclarationBlock, Rule};
pub use error::{CssError, CssResult};
pub use selector::{SelectorAlternative, SelectorAnalysis, SelectorPart, SelectorPartKind};
pub use squeegee_scan::{ScanError, SourceLocation, TemplateConfig, TemplateKind};
pub use token::{PropertyDetail, TemplateDetail, Token, TokenDetail, TokenKind, ValueDetail};
pub use tokenizer::{CssTokenizer, TokenizerOptions};

/// Compress a stylesheet to text
pub fn compress(text: &str, options: CompressOptions) -> CssResult<String> {
    Compressor::from_text(text, options)?.run()
}

/// Compress a stylesheet, returning the final token sequence for callers
/// that re-embed the result (e.g. inside an HTML attribute)
pub fn compress_to_tokens(text: &str, options: CompressOptions) -> CssResult<Vec<Token>> {
    Compressor::from_text(text, options)?.run_tokens()
}

/// Compress a pre-built token sequence
pub fn compress_tokens(tokens: Vec<Token>, options: CompressOptions) -> CssResult<String> {
    Compressor::from_tokens(tokens, options).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minify(text: &str) -> String {
        compress(text, CompressOptions::default()).unwrap()
    }

    fn minify_tpl(text: &str, kind: TemplateKind) -> String {
        let template = TemplateConfig::new(
            kind,
            vec!["{%".to_string()],
            vec!["%}".to_string()],
        )
        .unwrap();
        let options = CompressOptions { template: Some(template), ..Default::default() };
        compress(text, options).unwrap()
    }

    #[test]
    fn test_duplicate_property_and_hex_shorten() {
        assert_eq!(minify("a{color:#ffffff;color:#ffffff}"), "a{color:#fff}");
    }

    #[test]
    fn test_margin_children_merge() {
        let input = ".a{margin-top:10px;margin-right:20px;margin-bottom:10px;margin-left:20px}";
        assert_eq!(minify(input), ".a{margin:10px 20px}");
    }

    #[test]
    fn test_equal_specificity_selector_merge() {
        assert_eq!(minify(".a{color:red}.b{color:red}"), ".a,.b{color:red}");
    }

    #[test]
    fn test_override_same_property() {
        assert_eq!(minify("div{color:red;color:blue}"), "div{color:blue}");
    }

    #[test]
    fn test_important_wins_over_later_plain() {
        assert_eq!(
            minify("div{color:red!important;color:blue}"),
            "div{color:red!important}"
        );
    }

    #[test]
    fn test_important_overridden_by_important() {
        assert_eq!(
            minify("div{color:red!important;color:blue!important}"),
            "div{color:blue!important}"
        );
    }

    #[test]
    fn test_keyframes_blocks_kept_distinct() {
        let input = "@keyframes x{0%{opacity:0}50%{opacity:.5}}";
        assert_eq!(minify(input), "@keyframes x{0%{opacity:0}50%{opacity:.5}}");
    }

    #[test]
    fn test_keyframes_identical_bodies_not_merged() {
        let input = "@keyframes x{0%{opacity:0}100%{opacity:0}}";
        assert_eq!(minify(input), "@keyframes x{0%{opacity:0}100%{opacity:0}}");
    }

    #[test]
    fn test_template_property_position_retained() {
        let out = minify_tpl("a{ {%$x%}: red; }", TemplateKind::Generic);
        assert_eq!(out, "a{{%$x%}:red}");
    }

    #[test]
    fn test_template_only_declaration_keeps_semicolon() {
        let out = minify_tpl("a{color:red;{%if x%}}", TemplateKind::Generic);
        assert_eq!(out, "a{color:red;{%if x%};}");
    }

    #[test]
    fn test_template_block_not_sorted_or_merged() {
        let out = minify_tpl(
            "a{width:1px;{%if x%}color:red;{%/if%}background:blue}",
            TemplateKind::Generic,
        );
        // declarations keep their original relative order
        let width = out.find("width").unwrap();
        let color = out.find("color").unwrap();
        let background = out.find("background").unwrap();
        assert!(width < color && color < background);
    }

    #[test]
    fn test_hack_block_preserves_order() {
        let out = minify("a{width:1px;[;color:red;]height:2px}");
        let width = out.find("width").unwrap();
        let hack = out.find("[;color:red;]").unwrap();
        let height = out.find("height").unwrap();
        assert!(width < hack && hack < height);
    }

    #[test]
    fn test_empty_selector_removed() {
        assert_eq!(minify("a{}b{color:red}"), "b{color:red}");
    }

    #[test]
    fn test_charset_deduplicated() {
        let out = minify("@charset \"utf-8\";@charset \"gbk\";a{color:red}");
        assert_eq!(out.matches("@charset").count(), 1);
        assert!(out.contains("utf-8"));
    }

    #[test]
    fn test_specificity_sorting() {
        let out = minify("#b{color:red}a{color:blue}.c{color:green}");
        let a = out.find("a{").unwrap();
        let c = out.find(".c{").unwrap();
        let b = out.find("#b{").unwrap();
        assert!(a < c && c < b);
    }

    #[test]
    fn test_partial_intersection_extracted_when_profitable() {
        let input = ".a{background-color:#ffffff;width:1px}.b{background-color:#ffffff;height:2px}";
        let out = minify(input);
        assert_eq!(
            out,
            ".a,.b{background-color:#fff}.a{width:1px}.b{height:2px}"
        );
    }

    #[test]
    fn test_partial_intersection_skipped_when_unprofitable() {
        let input = ".aaaaaa{color:red;width:1px}.bbbbbb{color:red;height:2px}";
        let out = minify(input);
        assert!(out.contains(".aaaaaa{"));
        assert!(out.contains(".bbbbbb{"));
        assert!(!out.contains(","));
    }

    #[test]
    fn test_root_selector_never_merged() {
        let out = minify(":root{color:red}.b{color:red}");
        assert!(!out.contains(","));
    }

    #[test]
    fn test_ms_prefixed_selector_never_merged() {
        let out = minify("input::-ms-clear{color:red}.b{color:red}");
        assert!(!out.contains(","));
    }

    #[test]
    fn test_identical_selectors_unify() {
        assert_eq!(minify(".a{color:red}.a{width:1px}"), ".a{color:red;width:1px}");
    }

    #[test]
    fn test_border_vs_border_color_not_extracted() {
        let input = ".a{border:1px solid red;border-color:blue}.b{border:1px solid red}";
        let out = minify(input);
        // the shorthand/longhand collision vetoes extraction
        assert!(!out.contains(","));
    }

    #[test]
    fn test_background_fallback_chain_kept() {
        let out = minify("a{background:red;background:url(x.png)}");
        let first = out.find("background:red").unwrap();
        let second = out.find("background:url(x.png)").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_media_block_round_trip() {
        let out = minify("@media screen{a{color:#ffffff}}");
        assert_eq!(out, "@media screen{a{color:#fff}}");
    }

    #[test]
    fn test_rules_inside_media_not_merged() {
        let out = minify("@media screen{.a{color:red}.b{color:red}}");
        assert_eq!(out, "@media screen{.a{color:red}.b{color:red}}");
    }

    #[test]
    fn test_font_face_passes_through() {
        let out = minify("@font-face{font-family:x;src:url(a.woff)}");
        assert!(out.starts_with("@font-face{"));
        assert!(out.contains("font-family:x"));
        assert!(out.contains("src:url(a.woff)"));
    }

    #[test]
    fn test_import_kept() {
        let out = minify("@import url(\"a.css\");a{color:red}");
        assert!(out.starts_with("@import url(\"a.css\");"));
    }

    #[test]
    fn test_bang_comment_preserved() {
        let out = minify("/*! license */a{color:red}");
        assert!(out.starts_with("/*! license */"));
    }

    #[test]
    fn test_plain_comment_removed() {
        let out = minify("/* note */a{color:red}");
        assert_eq!(out, "a{color:red}");
    }

    #[test]
    fn test_last_semicolon_kept_when_disabled() {
        let options = CompressOptions { remove_last_semicolon: false, ..Default::default() };
        assert_eq!(compress("div{color:red}", options).unwrap(), "div{color:red;}");
    }

    #[test]
    fn test_smarty_comment_placeholder_dropped() {
        let template = TemplateConfig::new(
            TemplateKind::SmartyLike,
            vec!["{%".to_string()],
            vec!["%}".to_string()],
        )
        .unwrap();
        let options = CompressOptions { template: Some(template), ..Default::default() };
        let out = compress("a{color:red}{%* note *%}", options).unwrap();
        assert_eq!(out, "a{color:red}");
    }

    #[test]
    fn test_smarty_output_placeholder_kept() {
        let template = TemplateConfig::new(
            TemplateKind::SmartyLike,
            vec!["{%".to_string()],
            vec!["%}".to_string()],
        )
        .unwrap();
        let options = CompressOptions { template: Some(template), ..Default::default() };
        let out = compress("a{color:red}{%$header%}", options).unwrap();
        assert!(out.contains("{%$header%}"));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(compress("a{content:\"abc}", CompressOptions::default()).is_err());
    }

    #[test]
    fn test_selector_without_block_is_error() {
        assert!(compress("a ", CompressOptions::default()).is_err());
    }

    #[test]
    fn test_unequal_template_delimiters_rejected_at_config() {
        let err = TemplateConfig::new(
            TemplateKind::Generic,
            vec!["{%".to_string(), "{{".to_string()],
            vec!["%}".to_string()],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_compress_to_tokens_round_trip() {
        let tokens = compress_to_tokens(".a{color:red}", CompressOptions::default()).unwrap();
        let text = serialize::tokens_to_text(&tokens, &[]);
        assert_eq!(text, ".a{color:red}");
    }

    #[test]
    fn test_compress_pretokenized_input() {
        let options = CompressOptions::default();
        let tokenizer_options = TokenizerOptions { parse_selector: true, template: None };
        let tokens = CssTokenizer::new(".a{color:#ffffff}", tokenizer_options)
            .run()
            .unwrap();
        assert_eq!(compress_tokens(tokens, options).unwrap(), ".a{color:#fff}");
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "a{color:#ffffff;color:#ffffff}",
            ".a{margin-top:10px;margin-right:20px;margin-bottom:10px;margin-left:20px}",
            ".a{color:red}.b{color:red}",
            "@keyframes x{0%{opacity:0}50%{opacity:.5}}",
            "#b{color:red}a{color:blue}.c{color:green}",
            "@media screen{a{color:#ffffff}}",
        ];
        for input in inputs {
            let once = minify(input);
            let twice = minify(&once);
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_merge_safety_no_declaration_lost() {
        let input = ".a{background-color:#ffffff;width:1px}.b{background-color:#ffffff;height:2px}";
        let out = minify(input);
        assert!(out.contains("background-color:#fff"));
        assert!(out.contains("width:1px"));
        assert!(out.contains("height:2px"));
        assert_eq!(out.matches("background-color").count(), 1);
    }
}
