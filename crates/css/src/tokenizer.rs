//! CSS tokenizer
//!
//! Turns a stylesheet into a flat token sequence. A two-state mode
//! (selector vs. property position) plus the previously emitted token kind
//! drive disambiguation; template placeholders interrupt every scan and come
//! through as opaque tokens.

use std::sync::LazyLock;

use regex::Regex;
use squeegee_scan::{
    Checkpoint, CommentKind, MatchCharOptions, QuoteOptions, Scanner, Span, TemplateConfig,
    UnterminatedPolicy,
};

use crate::config::{self, AT_TYPES};
use crate::error::CssResult;
use crate::selector::SelectorScanner;
use crate::token::{PropertyDetail, TemplateDetail, Token, TokenDetail, TokenKind, ValueDetail};

static VENDOR_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-\w+-").unwrap());
static VALUE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:\\\d)+$").unwrap());
static IMPORTANT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)!\s*important").unwrap());

/// Tokenizer configuration
#[derive(Debug, Clone, Default)]
pub struct TokenizerOptions {
    /// Attach a [`crate::selector::SelectorAnalysis`] to every selector token
    pub parse_selector: bool,
    pub template: Option<TemplateConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Selector,
    Property,
}

/// CSS tokenizer over a character scanner
///
/// `run()` consumes the tokenizer; construct a new one to restart.
pub struct CssTokenizer {
    scanner: Scanner,
    options: TokenizerOptions,
    mode: Mode,
    prev_kind: Option<TokenKind>,
}

impl CssTokenizer {
    pub fn new(text: &str, options: TokenizerOptions) -> Self {
        let mut scanner = match options.template.clone() {
            Some(template) => Scanner::with_template(text, template),
            None => Scanner::new(text),
        };
        // leading CDO plus its trailing CDC are HTML wrapping, not CSS
        if scanner.look_at("<!--") {
            scanner.forward(4);
            scanner.shrink(3);
        }
        Self { scanner, options, mode: Mode::Selector, prev_kind: None }
    }

    /// Tokenize the whole input
    pub fn run(mut self) -> CssResult<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        while let Some(mut token) = self.next_token()? {
            if token.kind == TokenKind::LeftBrace
                && tokens.last().map(|t| t.kind) == Some(TokenKind::Template)
            {
                // a placeholder directly before `{` was really the selector
                if let Some(prev) = tokens.last_mut() {
                    prev.kind = TokenKind::Selector;
                    prev.detail = TokenDetail::None;
                }
                self.prev_kind = Some(TokenKind::Selector);
                self.mode = Mode::Property;
            } else if token.kind == TokenKind::Selector
                && tokens.last().map(|t| t.kind) == Some(TokenKind::Template)
            {
                // a placeholder directly before a selector belongs to it
                if let Some(prev) = tokens.pop() {
                    let space = if prev.end != token.start { " " } else { "" };
                    if let Some(analysis) = token.selector_analysis_mut() {
                        if let Some(part) = analysis
                            .alternatives
                            .first_mut()
                            .and_then(|alt| alt.parts.first_mut())
                        {
                            part.value = format!("{}{}{}", prev.value, space, part.value);
                        }
                    }
                    token.value = format!("{}{}{}", prev.value, space, token.value);
                    token.start = prev.start;
                    token.span.start = prev.span.start;
                }
            }
            let kind = token.kind;
            tokens.push(token);
            match kind {
                TokenKind::Template
                | TokenKind::LeftBrace
                | TokenKind::RightBrace
                | TokenKind::Colon
                | TokenKind::Semicolon
                | TokenKind::BracketHack
                | TokenKind::ReservedComment => continue,
                _ => {}
            }
            self.prev_kind = Some(kind);
            if kind.enters_property_mode() {
                self.mode = Mode::Property;
            }
        }
        log::debug!("tokenized {} tokens", tokens.len());
        Ok(tokens)
    }

    fn next_token(&mut self) -> CssResult<Option<Token>> {
        self.scanner.skip_whitespace();
        self.skip_comment();
        let start = self.scanner.checkpoint();
        if self.scanner.is_eof() {
            return Ok(self.last_token(&start));
        }
        if let Some(tpl) = self.scanner.template_token()? {
            let detail =
                TemplateDetail { left: tpl.left, right: tpl.right, body: tpl.body };
            let mut token = self.token(TokenKind::Template, tpl.raw, &start);
            token.detail = TokenDetail::Template(detail);
            return Ok(Some(token));
        }
        if self.scanner.look_at("/*!") {
            if let Some(text) = self.scanner.matched("/*!", "*/") {
                return Ok(Some(self.token(TokenKind::ReservedComment, text, &start)));
            }
        }
        let prev = self.prev_kind;
        let c = match self.scanner.peek() {
            Some(c) => c,
            None => return Ok(self.last_token(&start)),
        };
        match c {
            '@' => return self.at_token(start).map(Some),
            '{' => {
                if prev == Some(TokenKind::Selector) {
                    self.mode = Mode::Property;
                }
                let value = self.scanner.advance().to_string();
                return Ok(Some(self.token(TokenKind::LeftBrace, value, &start)));
            }
            '}' => {
                self.mode = Mode::Selector;
                let value = self.scanner.advance().to_string();
                let token = self.token(TokenKind::RightBrace, value, &start);
                self.prev_kind = Some(TokenKind::RightBrace);
                return Ok(Some(token));
            }
            ':' => {
                // only a declaration colon here; pseudo-class colons are
                // consumed by the selector scan itself
                if matches!(
                    prev,
                    Some(TokenKind::Property)
                        | Some(TokenKind::Selector)
                        | Some(TokenKind::Value)
                        | Some(TokenKind::Colon)
                ) {
                    let value = self.scanner.advance().to_string();
                    let token = self.token(TokenKind::Colon, value, &start);
                    self.prev_kind = Some(TokenKind::Colon);
                    return Ok(Some(token));
                }
            }
            ';' => {
                let value = self.scanner.advance().to_string();
                let token = self.token(TokenKind::Semicolon, value, &start);
                self.prev_kind = Some(TokenKind::Semicolon);
                return Ok(Some(token));
            }
            '[' => {
                // speculative CSS hack bracket: [;color:red;]
                if matches!(
                    prev,
                    Some(TokenKind::Selector) | Some(TokenKind::Value) | Some(TokenKind::Semicolon)
                ) {
                    if let Some(text) = self.scanner.matched("[", "]") {
                        return Ok(Some(self.token(TokenKind::BracketHack, text, &start)));
                    }
                }
            }
            _ => {}
        }
        if matches!(prev, Some(TokenKind::Property) | Some(TokenKind::Colon)) {
            return self.value_token(start).map(Some);
        }
        if self.mode == Mode::Property {
            return self.property_token(start).map(Some);
        }
        self.selector_token(start).map(Some)
    }

    /// Build a token from the scanner state, consuming pending whitespace
    /// counters and comments
    fn token(&mut self, kind: TokenKind, value: String, start: &Checkpoint) -> Token {
        let token = Token {
            kind,
            value,
            start: start.pos,
            end: self.scanner.pos(),
            span: Span { start: self.scanner.location_of(start), end: self.scanner.location() },
            newline_before: start.newline_before,
            space_before: start.space_before,
            comments_before: self.scanner.take_comments(),
            detail: TokenDetail::None,
        };
        self.scanner.reset_pending();
        token
    }

    /// Trailing whitespace or comments produce one final end-of-stream token
    fn last_token(&mut self, start: &Checkpoint) -> Option<Token> {
        if self.scanner.newline_before() > 0
            || self.scanner.space_before() > 0
            || self.scanner.has_pending_comments()
        {
            return Some(self.token(TokenKind::Eos, String::new(), start));
        }
        None
    }

    /// Collect plain comments for the next token; bang comments are tokens
    fn skip_comment(&mut self) {
        while self.scanner.peek() == Some('/')
            && self.scanner.peek_at(1) == Some('*')
            && self.scanner.peek_at(2) != Some('!')
        {
            match self.scanner.comment_token(CommentKind::Block, true) {
                Some(comment) => self.scanner.push_comment(comment),
                None => break,
            }
        }
    }

    fn at_token(&mut self, start: Checkpoint) -> CssResult<Token> {
        let mut kind = TokenKind::At;
        let mut out = String::new();
        for (pattern, at_kind) in AT_TYPES {
            if !self.scanner.look_at(pattern) {
                continue;
            }
            // require a separator so `@mediaquery` stays a generic at-token
            let follow_ok = match self.scanner.peek_at(pattern.chars().count()) {
                Some(c) => {
                    Scanner::is_whitespace(c)
                        || matches!(c, ';' | '{' | '/' | '"' | '\'' | ':' | ',')
                }
                None => false,
            };
            if follow_ok {
                out = self.scanner.forward(pattern.chars().count());
                kind = *at_kind;
                break;
            }
        }
        while !self.scanner.is_eof() {
            let c = match self.scanner.peek() {
                Some(c) => c,
                None => break,
            };
            if c == '/' && self.scanner.peek_at(1) == Some('*') {
                if let Some(comment) = self.scanner.comment_token(CommentKind::Block, false) {
                    out.push_str(&comment.text);
                    continue;
                }
            }
            if c == '"' || c == '\'' {
                out.push_str(&self.scanner.quoted(QuoteOptions::default())?.text);
                continue;
            }
            if c == ';' {
                out.push(self.scanner.advance());
                break;
            }
            if c == '{' {
                break;
            }
            out.push(self.scanner.advance());
        }
        let mut token = self.token(kind, String::new(), &start);
        token.value = self.scanner.skip_right_space(&out);
        Ok(token)
    }

    fn property_token(&mut self, start: Checkpoint) -> CssResult<Token> {
        let mut out = String::new();
        while !self.scanner.is_eof() {
            let c = match self.scanner.peek() {
                Some(c) => c,
                None => break,
            };
            if c == ';' {
                // a bare declaration without `:` is really a value
                self.scanner.rollback(&start);
                return self.value_token(start);
            }
            if c == ':' || c == '/' || c == '}' || Scanner::is_whitespace(c) {
                break;
            }
            out.push(self.scanner.advance());
        }
        let detail = parse_property(&out);
        let mut token = self.token(TokenKind::Property, out, &start);
        token.detail = TokenDetail::Property(detail);
        Ok(token)
    }

    fn value_token(&mut self, start: Checkpoint) -> CssResult<Token> {
        let mut raw = String::new();
        let mut buffer = String::new();
        let mut record: Option<Checkpoint> = None;
        let mut escape = false;
        let mut has_template = false;
        while !self.scanner.is_eof() {
            if let Some(tpl) = self.scanner.template_token()? {
                raw.push_str(&tpl.raw);
                has_template = true;
                continue;
            }
            let c = match self.scanner.peek() {
                Some(c) => c,
                None => break,
            };
            if c == '\\' || escape {
                escape = !escape;
                raw.push(self.scanner.advance());
                continue;
            }
            if c == ';' || c == '}' {
                break;
            }
            if c == '/' && self.scanner.peek_at(1) == Some('*') {
                let checkpoint = self.scanner.checkpoint();
                if let Some(comment) = self.scanner.comment_token(CommentKind::Block, false) {
                    if record.is_none() {
                        record = Some(checkpoint);
                    }
                    buffer.push_str(&comment.text);
                    continue;
                }
            }
            if record.is_some() {
                if Scanner::is_whitespace(c) {
                    buffer.push(self.scanner.advance());
                    continue;
                }
                // non-whitespace after the buffered comment: the comment was
                // interior to the value after all
                raw.push_str(&buffer);
                buffer.clear();
                record = None;
            }
            if c == '"' || c == '\'' {
                let quote = self.scanner.quoted(QuoteOptions {
                    on_unterminated: UnterminatedPolicy::Error,
                    ..QuoteOptions::default()
                })?;
                raw.push_str(&quote.text);
                continue;
            }
            if c == '(' {
                if let Some(text) = self.scanner.matched_char(
                    '(',
                    ')',
                    MatchCharOptions {
                        nest: true,
                        quote: true,
                        multi_comment: true,
                        ..Default::default()
                    },
                )? {
                    raw.push_str(&text);
                }
                continue;
            }
            raw.push(self.scanner.advance());
        }
        let mut token = self.token(TokenKind::Value, String::new(), &start);
        token.value = self.scanner.skip_right_space(&raw);
        // a trailing comment is not part of the value; rescan it as a
        // standalone comment before the terminator
        if let Some(record) = record {
            self.scanner.rollback(&record);
        }
        let mut detail = parse_value(&token.value);
        detail.has_template = has_template;
        token.detail = TokenDetail::Value(detail);
        Ok(token)
    }

    fn selector_token(&mut self, start: Checkpoint) -> CssResult<Token> {
        let mut raw = String::new();
        let mut buffer = String::new();
        let mut record: Option<Checkpoint> = None;
        let mut escape = false;
        while !self.scanner.is_eof() {
            if let Some(tpl) = self.scanner.template_token()? {
                raw.push_str(&tpl.raw);
                continue;
            }
            let c = match self.scanner.peek() {
                Some(c) => c,
                None => break,
            };
            if c == '\\' || escape {
                escape = !escape;
                raw.push(self.scanner.advance());
                continue;
            }
            if c == '{' {
                break;
            }
            if c == '/' && self.scanner.peek_at(1) == Some('*') {
                let checkpoint = self.scanner.checkpoint();
                if let Some(comment) = self.scanner.comment_token(CommentKind::Block, false) {
                    if record.is_none() {
                        record = Some(checkpoint);
                    }
                    buffer.push_str(&comment.text);
                    continue;
                }
            }
            if record.is_some() {
                if Scanner::is_whitespace(c) {
                    buffer.push(self.scanner.advance());
                    continue;
                }
                raw.push_str(&buffer);
                buffer.clear();
                record = None;
            }
            if c == '"' || c == '\'' {
                let quote = self.scanner.quoted(QuoteOptions {
                    on_unterminated: UnterminatedPolicy::Rollback,
                    ..QuoteOptions::default()
                })?;
                raw.push_str(&quote.text);
                continue;
            }
            if c == '[' {
                if let Some(text) = self.scanner.matched_char(
                    '[',
                    ']',
                    MatchCharOptions { quote: true, ..Default::default() },
                )? {
                    raw.push_str(&text);
                }
                continue;
            }
            if c == '(' {
                if let Some(text) = self.scanner.matched_char(
                    '(',
                    ')',
                    MatchCharOptions { quote: true, nest: true, ..Default::default() },
                )? {
                    raw.push_str(&text);
                }
                continue;
            }
            raw.push(self.scanner.advance());
        }
        let mut token = self.token(TokenKind::Selector, String::new(), &start);
        token.value = self.scanner.skip_right_space(&raw);
        if let Some(record) = record {
            self.scanner.rollback(&record);
        }
        if self.options.parse_selector {
            let analysis =
                SelectorScanner::new(&token.value, self.options.template.clone()).run()?;
            token.detail = TokenDetail::Selector(analysis);
        }
        Ok(token)
    }
}

/// Split a property name into `{prefix, value, suffix}`
fn parse_property(property: &str) -> PropertyDetail {
    let mut prefix = String::new();
    let mut rest = property.to_string();
    if property.starts_with('-') {
        if let Some(m) = VENDOR_PREFIX_RE.find(property) {
            prefix = m.as_str().to_string();
            rest = property[m.end()..].to_string();
        }
    } else if let Some(first) = property.chars().next() {
        if config::is_hack_char(first) {
            prefix = first.to_string();
            rest = property[first.len_utf8()..].to_string();
        }
    }
    PropertyDetail {
        prefix: prefix.to_lowercase(),
        value: rest.to_lowercase(),
        suffix: String::new(),
    }
}

/// Split a value into `{prefix, value, suffix, important}`
fn parse_value(value: &str) -> ValueDetail {
    let mut value = value.to_string();
    let mut suffix = String::new();
    let mut important = false;
    let mut prefix = String::new();
    if value.contains('\\') {
        if let Some(m) = VALUE_SUFFIX_RE.find(&value) {
            suffix = m.as_str().to_string();
            value.truncate(m.start());
        }
    }
    if value.contains('!') {
        if let Some(m) = IMPORTANT_RE.find(&value) {
            important = true;
            value.replace_range(m.range(), "");
        }
    }
    if value.starts_with('-') {
        if let Some(m) = VENDOR_PREFIX_RE.find(&value) {
            prefix = m.as_str().to_string();
            value = value[m.end()..].to_string();
        }
    }
    if !suffix.is_empty() || important {
        value = value.trim().to_string();
    }
    ValueDetail { prefix, value, suffix, important, has_template: false }
}
