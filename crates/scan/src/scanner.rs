//! Character scanner
//!
//! Position/line/column tracking over a cleaned character buffer, with
//! quote matching, comment capture, balanced-delimiter matching and
//! checkpoint/rollback for speculative scans.

use std::sync::Arc;

use crate::error::{ScanError, ScanResult, SourceLocation};
use crate::template::TemplateConfig;

/// A source span (start and end location)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

/// A comment captured during scanning, attached to the following token
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Raw comment text including delimiters
    pub text: String,
    pub span: Span,
    /// Newlines seen between the previous token and this comment
    pub newline_before: usize,
    /// Whitespace characters seen between the previous token and this comment
    pub space_before: usize,
}

impl Comment {
    /// Bang comments (`/*! ... */`) survive comment stripping
    pub fn is_preserved(&self) -> bool {
        self.text.starts_with("/*!")
    }
}

/// Value-typed scanner checkpoint, consumed by [`Scanner::rollback`]
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    pub pos: usize,
    pub line: usize,
    pub col: usize,
    pub newline_before: usize,
    pub space_before: usize,
}

/// Comment flavor understood by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `// ...` to end of line
    Line,
    /// `/* ... */`
    Block,
}

/// Policy applied when a quoted string never terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnterminatedPolicy {
    /// Keep everything consumed, report `terminated: false`
    Keep,
    /// Restore the scanner to just after the opening quote and return it alone
    Rollback,
    /// Raise a scan error at the opening quote
    Error,
}

/// Options for [`Scanner::quoted`]
#[derive(Debug, Clone, Copy)]
pub struct QuoteOptions {
    /// Honor backslash escapes inside the string
    pub escape: bool,
    /// Treat a doubled quote char as literal (SQL-style), not a terminator
    pub check_next: bool,
    pub on_unterminated: UnterminatedPolicy,
}

impl Default for QuoteOptions {
    fn default() -> Self {
        Self { escape: false, check_next: false, on_unterminated: UnterminatedPolicy::Keep }
    }
}

/// Result of [`Scanner::quoted`]
#[derive(Debug, Clone)]
pub struct QuoteMatch {
    /// Matched text including quotes (when terminated)
    pub text: String,
    pub terminated: bool,
}

/// Options for [`Scanner::matched_char`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchCharOptions {
    /// Characters inside quoted strings are inert
    pub quote: bool,
    /// Count nested open/close pairs
    pub nest: bool,
    /// Characters inside `/* */` comments are inert
    pub multi_comment: bool,
    /// Characters inside `// ...` comments are inert
    pub line_comment: bool,
    /// Honor backslash escapes
    pub escape: bool,
}

/// Options for [`Scanner::delimited`] (string-pair matching)
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedOptions {
    /// Count nested open/close pairs
    pub nest: bool,
    /// Characters inside quoted strings are inert
    pub quote: bool,
    /// Characters inside `/* */` comments are inert
    pub multi_comment: bool,
    /// Characters inside `// ...` comments are inert
    pub line_comment: bool,
    /// Missing close delimiter matches to end of input instead of failing
    pub ignore_end: bool,
}

/// A matched template placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMatch {
    /// Full matched span including delimiters
    pub raw: String,
    /// Span between the delimiters
    pub body: String,
    pub left: String,
    pub right: String,
}

/// Character scanner with pending-whitespace bookkeeping
///
/// `line`/`col` are tracked 0-based internally and exposed 1-based through
/// [`SourceLocation`]. `newline_before`/`space_before` count whitespace seen
/// since the last emitted token; the consumer resets them on emission.
pub struct Scanner {
    chars: Vec<char>,
    /// ASCII-lowercased shadow of `chars`; `look_at`/`find` match against it
    lower: Vec<char>,
    len: usize,
    pos: usize,
    line: usize,
    col: usize,
    newline_before: usize,
    space_before: usize,
    comments_before: Vec<Comment>,
    template: Option<Arc<TemplateConfig>>,
    has_template: bool,
}

impl Scanner {
    /// Create a scanner with no template overlay
    pub fn new(text: &str) -> Self {
        Self::build(text, None)
    }

    /// Create a scanner that recognizes template placeholders
    pub fn with_template(text: &str, template: TemplateConfig) -> Self {
        Self::build(text, Some(template))
    }

    fn build(text: &str, template: Option<TemplateConfig>) -> Self {
        let template = template.map(Arc::new);
        let chars = clean(text);
        let lower: Vec<char> = chars.iter().map(|c| c.to_ascii_lowercase()).collect();
        let len = chars.len();
        let source: String = chars.iter().collect();
        let has_template = template
            .as_ref()
            .map(|t| t.present_in(&source))
            .unwrap_or(false);
        Self {
            chars,
            lower,
            len,
            pos: 0,
            line: 0,
            col: 0,
            newline_before: 0,
            space_before: 0,
            comments_before: Vec::new(),
            template,
            has_template,
        }
    }

    /// Effective input length in characters
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current character offset
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.len
    }

    /// Drop `n` characters from the effective end of the input
    pub fn shrink(&mut self, n: usize) {
        self.len = self.len.saturating_sub(n);
    }

    /// Pending newline count since the last emitted token
    pub fn newline_before(&self) -> usize {
        self.newline_before
    }

    /// Pending whitespace count since the last emitted token
    pub fn space_before(&self) -> usize {
        self.space_before
    }

    /// Reset pending whitespace counters (called on token emission)
    pub fn reset_pending(&mut self) {
        self.newline_before = 0;
        self.space_before = 0;
    }

    /// Take the comments collected since the last emitted token
    pub fn take_comments(&mut self) -> Vec<Comment> {
        std::mem::take(&mut self.comments_before)
    }

    pub fn has_pending_comments(&self) -> bool {
        !self.comments_before.is_empty()
    }

    pub fn push_comment(&mut self, comment: Comment) {
        self.comments_before.push(comment);
    }

    /// Whether the input contains any configured template placeholder at all
    pub fn has_template(&self) -> bool {
        self.has_template
    }

    pub fn template(&self) -> Option<&TemplateConfig> {
        self.template.as_deref()
    }

    /// Current location, 1-based
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line + 1, self.col + 1, self.pos)
    }

    /// Location of a checkpoint, 1-based
    pub fn location_of(&self, checkpoint: &Checkpoint) -> SourceLocation {
        SourceLocation::new(checkpoint.line + 1, checkpoint.col + 1, checkpoint.pos)
    }

    pub fn peek(&self) -> Option<char> {
        if self.pos < self.len { Some(self.chars[self.pos]) } else { None }
    }

    pub fn peek_at(&self, offset: usize) -> Option<char> {
        let pos = self.pos + offset;
        if pos < self.len { Some(self.chars[pos]) } else { None }
    }

    /// Consume one character, updating line/col and the newline counter
    ///
    /// Callers guard with `is_eof()`; consuming past the end panics.
    pub fn advance(&mut self) -> char {
        let c = self.chars[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
            self.newline_before += 1;
        } else {
            self.col += 1;
        }
        c
    }

    /// Consume up to `n` characters and return them
    pub fn forward(&mut self, n: usize) -> String {
        let mut out = String::new();
        for _ in 0..n {
            if self.is_eof() {
                break;
            }
            out.push(self.advance());
        }
        out
    }

    /// Non-consuming, case-insensitive prefix test at the current position
    pub fn look_at(&self, needle: &str) -> bool {
        let mut pos = self.pos;
        for c in needle.chars() {
            if pos >= self.len || self.lower[pos] != c.to_ascii_lowercase() {
                return false;
            }
            pos += 1;
        }
        true
    }

    /// Case-insensitive forward search; returns the absolute character index
    pub fn find(&self, needle: &str, from_offset: usize) -> Option<usize> {
        let needle: Vec<char> = needle.chars().map(|c| c.to_ascii_lowercase()).collect();
        if needle.is_empty() {
            return None;
        }
        let mut start = self.pos + from_offset;
        while start + needle.len() <= self.len {
            if self.lower[start..start + needle.len()] == needle[..] {
                return Some(start);
            }
            start += 1;
        }
        None
    }

    /// Whitespace per the scanner's whitespace set (wider than ASCII)
    pub fn is_whitespace(c: char) -> bool {
        matches!(
            c,
            ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c' | '\u{00a0}' | '\u{200b}'
                | '\u{180e}' | '\u{2000}'..='\u{200a}' | '\u{202f}' | '\u{205f}' | '\u{3000}'
        )
    }

    /// Skip whitespace, counting it into the pending counters
    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !Self::is_whitespace(c) {
                break;
            }
            self.space_before += 1;
            self.advance();
        }
    }

    /// Trim trailing whitespace from an already-consumed token body, crediting
    /// the trimmed characters back to the pending counters
    pub fn skip_right_space(&mut self, value: &str) -> String {
        let mut newlines = 0;
        let mut spaces = 0;
        let mut end = value.len();
        for (idx, c) in value.char_indices().rev() {
            if Self::is_whitespace(c) {
                end = idx;
                spaces += 1;
                if c == '\n' {
                    newlines += 1;
                }
            } else {
                break;
            }
        }
        self.newline_before += newlines;
        self.space_before += spaces;
        value[..end].to_string()
    }

    /// Snapshot position, line/col and pending counters
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            line: self.line,
            col: self.col,
            newline_before: self.newline_before,
            space_before: self.space_before,
        }
    }

    /// Restore a snapshot taken with [`Scanner::checkpoint`]
    pub fn rollback(&mut self, checkpoint: &Checkpoint) {
        log::trace!("rollback {} -> {}", self.pos, checkpoint.pos);
        self.pos = checkpoint.pos;
        self.line = checkpoint.line;
        self.col = checkpoint.col;
        self.newline_before = checkpoint.newline_before;
        self.space_before = checkpoint.space_before;
    }

    /// Scan a quoted string starting at the current position
    ///
    /// Template placeholders inside the string are consumed as opaque spans.
    pub fn quoted(&mut self, options: QuoteOptions) -> ScanResult<QuoteMatch> {
        let quote = self.advance();
        let start = self.checkpoint();
        let mut text = String::new();
        text.push(quote);
        let mut terminated = false;
        let mut escape = false;
        while !self.is_eof() {
            if let Some(tpl) = self.template_token()? {
                text.push_str(&tpl.raw);
                continue;
            }
            let c = self.chars[self.pos];
            if options.escape && (c == '\\' || escape) {
                escape = !escape;
                text.push(self.advance());
                continue;
            }
            if !escape && c == quote {
                if !options.check_next || self.peek_at(1) != Some(quote) {
                    text.push(self.advance());
                    terminated = true;
                    break;
                }
            }
            text.push(self.advance());
        }
        if !terminated {
            match options.on_unterminated {
                UnterminatedPolicy::Error => {
                    return Err(ScanError::unterminated_quote(self.location_of(&start)));
                }
                UnterminatedPolicy::Rollback => {
                    self.rollback(&start);
                    return Ok(QuoteMatch { text: quote.to_string(), terminated: false });
                }
                UnterminatedPolicy::Keep => {}
            }
        }
        Ok(QuoteMatch { text, terminated })
    }

    /// Match a `start ... end` span with no nesting or quote awareness
    ///
    /// Returns `None` when `start` is not at the current position or `end`
    /// does not occur later in the input.
    pub fn matched(&mut self, start: &str, end: &str) -> Option<String> {
        if !self.look_at(start) {
            return None;
        }
        let start_len = start.chars().count();
        let end_len = end.chars().count();
        let close = self.find(end, start_len)?;
        Some(self.forward(close - self.pos + end_len))
    }

    /// Balanced single-character delimiter matching (`()`, `[]`, `{}`)
    ///
    /// Returns `None` only when the open character is not at the current
    /// position; an unbalanced span consumes to end of input.
    pub fn matched_char(
        &mut self,
        open: char,
        close: char,
        options: MatchCharOptions,
    ) -> ScanResult<Option<String>> {
        if self.peek() != Some(open) {
            return Ok(None);
        }
        let mut out = String::new();
        out.push(self.advance());
        let mut depth = 0usize;
        let mut escape = false;
        while !self.is_eof() {
            let c = self.chars[self.pos];
            if options.escape && (c == '\\' || escape) {
                escape = !escape;
                out.push(self.advance());
                continue;
            }
            if options.quote && !escape && (c == '"' || c == '\'') {
                let quote = self.quoted(QuoteOptions {
                    on_unterminated: UnterminatedPolicy::Rollback,
                    ..QuoteOptions::default()
                })?;
                out.push_str(&quote.text);
                continue;
            }
            if c == '/' {
                let comment = if options.multi_comment && self.peek_at(1) == Some('*') {
                    self.comment_token(CommentKind::Block, false)
                } else if options.line_comment && self.peek_at(1) == Some('/') {
                    self.comment_token(CommentKind::Line, false)
                } else {
                    None
                };
                if let Some(comment) = comment {
                    out.push_str(&comment.text);
                    continue;
                }
            }
            if options.nest && c == open {
                depth += 1;
            } else if c == close {
                if !options.nest || depth == 0 {
                    out.push(self.advance());
                    return Ok(Some(out));
                }
                depth -= 1;
            }
            out.push(self.advance());
        }
        Ok(Some(out))
    }

    /// Match a string-pair delimited span (template placeholders)
    pub fn delimited(
        &mut self,
        open: &str,
        close: &str,
        options: DelimitedOptions,
    ) -> ScanResult<Option<String>> {
        if !self.look_at(open) {
            return Ok(None);
        }
        let start = self.checkpoint();
        let open_len = open.chars().count();
        let close_len = close.chars().count();
        if self.find(close, open_len).is_none() {
            if options.ignore_end {
                let rest = self.forward(self.len - self.pos);
                return Ok(Some(rest));
            }
            return Ok(None);
        }
        let mut out = self.forward(open_len);
        let mut depth = 0usize;
        let mut escape = false;
        while !self.is_eof() {
            if self.look_at(close) {
                out.push_str(&self.forward(close_len));
                if !options.nest || depth == 0 {
                    return Ok(Some(out));
                }
                depth -= 1;
                continue;
            }
            if options.nest && self.look_at(open) {
                out.push_str(&self.forward(open_len));
                depth += 1;
                continue;
            }
            let c = self.chars[self.pos];
            if options.quote {
                if c == '\\' || escape {
                    escape = !escape;
                    out.push(self.advance());
                    continue;
                }
                if !escape && (c == '"' || c == '\'') {
                    let quote = self.quoted(QuoteOptions {
                        on_unterminated: UnterminatedPolicy::Rollback,
                        ..QuoteOptions::default()
                    })?;
                    out.push_str(&quote.text);
                    continue;
                }
            }
            if c == '/' {
                let comment = if options.multi_comment && self.peek_at(1) == Some('*') {
                    self.comment_token(CommentKind::Block, false)
                } else if options.line_comment && self.peek_at(1) == Some('/') {
                    self.comment_token(CommentKind::Line, false)
                } else {
                    None
                };
                if let Some(comment) = comment {
                    out.push_str(&comment.text);
                    continue;
                }
            }
            out.push(self.advance());
        }
        if depth != 0 && !options.ignore_end {
            return Err(ScanError::unmatched(open, close, self.location_of(&start)));
        }
        Ok(Some(out))
    }

    /// Scan one comment at the current position
    ///
    /// Pending whitespace counters are folded into the comment and reset, so
    /// the comment carries the separation that preceded it.
    pub fn comment_token(&mut self, kind: CommentKind, skip_whitespace_after: bool) -> Option<Comment> {
        let start = self.checkpoint();
        let text = match kind {
            CommentKind::Block => self.matched("/*", "*/")?,
            CommentKind::Line => self.line_comment()?,
        };
        let comment = Comment {
            text,
            span: Span { start: self.location_of(&start), end: self.location() },
            newline_before: start.newline_before,
            space_before: start.space_before,
        };
        self.reset_pending();
        if skip_whitespace_after {
            self.skip_whitespace();
        }
        Some(comment)
    }

    fn line_comment(&mut self) -> Option<String> {
        if !self.look_at("//") {
            return None;
        }
        let mut out = self.forward(2);
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            out.push(self.advance());
        }
        Some(out)
    }

    /// Try each configured delimiter pair for a template placeholder at the
    /// current position
    pub fn template_token(&mut self) -> ScanResult<Option<TemplateMatch>> {
        if !self.has_template {
            return Ok(None);
        }
        let template = match &self.template {
            Some(t) => Arc::clone(t),
            None => return Ok(None),
        };
        let options = template.match_options();
        for (left, right) in template.pairs() {
            if let Some(raw) = self.delimited(left, right, options)? {
                let chars: Vec<char> = raw.chars().collect();
                let left_len = left.chars().count();
                let right_len = right.chars().count();
                let lower: String = raw.to_ascii_lowercase();
                let body: String = if lower.ends_with(&right.to_ascii_lowercase()) {
                    chars[left_len..chars.len() - right_len].iter().collect()
                } else {
                    chars[left_len..].iter().collect()
                };
                return Ok(Some(TemplateMatch {
                    raw,
                    body,
                    left: left.clone(),
                    right: right.clone(),
                }));
            }
        }
        Ok(None)
    }

    /// Whether any configured left delimiter starts at the current position
    pub fn is_template_next(&self) -> bool {
        if !self.has_template {
            return false;
        }
        match &self.template {
            Some(t) => t.pairs().any(|(left, _)| self.look_at(left)),
            None => false,
        }
    }
}

/// Normalize line endings to `\n` and strip BOM characters
fn clean(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    let mut iter = text.chars().peekable();
    while let Some(c) = iter.next() {
        match c {
            '\u{feff}' => {}
            '\r' => {
                if iter.peek() == Some(&'\n') {
                    iter.next();
                }
                out.push('\n');
            }
            '\u{2028}' | '\u{2029}' => out.push('\n'),
            c => out.push(c),
        }
    }
    out
}
