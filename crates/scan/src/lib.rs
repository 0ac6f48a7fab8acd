//! Squeegee character scanner
//!
//! Low-level scanning shared by the CSS tokenizer: position tracking, quote
//! and comment matching, balanced delimiters, speculative checkpoints, and
//! the template-placeholder overlay.

pub mod error;
pub mod scanner;
pub mod template;

pub use error::{ScanError, ScanResult, SourceLocation};
pub use scanner::{
    Checkpoint, Comment, CommentKind, DelimitedOptions, MatchCharOptions, QuoteMatch,
    QuoteOptions, Scanner, Span, TemplateMatch, UnterminatedPolicy,
};
pub use template::{TemplateConfig, TemplateKind};
