//! Scanner error types

use std::fmt;
use thiserror::Error;

/// Scan result type
pub type ScanResult<T> = Result<T, ScanError>;

/// Source location in the scanned text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Character offset from start
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line: {}, col: {}", self.line, self.column)
    }
}

/// Scanning errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("can not find end quote char ({location})")]
    UnterminatedQuote {
        location: SourceLocation,
    },

    #[error("can not find matched string `{open}` & `{close}` ({location})")]
    UnmatchedDelimiter {
        open: String,
        close: String,
        location: SourceLocation,
    },

    #[error("left delimiter & right delimiter length not equal ({left} vs {right})")]
    DelimiterCountMismatch {
        left: usize,
        right: usize,
    },

    #[error("{message} ({location})")]
    ScanFailed {
        message: String,
        location: SourceLocation,
    },
}

impl ScanError {
    pub fn unterminated_quote(location: SourceLocation) -> Self {
        Self::UnterminatedQuote { location }
    }

    pub fn unmatched(open: impl Into<String>, close: impl Into<String>, location: SourceLocation) -> Self {
        Self::UnmatchedDelimiter { open: open.into(), close: close.into(), location }
    }

    pub fn scan_failed(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::ScanFailed { message: message.into(), location }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new(3, 7, 42);
        assert_eq!(format!("{}", loc), "line: 3, col: 7");
    }

    #[test]
    fn test_unterminated_quote_display() {
        let err = ScanError::unterminated_quote(SourceLocation::new(1, 5, 4));
        assert_eq!(format!("{}", err), "can not find end quote char (line: 1, col: 5)");
    }

    #[test]
    fn test_delimiter_mismatch_display() {
        let err = ScanError::DelimiterCountMismatch { left: 2, right: 1 };
        assert!(format!("{}", err).contains("not equal"));
    }
}
