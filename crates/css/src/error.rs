//! CSS compression error types

use squeegee_scan::{ScanError, SourceLocation};
use thiserror::Error;

/// CSS compression result type
pub type CssResult<T> = Result<T, CssError>;

/// Errors raised while tokenizing or compressing a stylesheet
#[derive(Debug, Error)]
pub enum CssError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("after selector must be a {{ ({location})")]
    MissingBlockStart {
        location: SourceLocation,
    },
}

impl CssError {
    pub fn missing_block_start(location: SourceLocation) -> Self {
        Self::MissingBlockStart { location }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_block_display() {
        let err = CssError::missing_block_start(SourceLocation::new(2, 4, 10));
        assert_eq!(format!("{}", err), "after selector must be a { (line: 2, col: 4)");
    }

    #[test]
    fn test_scan_error_wraps() {
        let err: CssError = ScanError::unterminated_quote(SourceLocation::new(1, 1, 0)).into();
        assert!(matches!(err, CssError::Scan(_)));
    }
}
