//! Error types for Easel model operations.
//!
//! All fallible model operations return [`ModelError`]. Variants are specific
//! so callers (and tests) can match on the exact condition; [`ErrorKind`]
//! groups them into the coarse categories a host application cares about.

use std::io;

use thiserror::Error;

use easel_core::{geometry::Point, text::MeasureError};

use crate::identifier::AssociationId;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Out-of-range value, unsupported tag, bad index, degenerate geometry,
    /// or a reference that is no longer valid.
    InvalidArgument,
    /// A file resource could not be read or loaded.
    FileIo,
    /// Persisted data did not have the expected shape.
    Parsing,
}

/// The main error type for Easel model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("ratio {0} out of range [0, 1]")]
    RatioOutOfRange(f64),

    #[error("font size must be positive")]
    NonPositiveFontSize,

    #[error("invalid font path `{0}`")]
    InvalidFontPath(String),

    #[error("unsupported association kind bits {0:#x}")]
    UnsupportedAssociationKind(u8),

    #[error("unsupported text style bits {0:#x}")]
    UnsupportedTextStyle(u8),

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: isize, len: usize },

    #[error("association endpoints coincide at {0:?}")]
    DegenerateGeometry(Point),

    #[error("parent gadget no longer exists")]
    DetachedEndpoint,

    #[error("component already present in container")]
    DuplicateComponent,

    #[error("component not present in container")]
    UnknownComponent,

    #[error("association {0} not indexed under the given endpoints")]
    NotIndexed(AssociationId),

    #[error("no command to undo")]
    NothingToUndo,

    #[error("no command to redo")]
    NothingToRedo,

    #[error("text measurement failed: {0}")]
    Measure(#[from] MeasureError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed diagram data: {0}")]
    Parse(String),
}

impl ModelError {
    /// Maps the concrete condition onto its coarse category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Measure(MeasureError::FontLoad { .. }) | ModelError::Io(_) => {
                ErrorKind::FileIo
            }
            ModelError::Parse(_) => ErrorKind::Parsing,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ModelError::RatioOutOfRange(1.5).kind(), ErrorKind::InvalidArgument);
        assert_eq!(ModelError::NothingToUndo.kind(), ErrorKind::InvalidArgument);
        assert_eq!(ModelError::Parse("bad".into()).kind(), ErrorKind::Parsing);
        assert_eq!(
            ModelError::Io(io::Error::new(io::ErrorKind::NotFound, "missing")).kind(),
            ErrorKind::FileIo
        );
        assert_eq!(
            ModelError::Measure(MeasureError::NonPositiveSize).kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_error_messages_are_specific() {
        let err = ModelError::IndexOutOfBounds { index: 4, len: 2 };
        assert_eq!(err.to_string(), "index 4 out of bounds for length 2");

        let err = ModelError::UnsupportedAssociationKind(0x3);
        assert!(err.to_string().contains("0x3"));
    }
}
