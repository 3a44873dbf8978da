//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::path::FieldPath;

/// Errors raised by the form engine.
///
/// Construction errors abort building the offending subtree. Validation
/// problems are never errors: they live in the error snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("shape mismatch at `{path}`: mapper produced field `{field}` with no declared child")]
    ShapeMismatch { path: FieldPath, field: String },

    #[error("unknown variant at `{path}`: discriminant `{discriminant}` has no subtree for {value}")]
    UnknownVariant {
        path: FieldPath,
        discriminant: String,
        value: String,
    },

    #[error("invalid shape at `{path}`: {reason}")]
    InvalidShape { path: FieldPath, reason: String },

    #[error("value mismatch at `{path}`: expected {expected}, found {found}")]
    ValueMismatch {
        path: FieldPath,
        expected: &'static str,
        found: String,
    },

    #[error("mapping failed at `{path}`: {message}")]
    Mapping { path: FieldPath, message: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("no node at `{0}`")]
    PathNotFound(FieldPath),

    #[error("node at `{0}` is not a collection")]
    NotACollection(FieldPath),

    #[error("node at `{0}` is not a leaf")]
    NotALeaf(FieldPath),

    #[error("index {index} out of range for `{path}` (len {len})")]
    IndexOutOfRange {
        path: FieldPath,
        index: usize,
        len: usize,
    },
}

impl FormError {
    /// Construction errors abort building a subtree; everything else is a
    /// caller mistake.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            FormError::ShapeMismatch { .. }
                | FormError::UnknownVariant { .. }
                | FormError::InvalidShape { .. }
                | FormError::ValueMismatch { .. }
                | FormError::Mapping { .. }
        )
    }

    /// Attach a path to a mapping failure raised without one.
    pub(crate) fn at(self, path: &FieldPath) -> Self {
        match self {
            FormError::Mapping { message, .. } => FormError::Mapping {
                path: path.clone(),
                message,
            },
            other => other,
        }
    }
}

/// Result type for form engine operations.
pub type FormResult<T> = Result<T, FormError>;
