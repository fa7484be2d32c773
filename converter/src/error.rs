//! Error types for the conversion engine.
//!
//! One enum per failure family, wrapped by [`ConvertError`]:
//!
//! - [`SelectorError`] - malformed paths, ambiguous steps, list-marker misuse
//! - [`ReferenceError`] - unresolved or duplicated cross-reference ids
//! - [`RelocationError`] - deferred relocations that were never finished
//! - [`LineError`] - line-record reader errors
//!
//! Every one of them aborts the current pass. Conversion is automatic via
//! `From` implementations, so `?` works across the boundaries.

use thiserror::Error;

pub use crate::parser::LineError;

// =============================================================================
// Selector Errors
// =============================================================================

/// Errors raised by the path selector language.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// A step does not follow the step grammar.
    #[error("Malformed path '{path}' at step '{step}': {reason}")]
    Malformed {
        path: String,
        step: String,
        reason: String,
    },

    /// A step without an explicit index matched more than one node.
    #[error("Ambiguous path '{path}': step '{step}' matched {count} nodes")]
    Ambiguous {
        path: String,
        step: String,
        count: usize,
    },

    /// `[]` used anywhere but the last step of a read path.
    #[error("List marker '[]' is only allowed on the last step of a read path: '{path}'")]
    ListMarker { path: String },
}

// =============================================================================
// Reference Errors
// =============================================================================

/// Errors resolving or registering cross-references.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    /// No record with this id exists in the expected category.
    #[error("Unresolved reference @{id}@ in category {category}")]
    Unresolved { id: String, category: String },

    /// Two records of the same category share an id.
    #[error("Duplicate id @{id}@ in category {category}")]
    DuplicateId { id: String, category: String },
}

// =============================================================================
// Relocation Errors
// =============================================================================

/// Errors from the deferred relocation queue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelocationError {
    /// Entries were still queued when the pass finished.
    #[error("{count} relocation(s) for category {category} were never drained")]
    Undrained { category: String, count: usize },

    /// The reference left behind by a deferred relocation was removed before draining.
    #[error("Placeholder for a pending {category} relocation was detached before draining")]
    DetachedPlaceholder { category: String },
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Top-level conversion error.
///
/// This is the error returned by [`crate::transform::pipeline::convert_tree`]
/// and the other pass entry points.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Selector error.
    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    /// Reference error.
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// Relocation error.
    #[error("Relocation error: {0}")]
    Relocation(#[from] RelocationError),

    /// Line-record reader error.
    #[error("Read error: {0}")]
    Line(#[from] LineError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Options or tree JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for selector operations.
pub type SelectorResult<T> = Result<T, SelectorError>;

/// Result type for store operations.
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Result type for conversion passes.
pub type ConvertResult<T> = Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let sel_err = SelectorError::ListMarker {
            path: "INDI[]/NAME".into(),
        };
        let convert_err: ConvertError = sel_err.into();
        assert!(convert_err.to_string().contains("INDI[]/NAME"));

        let ref_err = ReferenceError::Unresolved {
            id: "M7".into(),
            category: "OBJE".into(),
        };
        let convert_err: ConvertError = ref_err.into();
        let msg = convert_err.to_string();
        assert!(msg.contains("@M7@"));
        assert!(msg.contains("OBJE"));
    }

    #[test]
    fn test_ambiguous_error_format() {
        let err = SelectorError::Ambiguous {
            path: "INDI/NAME".into(),
            step: "NAME".into(),
            count: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("INDI/NAME"));
        assert!(msg.contains("matched 2 nodes"));
    }

    #[test]
    fn test_undrained_error_format() {
        let err = RelocationError::Undrained {
            category: "OBJE".into(),
            count: 3,
        };
        assert!(err.to_string().starts_with("3 relocation(s) for category OBJE"));
    }
}
