//! Error types for source graph intake and example document parsing.
//!
//! These cover contract violations at the crate boundary. Recoverable problems found
//! while building the SDK graph are reported as [`crate::Diagnostic`] values instead.

use thiserror::Error;

use crate::source::{OperationId, SourceId};

/// Errors raised when the upstream source graph is malformed.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid source graph JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("{referrer} references unknown source node {id}")]
    DanglingNode { referrer: String, id: SourceId },

    #[error("{referrer} references unknown operation {id}")]
    DanglingOperation { referrer: String, id: OperationId },

    #[error("source node {id} is a {actual}, expected {expected}")]
    UnexpectedKind {
        id: SourceId,
        expected: &'static str,
        actual: &'static str,
    },
}

impl GraphError {
    /// True when the error came from the JSON decoder rather than graph validation.
    pub fn is_syntax(&self) -> bool {
        matches!(self, GraphError::InvalidJson { .. })
    }
}

/// Errors raised while reading a single example document.
#[derive(Debug, Error)]
pub enum ExampleError {
    #[error("invalid JSON in example {path}: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "example {path} does not match the example document format ({} problem(s))",
        errors.len()
    )]
    InvalidShape {
        path: String,
        errors: Vec<ShapeError>,
    },
}

/// Single shape violation inside an example document.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ShapeError {
    /// JSON Pointer (RFC 6901) to the offending value.
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
