//! Error types for the bridge.

use thiserror::Error;

use crate::handle::Handle;
use crate::runtime::{Exception, ExceptionKind};

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Why the embedded runtime could not be brought up.
///
/// Recorded once and returned unchanged to every later caller, so it is
/// `Clone` and carries only owned strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    /// The configuration file could not be read or parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(String),

    /// A native library failed to load.
    #[error("failed to load native library {path}: {message}")]
    Library {
        /// Library path as configured.
        path: String,
        /// Loader error text.
        message: String,
    },

    /// The runtime itself refused to start.
    #[error("runtime initialization failed: {0}")]
    Runtime(String),

    /// Initialization panicked.
    #[error("runtime initialization panicked: {0}")]
    Panicked(String),

    /// The runtime was torn down and cannot be acquired again.
    #[error("runtime has been released")]
    Released,
}

/// Indexing failures, kept apart so rank mismatches can be told from shape
/// mismatches and out-of-range positions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexFault {
    /// Wrong number of indices for the array.
    #[error("expected {expected} indices, got {found}")]
    Rank {
        /// Array rank.
        expected: usize,
        /// Number of indices supplied.
        found: usize,
    },

    /// A position outside an axis.
    #[error("{0}")]
    OutOfRange(String),

    /// Assigned value cannot be broadcast to the selection.
    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("slice step cannot be zero")]
    ZeroStep,

    /// Malformed index expression.
    #[error("invalid index: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// The foreign runtime raised an exception.
    #[error("{path}: {kind}: {message}")]
    ForeignCall {
        /// Dotted call path, or the protocol operation.
        path: String,
        kind: ExceptionKind,
        message: String,
    },

    #[error("IndexError: {0}")]
    Index(#[from] IndexFault),

    #[error("AttributeError: '{type_name}' object has no attribute '{name}'")]
    Attribute { name: String, type_name: String },

    #[error("TypeError: expected {expected}, found {found}")]
    Type { expected: String, found: String },

    /// `free` reported a non-zero status.
    #[error("failed to release {handle}: status {status}")]
    Release { handle: Handle, status: i32 },

    /// The handle is not (or no longer) registered.
    #[error("invalid handle {0}")]
    InvalidHandle(Handle),

    /// The runtime was torn down while the value was still held.
    #[error("runtime has been released")]
    Released,
}

impl BridgeError {
    /// Wrap an exception raised while running `path`.
    pub fn foreign(path: impl Into<String>, exception: Exception) -> Self {
        BridgeError::ForeignCall {
            path: path.into(),
            kind: exception.kind,
            message: exception.message,
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        BridgeError::Type {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Foreign exception kind, when the error came from the runtime.
    pub fn foreign_kind(&self) -> Option<ExceptionKind> {
        match self {
            BridgeError::ForeignCall { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether the bridge is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Initialization(_) | BridgeError::Released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_error_display() {
        let err = BridgeError::foreign(
            "random.randint",
            Exception::value_error("low >= high"),
        );
        assert_eq!(err.to_string(), "random.randint: ValueError: low >= high");
        assert_eq!(err.foreign_kind(), Some(ExceptionKind::ValueError));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_initialization_is_fatal() {
        let err: BridgeError = InitializationError::Released.into();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "runtime has been released");
    }
}
