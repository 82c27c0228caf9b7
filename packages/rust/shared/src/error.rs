//! Error types for ProtocolBuilder.
//!
//! Library crates use [`ProtocolBuilderError`] via `thiserror`. The two
//! registry errors ([`DuplicateRegistration`], [`PathError`]) are standalone
//! types because callers match on them directly; the top-level enum wraps
//! them for code that only needs one error channel.

use std::path::PathBuf;

/// Which registry key collided during registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// The (type, name) key.
    Name,
    /// The (type, id) key.
    Id,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyKind::Name => write!(f, "name"),
            KeyKind::Id => write!(f, "id"),
        }
    }
}

/// A second registration landed on an already-taken registry key.
///
/// This indicates an upstream logic defect, not a recoverable runtime state:
/// registration is all-or-nothing and the original entry stays in place.
#[derive(Debug, Clone, thiserror::Error)]
#[error("duplicate registration for type '{type_tag}': {kind} key '{key}' is already registered")]
pub struct DuplicateRegistration {
    /// Declared type name of the entity being registered.
    pub type_tag: String,
    /// Which of the two identity maps collided.
    pub kind: KeyKind,
    /// The colliding key value.
    pub key: String,
}

/// Path-expression resolution failure.
///
/// Every variant carries the original path string so diagnostics can cite
/// the full expression, not just the failing token.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PathError {
    /// The (start type, start name) key resolved to nothing.
    #[error("path '{path}': could not find start instance '{type_tag}', '{name}'")]
    StartNotFound {
        path: String,
        type_tag: String,
        name: String,
    },

    /// A navigated attribute token named a missing (or empty) attribute.
    #[error("path '{path}': attribute '{attribute}' was not found")]
    AttributeNotFound { path: String, attribute: String },

    /// A navigated instance's declared type did not match the expected token.
    #[error("path '{path}': class mismatch, expecting '{expected}', found '{found}'")]
    ClassMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// Tokens could not be split into attribute/type pairs plus a terminal
    /// `@`-token.
    #[error("path '{path}': format error")]
    Format { path: String },
}

impl PathError {
    /// The original path expression that failed to resolve.
    pub fn path(&self) -> &str {
        match self {
            PathError::StartNotFound { path, .. }
            | PathError::AttributeNotFound { path, .. }
            | PathError::ClassMismatch { path, .. }
            | PathError::Format { path } => path,
        }
    }
}

/// Top-level error type for all ProtocolBuilder operations.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolBuilderError {
    /// Registry identity collision.
    #[error(transparent)]
    Duplicate(#[from] DuplicateRegistration),

    /// Path-expression resolution failure.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ProtocolBuilderError>;

impl ProtocolBuilderError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
