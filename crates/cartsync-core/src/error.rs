//! Error types for cartsync
//!
//! Provides error handling for:
//! - Remote cart calls (transport failures, rejected mutations)
//! - Cart session persistence and compare-and-set updates
//! - Configuration loading
//! - Widget access from a reconciliation pass

use crate::types::CartId;
use std::path::PathBuf;

/// Errors from the remote cart service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Network unreachable, bad status or undecodable response
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered but refused the request
    #[error("rejected by cart service: {}", .0.join("; "))]
    Rejected(Vec<String>),

    /// Read attempted against a cart that does not exist
    #[error("cart not found")]
    NotFound,
}

impl CartError {
    /// Create transport error
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Check if this is an application-level rejection
    #[inline]
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Check if a caller may reasonably retry
    ///
    /// Only transport failures qualify; rejections repeat deterministically.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Diagnostic messages carried by a rejection
    #[must_use]
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Rejected(messages) => messages,
            _ => &[],
        }
    }
}

/// Cart session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Compare-and-set saw a different identifier than expected
    #[error("session conflict: expected {expected:?}, found {actual:?}")]
    Conflict {
        /// Identifier the caller read before its update
        expected: Option<CartId>,
        /// Identifier in storage at write time
        actual: Option<CartId>,
    },

    /// Stored document could not be encoded or decoded
    #[error("session encoding error: {0}")]
    Serde(#[from] serde_json::Error),

    /// IO error on file-backed storage
    #[error("io error on {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range or missing
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a cart widget implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    /// The host instance is no longer mounted
    #[error("cart host detached")]
    Detached,

    /// No rendered line node carries this identifier
    #[error("line node not found: {0}")]
    NodeMissing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_error_display() {
        let err = CartError::Rejected(vec!["bad variant".into(), "too many".into()]);
        assert_eq!(
            err.to_string(),
            "rejected by cart service: bad variant; too many"
        );
        assert!(CartError::transport("timeout").to_string().contains("timeout"));
    }

    #[test]
    fn cart_error_classification() {
        assert!(CartError::transport("x").is_retryable());
        assert!(!CartError::Rejected(vec![]).is_retryable());
        assert!(CartError::Rejected(vec![]).is_rejected());
        assert!(!CartError::NotFound.is_rejected());
    }

    #[test]
    fn cart_error_messages() {
        let err = CartError::Rejected(vec!["a".into()]);
        assert_eq!(err.messages(), ["a".to_string()]);
        assert!(CartError::NotFound.messages().is_empty());
    }
}
