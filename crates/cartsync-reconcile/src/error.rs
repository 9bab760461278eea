//! Error types for the submission flow

use cartsync_core::{CartError, SessionError};

/// Why a submission did not add a line
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Availability gate is closed; no request was made
    #[error("item is unavailable")]
    Unavailable,

    /// Page supplied no variant id; no request was made
    #[error("variant id not found")]
    MissingVariant,

    /// A previous submission is still running
    #[error("submission already in progress")]
    Busy,

    /// Cart service call failed
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Session was replaced while the line was being added
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl SubmitError {
    /// Rejected without reaching the network
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Unavailable | Self::MissingVariant | Self::Busy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_errors() {
        assert!(SubmitError::Unavailable.is_local());
        assert!(SubmitError::MissingVariant.is_local());
        assert!(!SubmitError::Cart(CartError::NotFound).is_local());
    }

    #[test]
    fn cart_error_converts() {
        let err: SubmitError = CartError::transport("down").into();
        assert!(err.to_string().contains("down"));
    }
}
