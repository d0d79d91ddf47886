//! Typed credential verification failures.

use thiserror::Error;

/// Outcome of a failed credential verification.
///
/// The gateway surfaces expired and malformed tokens to clients as distinct
/// reason codes, so the verifier must keep them apart rather than collapsing
/// everything into one authentication error.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token's signature was valid but it has expired.
    #[error("token has expired")]
    Expired,

    /// The token is malformed, has a bad signature, or carries bad claims.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// The verifier itself failed (key material, crypto backend).
    #[error("credential verifier fault: {0}")]
    Internal(String),
}
