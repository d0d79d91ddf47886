//! Gateway error types with client-visible reason codes.

use thiserror::Error;

use pulse_auth::AuthError;

/// Handshake rejection reasons.
///
/// Admission errors always terminate the handshake; the gateway never
/// retries them on the client's behalf.
#[derive(Debug, Clone, Error)]
pub enum AdmissionError {
    /// No credential was presented.
    #[error("authentication required")]
    AuthRequired,

    /// The credential is malformed or carries a bad signature.
    #[error("invalid token")]
    InvalidToken,

    /// The credential has expired.
    #[error("token expired")]
    TokenExpired,

    /// The identity is temporarily banned after repeated errors.
    #[error("too many errors, try again later")]
    TemporaryBan,

    /// The gateway could not complete the handshake.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AdmissionError {
    /// Stable reason code surfaced to the client.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TemporaryBan => "TEMPORARY_BAN",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<AuthError> for AdmissionError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired => Self::TokenExpired,
            AuthError::Invalid(_) => Self::InvalidToken,
            AuthError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// Rejected subscribe/unsubscribe requests.
///
/// Validation runs before any mutation, so a rejected request leaves every
/// subscription exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    /// The topic list is empty.
    #[error("topics must be a non-empty list")]
    InvalidFormat,

    /// A topic name is empty.
    #[error("invalid topic name")]
    InvalidChannel,

    /// The request names more topics than allowed.
    #[error("too many topics requested")]
    ChannelLimitExceeded,
}

impl SubscribeError {
    /// Stable reason code surfaced to the client.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::InvalidChannel => "INVALID_CHANNEL",
            Self::ChannelLimitExceeded => "CHANNEL_LIMIT_EXCEEDED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_codes() {
        assert_eq!(AdmissionError::AuthRequired.code(), "AUTH_REQUIRED");
        assert_eq!(AdmissionError::InvalidToken.code(), "INVALID_TOKEN");
        assert_eq!(AdmissionError::TokenExpired.code(), "TOKEN_EXPIRED");
        assert_eq!(AdmissionError::TemporaryBan.code(), "TEMPORARY_BAN");
        assert_eq!(
            AdmissionError::Internal("boom".into()).code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_auth_error_mapping() {
        assert!(matches!(
            AdmissionError::from(AuthError::Expired),
            AdmissionError::TokenExpired
        ));
        assert!(matches!(
            AdmissionError::from(AuthError::Invalid("bad".into())),
            AdmissionError::InvalidToken
        ));
        assert!(matches!(
            AdmissionError::from(AuthError::Internal("x".into())),
            AdmissionError::Internal(_)
        ));
    }
}
