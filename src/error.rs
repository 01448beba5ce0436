// src/error.rs
//! Error types for the portal client.
//!
//! Every failure a user action can run into is mapped onto one
//! [`PortalError`] variant, so the command layer can render it as a single
//! message and keep going.

use thiserror::Error;

/// Errors raised while talking to the credential portal API or handling the
/// documents it returns.
#[derive(Debug, Error)]
pub enum PortalError {
    /// No session token is stored locally, or the server rejected it (401).
    #[error("authentication required: {0}")]
    Authentication(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// A local file handed to the client is not a JSON document.
    #[error("invalid input document: {0}")]
    MalformedInput(String),

    /// A form field is missing or badly formatted.
    #[error("{0}")]
    InvalidForm(String),

    /// A success response whose body could not be understood.
    #[error("malformed server response: {0}")]
    MalformedResponse(String),

    /// The disclosure policy rejected the claim selection.
    #[error("select at least {required} claim(s) to disclose ({selected} selected)")]
    InsufficientClaims { required: usize, selected: usize },

    #[error("credential has no claim named '{0}'")]
    UnknownClaim(String),

    #[error("no claims selected for credential {0}")]
    NothingSelected(i64),

    #[error("credential {0} is not in the session cache")]
    CredentialNotFound(i64),

    /// A presentation request for the credential is already in flight.
    #[error("a presentation for credential {0} is already being generated")]
    SubmissionInProgress(i64),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl PortalError {
    /// Whether the failure means the session is gone and the user has to log
    /// in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, PortalError::Authentication(_))
    }
}

pub type PortalResult<T> = Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_displays_server_message_verbatim() {
        let err = PortalError::Remote {
            status: 403,
            message: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "forbidden");
        assert!(!err.requires_login());
    }

    #[test]
    fn authentication_error_requires_login() {
        let err = PortalError::Authentication("token missing".into());
        assert!(err.requires_login());
    }
}
