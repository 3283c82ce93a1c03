//! Session verification errors.
//!
//! ERROR HANDLING
//! ==============
//! Every variant produces the same observable outcome at the gate: redirect
//! to login. The taxonomy exists for logs, keyed by `error_code()`. Nothing
//! is retried; the user re-initiates by logging in again.

use crate::credential::{CredentialError, StoreError};

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// No credential is stored.
    #[error("no credential stored")]
    MissingCredential,

    /// A credential is stored but cannot be used.
    #[error("stored credential is malformed: {0}")]
    MalformedCredential(#[from] CredentialError),

    /// The credential store could not be read.
    #[error("credential store failed: {0}")]
    Store(#[from] StoreError),

    /// The verifier request never produced a response (network, timeout).
    #[error("verifier request failed: {0}")]
    Transport(String),

    /// The backend rejected the credential (401/403).
    #[error("verifier rejected credential: status {status}")]
    Unauthorized { status: u16, message: Option<String> },

    /// The backend answered with any other non-2xx status.
    #[error("verifier returned status {status}")]
    BackendStatus { status: u16, message: Option<String> },

    /// A 2xx response whose body does not carry a valid `user`.
    #[error("verifier response invalid: {0}")]
    InvalidResponse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl GateError {
    /// Grepable code for log lines.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "E_MISSING_CREDENTIAL",
            Self::MalformedCredential(_) => "E_MALFORMED_CREDENTIAL",
            Self::Store(_) => "E_CREDENTIAL_STORE",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Unauthorized { .. } => "E_UNAUTHORIZED",
            Self::BackendStatus { .. } => "E_BACKEND_STATUS",
            Self::InvalidResponse(_) => "E_INVALID_RESPONSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Backend-supplied error message, when the response carried one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message, .. } | Self::BackendStatus { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}
