//! Backend session verifier.
//!
//! Thin HTTP wrapper around the backend's verify endpoint. Response handling
//! lives in `parse_response` so status and body rules are testable without a
//! network.
//!
//! WIRE CONTRACT
//! =============
//! `2xx` with `{"user": {...}}` is a valid session; every other status or
//! shape is invalid. Error bodies may carry `{"error": "..."}`, which is kept
//! for logs only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Transport, VerifierConfig, VerifyMethod};
use crate::credential::{Credential, CredentialError};
use crate::error::GateError;

#[cfg(test)]
#[path = "verifier_test.rs"]
mod tests;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const TOKEN_COOKIE: &str = "authToken";
pub const USER_ID_COOKIE: &str = "userId";

/// Longest raw body excerpt kept in an `InvalidResponse` message.
const BODY_EXCERPT_CHARS: usize = 200;

// =============================================================================
// USER INFO
// =============================================================================

/// Backend user id: any JSON number (unsigned, signed or float) or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(serde_json::Number),
    Text(String),
}

/// User payload returned by a successful verification.
///
/// Only `id` is checked. Every other field, `name` included, is carried
/// through untouched in `extra`, so serializing a `UserInfo` reproduces the
/// backend's record exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserInfo {
    /// Display name, when the backend sent one as a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(serde_json::Value::as_str)
    }
}

#[derive(Deserialize)]
struct VerifyEnvelope {
    user: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}

// =============================================================================
// VERIFIER CONTRACT
// =============================================================================

/// Authoritative session check for a credential.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verify `credential`, returning the user it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `Transport`, `Unauthorized`, `BackendStatus` or
    /// `InvalidResponse` when the session cannot be confirmed.
    async fn verify(&self, credential: &Credential) -> Result<UserInfo, GateError>;
}

// =============================================================================
// HTTP VERIFIER
// =============================================================================

pub struct HttpVerifier {
    http: reqwest::Client,
    endpoint: String,
    method: VerifyMethod,
    transport: Transport,
}

impl HttpVerifier {
    /// Build a verifier with the configured request and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns `HttpClientBuild` if the HTTP client cannot be constructed.
    pub fn new(config: &VerifierConfig) -> Result<Self, GateError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request)
            .connect_timeout(config.timeouts.connect)
            .build()
            .map_err(|e| GateError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint: config.endpoint(), method: config.method, transport: config.transport })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(&self, credential: &Credential) -> Result<UserInfo, GateError> {
        tracing::debug!(url = %self.endpoint, method = self.method.as_str(), "verifying session");

        let method = match self.method {
            VerifyMethod::Get => reqwest::Method::GET,
            VerifyMethod::Post => reqwest::Method::POST,
        };
        let mut request = self.http.request(method, &self.endpoint);
        for (name, value) in credential_headers(self.transport, credential)? {
            request = request.header(name, value);
        }
        if let Some(body) = credential_body(self.transport, credential) {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| transport_error(&e))?;

        parse_response(status, &text)
    }
}

fn transport_error(e: &reqwest::Error) -> GateError {
    if e.is_timeout() {
        GateError::Transport(format!("request timed out: {e}"))
    } else {
        GateError::Transport(e.to_string())
    }
}

/// Headers carrying the credential for header and cookie transports.
///
/// The cookie transport only accepts tokens made of RFC 6265 cookie-octets,
/// so a token can never smuggle in a second cookie.
pub(crate) fn credential_headers(
    transport: Transport,
    credential: &Credential,
) -> Result<Vec<(&'static str, String)>, GateError> {
    match transport {
        Transport::BearerHeader => Ok(vec![
            ("Authorization", format!("Bearer {}", credential.token())),
            (USER_ID_HEADER, credential.subject().to_string()),
        ]),
        Transport::Cookie => {
            if !credential.token().bytes().all(is_cookie_octet) {
                return Err(CredentialError::InvalidCookieToken.into());
            }
            Ok(vec![(
                "Cookie",
                format!("{TOKEN_COOKIE}={}; {USER_ID_COOKIE}={}", credential.token(), credential.subject()),
            )])
        }
        Transport::Body => Ok(Vec::new()),
    }
}

/// `cookie-octet` from RFC 6265 section 4.1.1: visible ASCII except
/// `"`, `,`, `;` and `\`.
fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

/// JSON body for the body transport.
pub(crate) fn credential_body(transport: Transport, credential: &Credential) -> Option<serde_json::Value> {
    match transport {
        Transport::Body => Some(serde_json::json!({
            "token": credential.token(),
            "userId": credential.subject().to_string(),
        })),
        Transport::BearerHeader | Transport::Cookie => None,
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// Turn a verifier response into the verified user or a typed failure.
///
/// # Errors
///
/// - 401/403: `Unauthorized`
/// - any other non-2xx: `BackendStatus`
/// - 2xx without a schema-valid `user`: `InvalidResponse`
pub fn parse_response(status: u16, body: &str) -> Result<UserInfo, GateError> {
    if !(200..300).contains(&status) {
        let message = error_message(body);
        return Err(match status {
            401 | 403 => GateError::Unauthorized { status, message },
            _ => GateError::BackendStatus { status, message },
        });
    }

    let envelope: VerifyEnvelope = serde_json::from_str(body)
        .map_err(|e| GateError::InvalidResponse(format!("{e}: {}", excerpt(body))))?;
    let user = envelope
        .user
        .filter(|u| !u.is_null())
        .ok_or_else(|| GateError::InvalidResponse("missing user field".into()))?;
    serde_json::from_value(user).map_err(|e| GateError::InvalidResponse(format!("user: {e}")))
}

/// The backend's `error` string, if the body is a JSON error envelope.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .filter(|m| !m.trim().is_empty())
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= BODY_EXCERPT_CHARS {
        body.to_owned()
    } else {
        let cut: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}
