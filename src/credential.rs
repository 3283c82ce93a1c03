//! Client-held credentials and the stores that persist them.
//!
//! SYSTEM CONTEXT
//! ==============
//! The login flow writes a credential after the OAuth handshake; the session
//! gate only reads it. Stores hand back the raw persisted strings so the gate
//! can tell "absent" apart from "present but malformed".

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "credential_test.rs"]
mod tests;

// =============================================================================
// ERRORS
// =============================================================================

/// Reasons a stored credential cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("token is empty")]
    EmptyToken,
    #[error("subject id {0:?} is not numeric")]
    InvalidSubject(String),
    #[error("token contains characters not allowed in a cookie value")]
    InvalidCookieToken,
}

/// Failures reading or writing a credential store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store contents unreadable: {0}")]
    Corrupt(String),
}

// =============================================================================
// CREDENTIAL
// =============================================================================

/// Raw persisted credential, exactly as the store holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Business/user id the token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(pub u64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated bearer token plus subject id.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    subject: SubjectId,
}

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>, subject: SubjectId) -> Self {
        Self { token: token.into(), subject }
    }

    /// Validate a stored credential. Both fields are trimmed; the token must be
    /// non-empty and the subject id must be an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns `EmptyToken` for a blank token and `InvalidSubject` when the
    /// subject id is not an unsigned integer.
    pub fn parse(stored: &StoredCredential) -> Result<Self, CredentialError> {
        let token = stored.token.trim();
        if token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        let raw_subject = stored.user_id.trim();
        let subject = raw_subject
            .parse::<u64>()
            .map_err(|_| CredentialError::InvalidSubject(raw_subject.to_owned()))?;
        Ok(Self { token: token.to_owned(), subject: SubjectId(subject) })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    #[must_use]
    pub fn to_stored(&self) -> StoredCredential {
        StoredCredential { token: self.token.clone(), user_id: self.subject.to_string() }
    }
}

// Tokens must never reach logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("subject", &self.subject)
            .finish()
    }
}

// =============================================================================
// STORE CONTRACT
// =============================================================================

/// Persistence for the client credential.
///
/// The gate only calls `get`; `set` and `clear` belong to the login and
/// logout flows.
pub trait CredentialStore: Send + Sync {
    /// Return the stored credential, or `None` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self) -> Result<Option<StoredCredential>, StoreError>;

    /// Replace the stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, credential: &Credential) -> Result<(), StoreError>;

    /// Remove any stored credential. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store, the equivalent of session storage.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<StoredCredential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw contents, valid or not.
    #[must_use]
    pub fn with_stored(stored: StoredCredential) -> Self {
        Self { slot: Mutex::new(Some(stored)) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<StoredCredential>, StoreError> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slot.clone())
    }

    fn set(&self, credential: &Credential) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(credential.to_stored());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON file on disk, the native counterpart of browser local storage.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<StoredCredential>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn set(&self, credential: &Credential) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body =
            serde_json::to_string(&credential.to_stored()).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
