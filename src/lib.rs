//! Session gate for the `MilaVerse` dashboard.
//!
//! ARCHITECTURE
//! ============
//! Every protected page sits behind one [`gate::SessionGate`]. On each route
//! transition the gate reads the stored credential, asks the backend
//! verifier whether it is still valid, and either renders the page or
//! redirects to login. Storage, verification and navigation are injected
//! collaborators:
//!
//! - [`credential::CredentialStore`]: where the login flow keeps the token
//! - [`verifier::Verifier`]: the backend's authoritative session check
//! - [`gate::Navigator`]: performs redirects for the host view
//!
//! Configuration comes from `MILAVERSE_*` environment variables
//! ([`config::Config::from_env`]). Logging uses `tracing`; the host installs
//! the subscriber.

pub mod config;
pub mod credential;
pub mod error;
pub mod gate;
pub mod route;
pub mod verifier;

pub use config::{Config, GateConfig, VerifierConfig};
pub use credential::{Credential, CredentialStore};
pub use error::GateError;
pub use gate::{GateDecision, SessionGate};
pub use verifier::{HttpVerifier, UserInfo, Verifier};
