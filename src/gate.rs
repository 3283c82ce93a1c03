//! Session gate: decides whether a route renders or redirects to login.
//!
//! SYSTEM CONTEXT
//! ==============
//! The host view calls [`SessionGate::navigate`] on every route transition and
//! renders page content only once [`SessionGate::decision`] reports `Render`.
//! Credential storage, backend verification and navigation are injected so
//! the gate reads no ambient globals.
//!
//! STATE MACHINE
//! =============
//! `Idle → Verifying → {Verified, Redirecting}` per navigation. `Verified` and
//! `Redirecting` are terminal until the next navigation re-enters
//! `Verifying`.
//!
//! CANCELLATION
//! ============
//! Each navigation takes a generation number. Starting a new navigation
//! bumps the generation and wakes the superseded one, which drops its pending
//! verification future (cancelling the HTTP request) and returns `None`
//! without touching state or the navigator. At most one verification is in
//! flight at any time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::config::GateConfig;
use crate::credential::{Credential, CredentialStore, StoreError};
use crate::error::GateError;
use crate::route::normalize_route;
use crate::verifier::{UserInfo, Verifier};

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;

// =============================================================================
// TYPES
// =============================================================================

/// Outcome of gating one route.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Show the page. `None` on public routes, which skip verification.
    Render(Option<UserInfo>),
    /// Navigate to the given route instead.
    Redirect(String),
    /// Verification is still pending; show nothing protected.
    Loading,
}

/// Current position in the per-navigation state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum GatePhase {
    Idle,
    Verifying { route: String },
    Verified { route: String, user: Option<UserInfo> },
    Redirecting { target: String },
}

/// Result of the latest completed verification. Never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub verified: bool,
    pub user: Option<UserInfo>,
}

/// Performs the navigation a `Redirect` decision asks for.
///
/// Called without any gate lock held, at most once per navigation.
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: &str);
}

struct GateState {
    generation: u64,
    phase: GatePhase,
}

// =============================================================================
// SESSION GATE
// =============================================================================

pub struct SessionGate {
    config: GateConfig,
    store: Arc<dyn CredentialStore>,
    verifier: Arc<dyn Verifier>,
    navigator: Arc<dyn Navigator>,
    state: Mutex<GateState>,
    latest: watch::Sender<u64>,
}

impl SessionGate {
    #[must_use]
    pub fn new(
        config: GateConfig,
        store: Arc<dyn CredentialStore>,
        verifier: Arc<dyn Verifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (latest, _) = watch::channel(0);
        Self {
            config,
            store,
            verifier,
            navigator,
            state: Mutex::new(GateState { generation: 0, phase: GatePhase::Idle }),
            latest,
        }
    }

    /// Decide how `route` should be handled.
    ///
    /// Public routes render without touching the verifier. When
    /// `redirect_authenticated_from_login` is enabled, the login route is
    /// checked against a stored credential and a valid session redirects to
    /// the dashboard; any failure there still renders the login page.
    /// Protected routes render only after the verifier confirms the session.
    pub async fn evaluate(&self, route: &str) -> GateDecision {
        let route = normalize_route(route);

        if self.config.is_public(&route) {
            if self.config.is_login(&route) && self.config.redirect_authenticated_from_login() {
                return self.evaluate_login(&route).await;
            }
            tracing::debug!(%route, "public route; skipping verification");
            return GateDecision::Render(None);
        }

        match self.verify_stored().await {
            Ok(user) => {
                tracing::debug!(%route, "session verified");
                GateDecision::Render(Some(user))
            }
            Err(e) => {
                tracing::warn!(
                    %route,
                    code = e.error_code(),
                    error = %e,
                    "session verification failed; redirecting to login"
                );
                GateDecision::Redirect(self.config.login_route().to_owned())
            }
        }
    }

    async fn evaluate_login(&self, route: &str) -> GateDecision {
        match self.verify_stored().await {
            Ok(_) => {
                tracing::debug!(%route, "already signed in; leaving login page");
                GateDecision::Redirect(self.config.dashboard_route().to_owned())
            }
            Err(GateError::MissingCredential) => GateDecision::Render(None),
            Err(e) => {
                tracing::debug!(%route, code = e.error_code(), error = %e, "no valid session on login page");
                GateDecision::Render(None)
            }
        }
    }

    async fn verify_stored(&self) -> Result<UserInfo, GateError> {
        let stored = self.store.get()?.ok_or(GateError::MissingCredential)?;
        let credential = Credential::parse(&stored)?;
        self.verifier.verify(&credential).await
    }

    /// Run one navigation event through the gate.
    ///
    /// Returns the applied decision, or `None` if a later navigation, login
    /// or logout superseded this one before it resolved. A `Redirect` is
    /// forwarded to the navigator exactly once.
    pub async fn navigate(&self, route: &str) -> Option<GateDecision> {
        let route = normalize_route(route);
        let ticket = self.begin(GatePhase::Verifying { route: route.clone() });

        let superseded = self.superseded(ticket);
        tokio::pin!(superseded);
        let decision = tokio::select! {
            decision = self.evaluate(&route) => decision,
            () = &mut superseded => {
                tracing::debug!(%route, "navigation superseded; dropping pending verification");
                return None;
            }
        };

        let phase = match &decision {
            GateDecision::Render(user) => GatePhase::Verified { route: route.clone(), user: user.clone() },
            GateDecision::Redirect(target) => GatePhase::Redirecting { target: target.clone() },
            GateDecision::Loading => GatePhase::Verifying { route: route.clone() },
        };
        if !self.finish(ticket, phase) {
            tracing::debug!(%route, "discarding stale gate decision");
            return None;
        }

        if let GateDecision::Redirect(target) = &decision {
            self.navigator.redirect(target);
        }
        Some(decision)
    }

    /// Persist a fresh credential from the login flow, then gate the
    /// dashboard route with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be stored.
    pub async fn complete_login(&self, credential: &Credential) -> Result<Option<GateDecision>, StoreError> {
        self.store.set(credential)?;
        tracing::debug!(subject = %credential.subject(), "credential stored");
        let dashboard = self.config.dashboard_route().to_owned();
        Ok(self.navigate(&dashboard).await)
    }

    /// Clear the stored credential, cancel any pending verification and
    /// redirect to the login route.
    pub fn logout(&self) -> GateDecision {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear credential on logout");
        }
        let target = self.config.login_route().to_owned();
        self.begin(GatePhase::Redirecting { target: target.clone() });
        self.navigator.redirect(&target);
        GateDecision::Redirect(target)
    }

    /// Snapshot for the view layer. Anything but `Render` means protected
    /// content must stay hidden.
    #[must_use]
    pub fn decision(&self) -> GateDecision {
        match &self.lock_state().phase {
            GatePhase::Idle | GatePhase::Verifying { .. } => GateDecision::Loading,
            GatePhase::Verified { user, .. } => GateDecision::Render(user.clone()),
            GatePhase::Redirecting { target } => GateDecision::Redirect(target.clone()),
        }
    }

    #[must_use]
    pub fn phase(&self) -> GatePhase {
        self.lock_state().phase.clone()
    }

    /// Session derived from the latest applied decision.
    #[must_use]
    pub fn session(&self) -> Session {
        match &self.lock_state().phase {
            GatePhase::Verified { user: Some(user), .. } => Session { verified: true, user: Some(user.clone()) },
            _ => Session::default(),
        }
    }

    // =========================================================================
    // GENERATIONS
    // =========================================================================

    fn lock_state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new generation in `phase`, superseding whatever was running.
    /// Published under the state lock so the watch value never goes backwards.
    fn begin(&self, phase: GatePhase) -> u64 {
        let mut state = self.lock_state();
        state.generation += 1;
        state.phase = phase;
        self.latest.send_replace(state.generation);
        state.generation
    }

    /// Apply `phase` if `ticket` is still the latest generation.
    fn finish(&self, ticket: u64, phase: GatePhase) -> bool {
        let mut state = self.lock_state();
        if state.generation != ticket {
            return false;
        }
        state.phase = phase;
        true
    }

    /// Resolves once a generation newer than `ticket` has begun.
    fn superseded(&self, ticket: u64) -> impl Future<Output = ()> + Send {
        let mut latest = self.latest.subscribe();
        async move {
            loop {
                if *latest.borrow_and_update() != ticket {
                    return;
                }
                if latest.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}
