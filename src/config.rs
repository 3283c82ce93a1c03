//! Gate and verifier configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Everything the source app hard-coded per page (public routes, redirect
//! target, verifier transport) is configured once here. Parsing goes through
//! a lookup function so tests never touch the process environment.

use std::time::Duration;

use crate::route::{RouteSet, normalize_route};

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

pub const DEFAULT_VERIFY_PATH: &str = "/verify-session";
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_DASHBOARD_ROUTE: &str = "/dashboard";
pub const DEFAULT_PUBLIC_ROUTES: &str = "/,/login";
pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

const ENV_BACKEND_URL: &str = "MILAVERSE_BACKEND_URL";
const ENV_VERIFY_PATH: &str = "MILAVERSE_VERIFY_PATH";
const ENV_VERIFY_METHOD: &str = "MILAVERSE_VERIFY_METHOD";
const ENV_VERIFY_TRANSPORT: &str = "MILAVERSE_VERIFY_TRANSPORT";
const ENV_VERIFY_TIMEOUT_SECS: &str = "MILAVERSE_VERIFY_TIMEOUT_SECS";
const ENV_CONNECT_TIMEOUT_SECS: &str = "MILAVERSE_CONNECT_TIMEOUT_SECS";
const ENV_PUBLIC_ROUTES: &str = "MILAVERSE_PUBLIC_ROUTES";
const ENV_LOGIN_ROUTE: &str = "MILAVERSE_LOGIN_ROUTE";
const ENV_DASHBOARD_ROUTE: &str = "MILAVERSE_DASHBOARD_ROUTE";
const ENV_REDIRECT_FROM_LOGIN: &str = "MILAVERSE_REDIRECT_AUTHENTICATED_FROM_LOGIN";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid { var: &'static str, value: String, reason: String },
}

// =============================================================================
// TYPES
// =============================================================================

/// How the credential travels to the backend verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// `Authorization: Bearer <token>` plus `X-User-Id`.
    BearerHeader,
    /// `Cookie: authToken=<token>; userId=<id>`.
    Cookie,
    /// JSON body `{"token", "userId"}`; requires POST.
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMethod {
    Get,
    Post,
}

impl VerifyMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyTimeouts {
    pub request: Duration,
    pub connect: Duration,
}

impl Default for VerifyTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(DEFAULT_VERIFY_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Where and how the backend verifier is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    pub backend_url: String,
    pub verify_path: String,
    pub method: VerifyMethod,
    pub transport: Transport,
    pub timeouts: VerifyTimeouts,
}

impl VerifierConfig {
    /// Bearer-header GET against `{backend_url}/verify-session`.
    #[must_use]
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into().trim_end_matches('/').to_owned(),
            verify_path: DEFAULT_VERIFY_PATH.to_owned(),
            method: VerifyMethod::Get,
            transport: Transport::BearerHeader,
            timeouts: VerifyTimeouts::default(),
        }
    }

    /// Full verifier endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        let path = self.verify_path.trim();
        if path.starts_with('/') {
            format!("{}{path}", self.backend_url)
        } else {
            format!("{}/{path}", self.backend_url)
        }
    }
}

/// Route policy for the session gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    public_routes: RouteSet,
    login_route: String,
    dashboard_route: String,
    redirect_authenticated_from_login: bool,
}

impl GateConfig {
    /// Build a gate policy. The login route is always added to the public set
    /// so a failed verification never redirects to the page already shown.
    #[must_use]
    pub fn new(mut public_routes: RouteSet, login_route: &str, dashboard_route: &str) -> Self {
        let login_route = normalize_route(login_route);
        public_routes.insert(&login_route);
        Self {
            public_routes,
            login_route,
            dashboard_route: normalize_route(dashboard_route),
            redirect_authenticated_from_login: false,
        }
    }

    /// Send a visitor who already holds a valid session from the login page
    /// to the dashboard. Off by default: public routes then never trigger a
    /// verifier call.
    #[must_use]
    pub fn with_redirect_authenticated_from_login(mut self, enabled: bool) -> Self {
        self.redirect_authenticated_from_login = enabled;
        self
    }

    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    #[must_use]
    pub fn dashboard_route(&self) -> &str {
        &self.dashboard_route
    }

    #[must_use]
    pub fn redirect_authenticated_from_login(&self) -> bool {
        self.redirect_authenticated_from_login
    }

    #[must_use]
    pub fn is_public(&self, route: &str) -> bool {
        self.public_routes.contains(route)
    }

    #[must_use]
    pub fn is_login(&self, route: &str) -> bool {
        normalize_route(route) == self.login_route
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new(RouteSet::parse(DEFAULT_PUBLIC_ROUTES), DEFAULT_LOGIN_ROUTE, DEFAULT_DASHBOARD_ROUTE)
    }
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub gate: GateConfig,
    pub verifier: VerifierConfig,
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `MILAVERSE_BACKEND_URL`
    ///
    /// Optional:
    /// - `MILAVERSE_VERIFY_PATH`: default `/verify-session`
    /// - `MILAVERSE_VERIFY_METHOD`: `get` (default) or `post`
    /// - `MILAVERSE_VERIFY_TRANSPORT`: `bearer` (default), `cookie` or `body`
    /// - `MILAVERSE_VERIFY_TIMEOUT_SECS`: default 10
    /// - `MILAVERSE_CONNECT_TIMEOUT_SECS`: default 5
    /// - `MILAVERSE_PUBLIC_ROUTES`: default `/,/login`
    /// - `MILAVERSE_LOGIN_ROUTE`: default `/login`
    /// - `MILAVERSE_DASHBOARD_ROUTE`: default `/dashboard`
    /// - `MILAVERSE_REDIRECT_AUTHENTICATED_FROM_LOGIN`: default false
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL is missing or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup(ENV_BACKEND_URL)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing { var: ENV_BACKEND_URL })?;
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: ENV_BACKEND_URL,
                value: backend_url,
                reason: "expected an http:// or https:// URL".into(),
            });
        }

        let method = parse_method(lookup(ENV_VERIFY_METHOD).as_deref())?;
        let transport = parse_transport(lookup(ENV_VERIFY_TRANSPORT).as_deref())?;
        if transport == Transport::Body && method == VerifyMethod::Get {
            return Err(ConfigError::Invalid {
                var: ENV_VERIFY_TRANSPORT,
                value: "body".into(),
                reason: "body transport requires MILAVERSE_VERIFY_METHOD=post".into(),
            });
        }

        let timeouts = VerifyTimeouts {
            request: Duration::from_secs(parse_secs(
                ENV_VERIFY_TIMEOUT_SECS,
                lookup(ENV_VERIFY_TIMEOUT_SECS).as_deref(),
                DEFAULT_VERIFY_TIMEOUT_SECS,
            )?),
            connect: Duration::from_secs(parse_secs(
                ENV_CONNECT_TIMEOUT_SECS,
                lookup(ENV_CONNECT_TIMEOUT_SECS).as_deref(),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?),
        };

        let verifier = VerifierConfig {
            verify_path: lookup(ENV_VERIFY_PATH).unwrap_or_else(|| DEFAULT_VERIFY_PATH.to_owned()),
            method,
            transport,
            timeouts,
            ..VerifierConfig::new(backend_url)
        };

        let public_routes = RouteSet::parse(
            lookup(ENV_PUBLIC_ROUTES)
                .as_deref()
                .unwrap_or(DEFAULT_PUBLIC_ROUTES),
        );
        let login_route = lookup(ENV_LOGIN_ROUTE).unwrap_or_else(|| DEFAULT_LOGIN_ROUTE.to_owned());
        let dashboard_route = lookup(ENV_DASHBOARD_ROUTE).unwrap_or_else(|| DEFAULT_DASHBOARD_ROUTE.to_owned());
        let redirect_from_login = match lookup(ENV_REDIRECT_FROM_LOGIN) {
            None => false,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: ENV_REDIRECT_FROM_LOGIN,
                value: raw.clone(),
                reason: "expected true/false".into(),
            })?,
        };

        let gate = GateConfig::new(public_routes, &login_route, &dashboard_route)
            .with_redirect_authenticated_from_login(redirect_from_login);

        Ok(Self { gate, verifier })
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_method(raw: Option<&str>) -> Result<VerifyMethod, ConfigError> {
    match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref().unwrap_or("get") {
        "get" => Ok(VerifyMethod::Get),
        "post" => Ok(VerifyMethod::Post),
        other => Err(ConfigError::Invalid {
            var: ENV_VERIFY_METHOD,
            value: other.to_owned(),
            reason: "expected 'get' or 'post'".into(),
        }),
    }
}

fn parse_transport(raw: Option<&str>) -> Result<Transport, ConfigError> {
    match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref().unwrap_or("bearer") {
        "bearer" | "header" => Ok(Transport::BearerHeader),
        "cookie" => Ok(Transport::Cookie),
        "body" => Ok(Transport::Body),
        other => Err(ConfigError::Invalid {
            var: ENV_VERIFY_TRANSPORT,
            value: other.to_owned(),
            reason: "expected 'bearer', 'cookie' or 'body'".into(),
        }),
    }
}

fn parse_secs(var: &'static str, raw: Option<&str>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid { var, value: raw.to_owned(), reason: "must be greater than zero".into() }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::Invalid { var, value: raw.to_owned(), reason: e.to_string() }),
    }
}
