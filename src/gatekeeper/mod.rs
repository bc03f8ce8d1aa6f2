//! Request Gatekeeper
//!
//! The single chokepoint every request passes through before reaching a handler.
//! The decision logic is a pure function of `(method, path, session snapshot)`; the
//! axum adapter in [`middleware`] feeds it from the live request and session and
//! turns the resulting [`Decision`] into a response.
//!
//! Order of evaluation (first match wins):
//! 1. CORS and marker headers are attached to every response.
//! 2. `OPTIONS` (any case) short-circuits with an empty JSON object.
//! 3. Paths without an actionable suffix (`.do` / `.html`) are static assets and pass.
//! 4. Paths matching a [`PublicRule`] pass regardless of login state.
//! 5. Paths containing the admin marker require `login_user`, all others require `user`.
//! 6. A missing key redirects to the realm's login page; a present key passes.
pub mod middleware;
pub mod rules;

use std::collections::HashSet;

use axum::http::{
    HeaderMap, HeaderName, HeaderValue, Method,
    header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_MAX_AGE,
    },
};
use tower_sessions::Session;

use crate::{
    config::ConfigError,
    session::{SESSION_ADMIN_KEY, SESSION_SHOPPER_KEY},
};

pub use middleware::gatekeeper_middleware;
pub use rules::{PathPattern, PublicRule, RuleScope, default_public_rules};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "POST, GET, OPTIONS, DELETE";
pub const MAX_AGE: &str = "3600";
pub const ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, X-Custom-Header";

/// Header naming the serving stack.
pub const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// GatekeeperConfig
///
/// Every literal the gatekeeper relies on. The defaults reproduce the mall's
/// stock behavior; deployments may override the markers and redirect targets.
#[derive(Clone, Debug)]
pub struct GatekeeperConfig {
    /// Substring placing a path in the back-office realm.
    pub admin_marker: String,
    /// Suffixes that make a path subject to the gate; everything else is a static asset.
    pub actionable_suffixes: Vec<String>,
    pub admin_login_path: String,
    pub user_login_path: String,
    pub admin_session_key: String,
    pub user_session_key: String,
    /// Value of the `X-Powered-By` header.
    pub powered_by: String,
    pub public_rules: Vec<PublicRule>,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            admin_marker: "admin".to_string(),
            actionable_suffixes: vec![".do".to_string(), ".html".to_string()],
            admin_login_path: "/mall/admin/toLogin.html".to_string(),
            user_login_path: "/mall/user/toLogin.html".to_string(),
            admin_session_key: SESSION_ADMIN_KEY.to_string(),
            user_session_key: SESSION_SHOPPER_KEY.to_string(),
            powered_by: "axum".to_string(),
            public_rules: default_public_rules(),
        }
    }
}

/// The two gated halves of the site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Realm {
    /// Shopper pages, gated by `user`.
    FrontOffice,
    /// Admin pages, gated by `login_user`.
    BackOffice,
}

/// What the gatekeeper makes of a request before looking at the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Preflight,
    StaticAsset,
    /// Matched the allow-list entry at zero-based index `rule`.
    Public { rule: usize },
    Guarded(Realm),
}

/// Final outcome for a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Answer with `{}` and skip the handler.
    Preflight,
    /// Hand the request to the downstream handler.
    Pass,
    /// Send the client to this login page.
    Redirect(String),
}

/// SessionLookup
///
/// Read-only view of the current request's session, injected into the gatekeeper
/// so the decision never reaches for ambient state.
pub trait SessionLookup {
    fn contains(&self, key: &str) -> bool;
}

/// The set of session keys present on a request, captured once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    keys: HashSet<String>,
}

impl SessionSnapshot {
    pub fn from_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Records which of `keys` are present in `session`. Values are read as raw JSON.
    pub async fn load(
        session: &Session,
        keys: &[&str],
    ) -> Result<Self, tower_sessions::session::Error> {
        let mut present = HashSet::new();
        for key in keys {
            if session.get::<serde_json::Value>(key).await?.is_some() {
                present.insert((*key).to_string());
            }
        }
        Ok(Self { keys: present })
    }
}

impl SessionLookup for SessionSnapshot {
    fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

/// Gatekeeper
///
/// Holds the configuration and the precomputed response headers. Cheap to share
/// behind an `Arc`; it carries no per-request state.
#[derive(Clone, Debug)]
pub struct Gatekeeper {
    config: GatekeeperConfig,
    headers: HeaderMap,
}

impl Gatekeeper {
    /// Fails only when the configured marker header value is not a valid header value.
    pub fn new(config: GatekeeperConfig) -> Result<Self, ConfigError> {
        let powered_by =
            HeaderValue::from_str(&config.powered_by).map_err(|_| ConfigError::Invalid {
                var: "MALL_POWERED_BY",
                value: config.powered_by.clone(),
            })?;

        Ok(Self {
            config,
            headers: fixed_headers(powered_by),
        })
    }

    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// The fixed headers attached to every response.
    pub fn cors_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Session key that unlocks `realm`.
    pub fn session_key(&self, realm: Realm) -> &str {
        match realm {
            Realm::BackOffice => &self.config.admin_session_key,
            Realm::FrontOffice => &self.config.user_session_key,
        }
    }

    /// Login page a client is sent to when `realm` is locked.
    pub fn login_path(&self, realm: Realm) -> &str {
        match realm {
            Realm::BackOffice => &self.config.admin_login_path,
            Realm::FrontOffice => &self.config.user_login_path,
        }
    }

    /// Classifies a request without consulting the session.
    pub fn classify(&self, method: &Method, path: &str) -> Classification {
        if method.as_str().eq_ignore_ascii_case(Method::OPTIONS.as_str()) {
            return Classification::Preflight;
        }

        let actionable = self
            .config
            .actionable_suffixes
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()));
        if !actionable {
            return Classification::StaticAsset;
        }

        let back_office = path.contains(self.config.admin_marker.as_str());
        if let Some(rule) = rules::first_match(&self.config.public_rules, path, back_office) {
            return Classification::Public { rule };
        }

        if back_office {
            Classification::Guarded(Realm::BackOffice)
        } else {
            Classification::Guarded(Realm::FrontOffice)
        }
    }

    /// Resolves a guarded realm against the session.
    pub fn authorize(&self, realm: Realm, session: &impl SessionLookup) -> Decision {
        if session.contains(self.session_key(realm)) {
            Decision::Pass
        } else {
            Decision::Redirect(self.login_path(realm).to_string())
        }
    }

    /// Full decision for a request.
    pub fn decide(&self, method: &Method, path: &str, session: &impl SessionLookup) -> Decision {
        match self.classify(method, path) {
            Classification::Preflight => Decision::Preflight,
            Classification::StaticAsset | Classification::Public { .. } => Decision::Pass,
            Classification::Guarded(realm) => self.authorize(realm, session),
        }
    }
}

impl Default for Gatekeeper {
    fn default() -> Self {
        Self {
            config: GatekeeperConfig::default(),
            headers: fixed_headers(HeaderValue::from_static("axum")),
        }
    }
}

fn fixed_headers(powered_by: HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(5);
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    headers.insert(X_POWERED_BY, powered_by);
    headers
}
