use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use crate::gatekeeper::GatekeeperConfig;

/// Longest accepted session idle time: one week.
pub const MAX_SESSION_IDLE_MINUTES: i64 = 7 * 24 * 60;

/// ConfigError
///
/// Raised while reading the environment. Startup aborts on any of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{0} must be set in production")]
    MissingSecret(&'static str),
}

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// pulled into handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which values are mandatory.
    pub env: Env,
    // Socket the HTTP server binds to.
    pub bind_addr: SocketAddr,
    // Directory served under /mall/static (scripts, styles, fonts, images).
    pub static_dir: PathBuf,
    // Idle time after which a session, and with it any login, expires.
    pub session_idle_minutes: i64,
    // Back-office account seeded at startup.
    pub admin_username: String,
    pub admin_password: String,
    // Path markers, redirect targets and header values used by the gatekeeper.
    pub gatekeeper: GatekeeperConfig,
}

/// Env
///
/// Selects between developer conveniences (pretty logs, default admin password)
/// and production strictness (JSON logs, mandatory secrets).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Local defaults; used directly by tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            static_dir: PathBuf::from("static"),
            session_idle_minutes: 30,
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            gatekeeper: GatekeeperConfig::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, falling back to the
    /// local defaults for anything unset.
    ///
    /// # Errors
    /// Fails on values that do not parse, on a session idle time outside
    /// 1..=[`MAX_SESSION_IDLE_MINUTES`], and in production when
    /// `MALL_ADMIN_PASSWORD` is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let admin_password = match (env, env::var("MALL_ADMIN_PASSWORD")) {
            (_, Ok(password)) => password,
            (Env::Production, Err(_)) => {
                return Err(ConfigError::MissingSecret("MALL_ADMIN_PASSWORD"));
            }
            (Env::Local, Err(_)) => defaults.admin_password,
        };

        let mut gatekeeper = defaults.gatekeeper;
        gatekeeper.admin_marker = string_var("MALL_ADMIN_MARKER", gatekeeper.admin_marker);
        gatekeeper.admin_login_path =
            string_var("MALL_ADMIN_LOGIN_PATH", gatekeeper.admin_login_path);
        gatekeeper.user_login_path = string_var("MALL_USER_LOGIN_PATH", gatekeeper.user_login_path);
        gatekeeper.powered_by = string_var("MALL_POWERED_BY", gatekeeper.powered_by);

        let session_idle_minutes =
            parse_var("MALL_SESSION_IDLE_MINUTES", defaults.session_idle_minutes)?;
        if !(1..=MAX_SESSION_IDLE_MINUTES).contains(&session_idle_minutes) {
            return Err(ConfigError::Invalid {
                var: "MALL_SESSION_IDLE_MINUTES",
                value: session_idle_minutes.to_string(),
            });
        }

        if gatekeeper.admin_marker.is_empty() {
            return Err(ConfigError::Invalid {
                var: "MALL_ADMIN_MARKER",
                value: gatekeeper.admin_marker,
            });
        }

        Ok(Self {
            env,
            bind_addr: parse_var("MALL_BIND_ADDR", defaults.bind_addr)?,
            static_dir: env::var("MALL_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            session_idle_minutes,
            admin_username: string_var("MALL_ADMIN_USERNAME", defaults.admin_username),
            admin_password,
            gatekeeper,
        })
    }
}

fn string_var(var: &'static str, default: String) -> String {
    env::var(var).unwrap_or(default)
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}
