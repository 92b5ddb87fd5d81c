//! Application configuration via environment variables.
//!
//! All knobs the gateway and the session engine need in one place: origins,
//! cookie scope, environment mode, and the session refresh cadence.

use std::env;
use std::time::Duration;

/// Deployment environment. Drives cookie attributes, log format, and the
/// unauthenticated-access escape hatch in the gatekeeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Gateway configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream origin the `/api` proxy forwards to.
    pub backend_origin: String,
    /// Origin hosting the identity provider's sign-in page.
    pub identity_origin: String,
    /// Origin this gateway is served from (used for same-origin fallback URLs).
    pub app_origin: String,
    /// Origins a post-login redirect target may point at.
    pub allowed_redirect_origins: Vec<String>,
    /// Parent domain for rotated identity cookies in production.
    pub cookie_domain: Option<String>,
    pub environment: Environment,
    /// Advertised lifetime of the identity provider's access token.
    pub token_lifetime_secs: u64,
    /// How long before expiry the background refresh should fire.
    pub refresh_margin_secs: u64,
    pub port: u16,
    /// Directory holding the built admin UI bundle.
    pub ui_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default pointing at the production volvix.com.br
    /// deployment; local development only needs `SYNCRO_ENV` unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_origin =
            env::var("BACKEND_ORIGIN").unwrap_or_else(|_| "https://volvix.com.br".into());
        let identity_origin =
            env::var("IDENTITY_ORIGIN").unwrap_or_else(|_| backend_origin.clone());

        let environment = match env::var("SYNCRO_ENV").as_deref() {
            Ok("production") => Environment::Production,
            Ok("development") | Err(_) => Environment::Development,
            Ok(other) => return Err(ConfigError::InvalidEnvironment(other.into())),
        };

        let allowed_redirect_origins = match env::var("ALLOWED_REDIRECT_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => vec![
                "https://volvix.com.br".into(),
                "https://syncro.volvix.com.br".into(),
                "http://localhost:3000".into(),
                "http://localhost:3001".into(),
            ],
        };

        let token_lifetime_secs = parse_env_u64("TOKEN_LIFETIME_SECS", 3600)?;
        let refresh_margin_secs = parse_env_u64("REFRESH_MARGIN_SECS", 600)?;
        if refresh_margin_secs >= token_lifetime_secs {
            return Err(ConfigError::InvalidRefreshMargin {
                margin: refresh_margin_secs,
                lifetime: token_lifetime_secs,
            });
        }

        Ok(Self {
            backend_origin,
            identity_origin,
            app_origin: env::var("APP_ORIGIN")
                .unwrap_or_else(|_| "https://syncro.volvix.com.br".into()),
            allowed_redirect_origins,
            cookie_domain: env::var("COOKIE_DOMAIN").ok().filter(|d| !d.is_empty()),
            environment,
            token_lifetime_secs,
            refresh_margin_secs,
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            ui_dir: env::var("UI_DIR").unwrap_or_else(|_| "ui".into()),
        })
    }

    /// Identity provider's sign-in page.
    pub fn sign_in_url(&self) -> String {
        format!("{}/auth/sign-in", self.identity_origin)
    }

    /// Session refresh endpoint on the backend.
    pub fn session_refresh_url(&self) -> String {
        format!("{}/api/access/auth/session/refresh", self.backend_origin)
    }

    /// Sign-out endpoint on the backend.
    pub fn sign_out_url(&self) -> String {
        format!("{}/api/access/auth/sign-out", self.backend_origin)
    }

    /// Cookie-validation endpoint used by the gatekeeper to resolve identity.
    pub fn identity_user_url(&self) -> String {
        format!("{}/api/access/auth/user", self.backend_origin)
    }

    /// Interval between background refreshes: token lifetime minus the
    /// safety margin, never zero.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.token_lifetime_secs
                .saturating_sub(self.refresh_margin_secs)
                .max(1),
        )
    }
}

/// Configuration for testing — all fields settable directly.
impl Config {
    pub fn test_default() -> Self {
        Self {
            backend_origin: "https://volvix.com.br".into(),
            identity_origin: "https://volvix.com.br".into(),
            app_origin: "https://syncro.volvix.com.br".into(),
            allowed_redirect_origins: vec![
                "https://volvix.com.br".into(),
                "https://syncro.volvix.com.br".into(),
                "http://localhost:3000".into(),
                "http://localhost:3001".into(),
            ],
            cookie_domain: None,
            environment: Environment::Production,
            token_lifetime_secs: 3600,
            refresh_margin_secs: 600,
            port: 3000,
            ui_dir: "ui".into(),
        }
    }
}

fn parse_env_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(key.into(), raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SYNCRO_ENV must be \"development\" or \"production\", got {0:?}")]
    InvalidEnvironment(String),

    #[error("{0} must be an integer number of seconds, got {1:?}")]
    InvalidNumber(String, String),

    #[error("REFRESH_MARGIN_SECS ({margin}) must be smaller than TOKEN_LIFETIME_SECS ({lifetime})")]
    InvalidRefreshMargin { margin: u64, lifetime: u64 },
}
