use axum_extra::extract::cookie::Key;
use time::Duration;
use url::Url;

use super::error::AuthError;
use crate::oauth::{AuthClient, OAuthConfig};

const DEV_PLACEHOLDER: &str = "dev-placeholder";

/// Auth settings shared by the config builder and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl: Duration,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) logout_path: String,
    pub(crate) user_redirect: String,
    pub(crate) superuser_redirect: String,
    pub(crate) logout_redirect: String,
    pub(crate) error_redirect: String,
    pub(crate) dev_login_enabled: bool,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__wellness_session".into(),
            session_ttl: Duration::minutes(15),
            secure_cookies: true,
            auth_path: "/auth/google".into(),
            logout_path: "/logout".into(),
            user_redirect: "/dashboard".into(),
            superuser_redirect: "/super-dashboard".into(),
            logout_redirect: "/".into(),
            error_redirect: "/error".into(),
            dev_login_enabled: false,
        }
    }

    pub(crate) fn unauthenticated(&self) -> AuthError {
        AuthError::Unauthenticated {
            redirect_to: self.error_redirect.clone(),
        }
    }

    pub(crate) fn provider_failed(&self, code: impl Into<String>) -> AuthError {
        AuthError::ProviderAuthFailed {
            redirect_to: self.error_redirect.clone(),
            code: code.into(),
        }
    }
}

/// Google sign-in configuration.
///
/// The OAuth client is a constructor parameter. Use
/// [`from_env()`](AuthConfig::from_env) for convention-based setup, or
/// [`new()`](AuthConfig::new) with `with_*` methods for full control.
pub struct AuthConfig {
    pub(crate) client: AuthClient,
    pub(crate) settings: AuthSettings,
}

impl AuthConfig {
    #[must_use]
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars (unless `DEV_AUTH` is on)
    /// - `GOOGLE_CLIENT_ID`
    /// - `GOOGLE_CLIENT_SECRET`
    /// - `GOOGLE_REDIRECT_URI`: callback URL registered with Google
    ///
    /// # Optional env vars
    /// - `GOOGLE_AUTH_URL`, `GOOGLE_TOKEN_URL`, `GOOGLE_USERINFO_URL`: endpoint overrides
    /// - `GOOGLE_SCOPES`: comma-separated scopes
    /// - `SESSION_SECRET`: cookie encryption key, at least 64 bytes
    /// - `SESSION_TTL_MINUTES`: session lifetime in whole minutes, at least 1 (default 15)
    /// - `DEV_AUTH`: `"1"` or `"true"` enables the dev-login route and plain-HTTP cookies
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AuthError> {
        let dev_auth = matches!(
            std::env::var("DEV_AUTH").as_deref(),
            Ok("1") | Ok("true"),
        );

        let required = |name: &str| match std::env::var(name) {
            Ok(value) => Ok(value),
            Err(_) if dev_auth => {
                tracing::warn!(var = name, "Not set, using dev placeholder");
                Ok(DEV_PLACEHOLDER.to_string())
            }
            Err(_) => Err(AuthError::Config(format!("{name} is required"))),
        };

        let client_id = required("GOOGLE_CLIENT_ID")?;
        let client_secret = required("GOOGLE_CLIENT_SECRET")?;
        let redirect_uri = match std::env::var("GOOGLE_REDIRECT_URI") {
            Ok(value) => parse_url("GOOGLE_REDIRECT_URI", &value)?,
            Err(_) if dev_auth => parse_url(
                "GOOGLE_REDIRECT_URI",
                "http://localhost:3000/auth/google/callback",
            )?,
            Err(_) => {
                return Err(AuthError::Config("GOOGLE_REDIRECT_URI is required".into()));
            }
        };

        let mut config = OAuthConfig::new(client_id, client_secret, redirect_uri);

        if let Ok(value) = std::env::var("GOOGLE_AUTH_URL") {
            config = config.with_auth_url(parse_url("GOOGLE_AUTH_URL", &value)?);
        }
        if let Ok(value) = std::env::var("GOOGLE_TOKEN_URL") {
            config = config.with_token_url(parse_url("GOOGLE_TOKEN_URL", &value)?);
        }
        if let Ok(value) = std::env::var("GOOGLE_USERINFO_URL") {
            config = config.with_userinfo_url(parse_url("GOOGLE_USERINFO_URL", &value)?);
        }
        if let Ok(scopes) = std::env::var("GOOGLE_SCOPES") {
            config =
                config.with_scopes(scopes.split(',').map(|s| s.trim().to_string()).collect());
        }

        let cookie_key = match std::env::var("SESSION_SECRET") {
            Ok(secret) => Key::try_from(secret.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "SESSION_SECRET is set but too short (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a longer secret."
                        .into(),
                )
            })?,
            Err(_) => {
                tracing::warn!("SESSION_SECRET not set, sessions will not survive a restart");
                Key::generate()
            }
        };

        let mut auth = Self::new(AuthClient::new(config))
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth)
            .with_dev_login_enabled(dev_auth);

        if let Ok(minutes) = std::env::var("SESSION_TTL_MINUTES") {
            auth = auth.with_session_ttl(parse_ttl_minutes(&minutes)?);
        }

        Ok(auth)
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.settings.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_dev_login_enabled(mut self, enabled: bool) -> Self {
        self.settings.dev_login_enabled = enabled;
        self
    }

    /// Lifetime a session store should give new sessions.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.settings.session_ttl
    }
}

fn parse_ttl_minutes(raw: &str) -> Result<Duration, AuthError> {
    let minutes: u32 = raw
        .trim()
        .parse()
        .map_err(|e| AuthError::Config(format!("SESSION_TTL_MINUTES: {e}")))?;
    if minutes == 0 {
        return Err(AuthError::Config(
            "SESSION_TTL_MINUTES must be at least 1".into(),
        ));
    }
    Ok(Duration::minutes(i64::from(minutes)))
}

fn parse_url(name: &str, value: &str) -> Result<Url, AuthError> {
    value
        .parse()
        .map_err(|e| AuthError::Config(format!("{name}: {e}")))
}
