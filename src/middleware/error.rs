use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::types::Role;

const GENERIC_ERROR_PAGE: &str =
    "<h1>Something went wrong</h1><p>Please try again later.</p><a href=\"/\">Home</a>";

/// Failure of a backing store (identity or session).
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(e: impl std::fmt::Display) -> Self {
        Self::Unavailable(e.to_string())
    }
}

/// Authentication and authorization errors for the middleware layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable session. The browser is sent to the error view.
    #[error("Not authenticated")]
    Unauthenticated { redirect_to: String },

    /// Authenticated, but the principal lacks the required role.
    #[error("Access denied: {required} only")]
    Forbidden { required: Role },

    /// Google declined, consent was denied, or the handshake broke.
    #[error("Provider authentication failed: {code}")]
    ProviderAuthFailed { redirect_to: String, code: String },

    /// Identity or session store unreachable.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Session termination failed; the user must not see a false logout.
    #[error("Logout failed: {0}")]
    Logout(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated { ref redirect_to } => Redirect::to(redirect_to).into_response(),
            Self::Forbidden { .. } => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
            Self::ProviderAuthFailed {
                ref redirect_to,
                ref code,
            } => {
                let encoded = urlencoding::encode(code);
                Redirect::to(&format!("{redirect_to}?error={encoded}")).into_response()
            }
            Self::StoreUnavailable(_) | Self::Logout(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, Html(GENERIC_ERROR_PAGE)).into_response()
            }
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}
