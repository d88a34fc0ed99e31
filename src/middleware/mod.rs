//! Google sign-in, sessions and role gates for Axum.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use wellness_sso::middleware::{AuthConfig, AuthState, Principal, SuperuserOnly, auth_routes};
//! use wellness_sso::memory::{MemoryIdentityStore, MemorySessionStore};
//!
//! // 1. Configure from environment
//! let config = AuthConfig::from_env()?;
//!
//! // 2. Build shared state around your stores
//! let sessions = MemorySessionStore::new(config.session_ttl());
//! let state = AuthState::new(config, MemoryIdentityStore::new(), sessions);
//!
//! // 3. Mount auth routes and gate handlers with extractors
//! let app = axum::Router::new()
//!     .route("/dashboard", get(|p: Principal| async move { p.display_name }))
//!     .route("/super-dashboard", get(|p: SuperuserOnly| async move { p.display_name.clone() }))
//!     .merge(auth_routes(&state))
//!     .with_state(state);
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;
mod traits;
mod types;

pub use config::AuthConfig;
pub use error::{AuthError, StoreError};
pub use extractor::{
    AdminOnly, AdminRole, RequireRole, RequiredRole, SuperuserOnly, SuperuserRole, resolve_session,
};
pub use routes::auth_routes;
pub use state::AuthState;
pub use traits::{IdentityStore, SessionStore};
pub use types::NewSession;

pub use crate::identity::Principal;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
