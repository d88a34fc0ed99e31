#![doc = include_str!("../README.md")]

pub mod app;
pub mod config;
pub mod error;
pub mod gate;
pub mod goals;
pub mod identity;
pub mod memory;
pub mod middleware;
pub mod oauth;
pub mod pkce;
pub mod types;

// Re-exports for convenient access
pub use error::Error;
pub use gate::{Denial, require_authenticated, require_role};
pub use identity::{
    Identity, PROMOTION_THRESHOLD, Principal, ResolveError, on_external_login, resolve,
};
pub use oauth::{AuthClient, AuthorizationRequest, OAuthConfig, TokenResponse, UserInfo};
pub use types::{ExternalId, Role, SessionId};
