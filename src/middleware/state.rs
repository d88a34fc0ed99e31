use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{AuthConfig, AuthSettings};
use super::traits::{IdentityStore, SessionStore};
use crate::oauth::AuthClient;

/// Router state shared by the auth routes, the gate extractors and every
/// handler that needs the signed-in principal.
pub struct AuthState<I, S> {
    pub(crate) client: Arc<AuthClient>,
    pub(crate) identity_store: Arc<I>,
    pub(crate) session_store: Arc<S>,
    pub(crate) settings: AuthSettings,
}

impl<I: IdentityStore, S: SessionStore> AuthState<I, S> {
    #[must_use]
    pub fn new(config: AuthConfig, identity_store: I, session_store: S) -> Self {
        Self::from_shared(config, Arc::new(identity_store), Arc::new(session_store))
    }

    /// Build state around stores the caller keeps a handle to.
    #[must_use]
    pub fn from_shared(config: AuthConfig, identity_store: Arc<I>, session_store: Arc<S>) -> Self {
        Self {
            client: Arc::new(config.client),
            identity_store,
            session_store,
            settings: config.settings,
        }
    }
}

// Manual Clone: avoid derive adding `I: Clone, S: Clone` bounds.
impl<I, S> Clone for AuthState<I, S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            identity_store: self.identity_store.clone(),
            session_store: self.session_store.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<I: IdentityStore, S: SessionStore> FromRef<AuthState<I, S>> for Key {
    fn from_ref(state: &AuthState<I, S>) -> Self {
        state.settings.cookie_key.clone()
    }
}
