use std::marker::PhantomData;
use std::ops::Deref;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;

use super::config::AuthSettings;
use super::cookies;
use super::error::{AuthError, StoreError};
use super::state::AuthState;
use super::traits::{IdentityStore, SessionStore};
use crate::gate::{self, Denial};
use crate::identity::{self, Principal, ResolveError};
use crate::types::Role;

/// Resolve the principal behind a request's session cookie.
///
/// Missing cookie, unknown or expired session, and a session whose identity
/// was deleted all yield `Ok(None)`. Only store failures are errors.
///
/// # Errors
///
/// Returns [`StoreError`] if either store is unreachable.
pub async fn resolve_session<I: IdentityStore, S: SessionStore>(
    identity_store: &I,
    session_store: &S,
    jar: &PrivateCookieJar,
    cookie_name: &str,
) -> Result<Option<Principal>, StoreError> {
    let Some(session_id) = cookies::session_id(jar, cookie_name) else {
        return Ok(None);
    };

    let Some(external_id) = session_store.find(&session_id).await? else {
        tracing::debug!(session_id = %session_id, "Session unknown or expired");
        return Ok(None);
    };

    match identity::resolve(identity_store, &external_id).await {
        Ok(principal) => Ok(Some(principal)),
        Err(ResolveError::IdentityNotFound(external_id)) => {
            tracing::warn!(
                session_id = %session_id,
                external_id = %external_id,
                "Session references a missing identity, treating request as anonymous"
            );
            Ok(None)
        }
        Err(ResolveError::Store(e)) => Err(e),
    }
}

async fn current_principal<I: IdentityStore, S: SessionStore>(
    parts: &mut Parts,
    state: &AuthState<I, S>,
) -> Result<Option<Principal>, AuthError> {
    let jar = <PrivateCookieJar as FromRequestParts<AuthState<I, S>>>::from_request_parts(
        parts, state,
    )
    .await
    .unwrap_or_else(|never| match never {});

    resolve_session(
        state.identity_store.as_ref(),
        state.session_store.as_ref(),
        &jar,
        &state.settings.session_cookie_name,
    )
    .await
    .map_err(AuthError::from)
}

fn deny(settings: &AuthSettings, denial: Denial) -> AuthError {
    match denial {
        Denial::Unauthenticated => settings.unauthenticated(),
        Denial::Forbidden { required } => AuthError::Forbidden { required },
    }
}

/// Authenticated principal extracted from the session cookie.
///
/// Anonymous requests are redirected to the error view.
///
/// ```rust,ignore
/// async fn dashboard(principal: Principal) -> impl IntoResponse {
///     format!("Welcome {}! Role: {}", principal.display_name, principal.role)
/// }
///
/// // Optional: accessible to both authenticated and anonymous users
/// async fn index(principal: Option<Principal>) -> impl IntoResponse { /* ... */ }
/// ```
impl<I: IdentityStore, S: SessionStore> FromRequestParts<AuthState<I, S>> for Principal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<I, S>,
    ) -> Result<Self, Self::Rejection> {
        let principal = current_principal(parts, state).await?;
        gate::require_authenticated(principal.as_ref())
            .cloned()
            .map_err(|denial| deny(&state.settings, denial))
    }
}

impl<I: IdentityStore, S: SessionStore> OptionalFromRequestParts<AuthState<I, S>> for Principal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<I, S>,
    ) -> Result<Option<Self>, Self::Rejection> {
        current_principal(parts, state).await
    }
}

/// Role a [`RequireRole`] extractor demands.
pub trait RequiredRole: Send + Sync + 'static {
    const ROLE: Role;
}

pub struct SuperuserRole;

impl RequiredRole for SuperuserRole {
    const ROLE: Role = Role::Superuser;
}

pub struct AdminRole;

impl RequiredRole for AdminRole {
    const ROLE: Role = Role::Admin;
}

/// Principal whose role is exactly `R::ROLE`.
///
/// Anonymous requests are redirected like [`Principal`]; authenticated
/// principals with another role get `403 Forbidden`.
pub struct RequireRole<R> {
    principal: Principal,
    _role: PhantomData<fn() -> R>,
}

pub type SuperuserOnly = RequireRole<SuperuserRole>;
pub type AdminOnly = RequireRole<AdminRole>;

impl<R> Deref for RequireRole<R> {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.principal
    }
}

impl<I, S, R> FromRequestParts<AuthState<I, S>> for RequireRole<R>
where
    I: IdentityStore,
    S: SessionStore,
    R: RequiredRole,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<I, S>,
    ) -> Result<Self, Self::Rejection> {
        let principal = current_principal(parts, state).await?;
        match gate::require_role(principal.as_ref(), R::ROLE) {
            Ok(principal) => Ok(Self {
                principal: principal.clone(),
                _role: PhantomData,
            }),
            Err(denial) => {
                if let (Some(principal), Denial::Forbidden { required }) = (&principal, denial) {
                    tracing::warn!(
                        external_id = %principal.external_id,
                        role = %principal.role,
                        required = %required,
                        "Access denied"
                    );
                }
                Err(deny(&state.settings, denial))
            }
        }
    }
}
