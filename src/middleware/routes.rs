use axum::Router;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::cookies;
use super::error::AuthError;
use super::state::AuthState;
use super::traits::{IdentityStore, SessionStore};
use super::types::NewSession;
use crate::identity;
use crate::oauth::UserInfo;
use crate::types::{ExternalId, Role};

/// Google sign-in, callback, logout and (when enabled) dev-login routes.
///
/// Merge into the application router before calling `with_state`.
pub fn auth_routes<I, S>(state: &AuthState<I, S>) -> Router<AuthState<I, S>>
where
    I: IdentityStore,
    S: SessionStore,
{
    let auth_path = &state.settings.auth_path;

    let mut router = Router::new()
        .route(auth_path, get(login::<I, S>))
        .route(&format!("{auth_path}/callback"), get(callback::<I, S>))
        .route(
            &state.settings.logout_path,
            get(logout::<I, S>).post(logout::<I, S>),
        );

    if state.settings.dev_login_enabled {
        tracing::warn!("Dev login enabled at {auth_path}/dev-login");
        router = router.route(&format!("{auth_path}/dev-login"), get(dev_login::<I, S>));
    }

    router
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<I: IdentityStore, S: SessionStore>(
    State(state): State<AuthState<I, S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let auth_req = state.client.authorization_url();

    let [verifier_cookie, state_cookie] = cookies::handshake_cookies(
        &auth_req.code_verifier,
        &auth_req.state,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    );

    (
        jar.add(verifier_cookie).add(state_cookie),
        Redirect::to(&auth_req.url),
    )
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// The handshake cookies are spent whatever the outcome.
async fn callback<I: IdentityStore, S: SessionStore>(
    State(state): State<AuthState<I, S>>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), (PrivateCookieJar, AuthError)> {
    let verified = verify_callback(&state, &jar, params).await;

    let [clear_verifier, clear_state] =
        cookies::clear_handshake_cookies(&state.settings.auth_path);
    let jar = jar.add(clear_verifier).add(clear_state);

    match verified {
        Ok(user_info) => {
            let external_id = ExternalId(user_info.sub.clone());
            complete_login(&state, jar.clone(), external_id, user_info.display_name())
                .await
                .map_err(|e| (jar, e))
        }
        Err(e) => Err((jar, e)),
    }
}

/// Check `state` against the handshake cookie, then trade the code for the
/// caller's userinfo.
async fn verify_callback<I: IdentityStore, S: SessionStore>(
    state: &AuthState<I, S>,
    jar: &PrivateCookieJar,
    params: CallbackParams,
) -> Result<UserInfo, AuthError> {
    let settings = &state.settings;

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Google declined the sign-in");
        return Err(settings.provider_failed(error));
    }

    let code = params
        .code
        .ok_or_else(|| settings.provider_failed("missing_code"))?;

    let received_state = params
        .state
        .ok_or_else(|| settings.provider_failed("state_mismatch"))?;

    let stored_state =
        cookies::oauth_state(jar).ok_or_else(|| settings.provider_failed("state_mismatch"))?;

    if received_state != stored_state {
        tracing::warn!("OAuth state mismatch");
        return Err(settings.provider_failed("state_mismatch"));
    }

    let code_verifier =
        cookies::code_verifier(jar).ok_or_else(|| settings.provider_failed("missing_verifier"))?;

    let token_response = state
        .client
        .exchange_code(&code, &code_verifier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            settings.provider_failed("token_exchange_failed")
        })?;

    state
        .client
        .get_user_info(&token_response.access_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Userinfo request failed");
            settings.provider_failed("userinfo_failed")
        })
}

/// Apply the login upgrade policy, open a session and pick the landing page.
async fn complete_login<I: IdentityStore, S: SessionStore>(
    state: &AuthState<I, S>,
    jar: PrivateCookieJar,
    external_id: ExternalId,
    display_name: &str,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let settings = &state.settings;

    let identity =
        identity::on_external_login(state.identity_store.as_ref(), &external_id, display_name)
            .await?;

    // A fresh login always gets a fresh session id.
    if let Some(previous) = cookies::session_id(&jar, &settings.session_cookie_name) {
        if let Err(e) = state.session_store.delete(&previous).await {
            tracing::warn!(error = %e, session_id = %previous, "Could not drop previous session");
        }
    }

    let session_id = state
        .session_store
        .create(NewSession { external_id })
        .await?;

    let session_cookie = cookies::session_cookie(
        &settings.session_cookie_name,
        &session_id,
        settings.session_ttl,
        settings.secure_cookies,
    );

    let landing = if identity.role == Role::Superuser {
        &settings.superuser_redirect
    } else {
        &settings.user_redirect
    };

    tracing::info!(
        session_id = %session_id,
        external_id = %identity.external_id,
        login_count = identity.login_count,
        role = %identity.role,
        "Login successful"
    );

    Ok((jar.add(session_cookie), Redirect::to(landing)))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<I: IdentityStore, S: SessionStore>(
    State(state): State<AuthState<I, S>>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let cookie_name = &state.settings.session_cookie_name;

    if let Some(session_id) = cookies::session_id(&jar, cookie_name) {
        // The cookie stays put on failure so the browser is not told it logged out.
        state
            .session_store
            .delete(&session_id)
            .await
            .map_err(|e| AuthError::Logout(e.to_string()))?;
        tracing::info!(session_id = %session_id, "Logged out");
    }

    Ok((
        jar.remove(cookies::clear_session_cookie(cookie_name)),
        Redirect::to(&state.settings.logout_redirect),
    ))
}

// ── Dev Login ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DevLoginParams {
    id: Option<String>,
    name: Option<String>,
}

async fn dev_login<I: IdentityStore, S: SessionStore>(
    State(state): State<AuthState<I, S>>,
    jar: PrivateCookieJar,
    Query(params): Query<DevLoginParams>,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    // No runtime guard needed: the route only exists when dev login is enabled.
    let sub = params
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| "dev-user".to_string());
    let name = params.name.unwrap_or_else(|| "Dev User".to_string());
    // Same fallback as Google: a blank name shows the subject instead.
    let user_info = UserInfo::new(sub).with_name(name);

    let external_id = ExternalId(user_info.sub.clone());
    complete_login(&state, jar, external_id, user_info.display_name()).await
}
