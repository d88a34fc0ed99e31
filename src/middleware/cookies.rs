use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::types::SessionId;

const VERIFIER_COOKIE: &str = "__wellness_pkce";
const STATE_COOKIE: &str = "__wellness_state";
const HANDSHAKE_TTL_MINUTES: i64 = 5;

/// Short-lived cookies that carry the PKCE verifier and `state` from the
/// login redirect to the callback. Scoped to the auth path.
pub(super) fn handshake_cookies(
    code_verifier: &str,
    state: &str,
    secure: bool,
    auth_path: &str,
) -> [Cookie<'static>; 2] {
    let pairs: [(&'static str, &str); 2] =
        [(VERIFIER_COOKIE, code_verifier), (STATE_COOKIE, state)];
    pairs.map(|(name, value)| {
        Cookie::build((name, value.to_string()))
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .path(auth_path.to_string())
            .max_age(Duration::minutes(HANDSHAKE_TTL_MINUTES))
            .build()
    })
}

/// Removal cookies for the handshake pair.
pub(super) fn clear_handshake_cookies(auth_path: &str) -> [Cookie<'static>; 2] {
    [VERIFIER_COOKIE, STATE_COOKIE].map(|name| {
        Cookie::build((name, ""))
            .path(auth_path.to_string())
            .max_age(Duration::ZERO)
            .build()
    })
}

pub(super) fn session_cookie(
    name: &str,
    session_id: &SessionId,
    ttl: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(ttl)
        .build()
}

pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

pub(super) fn session_id(jar: &PrivateCookieJar, name: &str) -> Option<SessionId> {
    jar.get(name)
        .map(|c| SessionId(c.value().to_string()))
        .filter(|id| !id.as_str().is_empty())
}

pub(super) fn code_verifier(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(VERIFIER_COOKIE).map(|c| c.value().to_string())
}

pub(super) fn oauth_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE).map(|c| c.value().to_string())
}
