//! Per-route access predicates.
//!
//! Both gates are pure functions of the (optional) resolved principal. The
//! axum extractors in [`middleware`](crate::middleware) map a [`Denial`] to a
//! response: a redirect for anonymous requests and a 403 for authenticated
//! principals without the required role.

use crate::identity::Principal;
use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No principal: "please log in".
    Unauthenticated,
    /// Principal present but not allowed: "you are logged in but not allowed".
    Forbidden { required: Role },
}

/// Pass any authenticated principal.
///
/// # Errors
///
/// [`Denial::Unauthenticated`] when there is no principal.
pub fn require_authenticated(principal: Option<&Principal>) -> Result<&Principal, Denial> {
    principal.ok_or(Denial::Unauthenticated)
}

/// Pass only an authenticated principal whose role is exactly `role`.
///
/// # Errors
///
/// [`Denial::Unauthenticated`] when there is no principal,
/// [`Denial::Forbidden`] when the role differs.
pub fn require_role(principal: Option<&Principal>, role: Role) -> Result<&Principal, Denial> {
    let principal = require_authenticated(principal)?;
    if principal.role == role {
        Ok(principal)
    } else {
        Err(Denial::Forbidden { required: role })
    }
}
