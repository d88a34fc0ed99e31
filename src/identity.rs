//! Identity records, the login upgrade policy and session principal resolution.

use serde::{Deserialize, Serialize};

use crate::middleware::{IdentityStore, StoreError};
use crate::types::{ExternalId, Role};

/// Logins after which a `user` is promoted to `superuser` (promotion happens
/// on login number `PROMOTION_THRESHOLD + 1`).
pub const PROMOTION_THRESHOLD: u32 = 3;

/// Durable record of one provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub external_id: ExternalId,
    pub display_name: String,
    pub login_count: u32,
    pub role: Role,
}

impl Identity {
    /// Record for a provider account seen for the first time.
    #[must_use]
    pub fn first_login(external_id: ExternalId, display_name: impl Into<String>) -> Self {
        Self {
            external_id,
            display_name: display_name.into(),
            login_count: 1,
            role: Role::User,
        }
    }

    /// Count one more login and promote once past the threshold.
    ///
    /// Roles only ever move up: an `admin` stays `admin`.
    pub fn record_login(&mut self) {
        self.login_count = self.login_count.saturating_add(1);
        if self.login_count > PROMOTION_THRESHOLD {
            self.role = self.role.max(Role::Superuser);
        }
    }

    /// Apply one successful login to whatever the store currently holds.
    #[must_use]
    pub fn after_login(
        existing: Option<Self>,
        external_id: &ExternalId,
        display_name: &str,
    ) -> Self {
        match existing {
            Some(mut identity) => {
                identity.record_login();
                identity
            }
            None => Self::first_login(external_id.clone(), display_name),
        }
    }
}

/// Run the login upgrade policy for a successful provider login.
///
/// Issues exactly one atomic upsert against the store, so the increment and
/// the promotion check are never observable separately.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be reached. Nothing is committed
/// in that case.
pub async fn on_external_login<I: IdentityStore>(
    store: &I,
    external_id: &ExternalId,
    display_name: &str,
) -> Result<Identity, StoreError> {
    let identity = store
        .upsert_with(external_id, |existing| {
            Identity::after_login(existing, external_id, display_name)
        })
        .await?;

    if identity.login_count == 1 {
        tracing::info!(external_id = %identity.external_id, "Created identity on first login");
    } else if identity.login_count == PROMOTION_THRESHOLD + 1 && identity.role == Role::Superuser {
        tracing::info!(
            external_id = %identity.external_id,
            login_count = identity.login_count,
            "Promoted identity to superuser"
        );
    } else {
        tracing::debug!(
            external_id = %identity.external_id,
            login_count = identity.login_count,
            role = %identity.role,
            "Recorded login"
        );
    }

    Ok(identity)
}

/// Authenticated principal of one request, derived from the stored identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub external_id: ExternalId,
    pub display_name: String,
    pub role: Role,
}

impl From<Identity> for Principal {
    fn from(identity: Identity) -> Self {
        Self {
            external_id: identity.external_id,
            display_name: identity.display_name,
            role: identity.role,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The session points at an identity that no longer exists.
    #[error("Identity not found: {0}")]
    IdentityNotFound(ExternalId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rebuild the principal for the identity reference stored in a session.
///
/// # Errors
///
/// [`ResolveError::IdentityNotFound`] if the identity was deleted out-of-band;
/// callers treat that as an anonymous request rather than a failure.
pub async fn resolve<I: IdentityStore>(
    store: &I,
    external_id: &ExternalId,
) -> Result<Principal, ResolveError> {
    store
        .find(external_id)
        .await?
        .map(Principal::from)
        .ok_or_else(|| ResolveError::IdentityNotFound(external_id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryIdentityStore;

    fn ada() -> ExternalId {
        ExternalId::from("g-123")
    }

    #[test]
    fn first_login_starts_as_user() {
        let identity = Identity::first_login(ada(), "Ada");
        assert_eq!(identity.login_count, 1);
        assert_eq!(identity.role, Role::User);
        assert_eq!(identity.display_name, "Ada");
    }

    #[test]
    fn promotion_happens_on_fourth_login() {
        let mut identity = Identity::first_login(ada(), "Ada");
        identity.record_login();
        identity.record_login();
        assert_eq!((identity.login_count, identity.role), (3, Role::User));

        identity.record_login();
        assert_eq!((identity.login_count, identity.role), (4, Role::Superuser));

        identity.record_login();
        assert_eq!((identity.login_count, identity.role), (5, Role::Superuser));
    }

    #[test]
    fn admin_is_never_demoted_by_login() {
        let mut identity = Identity::first_login(ada(), "Ada");
        identity.role = Role::Admin;
        for _ in 0..5 {
            identity.record_login();
            assert_eq!(identity.role, Role::Admin);
        }
    }

    #[test]
    fn role_follows_login_count_for_any_k() {
        for k in 1..=12u32 {
            let mut identity = Identity::after_login(None, &ada(), "Ada");
            for _ in 1..k {
                identity = Identity::after_login(Some(identity), &ada(), "Ada");
            }
            assert_eq!(identity.login_count, k);
            assert_eq!(identity.role == Role::Superuser, k > PROMOTION_THRESHOLD);
        }
    }

    #[test]
    fn later_logins_keep_first_display_name() {
        let identity = Identity::after_login(None, &ada(), "Ada");
        let identity = Identity::after_login(Some(identity), &ada(), "Ada Lovelace");
        assert_eq!(identity.display_name, "Ada");
    }

    #[test]
    fn identity_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(Identity::first_login(ada(), "Ada")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "externalId": "g-123",
                "displayName": "Ada",
                "loginCount": 1,
                "role": "user",
            })
        );
    }

    #[tokio::test]
    async fn ada_scenario_through_the_store() {
        let store = MemoryIdentityStore::new();
        let expected = [
            (1, Role::User),
            (2, Role::User),
            (3, Role::User),
            (4, Role::Superuser),
            (5, Role::Superuser),
        ];

        for (count, role) in expected {
            let identity = on_external_login(&store, &ada(), "Ada").await.unwrap();
            assert_eq!((identity.login_count, identity.role), (count, role));
        }

        let stored = store.find(&ada()).await.unwrap().unwrap();
        assert_eq!(stored.login_count, 5);
        assert_eq!(stored.role, Role::Superuser);
    }

    #[tokio::test]
    async fn identities_are_independent() {
        let store = MemoryIdentityStore::new();
        for _ in 0..4 {
            on_external_login(&store, &ada(), "Ada").await.unwrap();
        }
        let grace = on_external_login(&store, &ExternalId::from("g-456"), "Grace")
            .await
            .unwrap();

        assert_eq!(grace.login_count, 1);
        assert_eq!(grace.role, Role::User);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn resolve_returns_principal_for_stored_identity() {
        let store = MemoryIdentityStore::new();
        on_external_login(&store, &ada(), "Ada").await.unwrap();

        let principal = resolve(&store, &ada()).await.unwrap();
        assert_eq!(principal.display_name, "Ada");
        assert_eq!(principal.role, Role::User);
        assert_eq!(principal.external_id, ada());
    }

    #[tokio::test]
    async fn resolve_reports_deleted_identity() {
        let store = MemoryIdentityStore::new();
        on_external_login(&store, &ada(), "Ada").await.unwrap();
        store.remove(&ada());

        let err = resolve(&store, &ada()).await.unwrap_err();
        assert!(matches!(err, ResolveError::IdentityNotFound(id) if id == ada()));
    }
}
