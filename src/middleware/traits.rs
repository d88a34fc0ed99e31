use std::future::Future;

use super::error::StoreError;
use super::types::NewSession;
use crate::identity::Identity;
use crate::types::{ExternalId, SessionId};

/// Consumer-provided identity persistence, keyed by [`ExternalId`].
///
/// The login path issues one [`upsert_with`](IdentityStore::upsert_with) per
/// login; request authentication issues one [`find`](IdentityStore::find).
///
/// # Example
///
/// ```rust,ignore
/// impl IdentityStore for MongoIdentities {
///     async fn find(&self, id: &ExternalId) -> Result<Option<Identity>, StoreError> {
///         self.collection.find_one(doc! { "externalId": id.as_str() }).await.map_err(StoreError::unavailable)
///     }
///
///     async fn upsert_with<F>(&self, id: &ExternalId, apply: F) -> Result<Identity, StoreError>
///     where
///         F: FnOnce(Option<Identity>) -> Identity + Send,
///     {
///         // compare-and-swap on loginCount, or a transaction
///     }
/// }
/// ```
pub trait IdentityStore: Send + Sync + 'static {
    /// Look up an identity by provider subject.
    fn find(
        &self,
        external_id: &ExternalId,
    ) -> impl Future<Output = Result<Option<Identity>, StoreError>> + Send;

    /// Atomically read the current record (if any), compute its successor
    /// with `apply` and persist it.
    ///
    /// Implementations must not let two concurrent calls for the same key
    /// both observe the same prior record. If the store fails, nothing is
    /// written.
    fn upsert_with<F>(
        &self,
        external_id: &ExternalId,
        apply: F,
    ) -> impl Future<Output = Result<Identity, StoreError>> + Send
    where
        F: FnOnce(Option<Identity>) -> Identity + Send;
}

/// Consumer-provided session persistence.
///
/// Sessions are identified by opaque [`SessionId`]s and hold only the
/// identity reference; the principal is rebuilt from the identity store on
/// every request.
pub trait SessionStore: Send + Sync + 'static {
    /// Create a new session. Returns the session ID.
    fn create(
        &self,
        session: NewSession,
    ) -> impl Future<Output = Result<SessionId, StoreError>> + Send;

    /// Identity reference for a live session, `None` if unknown or expired.
    fn find(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<ExternalId>, StoreError>> + Send;

    /// Delete a session (logout).
    fn delete(&self, session_id: &SessionId) -> impl Future<Output = Result<(), StoreError>> + Send;
}
