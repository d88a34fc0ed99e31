use crate::types::ExternalId;

/// Session data from a successful login.
///
/// Passed to [`SessionStore::create`](super::SessionStore::create) for the
/// consumer to persist.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Identity this session authenticates.
    pub external_id: ExternalId,
}
