//! In-process store implementations.
//!
//! Used by the binary when no external database is configured and by the
//! tests. Both stores are cheap to share behind an `Arc`.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::{Duration, OffsetDateTime};
use ulid::Ulid;

use crate::identity::Identity;
use crate::middleware::{IdentityStore, NewSession, SessionStore, StoreError};
use crate::types::{ExternalId, SessionId};

/// Identity records held in a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    identities: DashMap<ExternalId, Identity>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Administrative deletion. Live sessions for this identity become
    /// anonymous on their next request.
    pub fn remove(&self, external_id: &ExternalId) -> Option<Identity> {
        self.identities.remove(external_id).map(|(_, identity)| identity)
    }

    /// Insert or overwrite a record as-is, bypassing the login policy.
    pub fn insert(&self, identity: Identity) {
        self.identities.insert(identity.external_id.clone(), identity);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl IdentityStore for MemoryIdentityStore {
    async fn find(&self, external_id: &ExternalId) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.get(external_id).map(|entry| entry.clone()))
    }

    async fn upsert_with<F>(
        &self,
        external_id: &ExternalId,
        apply: F,
    ) -> Result<Identity, StoreError>
    where
        F: FnOnce(Option<Identity>) -> Identity + Send,
    {
        // The entry guard holds the shard write lock until the new record is in.
        let identity = match self.identities.entry(external_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let next = apply(Some(occupied.get().clone()));
                occupied.insert(next.clone());
                next
            }
            Entry::Vacant(vacant) => {
                let next = apply(None);
                vacant.insert(next.clone());
                next
            }
        };
        debug_assert_eq!(&identity.external_id, external_id);
        Ok(identity)
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    external_id: ExternalId,
    expires_at: OffsetDateTime,
}

/// Sessions with a fixed time-to-live, keyed by ULID.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, StoredSession>,
    ttl: Duration,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::minutes(15))
    }
}

impl SessionStore for MemorySessionStore {
    async fn create(&self, session: NewSession) -> Result<SessionId, StoreError> {
        let session_id = SessionId(Ulid::new().to_string());
        self.sessions.insert(
            session_id.clone(),
            StoredSession {
                external_id: session.external_id,
                expires_at: OffsetDateTime::now_utc() + self.ttl,
            },
        );
        Ok(session_id)
    }

    async fn find(&self, session_id: &SessionId) -> Result<Option<ExternalId>, StoreError> {
        let now = OffsetDateTime::now_utc();
        let found = self
            .sessions
            .get(session_id)
            .map(|session| (session.external_id.clone(), session.expires_at));

        match found {
            Some((external_id, expires_at)) if expires_at > now => Ok(Some(external_id)),
            Some(_) => {
                self.sessions.remove(session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.sessions.remove(session_id);
        Ok(())
    }
}
