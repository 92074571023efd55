//! User record — the only entity with cross-request lifetime.
//!
//! One record per external identity, owned by the store. The rate-limit gate
//! is the sole mutator; records are never deleted by this backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Persistent per-user authorization and rate-limit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Tier flag. Unauthorized users are hard-downgraded to the default
    /// engine; they are still admitted.
    pub authorized: bool,

    /// Earliest instant a new chargeable call may be admitted.
    pub rate_limit_at: DateTime<Utc>,
}

impl UserRecord {
    /// A fresh record for a first-time user: unauthorized, with the window
    /// already charged so the free first call still starts the clock.
    pub fn new_user(now: DateTime<Utc>, window: chrono::Duration) -> Self {
        Self {
            authorized: false,
            rate_limit_at: now + window,
        }
    }
}

/// Persistent mapping from user identity to [`UserRecord`].
///
/// Implementations: SQLite (durable), in-memory (tests/ephemeral). The store
/// must provide read-your-own-write consistency per key; cross-request races
/// between two admitted calls are accepted (best-effort rate limiting).
#[async_trait]
pub trait UserRecordStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Look up the record for a user id.
    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a record for a new user. Overwrites nothing in practice: the
    /// gate only calls this after `get` returned None.
    async fn insert(&self, user_id: &str, record: UserRecord) -> Result<(), StoreError>;

    /// Advance the rate-limit timestamp for an existing user.
    async fn update_rate_limit(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
