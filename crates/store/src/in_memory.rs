//! In-memory store — useful for testing and ephemeral deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codetutor_core::error::StoreError;
use codetutor_core::record::{UserRecord, UserRecordStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory store that keeps records in a HashMap.
/// Records do not survive a restart; use the SQLite backend in production.
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRecordStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.records.read().await.get(user_id).cloned())
    }

    async fn insert(&self, user_id: &str, record: UserRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(user_id.into(), record);
        Ok(())
    }

    async fn update_rate_limit(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(user_id) {
            Some(record) => {
                record.rate_limit_at = at;
                Ok(())
            }
            None => Err(StoreError::Storage(format!(
                "no record for user '{user_id}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let record = UserRecord::new_user(now, Duration::seconds(60));

        store.insert("42", record.clone()).await.unwrap();
        let fetched = store.get("42").await.unwrap();
        assert_eq!(fetched, Some(record));
    }

    #[tokio::test]
    async fn get_absent_returns_none() {
        let store = InMemoryStore::new();
        assert!(store.get("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_advances_timestamp_only() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert("42", UserRecord::new_user(now, Duration::seconds(60)))
            .await
            .unwrap();

        let later = now + Duration::seconds(120);
        store.update_rate_limit("42", later).await.unwrap();

        let record = store.get("42").await.unwrap().unwrap();
        assert_eq!(record.rate_limit_at, later);
        assert!(!record.authorized);
    }

    #[tokio::test]
    async fn update_missing_record_errors() {
        let store = InMemoryStore::new();
        let result = store.update_rate_limit("ghost", Utc::now()).await;
        assert!(result.is_err());
    }
}
