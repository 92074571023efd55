//! Rate-limit and authorization gate.
//!
//! One state machine over a single [`UserRecord`], keyed by the resolved
//! identity id. Three states per call: new user (insert, admit free), blocked
//! (reject with wait, no mutation), admitted (charge the window only when the
//! call will actually invoke an engine).
//!
//! Limiting is best-effort: two requests from the same user racing the store
//! can both be admitted before either write lands. The store only has to give
//! read-your-own-write consistency per key.

use chrono::{DateTime, Duration, Utc};
use codetutor_core::error::HelpError;
use codetutor_core::identity::GithubUser;
use codetutor_core::record::{UserRecord, UserRecordStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The gate's verdict for an admitted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Effective tier: the stored flag, or super-user status by login.
    pub authorized: bool,

    /// Seconds until the next chargeable call would be admitted.
    pub wait_secs: u64,
}

/// A rejected call, with the wait still attached when it was computed before
/// the failure so the caller can honor its own backoff.
#[derive(Debug, Clone)]
pub struct Denial {
    pub error: HelpError,
    pub wait_secs: Option<u64>,
}

impl From<HelpError> for Denial {
    fn from(error: HelpError) -> Self {
        let wait_secs = match &error {
            HelpError::RateLimited { wait_secs } => Some(*wait_secs),
            _ => None,
        };
        Self { error, wait_secs }
    }
}

/// The rate-limit / authorization gate.
pub struct Gate {
    store: Arc<dyn UserRecordStore>,
    window: Duration,
    super_users: Vec<String>,
}

impl Gate {
    pub fn new(store: Arc<dyn UserRecordStore>, window_secs: u64, super_users: Vec<String>) -> Self {
        Self {
            store,
            window: Duration::seconds(window_secs as i64),
            super_users,
        }
    }

    /// Decide whether this call is admitted.
    ///
    /// `chargeable` is false for dry runs: the decision is identical but an
    /// admitted dry run never advances the timestamp.
    pub async fn admit(&self, user: &GithubUser, chargeable: bool) -> Result<Admission, Denial> {
        let key = user.store_key();
        let now = Utc::now();

        let record = self
            .store
            .get(&key)
            .await
            .map_err(|e| Denial::from(HelpError::from(e)))?;

        let Some(record) = record else {
            return self.admit_new_user(user, &key, now).await;
        };

        if now < record.rate_limit_at {
            let wait_secs = wait_until(now, record.rate_limit_at);
            debug!(user = %user.login, wait_secs, "Call blocked by rate limit");
            return Err(Denial::from(HelpError::RateLimited { wait_secs }));
        }

        let authorized = record.authorized || self.is_super_user(&user.login);
        let wait_secs = if chargeable {
            let next = now + self.window;
            self.store
                .update_rate_limit(&key, next)
                .await
                .map_err(|e| Denial {
                    error: HelpError::from(e),
                    wait_secs: Some(wait_until(now, next)),
                })?;
            wait_until(now, next)
        } else {
            0
        };

        debug!(user = %user.login, authorized, chargeable, "Call admitted");
        Ok(Admission {
            authorized,
            wait_secs,
        })
    }

    /// First call from a new identity: insert the record with the window
    /// already stamped, but admit this call without charging it.
    async fn admit_new_user(
        &self,
        user: &GithubUser,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Admission, Denial> {
        let record = UserRecord::new_user(now, self.window);
        let wait_secs = wait_until(now, record.rate_limit_at);

        self.store
            .insert(key, record)
            .await
            .map_err(|e| Denial {
                error: HelpError::from(e),
                wait_secs: Some(wait_secs),
            })?;

        info!(user = %user.login, "First request from new user");
        Ok(Admission {
            authorized: self.is_super_user(&user.login),
            wait_secs,
        })
    }

    fn is_super_user(&self, login: &str) -> bool {
        let elevated = self.super_users.iter().any(|u| u == login);
        if elevated {
            warn!(login, "Super user granted elevated tier");
        }
        elevated
    }
}

/// Seconds from `now` until `at`, rounded up; zero when `at` has passed.
fn wait_until(now: DateTime<Utc>, at: DateTime<Utc>) -> u64 {
    let ms = (at - now).num_milliseconds().max(0);
    (ms as u64).div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codetutor_core::error::StoreError;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    struct MapStore {
        records: RwLock<HashMap<String, UserRecord>>,
        fail_writes: bool,
    }

    impl MapStore {
        fn new() -> Self {
            Self {
                records: RwLock::new(HashMap::new()),
                fail_writes: false,
            }
        }

        async fn seed(&self, key: &str, record: UserRecord) {
            self.records.write().await.insert(key.into(), record);
        }
    }

    #[async_trait]
    impl UserRecordStore for MapStore {
        fn name(&self) -> &str {
            "map"
        }

        async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
            Ok(self.records.read().await.get(user_id).cloned())
        }

        async fn insert(&self, user_id: &str, record: UserRecord) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Storage("write refused".into()));
            }
            self.records.write().await.insert(user_id.into(), record);
            Ok(())
        }

        async fn update_rate_limit(
            &self,
            user_id: &str,
            at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Storage("write refused".into()));
            }
            let mut records = self.records.write().await;
            records
                .get_mut(user_id)
                .map(|r| r.rate_limit_at = at)
                .ok_or_else(|| StoreError::Storage("missing record".into()))
        }
    }

    fn student() -> GithubUser {
        GithubUser {
            id: 12345,
            login: "octocat".into(),
        }
    }

    #[tokio::test]
    async fn first_call_admitted_and_stamped() {
        let store = Arc::new(MapStore::new());
        let gate = Gate::new(store.clone(), 60, vec![]);

        let admission = gate.admit(&student(), true).await.unwrap();
        assert!(!admission.authorized);
        assert!(admission.wait_secs > 0 && admission.wait_secs <= 60);

        // The record now exists with the window charged.
        let record = store.get("12345").await.unwrap().unwrap();
        assert!(!record.authorized);
        assert!(record.rate_limit_at > Utc::now());
    }

    #[tokio::test]
    async fn blocked_call_returns_wait_without_mutation() {
        let store = Arc::new(MapStore::new());
        let stamped = Utc::now() + Duration::seconds(30);
        store
            .seed(
                "12345",
                UserRecord {
                    authorized: false,
                    rate_limit_at: stamped,
                },
            )
            .await;
        let gate = Gate::new(store.clone(), 60, vec![]);

        let denial = gate.admit(&student(), true).await.unwrap_err();
        assert!(matches!(denial.error, HelpError::RateLimited { .. }));
        let wait = denial.wait_secs.unwrap();
        assert!(wait >= 29 && wait <= 30);

        // Timestamp untouched.
        let record = store.get("12345").await.unwrap().unwrap();
        assert_eq!(record.rate_limit_at, stamped);
    }

    #[tokio::test]
    async fn chargeable_admit_advances_timestamp() {
        let store = Arc::new(MapStore::new());
        let expired = Utc::now() - Duration::seconds(10);
        store
            .seed(
                "12345",
                UserRecord {
                    authorized: false,
                    rate_limit_at: expired,
                },
            )
            .await;
        let gate = Gate::new(store.clone(), 60, vec![]);

        let admission = gate.admit(&student(), true).await.unwrap();
        assert_eq!(admission.wait_secs, 60);

        let record = store.get("12345").await.unwrap().unwrap();
        assert!(record.rate_limit_at > Utc::now());
    }

    #[tokio::test]
    async fn dry_run_never_charges() {
        let store = Arc::new(MapStore::new());
        let expired = Utc::now() - Duration::seconds(10);
        store
            .seed(
                "12345",
                UserRecord {
                    authorized: false,
                    rate_limit_at: expired,
                },
            )
            .await;
        let gate = Gate::new(store.clone(), 60, vec![]);

        let admission = gate.admit(&student(), false).await.unwrap();
        assert_eq!(admission.wait_secs, 0);

        let record = store.get("12345").await.unwrap().unwrap();
        assert_eq!(record.rate_limit_at, expired);
    }

    #[tokio::test]
    async fn super_user_login_gets_elevated_tier() {
        let store = Arc::new(MapStore::new());
        let gate = Gate::new(store, 60, vec!["octocat".into()]);

        let admission = gate.admit(&student(), true).await.unwrap();
        assert!(admission.authorized);
    }

    #[tokio::test]
    async fn store_write_failure_keeps_computed_wait() {
        let store = Arc::new(MapStore {
            records: RwLock::new(HashMap::new()),
            fail_writes: true,
        });
        let gate = Gate::new(store, 60, vec![]);

        let denial = gate.admit(&student(), true).await.unwrap_err();
        assert!(matches!(denial.error, HelpError::Internal { .. }));
        assert!(denial.wait_secs.is_some());
    }

    #[test]
    fn wait_rounds_up() {
        let now = Utc::now();
        assert_eq!(wait_until(now, now + Duration::milliseconds(1)), 1);
        assert_eq!(wait_until(now, now + Duration::milliseconds(1500)), 2);
        assert_eq!(wait_until(now, now - Duration::seconds(5)), 0);
    }
}
