//! Resolved external user identity.

use serde::{Deserialize, Serialize};

/// A user as reported by the GitHub identity API.
///
/// `id` is the stable key for the user-record store; `login` is only used for
/// super-user elevation and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubUser {
    pub id: u64,
    pub login: String,
}

impl GithubUser {
    /// The store key for this identity.
    pub fn store_key(&self) -> String {
        self.id.to_string()
    }
}
