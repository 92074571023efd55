//! Error types for the codetutor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; `HelpError` is the
//! request-level taxonomy that the response envelope is built from.

use thiserror::Error;

/// Request-level failure taxonomy for the help pipeline.
///
/// Every boundary failure (identity check, store access, engine call) maps
/// deterministically onto one of these variants; the gateway turns them into
/// JSON envelopes with a stable `status` code.
#[derive(Debug, Clone, Error)]
pub enum HelpError {
    /// The Authorization header was missing or not of the form `token <value>`.
    #[error("invalid or missing authorization token")]
    InvalidToken,

    /// The identity provider rejected the token. The client should drop its
    /// stored credential (`expire_logins` is set in the envelope).
    #[error("identity provider rejected the token: {detail}")]
    UpstreamAuth { detail: String },

    /// The caller must wait before the next chargeable call.
    #[error("rate limited, retry in {wait_secs}s")]
    RateLimited { wait_secs: u64 },

    /// The request body failed to parse into problem/user data.
    #[error("malformed request body: {detail}")]
    MalformedRequest { detail: String },

    /// Store or engine failure, or any unexpected condition.
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl HelpError {
    /// The HTTP status this failure is reported as. The envelope's `status`
    /// field mirrors the HTTP status exactly.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidToken | Self::UpstreamAuth { .. } => 401,
            Self::RateLimited { .. } => 429,
            Self::MalformedRequest { .. } => 400,
            Self::Internal { .. } => 500,
        }
    }

    /// Whether the client should invalidate its stored credential.
    ///
    /// True only when the upstream identity check itself failed; a rate limit
    /// or internal error says nothing about the credential's validity.
    pub fn expire_logins(&self) -> bool {
        matches!(self, Self::UpstreamAuth { .. })
    }
}

/// Failures from an LLM engine backend.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("engine returned no reply text")]
    EmptyReply,

    #[error("network error: {0}")]
    Network(String),
}

/// Failures from the user-record store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

/// Failures while resolving a bearer credential to a user identity.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// Header absent or not exactly `token <value>`.
    #[error("malformed authorization header")]
    Malformed,

    /// The identity API returned a non-success response.
    #[error("identity API rejected the token: {detail}")]
    Upstream { detail: String },

    #[error("network error reaching identity API: {0}")]
    Network(String),
}

impl From<IdentityError> for HelpError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Malformed => HelpError::InvalidToken,
            IdentityError::Upstream { detail } => HelpError::UpstreamAuth { detail },
            IdentityError::Network(detail) => HelpError::Internal { detail },
        }
    }
}

impl From<StoreError> for HelpError {
    fn from(err: StoreError) -> Self {
        HelpError::Internal {
            detail: err.to_string(),
        }
    }
}

impl From<EngineError> for HelpError {
    fn from(err: EngineError) -> Self {
        HelpError::Internal {
            detail: err.to_string(),
        }
    }
}
