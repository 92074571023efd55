//! Response envelope — the fixed JSON shape returned for every help request.
//!
//! The `status` field mirrors the HTTP status exactly; the frontend branches
//! on `status` and `expire_logins`, never on free-text error content. Field
//! casing is what the frontend already expects and is not negotiable here.

use codetutor_core::error::HelpError;
use serde::{Deserialize, Serialize};

/// The envelope for a help request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelpResponse {
    /// Mirrors the HTTP status code.
    pub status: u16,

    #[serde(rename = "statusText", skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,

    /// The assembled prompt, echoed back for frontend display/debugging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// The model's reply with any trailing remembering section removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// The directive that asked the model to produce a remembering section.
    #[serde(rename = "rememberingPrompt", skip_serializing_if = "Option::is_none")]
    pub remembering_prompt: Option<String>,

    /// The remembering section extracted from the model's reply.
    #[serde(rename = "rememberingResponse", skip_serializing_if = "Option::is_none")]
    pub remembering_response: Option<String>,

    /// True only when the upstream identity check failed; tells the client to
    /// drop its stored credential.
    pub expire_logins: bool,

    /// Seconds until the next chargeable call is admitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<u64>,

    /// The engine identifier that produced the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HelpResponse {
    /// A success envelope. The response and model fields are filled in by the
    /// service when an engine actually ran.
    pub fn success(prompt: String, wait_time: u64) -> Self {
        Self {
            status: 200,
            status_text: Some("OK".to_string()),
            prompt: Some(prompt),
            expire_logins: false,
            wait_time: Some(wait_time),
            ..Default::default()
        }
    }

    /// A failure envelope from the request-level error taxonomy.
    ///
    /// `wait_time` is attached whenever it was computed before the failure,
    /// so the caller can still honor its backoff.
    pub fn failure(error: &HelpError, wait_time: Option<u64>) -> Self {
        Self {
            status: error.status(),
            status_text: Some(status_text(error.status()).to_string()),
            expire_logins: error.expire_logins(),
            wait_time,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        _ => "Internal Server Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_auth_failure_expires_logins() {
        let envelope = HelpResponse::failure(
            &HelpError::UpstreamAuth {
                detail: "404 from identity API".into(),
            },
            None,
        );
        assert_eq!(envelope.status, 401);
        assert!(envelope.expire_logins);
    }

    #[test]
    fn rate_limited_carries_wait_without_expiring() {
        let envelope =
            HelpResponse::failure(&HelpError::RateLimited { wait_secs: 42 }, Some(42));
        assert_eq!(envelope.status, 429);
        assert_eq!(envelope.wait_time, Some(42));
        assert!(!envelope.expire_logins);
    }

    #[test]
    fn serializes_with_frontend_field_names() {
        let mut envelope = HelpResponse::success("the prompt".into(), 60);
        envelope.remembering_response = Some("note".into());

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], 200);
        assert_eq!(json["statusText"], "OK");
        assert_eq!(json["rememberingResponse"], "note");
        assert_eq!(json["wait_time"], 60);
        assert_eq!(json["expire_logins"], false);
        // Absent optionals are omitted, not null.
        assert!(json.get("response").is_none());
        assert!(json.get("error").is_none());
    }
}
