//! GitHub OAuth login flow.
//!
//! `GET /auth` redirects the browser to GitHub's authorize page; `POST /auth`
//! exchanges the returned code for an access token. Requests arriving from a
//! localhost frontend use the dev OAuth app's client pair so local development
//! works against the same backend.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use codetutor_config::GithubConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::SharedState;

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub referer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExchangePayload {
    pub code: String,
    pub referer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// `GET /auth` — send the browser to GitHub's authorize page.
pub async fn authorize_redirect(
    State(state): State<SharedState>,
    Query(query): Query<AuthQuery>,
) -> Response {
    let Some((client_id, _)) = client_pair(&state.config.github, query.referer.as_deref()) else {
        warn!("OAuth redirect requested but no GitHub client is configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "GitHub OAuth is not configured" })),
        )
            .into_response();
    };

    let url = format!("{GITHUB_AUTHORIZE_URL}?client_id={client_id}");
    Redirect::temporary(&url).into_response()
}

/// `POST /auth` — exchange an authorization code for an access token.
pub async fn exchange_code(
    State(state): State<SharedState>,
    Json(payload): Json<ExchangePayload>,
) -> Response {
    let Some((client_id, Some(client_secret))) =
        client_pair(&state.config.github, payload.referer.as_deref())
    else {
        warn!("OAuth exchange requested but no GitHub client pair is configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "GitHub OAuth is not configured" })),
        )
            .into_response();
    };

    let result = state
        .http
        .post(GITHUB_TOKEN_URL)
        .header("Accept", "application/json")
        .json(&json!({
            "client_id": client_id,
            "client_secret": client_secret,
            "code": payload.code,
        }))
        .send()
        .await;

    match result {
        Ok(response) => match response.json::<ExchangeResponse>().await {
            Ok(exchange) => {
                if exchange.access_token.is_some() {
                    info!("OAuth code exchanged for access token");
                } else {
                    warn!(error = ?exchange.error, "OAuth exchange rejected by GitHub");
                }
                (StatusCode::OK, Json(exchange)).into_response()
            }
            Err(e) => {
                warn!(error = %e, "OAuth exchange returned an unreadable body");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "unreadable response from GitHub" })),
                )
                    .into_response()
            }
        },
        Err(e) => {
            warn!(error = %e, "OAuth exchange request failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "could not reach GitHub" })),
            )
                .into_response()
        }
    }
}

/// Pick the OAuth client pair for a request origin.
///
/// Localhost referers get the dev OAuth app; everything else gets the
/// production pair. Falls back to the production pair when no dev pair is
/// configured.
fn client_pair(github: &GithubConfig, referer: Option<&str>) -> Option<(String, Option<String>)> {
    if referer.is_some_and(is_localhost) {
        if let Some(id) = &github.client_id_dev {
            return Some((id.clone(), github.client_secret_dev.clone()));
        }
    }
    github
        .client_id
        .as_ref()
        .map(|id| (id.clone(), github.client_secret.clone()))
}

fn is_localhost(referer: &str) -> bool {
    referer.starts_with("http://localhost") || referer.starts_with("http://127.0.0.1")
}
