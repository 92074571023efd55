//! HTTP gateway for the codetutor backend.
//!
//! Routes:
//! - `POST /help`   — the tutoring pipeline (auth → rate limit → prompt → engine)
//! - `GET  /auth`   — redirect to GitHub's OAuth authorize page
//! - `POST /auth`   — exchange an OAuth code for an access token
//! - `GET  /health` — liveness probe
//!
//! Built on Axum. CORS admits the configured frontend origin plus localhost
//! dev origins; every failure leaves the server as a JSON envelope.

pub mod auth;
pub mod github;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use codetutor_core::error::HelpError;
use codetutor_tutor::{HelpRequest, HelpResponse, TutorService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::github::{GithubResolver, IdentityResolver};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: codetutor_config::AppConfig,
    pub service: TutorService,
    pub resolver: Arc<dyn IdentityResolver>,
    pub http: reqwest::Client,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway.allowed_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route("/help", post(help_handler))
        .route("/auth", get(auth::authorize_redirect).post(auth::exchange_code))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(
    config: codetutor_config::AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let store: Arc<dyn codetutor_core::record::UserRecordStore> =
        match config.store.backend.as_str() {
            "memory" => Arc::new(codetutor_store::InMemoryStore::new()),
            _ => Arc::new(codetutor_store::SqliteStore::new(&config.store.path).await?),
        };

    let service = TutorService::from_config(&config, store);
    let state = Arc::new(GatewayState {
        config,
        service,
        resolver: Arc::new(GithubResolver::new()),
        http: reqwest::Client::new(),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS: the configured production origin plus localhost dev origins.
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let allowed = allowed_origin.to_string();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|o| {
                    o == allowed
                        || o.starts_with("http://localhost")
                        || o.starts_with("http://127.0.0.1")
                })
                .unwrap_or(false)
        }))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

// --- Handlers ---

#[derive(Debug, Deserialize)]
pub struct HelpQuery {
    /// Requested engine identifier; unauthorized users are downgraded anyway.
    pub engine: Option<String>,

    /// False selects dry-run: no engine call, no rate-limit charge.
    #[serde(rename = "callAPI")]
    pub call_api: Option<bool>,
}

async fn help_handler(
    State(state): State<SharedState>,
    query: Result<Query<HelpQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Json<HelpRequest>, JsonRejection>,
) -> Response {
    let auth_header = headers.get("Authorization").and_then(|v| v.to_str().ok());

    let user = match state.resolver.verify(auth_header).await {
        Ok(user) => user,
        Err(e) => {
            return envelope_response(HelpResponse::failure(&HelpError::from(e), None));
        }
    };

    // Bad query parameters get the same envelope treatment as a bad body.
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return envelope_response(HelpResponse::failure(
                &HelpError::MalformedRequest {
                    detail: rejection.body_text(),
                },
                None,
            ));
        }
    };

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return envelope_response(HelpResponse::failure(
                &HelpError::MalformedRequest {
                    detail: rejection.body_text(),
                },
                None,
            ));
        }
    };

    let engine = query
        .engine
        .unwrap_or_else(|| state.config.default_engine.clone());
    let call_api = query.call_api.unwrap_or(true);

    let envelope = state.service.help(&user, &request, &engine, call_api).await;
    envelope_response(envelope)
}

fn envelope_response(envelope: HelpResponse) -> Response {
    let status =
        StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use codetutor_core::error::IdentityError;
    use codetutor_core::identity::GithubUser;
    use codetutor_engines::router::EngineRouter;
    use codetutor_store::InMemoryStore;
    use codetutor_tutor::{Gate, PromptConfig};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct ScriptedResolver {
        result: Result<GithubUser, IdentityError>,
    }

    #[async_trait]
    impl IdentityResolver for ScriptedResolver {
        async fn verify(&self, _auth: Option<&str>) -> Result<GithubUser, IdentityError> {
            self.result.clone()
        }
    }

    fn test_state(resolver: ScriptedResolver) -> SharedState {
        let config = codetutor_config::AppConfig::default();
        let store = Arc::new(InMemoryStore::new());
        let gate = Gate::new(store, config.rate_limit_window_secs, vec![]);
        // No engine credentials: dispatch is a soft no-op in these tests.
        let router = EngineRouter::new(None, None);
        let service = TutorService::new(
            gate,
            router,
            PromptConfig::default(),
            config.default_engine.clone(),
            config.max_output_tokens,
        );
        Arc::new(GatewayState {
            config,
            service,
            resolver: Arc::new(resolver),
            http: reqwest::Client::new(),
        })
    }

    fn ok_resolver() -> ScriptedResolver {
        ScriptedResolver {
            result: Ok(GithubUser {
                id: 7,
                login: "octocat".into(),
            }),
        }
    }

    fn help_body() -> String {
        serde_json::json!({
            "userData": {
                "currentCode": "const x = 1;",
                "testResults": { "ranSuccessfully": true, "testResults": ["Passed"] },
                "aiRememberResponse": []
            },
            "problemData": {
                "title": "Sum",
                "description": "Add numbers.",
                "solution": "secret",
                "codeLang": "javascript",
                "tests": [],
                "hiddenTests": []
            }
        })
        .to_string()
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(ok_resolver()));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn help_succeeds_with_resolved_user() {
        let app = build_router(test_state(ok_resolver()));

        let req = Request::builder()
            .method("POST")
            .uri("/help?callAPI=true")
            .header("Content-Type", "application/json")
            .header("Authorization", "token gho_abc")
            .body(Body::from(help_body()))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], 200);
        assert!(json["prompt"].is_string());
        // No engine is configured, so the reply is absent but not an error.
        assert!(json.get("response").is_none());
    }

    #[tokio::test]
    async fn upstream_rejection_expires_logins() {
        let app = build_router(test_state(ScriptedResolver {
            result: Err(IdentityError::Upstream {
                detail: "404 Not Found".into(),
            }),
        }));

        let req = Request::builder()
            .method("POST")
            .uri("/help")
            .header("Content-Type", "application/json")
            .header("Authorization", "token expired")
            .body(Body::from(help_body()))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = response_json(response).await;
        assert_eq!(json["status"], 401);
        assert_eq!(json["expire_logins"], true);
    }

    #[tokio::test]
    async fn malformed_header_does_not_expire_logins() {
        let app = build_router(test_state(ScriptedResolver {
            result: Err(IdentityError::Malformed),
        }));

        let req = Request::builder()
            .method("POST")
            .uri("/help")
            .header("Content-Type", "application/json")
            .body(Body::from(help_body()))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = response_json(response).await;
        assert_eq!(json["expire_logins"], false);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request_envelope() {
        let app = build_router(test_state(ok_resolver()));

        let req = Request::builder()
            .method("POST")
            .uri("/help")
            .header("Content-Type", "application/json")
            .header("Authorization", "token gho_abc")
            .body(Body::from("{ not json"))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert_eq!(json["status"], 400);
        assert_eq!(json["expire_logins"], false);
    }

    #[tokio::test]
    async fn malformed_query_is_bad_request_envelope() {
        let app = build_router(test_state(ok_resolver()));

        let req = Request::builder()
            .method("POST")
            .uri("/help?callAPI=banana")
            .header("Content-Type", "application/json")
            .header("Authorization", "token gho_abc")
            .body(Body::from(help_body()))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Still a JSON envelope, never axum's plain-text rejection.
        let json = response_json(response).await;
        assert_eq!(json["status"], 400);
        assert_eq!(json["expire_logins"], false);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn dry_run_returns_prompt_without_reply() {
        let app = build_router(test_state(ok_resolver()));

        let req = Request::builder()
            .method("POST")
            .uri("/help?callAPI=false")
            .header("Content-Type", "application/json")
            .header("Authorization", "token gho_abc")
            .body(Body::from(help_body()))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert!(json["prompt"].is_string());
        assert!(json["wait_time"].is_number());
        assert!(json.get("response").is_none());
    }
}
