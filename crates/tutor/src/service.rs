//! The tutoring service — the full help pipeline behind `POST /help`.
//!
//! gate → tier downgrade → prompt assembly → engine dispatch → envelope.
//! Identity resolution happens in the gateway before this service is called;
//! the service receives an already-resolved user.

use codetutor_config::AppConfig;
use codetutor_core::engine::{EngineRequest, SamplingConfig};
use codetutor_core::error::HelpError;
use codetutor_core::identity::GithubUser;
use codetutor_core::problem::{ProblemData, UserData};
use codetutor_core::record::UserRecordStore;
use codetutor_engines::router::EngineRouter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::envelope::HelpResponse;
use crate::gate::Gate;
use crate::prompt::{self, PromptConfig, REMEMBER_DIRECTIVE};

/// The request body for a help call, exactly as the frontend sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
    pub user_data: UserData,
    pub problem_data: ProblemData,
}

/// The tutoring service. One instance serves all requests.
pub struct TutorService {
    gate: Gate,
    router: EngineRouter,
    prompts: PromptConfig,
    default_engine: String,
    max_output_tokens: u32,
}

impl TutorService {
    pub fn new(
        gate: Gate,
        router: EngineRouter,
        prompts: PromptConfig,
        default_engine: String,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            gate,
            router,
            prompts,
            default_engine,
            max_output_tokens,
        }
    }

    /// Build the service from configuration and a store backend.
    pub fn from_config(config: &AppConfig, store: Arc<dyn UserRecordStore>) -> Self {
        let gate = Gate::new(
            store,
            config.rate_limit_window_secs,
            config.super_users.clone(),
        );
        let router = EngineRouter::from_config(config);
        Self::new(
            gate,
            router,
            PromptConfig::default(),
            config.default_engine.clone(),
            config.max_output_tokens,
        )
    }

    /// Handle one help request for an already-resolved user.
    ///
    /// `call_api = false` selects dry-run: the gate still runs (uncharged),
    /// the prompt is still assembled, but no engine is invoked.
    pub async fn help(
        &self,
        user: &GithubUser,
        request: &HelpRequest,
        engine_id: &str,
        call_api: bool,
    ) -> HelpResponse {
        let admission = match self.gate.admit(user, call_api).await {
            Ok(admission) => admission,
            Err(denial) => {
                info!(user = %user.login, error = %denial.error, "Help request denied");
                return HelpResponse::failure(&denial.error, denial.wait_secs);
            }
        };

        // Unauthorized tier is hard-downgraded to the default engine. Not an
        // error: the caller gets a reply, just from the baseline model.
        let effective_engine = if admission.authorized {
            engine_id
        } else {
            if engine_id != self.default_engine {
                debug!(
                    user = %user.login,
                    requested = engine_id,
                    "Unauthorized tier, downgrading to default engine"
                );
            }
            &self.default_engine
        };

        let prompt = prompt::assemble(&self.prompts, &request.problem_data, &request.user_data);

        let mut envelope = HelpResponse::success(prompt.clone(), admission.wait_secs);
        if !call_api {
            debug!(user = %user.login, "Dry run, skipping engine call");
            return envelope;
        }

        let Some(dispatch) = self.router.dispatch(effective_engine) else {
            // Unrecognized engine or missing credential: degraded but not
            // fatal. The envelope reports success with no reply.
            warn!(engine = effective_engine, "No engine available, returning empty reply");
            return envelope;
        };

        let engine_request = EngineRequest {
            model: dispatch.model,
            system: self.prompts.system_prompt.clone(),
            prompt,
            sampling: SamplingConfig {
                max_output_tokens: self.max_output_tokens,
                ..Default::default()
            },
        };

        match dispatch.engine.complete(engine_request).await {
            Ok(reply) => {
                let (response, remembering) = split_remembering(&reply);
                info!(
                    user = %user.login,
                    engine = effective_engine,
                    reply_len = reply.len(),
                    "Engine reply received"
                );
                envelope.response = Some(response);
                envelope.remembering_response = remembering;
                envelope.remembering_prompt = Some(REMEMBER_DIRECTIVE.to_string());
                envelope.model = Some(effective_engine.to_string());
                envelope
            }
            Err(e) => {
                warn!(engine = effective_engine, error = %e, "Engine call failed");
                HelpResponse::failure(&HelpError::from(e), Some(admission.wait_secs))
            }
        }
    }
}

/// Split a trailing `# Remembering` section out of an engine reply.
///
/// Everything after the last `# Remembering` heading line becomes the
/// remembering note; the rest is the student-facing response. Replies without
/// the heading are returned whole.
pub fn split_remembering(reply: &str) -> (String, Option<String>) {
    let mut heading_start = None;
    let mut offset = 0;
    for line in reply.split_inclusive('\n') {
        if line.trim() == "# Remembering" {
            heading_start = Some((offset, offset + line.len()));
        }
        offset += line.len();
    }

    match heading_start {
        Some((start, end)) => {
            let response = reply[..start].trim_end().to_string();
            let remembering = reply[end..].trim().to_string();
            let remembering = (!remembering.is_empty()).then_some(remembering);
            (response, remembering)
        }
        None => (reply.trim_end().to_string(), None),
    }
}
