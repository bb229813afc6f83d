use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use pitchcraft_core::domain::mode::Mode;
use pitchcraft_core::domain::pitch::PitchRequest;
use pitchcraft_core::errors::{ApplicationError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bootstrap::ModeAgents;

#[derive(Clone)]
pub struct ApiState {
    agents: Arc<ModeAgents>,
    default_mode: Mode,
}

impl ApiState {
    pub fn new(agents: Arc<ModeAgents>, default_mode: Mode) -> Self {
        Self { agents, default_mode }
    }
}

/// Body of `POST /api/generate`. Fields are optional here so that a missing
/// field is reported the same way as a blank one.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub industry: Option<String>,
    pub audience: Option<String>,
    pub random_word: Option<String>,
    pub mode: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerateResponse {
    pub result: String,
    pub mode: Mode,
    pub tools_used: Vec<String>,
    pub run_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub correlation_id: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new().route("/api/generate", post(generate)).with_state(state)
}

pub async fn generate(
    State(state): State<ApiState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            let error = InterfaceError::BadRequest {
                message: rejection.body_text(),
                correlation_id: correlation_id.clone(),
            };
            return error_response(error);
        }
    };

    let mode = match body.mode.as_deref() {
        None => state.default_mode,
        Some(raw) => match raw.parse::<Mode>() {
            Ok(mode) => mode,
            Err(error) => {
                return error_response(
                    ApplicationError::from(error).into_interface(correlation_id.as_str()),
                )
            }
        },
    };

    let industry = body.industry.unwrap_or_default();
    let audience = body.audience.unwrap_or_default();
    let keyword = body.random_word.unwrap_or_default();
    let task = match PitchRequest::new(&industry, &audience, &keyword) {
        Ok(request) => request.task_description(mode),
        Err(error) => {
            return error_response(
                ApplicationError::from(error).into_interface(correlation_id.as_str()),
            )
        }
    };

    match state.agents.get(mode).execute(&task, &industry, &audience, &keyword).await {
        Ok(report) => {
            info!(
                event_name = "server.api.generate.completed",
                correlation_id = %correlation_id,
                run_id = %report.run_id,
                mode = %mode,
                tools_used = ?report.tools_used,
                "pitch generated"
            );
            let response = GenerateResponse {
                result: report.pitch,
                mode,
                tools_used: report.tools_used,
                run_id: report.run_id,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => {
            error_response(ApplicationError::from(error).into_interface(correlation_id.as_str()))
        }
    }
}

fn error_response(error: InterfaceError) -> Response {
    let (status, detail) = match &error {
        InterfaceError::BadRequest { message, .. } => {
            (StatusCode::BAD_REQUEST, Some(message.clone()))
        }
        InterfaceError::ServiceUnavailable { .. } => (StatusCode::BAD_GATEWAY, None),
        InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, None),
    };

    warn!(
        event_name = "server.api.generate.rejected",
        correlation_id = %error.correlation_id(),
        status = status.as_u16(),
        error = %error,
        "pitch request failed"
    );

    let body = ErrorResponse {
        error: error.user_message().to_string(),
        detail,
        correlation_id: error.correlation_id().to_string(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use pitchcraft_agent::errors::{LlmError, ToolError};
    use pitchcraft_agent::runtime::{AgentRuntime, AgentSettings};
    use pitchcraft_agent::tools::{
        GeneratorRequest, GeneratorTool, PitchOutput, ToolCategory, ToolInstance, ToolMetadata,
        ToolRegistry, SERIOUS_STARTUP_SIMULATOR, STARTUP_SIMULATOR,
    };
    use pitchcraft_core::audit::NoopAuditSink;
    use pitchcraft_core::domain::mode::Mode;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, ApiState};
    use crate::bootstrap::ModeAgents;

    type Seen = Arc<Mutex<Vec<GeneratorRequest>>>;

    struct StubGenerator {
        name: &'static str,
        fail: bool,
        seen: Seen,
    }

    #[async_trait]
    impl GeneratorTool for StubGenerator {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(&self, request: GeneratorRequest) -> Result<PitchOutput, ToolError> {
            self.seen.lock().expect("seen").push(request.clone());
            if self.fail {
                return Err(ToolError::Llm(LlmError::Status {
                    status: 500,
                    body: "secret upstream detail".to_string(),
                }));
            }
            let pitch = format!("{} pitch about {}", self.name, request.keyword);
            Ok(PitchOutput {
                character_count: pitch.chars().count(),
                pitch,
                mode: Mode::Silly,
                context_used: false,
                model: "stub".to_string(),
                usage: None,
            })
        }
    }

    fn agent(mode: Mode, generator: &'static str, fail: bool, seen: &Seen) -> AgentRuntime {
        let mut registry = ToolRegistry::new();
        let seen = Arc::clone(seen);
        registry.register(ToolMetadata::new(generator, "stub", ToolCategory::Generator), move || {
            ToolInstance::Generator(Box::new(StubGenerator {
                name: generator,
                fail,
                seen: Arc::clone(&seen),
            }))
        });
        AgentRuntime::with_registry(
            AgentSettings { mode, ..AgentSettings::default() },
            registry,
            Arc::new(NoopAuditSink),
        )
    }

    fn app(fail: bool, seen: &Seen) -> Router {
        let agents = ModeAgents::new(
            agent(Mode::Silly, STARTUP_SIMULATOR, fail, seen),
            agent(Mode::Serious, SERIOUS_STARTUP_SIMULATOR, fail, seen),
        );
        router(ApiState::new(Arc::new(agents), Mode::Silly))
    }

    async fn post(app: Router, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn generate_uses_default_mode_and_returns_pitch() {
        let seen = Seen::default();
        let (status, body) = post(
            app(false, &seen),
            json!({"industry": "tech", "audience": "students", "randomWord": "cloud"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "startup_simulator pitch about cloud");
        assert_eq!(body["mode"], "silly");
        assert_eq!(body["tools_used"], json!(["startup_simulator"]));
        assert!(body["run_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(seen.lock().expect("seen")[0].context, "");
    }

    #[tokio::test]
    async fn generate_honours_requested_mode() {
        let seen = Seen::default();
        let (status, body) = post(
            app(false, &seen),
            json!({
                "industry": "fintech",
                "audience": "banks",
                "randomWord": "ledger",
                "mode": "serious"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "serious_startup_simulator pitch about ledger");
        assert_eq!(body["mode"], "serious");
    }

    #[tokio::test]
    async fn blank_field_is_a_bad_request() {
        let seen = Seen::default();
        let (status, body) = post(
            app(false, &seen),
            json!({"industry": "tech", "audience": "  ", "randomWord": "cloud"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().is_some_and(|detail| detail.contains("audience")));
        assert!(seen.lock().expect("seen").is_empty());
    }

    #[tokio::test]
    async fn unknown_mode_and_malformed_json_are_bad_requests() {
        let seen = Seen::default();
        let (status, body) = post(
            app(false, &seen),
            json!({"industry": "a", "audience": "b", "randomWord": "c", "mode": "zany"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().is_some_and(|detail| detail.contains("zany")));

        let (status, _body) = post(app(false, &seen), json!(["not", "an", "object"])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generator_failure_is_a_bad_gateway_without_upstream_detail() {
        let seen = Seen::default();
        let (status, body) = post(
            app(true, &seen),
            json!({"industry": "tech", "audience": "students", "randomWord": "cloud"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["error"],
            "The pitch generator is temporarily unavailable. Please retry shortly."
        );
        assert!(!body.to_string().contains("secret upstream detail"));
    }
}
