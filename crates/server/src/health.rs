use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use pitchcraft_core::domain::mode::Mode;
use serde::Serialize;

use crate::bootstrap::ModeAgents;

#[derive(Clone)]
pub struct HealthState {
    agents: Arc<ModeAgents>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModeCheck {
    pub mode: Mode,
    pub agent_id: String,
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub modes: Vec<ModeCheck>,
    pub checked_at: String,
}

pub fn router(agents: Arc<ModeAgents>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { agents })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let modes: Vec<ModeCheck> =
        Mode::ALL.into_iter().map(|mode| mode_check(&state, mode)).collect();
    let ready = modes.iter().all(|check| check.status == "ready");

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "pitchcraft-server runtime initialized".to_string(),
        },
        modes,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

/// A mode is ready when both tools of its pipeline are registered.
fn mode_check(state: &HealthState, mode: Mode) -> ModeCheck {
    let agent = state.agents.get(mode);
    let plan = agent.plan();
    let missing: Vec<&str> = [plan.context_tool, plan.generator_tool]
        .into_iter()
        .filter(|name| agent.registry().get_implementation(name).is_none())
        .collect();

    let (status, detail) = if missing.is_empty() {
        ("ready", format!("{} -> {}", plan.context_tool, plan.generator_tool))
    } else {
        ("degraded", format!("unregistered tools: {}", missing.join(", ")))
    };
    ModeCheck { mode, agent_id: agent.agent_id(), status, detail }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use pitchcraft_agent::runtime::{AgentRuntime, AgentSettings};
    use pitchcraft_agent::tools::{HackerNewsTool, ToolInstance, ToolRegistry};
    use pitchcraft_core::audit::NoopAuditSink;
    use pitchcraft_core::domain::mode::Mode;

    use crate::bootstrap::ModeAgents;
    use crate::health::{health, HealthState};

    fn agent(mode: Mode, registry: ToolRegistry) -> AgentRuntime {
        AgentRuntime::with_registry(
            AgentSettings { mode, ..AgentSettings::default() },
            registry,
            Arc::new(NoopAuditSink),
        )
    }

    #[tokio::test]
    async fn health_is_degraded_when_a_pipeline_tool_is_missing() {
        let mut silly_tools = ToolRegistry::new();
        silly_tools.register(HackerNewsTool::metadata(), || {
            ToolInstance::Context(Box::new(HackerNewsTool::new("http://127.0.0.1:9")))
        });
        let agents = ModeAgents::new(
            agent(Mode::Silly, silly_tools),
            agent(Mode::Serious, ToolRegistry::new()),
        );

        let (status, Json(payload)) = health(State(HealthState { agents: Arc::new(agents) })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.modes.len(), 2);
        assert_eq!(payload.modes[0].detail, "unregistered tools: startup_simulator");
        assert_eq!(
            payload.modes[1].detail,
            "unregistered tools: news_api_tool, serious_startup_simulator"
        );
    }
}
