use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use pitchcraft_core::audit::{
    emit_or_warn, preview, AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink,
};
use pitchcraft_core::config::AppConfig;
use pitchcraft_core::domain::mode::Mode;
use pitchcraft_core::domain::pitch::PitchRequest;
use pitchcraft_core::flows::{FlowEvent, FlowState, RunFlow};
use secrecy::SecretString;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{RunError, ToolError};
use crate::formatter::{ResultFormatter, ToolInvocationResult, NO_PITCH_SENTINEL};
use crate::llm::LlmClient;
use crate::pipeline::{render_context, ModePipeline, PipelinePlan};
use crate::tools::{default_registry, ContextRequest, GeneratorRequest, ToolRegistry};

/// Everything one agent needs, resolved from configuration up front.
#[derive(Clone, Debug)]
pub struct AgentSettings {
    pub mode: Mode,
    pub silly_story_limit: u32,
    pub serious_article_limit: u32,
    pub tool_timeout: Duration,
    pub temperature: f32,
    pub hackernews_base_url: String,
    pub news_api_base_url: String,
    pub news_api_key: Option<SecretString>,
    pub news_category: String,
    pub news_country: String,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig, mode: Mode) -> Self {
        Self {
            mode,
            silly_story_limit: config.agent.silly_story_limit,
            serious_article_limit: config.agent.serious_article_limit,
            tool_timeout: Duration::from_secs(config.agent.tool_timeout_secs),
            temperature: config.llm.temperature,
            hackernews_base_url: config.feeds.hackernews_base_url.clone(),
            news_api_base_url: config.feeds.news_api_base_url.clone(),
            news_api_key: config.feeds.news_api_key.clone(),
            news_category: config.feeds.news_category.clone(),
            news_country: config.feeds.news_country.clone(),
        }
    }

    pub fn agent_id(&self) -> String {
        format!("startup-agent-{}", self.mode)
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default(), Mode::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    /// Finished, but without context or without a generator.
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunEnvelope {
    pub agent_id: String,
    pub mode: Mode,
    pub task: String,
    pub final_output: String,
    pub tools_used: Vec<String>,
    pub execution_status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub pitch: String,
    pub tools_used: Vec<String>,
    pub results: Vec<ToolInvocationResult>,
    pub states: Vec<FlowState>,
    pub envelope: RunEnvelope,
}

enum InvokeFailure {
    Tool(ToolError),
    TimedOut(u64),
}

impl InvokeFailure {
    fn describe(&self) -> String {
        match self {
            Self::Tool(error) => error.to_string(),
            Self::TimedOut(secs) => format!("timed out after {secs}s"),
        }
    }
}

struct RunTrack {
    audit: AuditContext,
    state: FlowState,
    states: Vec<FlowState>,
    tools_used: Vec<String>,
    results: Vec<ToolInvocationResult>,
    degraded: bool,
}

/// Runs one mode's pipeline: context provider, then generator, then result
/// extraction. The registry is built once and only read afterwards.
pub struct AgentRuntime {
    settings: AgentSettings,
    registry: Arc<ToolRegistry>,
    pipeline: ModePipeline,
    flow: RunFlow,
    sink: Arc<dyn AuditSink>,
}

impl AgentRuntime {
    pub fn new(
        settings: AgentSettings,
        llm: Arc<dyn LlmClient>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        let registry = default_registry(&settings, llm);
        Self::with_registry(settings, registry, sink)
    }

    pub fn with_registry(
        settings: AgentSettings,
        registry: ToolRegistry,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        let pipeline =
            ModePipeline::new(settings.silly_story_limit, settings.serious_article_limit);
        Self { settings, registry: Arc::new(registry), pipeline, flow: RunFlow, sink }
    }

    pub fn mode(&self) -> Mode {
        self.settings.mode
    }

    pub fn agent_id(&self) -> String {
        self.settings.agent_id()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn plan(&self) -> PipelinePlan {
        self.pipeline.plan(self.settings.mode)
    }

    /// Returns just the pitch. `task` is recorded for observability only.
    pub async fn run(
        &self,
        task: &str,
        industry: &str,
        audience: &str,
        keyword: &str,
    ) -> Result<String, RunError> {
        Ok(self.execute(task, industry, audience, keyword).await?.pitch)
    }

    pub async fn execute(
        &self,
        task: &str,
        industry: &str,
        audience: &str,
        keyword: &str,
    ) -> Result<RunReport, RunError> {
        let request = PitchRequest::new(industry, audience, keyword)?;
        let plan = self.plan();
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let clock = Instant::now();

        let mut track = RunTrack {
            audit: AuditContext::new(run_id.clone(), self.agent_id()),
            state: self.flow.initial_state(),
            states: vec![self.flow.initial_state()],
            tools_used: Vec::new(),
            results: Vec::new(),
            degraded: false,
        };

        tracing::info!(
            event_name = "agent.run.started",
            run_id = %run_id,
            mode = %plan.mode,
            "starting pitch run"
        );
        self.emit(
            &track.audit,
            "run.started",
            AuditCategory::Run,
            AuditOutcome::Success,
            [
                ("mode", plan.mode.to_string()),
                ("task", preview(task)),
                ("registered_tools", self.registry.list_names().join(",")),
            ],
        );

        let context = self.context_phase(&plan, &mut track).await?;

        if let Err(error) = self.generation_phase(&plan, &request, context, &mut track).await {
            tracing::error!(
                event_name = "agent.run.failed",
                run_id = %run_id,
                mode = %plan.mode,
                error = %error,
                "pitch run failed"
            );
            self.emit(
                &track.audit,
                "run.failed",
                AuditCategory::Run,
                AuditOutcome::Failed,
                [("error", error.to_string()), ("tools_used", track.tools_used.join(","))],
            );
            return Err(error);
        }

        let pitch = ResultFormatter::extract(plan.generator_tool, &track.results);
        if pitch == NO_PITCH_SENTINEL {
            track.degraded = true;
        }
        self.emit(
            &track.audit,
            "result.formatted",
            AuditCategory::Formatting,
            AuditOutcome::Success,
            [
                ("generator", plan.generator_tool.to_string()),
                ("output_chars", pitch.chars().count().to_string()),
            ],
        );
        self.advance(&mut track, FlowEvent::ResultFormatted)?;
        self.advance(&mut track, FlowEvent::RunCompleted)?;

        let execution_status =
            if track.degraded { ExecutionStatus::Degraded } else { ExecutionStatus::Success };
        let duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        let envelope = RunEnvelope {
            agent_id: self.agent_id(),
            mode: plan.mode,
            task: task.to_string(),
            final_output: pitch.clone(),
            tools_used: track.tools_used.clone(),
            execution_status,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        };

        self.emit(
            &track.audit,
            "run.completed",
            AuditCategory::Run,
            match execution_status {
                ExecutionStatus::Success => AuditOutcome::Success,
                ExecutionStatus::Degraded => AuditOutcome::Degraded,
            },
            [
                ("tools_used", track.tools_used.join(",")),
                ("output_length", pitch.chars().count().to_string()),
                ("status", "success".to_string()),
                ("duration_ms", duration_ms.to_string()),
            ],
        );
        tracing::info!(
            event_name = "agent.run.completed",
            run_id = %run_id,
            mode = %plan.mode,
            duration_ms,
            degraded = track.degraded,
            "pitch run completed"
        );

        Ok(RunReport {
            run_id,
            pitch,
            tools_used: track.tools_used,
            results: track.results,
            states: track.states,
            envelope,
        })
    }

    /// Never fails on tool errors: any failure degrades to an empty context.
    async fn context_phase(
        &self,
        plan: &PipelinePlan,
        track: &mut RunTrack,
    ) -> Result<String, RunError> {
        let outcome = match self.registry.get_implementation(plan.context_tool) {
            None => Err(format!("tool `{}` is not registered", plan.context_tool)),
            Some(constructor) => {
                let tool = constructor();
                track.tools_used.push(plan.context_tool.to_string());
                let request = ContextRequest { limit: plan.context_limit };
                let mode = plan.mode;
                self.invoke(
                    &track.audit,
                    plan.context_tool,
                    format!("limit={}", plan.context_limit),
                    tool.fetch_context(request),
                    |output| render_context(mode, &output.items),
                )
                .await
                .map(|output| render_context(mode, &output.items))
                .map_err(|failure| failure.describe())
            }
        };

        let (context, event) = match outcome {
            Ok(context) => (context, FlowEvent::ContextSucceeded),
            Err(reason) => {
                tracing::warn!(
                    event_name = "agent.context.degraded",
                    run_id = %track.audit.run_id,
                    tool = plan.context_tool,
                    reason = %reason,
                    "context provider failed; continuing with empty context"
                );
                track.degraded = true;
                (String::new(), FlowEvent::ContextFailed)
            }
        };

        track.results.push(ToolInvocationResult::text(plan.context_tool, context.clone()));
        self.advance(track, event)?;
        Ok(context)
    }

    async fn generation_phase(
        &self,
        plan: &PipelinePlan,
        request: &PitchRequest,
        context: String,
        track: &mut RunTrack,
    ) -> Result<(), RunError> {
        let Some(constructor) = self.registry.get_implementation(plan.generator_tool) else {
            tracing::warn!(
                event_name = "agent.generator.missing",
                run_id = %track.audit.run_id,
                tool = plan.generator_tool,
                "generator is not registered; no pitch will be produced"
            );
            return self.advance(track, FlowEvent::GeneratorUnavailable);
        };

        let tool = constructor();
        track.tools_used.push(plan.generator_tool.to_string());
        let input_preview = format!(
            "industry={} audience={} keyword={} {}={}",
            request.industry, request.audience, request.keyword, plan.context_param, context
        );
        let generator_request = GeneratorRequest {
            industry: request.industry.clone(),
            audience: request.audience.clone(),
            keyword: request.keyword.clone(),
            context,
        };

        let invoked = self
            .invoke(
                &track.audit,
                plan.generator_tool,
                input_preview,
                tool.generate(generator_request),
                |output| output.pitch.clone(),
            )
            .await;

        match invoked {
            Ok(output) => {
                track
                    .results
                    .push(ToolInvocationResult::record(plan.generator_tool, output.to_record()));
                self.advance(track, FlowEvent::GeneratorSucceeded)
            }
            Err(failure) => {
                self.advance(track, FlowEvent::GeneratorFailed)?;
                Err(match failure {
                    InvokeFailure::Tool(source) => {
                        RunError::Generator { tool: plan.generator_tool.to_string(), source }
                    }
                    InvokeFailure::TimedOut(secs) => {
                        RunError::Timeout { tool: plan.generator_tool.to_string(), secs }
                    }
                })
            }
        }
    }

    /// The single instrumentation point around every tool call: bounds it by
    /// the configured timeout and reports a `tool.invoked` event.
    async fn invoke<T, Fut>(
        &self,
        audit: &AuditContext,
        tool_name: &str,
        input_preview: String,
        call: Fut,
        describe_output: impl FnOnce(&T) -> String,
    ) -> Result<T, InvokeFailure>
    where
        Fut: Future<Output = Result<T, ToolError>>,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.settings.tool_timeout, call).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(error)) => Err(InvokeFailure::Tool(error)),
            Err(_elapsed) => Err(InvokeFailure::TimedOut(self.settings.tool_timeout.as_secs())),
        };
        let elapsed_ms = started.elapsed().as_millis().to_string();

        let (outcome, output_preview) = match &result {
            Ok(output) => (AuditOutcome::Success, preview(&describe_output(output))),
            Err(failure) => (AuditOutcome::Failed, preview(&failure.describe())),
        };
        tracing::debug!(
            event_name = "agent.tool.invoked",
            run_id = %audit.run_id,
            tool = tool_name,
            outcome = outcome.as_str(),
            elapsed_ms = %elapsed_ms,
            "tool invocation finished"
        );
        self.emit(
            audit,
            "tool.invoked",
            AuditCategory::Tool,
            outcome,
            [
                ("tool", tool_name.to_string()),
                ("input_preview", preview(&input_preview)),
                ("output_preview", output_preview),
                ("elapsed_ms", elapsed_ms),
            ],
        );
        result
    }

    fn advance(&self, track: &mut RunTrack, event: FlowEvent) -> Result<(), RunError> {
        let outcome =
            self.flow.apply_with_audit(&track.state, &event, self.sink.as_ref(), &track.audit)?;
        track.state = outcome.to;
        track.states.push(outcome.to);
        Ok(())
    }

    fn emit<const N: usize>(
        &self,
        audit: &AuditContext,
        event_type: &str,
        category: AuditCategory,
        outcome: AuditOutcome,
        metadata: [(&str, String); N],
    ) {
        let actor = audit.actor.clone();
        let initial = AuditEvent::new(audit.run_id.clone(), event_type, category, actor, outcome);
        let event = metadata
            .into_iter()
            .fold(initial, |event, (key, value)| event.with_metadata(key, value));
        emit_or_warn(self.sink.as_ref(), event);
    }
}
