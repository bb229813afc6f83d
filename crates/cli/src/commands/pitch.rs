use std::sync::Arc;

use pitchcraft_agent::llm::OpenAiCompatibleClient;
use pitchcraft_agent::runtime::{AgentRuntime, AgentSettings};
use pitchcraft_core::audit::TracingAuditSink;
use pitchcraft_core::config::{AppConfig, LoadOptions};
use pitchcraft_core::domain::mode::Mode;
use pitchcraft_core::domain::pitch::PitchRequest;
use pitchcraft_core::errors::ApplicationError;

use crate::commands::CommandResult;

const COMMAND: &str = "pitch";

#[derive(Clone, Debug, Default)]
pub struct PitchArgs {
    pub industry: String,
    pub audience: String,
    pub word: String,
    pub mode: Option<String>,
    pub json: bool,
}

pub fn run(args: PitchArgs) -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => run_with_config(config, args),
        Err(error) => CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2),
    }
}

/// Runs one pipeline on a private current-thread runtime and prints either the
/// pitch or the run envelope.
pub fn run_with_config(config: AppConfig, args: PitchArgs) -> CommandResult {
    let mode = match args.mode.as_deref().map(str::parse::<Mode>).transpose() {
        Ok(mode) => mode.unwrap_or(config.agent.mode),
        Err(error) => return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), 3),
    };

    let request = match PitchRequest::new(&args.industry, &args.audience, &args.word) {
        Ok(request) => request,
        Err(error) => return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), 3),
    };

    let llm = match OpenAiCompatibleClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => return CommandResult::failure(COMMAND, "llm_client", error.to_string(), 4),
    };
    let agent = AgentRuntime::new(
        AgentSettings::from_config(&config, mode),
        Arc::new(llm),
        Arc::new(TracingAuditSink),
    );

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                4,
            )
        }
    };

    let task = request.task_description(mode);
    let outcome = runtime.block_on(agent.execute(
        &task,
        &request.industry,
        &request.audience,
        &request.keyword,
    ));

    let report = match outcome {
        Ok(report) => report,
        Err(error) => {
            let interface = ApplicationError::from(error.clone()).into_interface(COMMAND);
            return CommandResult::failure(
                COMMAND,
                "run_failed",
                format!("{} ({error})", interface.user_message()),
                5,
            );
        }
    };
    tracing::debug!(
        event_name = "cli.pitch.completed",
        run_id = %report.run_id,
        mode = %mode,
        "pitch run completed"
    );

    if !args.json {
        return CommandResult::printed(report.pitch);
    }
    match serde_json::to_string_pretty(&report.envelope) {
        Ok(rendered) => CommandResult::printed(rendered),
        Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 5),
    }
}
