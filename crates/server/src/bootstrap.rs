use std::sync::Arc;

use pitchcraft_agent::llm::{LlmClient, OpenAiCompatibleClient};
use pitchcraft_agent::runtime::{AgentRuntime, AgentSettings};
use pitchcraft_agent::LlmError;
use pitchcraft_core::audit::{AuditSink, TracingAuditSink};
use pitchcraft_core::config::{AppConfig, ConfigError, LoadOptions};
use pitchcraft_core::domain::mode::Mode;
use thiserror::Error;
use tracing::info;

/// One agent per mode. Both are built at startup so that every request only
/// reads shared state.
pub struct ModeAgents {
    silly: AgentRuntime,
    serious: AgentRuntime,
}

impl ModeAgents {
    pub fn new(silly: AgentRuntime, serious: AgentRuntime) -> Self {
        Self { silly, serious }
    }

    pub fn get(&self, mode: Mode) -> &AgentRuntime {
        match mode {
            Mode::Silly => &self.silly,
            Mode::Serious => &self.serious,
        }
    }
}

pub struct Application {
    pub config: AppConfig,
    pub agents: Arc<ModeAgents>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("llm client could not be built: {0}")]
    LlmClient(#[source] LlmError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        llm_provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        default_mode = %config.agent.mode,
        "starting application bootstrap"
    );

    let client =
        OpenAiCompatibleClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?;
    let llm: Arc<dyn LlmClient> = Arc::new(client);
    let sink: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);

    let build = |mode: Mode| {
        AgentRuntime::new(
            AgentSettings::from_config(&config, mode),
            Arc::clone(&llm),
            Arc::clone(&sink),
        )
    };
    let agents = ModeAgents::new(build(Mode::Silly), build(Mode::Serious));

    info!(
        event_name = "system.bootstrap.agents_ready",
        tools = ?agents.get(Mode::Silly).registry().list_names(),
        "agents built for every mode"
    );

    Ok(Application { config, agents: Arc::new(agents) })
}

#[cfg(test)]
mod tests {
    use pitchcraft_core::config::{ConfigOverrides, LlmProvider, LoadOptions};
    use pitchcraft_core::domain::mode::Mode;

    use crate::bootstrap::bootstrap;

    fn options_with(overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions {
            config_path: Some("does-not-exist/pitchcraft.toml".into()),
            overrides,
            ..LoadOptions::default()
        }
    }

    #[test]
    fn bootstrap_builds_one_agent_per_mode() {
        let app = bootstrap(options_with(ConfigOverrides {
            llm_provider: Some(LlmProvider::Ollama),
            llm_base_url: Some("http://127.0.0.1:11434".to_string()),
            mode: Some(Mode::Serious),
            ..ConfigOverrides::default()
        }))
        .expect("bootstrap should succeed without an api key for ollama");

        assert_eq!(app.config.agent.mode, Mode::Serious);
        assert_eq!(app.agents.get(Mode::Silly).agent_id(), "startup-agent-silly");
        assert_eq!(app.agents.get(Mode::Serious).agent_id(), "startup-agent-serious");
        assert_eq!(app.agents.get(Mode::Serious).registry().len(), 4);
    }

    #[test]
    fn bootstrap_fails_fast_with_an_invalid_base_url() {
        let result = bootstrap(options_with(ConfigOverrides {
            llm_provider: Some(LlmProvider::Ollama),
            llm_base_url: Some("localhost:11434".to_string()),
            ..ConfigOverrides::default()
        }));

        let message = result.err().expect("error").to_string();
        assert!(message.contains("llm.base_url"));
    }
}
