use std::sync::Arc;

use pitchcraft_agent::llm::OpenAiCompatibleClient;
use pitchcraft_agent::pipeline::ModePipeline;
use pitchcraft_agent::runtime::AgentSettings;
use pitchcraft_agent::tools::{default_registry, ToolMetadata};
use pitchcraft_core::config::{AppConfig, LoadOptions};
use pitchcraft_core::domain::mode::Mode;
use serde::Serialize;

use crate::commands::CommandResult;

const COMMAND: &str = "tools";

#[derive(Debug, Serialize)]
struct ToolsReport<'a> {
    pipelines: Vec<PipelineLine>,
    tools: Vec<&'a ToolMetadata>,
}

#[derive(Debug, Serialize)]
struct PipelineLine {
    mode: Mode,
    context_tool: &'static str,
    generator_tool: &'static str,
    context_limit: u32,
}

pub fn run(mode: Option<&str>, json_output: bool) -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => run_with_config(&config, mode, json_output),
        Err(error) => CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2),
    }
}

/// Lists the registered tools. With a mode, only that mode's pipeline and its
/// two tools are shown.
pub fn run_with_config(config: &AppConfig, mode: Option<&str>, json_output: bool) -> CommandResult {
    let modes: Vec<Mode> = match mode.map(str::parse::<Mode>).transpose() {
        Ok(Some(mode)) => vec![mode],
        Ok(None) => Mode::ALL.to_vec(),
        Err(error) => return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), 3),
    };

    let llm = match OpenAiCompatibleClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => return CommandResult::failure(COMMAND, "llm_client", error.to_string(), 4),
    };
    let settings = AgentSettings::from_config(config, config.agent.mode);
    let registry = default_registry(&settings, Arc::new(llm));
    let pipeline =
        ModePipeline::new(config.agent.silly_story_limit, config.agent.serious_article_limit);

    let pipelines: Vec<PipelineLine> = modes
        .iter()
        .map(|mode| {
            let plan = pipeline.plan(*mode);
            PipelineLine {
                mode: plan.mode,
                context_tool: plan.context_tool,
                generator_tool: plan.generator_tool,
                context_limit: plan.context_limit,
            }
        })
        .collect();

    let tools: Vec<&ToolMetadata> = registry
        .list_names()
        .iter()
        .filter(|name| {
            mode.is_none()
                || pipelines.iter().any(|line| {
                    line.context_tool == name.as_str() || line.generator_tool == name.as_str()
                })
        })
        .filter_map(|name| registry.metadata(name))
        .collect();

    if json_output {
        let report = ToolsReport { pipelines, tools };
        return match serde_json::to_string_pretty(&report) {
            Ok(rendered) => CommandResult::printed(rendered),
            Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 4),
        };
    }

    let mut lines = Vec::new();
    for line in &pipelines {
        lines.push(format!(
            "pipeline ({}): {} -> {} (limit {})",
            line.mode, line.context_tool, line.generator_tool, line.context_limit
        ));
    }
    lines.push(format!("registered tools ({}):", tools.len()));
    for tool in tools {
        let tags: Vec<&str> = tool.tags.iter().map(String::as_str).collect();
        lines.push(format!(
            "- {} [{}] {} (tags: {})",
            tool.name,
            tool.category,
            tool.description,
            tags.join(", ")
        ));
    }

    CommandResult::printed(lines.join("\n"))
}
