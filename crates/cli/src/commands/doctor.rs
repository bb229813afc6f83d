use std::sync::Arc;

use pitchcraft_agent::llm::OpenAiCompatibleClient;
use pitchcraft_agent::pipeline::ModePipeline;
use pitchcraft_agent::runtime::AgentSettings;
use pitchcraft_agent::tools::default_registry;
use pitchcraft_core::config::{AppConfig, LlmProvider, LoadOptions};
use pitchcraft_core::domain::mode::Mode;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::{escape_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => build_report(Ok(&config)),
        Err(error) => build_report(Err(error.to_string())),
    };
    render(&report, json_output)
}

pub fn run_with_config(config: &AppConfig, json_output: bool) -> CommandResult {
    render(&build_report(Ok(config)), json_output)
}

fn render(report: &DoctorReport, json_output: bool) -> CommandResult {
    let exit_code = if report.overall_status == CheckStatus::Fail { 6 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(report)
    };

    CommandResult { exit_code, output }
}

fn build_report(config: Result<&AppConfig, String>) -> DoctorReport {
    let mut checks = Vec::new();

    match config {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_credentials(config));
            checks.push(check_news_credentials(config));
            checks.push(check_registry(config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error,
            });
            for name in ["llm_credentials", "news_credentials", "tool_registry"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = match (failed, warned) {
        (true, _) => (CheckStatus::Fail, "doctor: one or more readiness checks failed"),
        (false, true) => (CheckStatus::Warn, "doctor: ready with warnings"),
        (false, false) => (CheckStatus::Pass, "doctor: all readiness checks passed"),
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let has_key =
        config.llm.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty());

    let (status, details) = match (config.llm.provider, has_key) {
        (LlmProvider::OpenAi, true) => {
            (CheckStatus::Pass, format!("api key configured for model `{}`", config.llm.model))
        }
        (LlmProvider::OpenAi, false) => {
            (CheckStatus::Fail, "openai provider selected but no api key is set".to_string())
        }
        (LlmProvider::Ollama, _) => (
            CheckStatus::Pass,
            format!("ollama at {} needs no api key", config.llm.base_url),
        ),
    };
    DoctorCheck { name: "llm_credentials", status, details }
}

/// Missing news credentials only cost serious mode its context.
fn check_news_credentials(config: &AppConfig) -> DoctorCheck {
    let has_key = config
        .feeds
        .news_api_key
        .as_ref()
        .is_some_and(|key| !key.expose_secret().trim().is_empty());

    if has_key {
        DoctorCheck {
            name: "news_credentials",
            status: CheckStatus::Pass,
            details: "news api key configured".to_string(),
        }
    } else {
        DoctorCheck {
            name: "news_credentials",
            status: CheckStatus::Warn,
            details: "NEWS_API_KEY is not set; serious mode will run without news context"
                .to_string(),
        }
    }
}

fn check_registry(config: &AppConfig) -> DoctorCheck {
    let llm = match OpenAiCompatibleClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck {
                name: "tool_registry",
                status: CheckStatus::Fail,
                details: format!("llm client could not be built: {error}"),
            }
        }
    };

    let registry =
        default_registry(&AgentSettings::from_config(config, config.agent.mode), Arc::new(llm));
    let pipeline =
        ModePipeline::new(config.agent.silly_story_limit, config.agent.serious_article_limit);

    let missing: Vec<String> = Mode::ALL
        .into_iter()
        .flat_map(|mode| {
            let plan = pipeline.plan(mode);
            [plan.context_tool, plan.generator_tool]
        })
        .filter(|name| registry.get_implementation(name).is_none())
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        DoctorCheck {
            name: "tool_registry",
            status: CheckStatus::Pass,
            details: format!("{} tools registered for every mode", registry.len()),
        }
    } else {
        DoctorCheck {
            name: "tool_registry",
            status: CheckStatus::Fail,
            details: format!("unregistered tools: {}", missing.join(", ")),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
