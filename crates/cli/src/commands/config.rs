use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pitchcraft_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct SourceLookup {
    file_doc: Option<Value>,
    file_path: Option<PathBuf>,
}

impl SourceLookup {
    fn detect() -> Self {
        let file_path = detect_config_path();
        let file_doc = load_config_file_doc(file_path.as_deref());
        Self { file_doc, file_path }
    }

    /// The first matching env var wins, then the config file, then defaults.
    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => render(&config, &SourceLookup::detect()),
        Err(error) => format!("config validation failed: {error}"),
    }
}

fn render(config: &AppConfig, lookup: &SourceLookup) -> String {
    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: String, env_keys: &[&str]| {
        lines.push(render_line(key, &value, lookup.source(key, env_keys)));
    };

    push("llm.provider", config.llm.provider.as_str().to_string(), &["PITCHCRAFT_LLM_PROVIDER"]);
    push(
        "llm.api_key",
        redact_secret(config.llm.api_key.as_ref()),
        &["PITCHCRAFT_LLM_API_KEY", "OPENAI_API_KEY"],
    );
    push("llm.base_url", config.llm.base_url.clone(), &["PITCHCRAFT_LLM_BASE_URL"]);
    push("llm.model", config.llm.model.clone(), &["PITCHCRAFT_LLM_MODEL"]);
    push("llm.temperature", config.llm.temperature.to_string(), &["PITCHCRAFT_LLM_TEMPERATURE"]);
    push(
        "llm.timeout_secs",
        config.llm.timeout_secs.to_string(),
        &["PITCHCRAFT_LLM_TIMEOUT_SECS"],
    );

    push(
        "feeds.hackernews_base_url",
        config.feeds.hackernews_base_url.clone(),
        &["PITCHCRAFT_FEEDS_HACKERNEWS_BASE_URL"],
    );
    push(
        "feeds.news_api_base_url",
        config.feeds.news_api_base_url.clone(),
        &["PITCHCRAFT_FEEDS_NEWS_API_BASE_URL"],
    );
    push(
        "feeds.news_api_key",
        redact_secret(config.feeds.news_api_key.as_ref()),
        &["PITCHCRAFT_NEWS_API_KEY", "NEWS_API_KEY"],
    );
    push(
        "feeds.news_category",
        config.feeds.news_category.clone(),
        &["PITCHCRAFT_FEEDS_NEWS_CATEGORY"],
    );
    push(
        "feeds.news_country",
        config.feeds.news_country.clone(),
        &["PITCHCRAFT_FEEDS_NEWS_COUNTRY"],
    );

    push("agent.mode", config.agent.mode.to_string(), &["PITCHCRAFT_AGENT_MODE"]);
    push(
        "agent.silly_story_limit",
        config.agent.silly_story_limit.to_string(),
        &["PITCHCRAFT_AGENT_SILLY_STORY_LIMIT"],
    );
    push(
        "agent.serious_article_limit",
        config.agent.serious_article_limit.to_string(),
        &["PITCHCRAFT_AGENT_SERIOUS_ARTICLE_LIMIT"],
    );
    push(
        "agent.tool_timeout_secs",
        config.agent.tool_timeout_secs.to_string(),
        &["PITCHCRAFT_AGENT_TOOL_TIMEOUT_SECS"],
    );

    push(
        "server.bind_address",
        config.server.bind_address.clone(),
        &["PITCHCRAFT_SERVER_BIND_ADDRESS"],
    );
    push("server.port", config.server.port.to_string(), &["PITCHCRAFT_SERVER_PORT"]);
    push(
        "server.graceful_shutdown_secs",
        config.server.graceful_shutdown_secs.to_string(),
        &["PITCHCRAFT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    );

    push(
        "logging.level",
        config.logging.level.clone(),
        &["PITCHCRAFT_LOGGING_LEVEL", "PITCHCRAFT_LOG_LEVEL"],
    );
    push(
        "logging.format",
        config.logging.format.as_str().to_string(),
        &["PITCHCRAFT_LOGGING_FORMAT", "PITCHCRAFT_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognisable prefix such as `sk-` and hides the rest.
fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        if prefix.len() <= 4 {
            return format!("{prefix}-***");
        }
    }

    "<redacted>".to_string()
}
