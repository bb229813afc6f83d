use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::mode::Mode;

pub const DEFAULT_CONFIG_FILE: &str = "pitchcraft.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub feeds: FeedsConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct FeedsConfig {
    pub hackernews_base_url: String,
    pub news_api_base_url: String,
    pub news_api_key: Option<SecretString>,
    pub news_category: String,
    pub news_country: String,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub mode: Mode,
    pub silly_story_limit: u32,
    pub serious_article_limit: u32,
    pub tool_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub mode: Option<Mode>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: "https://api.openai.com".to_string(),
                model: "gpt-4".to_string(),
                temperature: 0.7,
                timeout_secs: 30,
            },
            feeds: FeedsConfig {
                hackernews_base_url: "https://hacker-news.firebaseio.com".to_string(),
                news_api_base_url: "https://newsapi.org".to_string(),
                news_api_key: None,
                news_category: "business".to_string(),
                news_country: "us".to_string(),
            },
            agent: AgentConfig {
                mode: Mode::Silly,
                silly_story_limit: 3,
                serious_article_limit: 5,
                tool_timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 2021,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Story or article count handed to the context provider of `mode`.
    pub fn context_limit(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Silly => self.agent.silly_story_limit,
            Mode::Serious => self.agent.serious_article_limit,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(feeds) = patch.feeds {
            if let Some(hackernews_base_url) = feeds.hackernews_base_url {
                self.feeds.hackernews_base_url = hackernews_base_url;
            }
            if let Some(news_api_base_url) = feeds.news_api_base_url {
                self.feeds.news_api_base_url = news_api_base_url;
            }
            if let Some(news_api_key) = feeds.news_api_key {
                self.feeds.news_api_key = Some(secret_value(news_api_key));
            }
            if let Some(news_category) = feeds.news_category {
                self.feeds.news_category = news_category;
            }
            if let Some(news_country) = feeds.news_country {
                self.feeds.news_country = news_country;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(mode) = agent.mode {
                self.agent.mode = mode;
            }
            if let Some(silly_story_limit) = agent.silly_story_limit {
                self.agent.silly_story_limit = silly_story_limit;
            }
            if let Some(serious_article_limit) = agent.serious_article_limit {
                self.agent.serious_article_limit = serious_article_limit;
            }
            if let Some(tool_timeout_secs) = agent.tool_timeout_secs {
                self.agent.tool_timeout_secs = tool_timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PITCHCRAFT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let llm_api_key =
            read_env("PITCHCRAFT_LLM_API_KEY").or_else(|| read_env("OPENAI_API_KEY"));
        if let Some(value) = llm_api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PITCHCRAFT_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("PITCHCRAFT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("PITCHCRAFT_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("PITCHCRAFT_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("PITCHCRAFT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("PITCHCRAFT_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PITCHCRAFT_FEEDS_HACKERNEWS_BASE_URL") {
            self.feeds.hackernews_base_url = value;
        }
        if let Some(value) = read_env("PITCHCRAFT_FEEDS_NEWS_API_BASE_URL") {
            self.feeds.news_api_base_url = value;
        }
        let news_api_key =
            read_env("PITCHCRAFT_NEWS_API_KEY").or_else(|| read_env("NEWS_API_KEY"));
        if let Some(value) = news_api_key {
            self.feeds.news_api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PITCHCRAFT_FEEDS_NEWS_CATEGORY") {
            self.feeds.news_category = value;
        }
        if let Some(value) = read_env("PITCHCRAFT_FEEDS_NEWS_COUNTRY") {
            self.feeds.news_country = value;
        }

        if let Some(value) = read_env("PITCHCRAFT_AGENT_MODE") {
            self.agent.mode = value.parse::<Mode>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "PITCHCRAFT_AGENT_MODE".to_string(),
                value,
            })?;
        }
        if let Some(value) = read_env("PITCHCRAFT_AGENT_SILLY_STORY_LIMIT") {
            self.agent.silly_story_limit =
                parse_u32("PITCHCRAFT_AGENT_SILLY_STORY_LIMIT", &value)?;
        }
        if let Some(value) = read_env("PITCHCRAFT_AGENT_SERIOUS_ARTICLE_LIMIT") {
            self.agent.serious_article_limit =
                parse_u32("PITCHCRAFT_AGENT_SERIOUS_ARTICLE_LIMIT", &value)?;
        }
        if let Some(value) = read_env("PITCHCRAFT_AGENT_TOOL_TIMEOUT_SECS") {
            self.agent.tool_timeout_secs =
                parse_u64("PITCHCRAFT_AGENT_TOOL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PITCHCRAFT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PITCHCRAFT_SERVER_PORT") {
            self.server.port = parse_u16("PITCHCRAFT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PITCHCRAFT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PITCHCRAFT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("PITCHCRAFT_LOGGING_LEVEL").or_else(|| read_env("PITCHCRAFT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PITCHCRAFT_LOGGING_FORMAT").or_else(|| read_env("PITCHCRAFT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(mode) = overrides.mode {
            self.agent.mode = mode;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_feeds(&self.feeds)?;
        validate_agent(&self.agent)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if !is_http_url(&llm.base_url) {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.provider == LlmProvider::OpenAi {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for the openai provider. Set PITCHCRAFT_LLM_API_KEY or OPENAI_API_KEY, or switch llm.provider to ollama".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_feeds(feeds: &FeedsConfig) -> Result<(), ConfigError> {
    if !is_http_url(&feeds.hackernews_base_url) {
        return Err(ConfigError::Validation(
            "feeds.hackernews_base_url must start with http:// or https://".to_string(),
        ));
    }
    if !is_http_url(&feeds.news_api_base_url) {
        return Err(ConfigError::Validation(
            "feeds.news_api_base_url must start with http:// or https://".to_string(),
        ));
    }
    if feeds.news_category.trim().is_empty() || feeds.news_country.trim().is_empty() {
        return Err(ConfigError::Validation(
            "feeds.news_category and feeds.news_country must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    for (key, limit) in [
        ("agent.silly_story_limit", agent.silly_story_limit),
        ("agent.serious_article_limit", agent.serious_article_limit),
    ] {
        if limit == 0 || limit > 50 {
            return Err(ConfigError::Validation(format!("{key} must be in range 1..=50")));
        }
    }

    if agent.tool_timeout_secs == 0 || agent.tool_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "agent.tool_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    feeds: Option<FeedsPatch>,
    agent: Option<AgentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FeedsPatch {
    hackernews_base_url: Option<String>,
    news_api_base_url: Option<String>,
    news_api_key: Option<String>,
    news_category: Option<String>,
    news_country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    mode: Option<Mode>,
    silly_story_limit: Option<u32>,
    serious_article_limit: Option<u32>,
    tool_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
    use crate::domain::mode::Mode;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const MANAGED_VARS: &[&str] = &[
        "OPENAI_API_KEY",
        "NEWS_API_KEY",
        "PITCHCRAFT_LLM_API_KEY",
        "PITCHCRAFT_LLM_PROVIDER",
        "PITCHCRAFT_LLM_TEMPERATURE",
        "PITCHCRAFT_NEWS_API_KEY",
        "PITCHCRAFT_AGENT_MODE",
        "PITCHCRAFT_SERVER_PORT",
        "PITCHCRAFT_LOG_LEVEL",
        "PITCHCRAFT_LOG_FORMAT",
        "TEST_PITCHCRAFT_LLM_KEY",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_documented_values() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("OPENAI_API_KEY", "sk-default-test");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.model == "gpt-4", "default model should be gpt-4")?;
            ensure((config.llm.temperature - 0.7).abs() < f32::EPSILON, "temperature 0.7")?;
            ensure(config.agent.mode == Mode::Silly, "default mode should be silly")?;
            ensure(config.context_limit(Mode::Silly) == 3, "silly pulls three stories")?;
            ensure(config.context_limit(Mode::Serious) == 5, "serious pulls five articles")?;
            ensure(config.server.port == 2021, "default port should be 2021")?;
            ensure(
                config.feeds.hackernews_base_url == "https://hacker-news.firebaseio.com",
                "hackernews base url default",
            )?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("TEST_PITCHCRAFT_LLM_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pitchcraft.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_PITCHCRAFT_LLM_KEY}"
model = "gpt-4o-mini"

[agent]
mode = "serious"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )?;
            ensure(config.llm.model == "gpt-4o-mini", "model should come from the file")?;
            ensure(config.agent.mode == Mode::Serious, "mode should come from the file")?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("PITCHCRAFT_LLM_API_KEY", "sk-from-env");
        env::set_var("PITCHCRAFT_SERVER_PORT", "3030");
        env::set_var("PITCHCRAFT_LOG_LEVEL", "warn");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pitchcraft.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "sk-from-file"

[server]
port = 4040

[logging]
level = "error"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    mode: Some(Mode::Serious),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(config.agent.mode == Mode::Serious, "override mode should win")?;
            ensure(config.server.port == 3030, "env port should win over file")?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "env api key should win over file",
            )?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn provider_key_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("OPENAI_API_KEY", "sk-alias");
        env::set_var("NEWS_API_KEY", "news-alias");
        env::set_var("PITCHCRAFT_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.feeds.news_api_key.as_ref().map(|key| key.expose_secret() == "news-alias")
                    == Some(true),
                "NEWS_API_KEY alias should populate the news key",
            )?;
            ensure(matches!(config.logging.format, LogFormat::Json), "json log format from env")?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn ollama_provider_does_not_need_api_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("PITCHCRAFT_LLM_PROVIDER", "ollama");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    llm_base_url: Some("http://localhost:11434".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.provider == LlmProvider::Ollama, "provider should be ollama")?;
            ensure(config.llm.api_key.is_none(), "no api key expected")?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn invalid_numeric_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("PITCHCRAFT_LLM_TEMPERATURE", "warm");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "PITCHCRAFT_LLM_TEMPERATURE"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn unknown_mode_in_env_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("PITCHCRAFT_AGENT_MODE", "zany");

        let result = (|| -> Result<(), String> {
            ensure(
                matches!(
                    AppConfig::load(LoadOptions::default()),
                    Err(ConfigError::InvalidEnvOverride { .. })
                ),
                "unknown mode should be an invalid override",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("OPENAI_API_KEY", "sk-secret-value");
        env::set_var("NEWS_API_KEY", "news-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output leaked the llm key")?;
            ensure(!debug.contains("news-secret-value"), "debug output leaked the news key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }
}
