//! Tool contracts shared by the registry, the concrete tools and the runtime.
//!
//! Tools come in two categories with their own typed request and output:
//! context providers turn a feed into [`ContextItem`]s, generators turn the
//! user's inputs plus a context string into a [`PitchOutput`].

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use pitchcraft_core::domain::mode::Mode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ToolError;
use crate::llm::TokenUsage;

pub mod hackernews;
pub mod news_api;
pub mod registry;
pub mod startup_simulator;

pub use hackernews::HackerNewsTool;
pub use news_api::NewsApiTool;
pub use registry::{default_registry, ToolConstructor, ToolRegistration, ToolRegistry};
pub use startup_simulator::{StartupSimulator, MAX_PITCH_CHARS};

pub const HACKERNEWS_TOOL: &str = "hackernews_tool";
pub const NEWS_API_TOOL: &str = "news_api_tool";
pub const STARTUP_SIMULATOR: &str = "startup_simulator";
pub const SERIOUS_STARTUP_SIMULATOR: &str = "serious_startup_simulator";

pub const MAX_CONTEXT_LIMIT: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    ContextProvider,
    Generator,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContextProvider => "context_provider",
            Self::Generator => "generator",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub input_schema: Value,
    pub output_schema: Value,
    pub category: ToolCategory,
}

impl ToolMetadata {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: BTreeSet::new(),
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            category,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_schemas(mut self, input_schema: Value, output_schema: Value) -> Self {
        self.input_schema = input_schema;
        self.output_schema = output_schema;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRequest {
    pub limit: u32,
}

impl ContextRequest {
    pub fn validate(&self) -> Result<(), ToolError> {
        if self.limit == 0 || self.limit > MAX_CONTEXT_LIMIT {
            return Err(ToolError::InvalidInput(format!(
                "limit must be in range 1..={MAX_CONTEXT_LIMIT}, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextItem {
    pub title: String,
    pub source: Option<String>,
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOutput {
    pub items: Vec<ContextItem>,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorRequest {
    pub industry: String,
    pub audience: String,
    pub keyword: String,
    pub context: String,
}

impl GeneratorRequest {
    pub fn validate(&self) -> Result<(), ToolError> {
        for (field, value) in
            [("industry", &self.industry), ("audience", &self.audience), ("keyword", &self.keyword)]
        {
            if value.trim().is_empty() {
                return Err(ToolError::InvalidInput(format!("`{field}` must not be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchOutput {
    pub pitch: String,
    pub character_count: usize,
    pub mode: Mode,
    pub context_used: bool,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

impl PitchOutput {
    /// Structured form recorded in the run's invocation results.
    pub fn to_record(&self) -> Value {
        json!({
            "pitch": self.pitch,
            "character_count": self.character_count,
            "mode": self.mode.as_str(),
            "context_used": self.context_used,
            "model": self.model,
            "usage": self.usage,
        })
    }
}

#[async_trait]
pub trait ContextProviderTool: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self, request: ContextRequest) -> Result<ContextOutput, ToolError>;
}

#[async_trait]
pub trait GeneratorTool: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: GeneratorRequest) -> Result<PitchOutput, ToolError>;
}

pub enum ToolInstance {
    Context(Box<dyn ContextProviderTool>),
    Generator(Box<dyn GeneratorTool>),
}

impl ToolInstance {
    pub fn name(&self) -> &str {
        match self {
            Self::Context(tool) => tool.name(),
            Self::Generator(tool) => tool.name(),
        }
    }

    pub fn category(&self) -> ToolCategory {
        match self {
            Self::Context(_) => ToolCategory::ContextProvider,
            Self::Generator(_) => ToolCategory::Generator,
        }
    }

    /// Validates `request`, then runs the tool as a context provider.
    pub async fn fetch_context(
        &self,
        request: ContextRequest,
    ) -> Result<ContextOutput, ToolError> {
        match self {
            Self::Context(tool) => {
                request.validate()?;
                tool.fetch(request).await
            }
            Self::Generator(tool) => Err(ToolError::CategoryMismatch {
                tool: tool.name().to_string(),
                expected: ToolCategory::ContextProvider,
            }),
        }
    }

    /// Validates `request`, then runs the tool as a generator.
    pub async fn generate(&self, request: GeneratorRequest) -> Result<PitchOutput, ToolError> {
        match self {
            Self::Generator(tool) => {
                request.validate()?;
                tool.generate(request).await
            }
            Self::Context(tool) => Err(ToolError::CategoryMismatch {
                tool: tool.name().to_string(),
                expected: ToolCategory::Generator,
            }),
        }
    }
}

/// Sends `request` and decodes a JSON body, mapping every failure to a
/// [`ToolError`] that names `url`.
pub(crate) async fn send_json<T>(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<T, ToolError>
where
    T: DeserializeOwned,
{
    let response = request
        .send()
        .await
        .map_err(|error| ToolError::Http { url: url.to_string(), message: error.to_string() })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ToolError::Status { url: url.to_string(), status: status.as_u16() });
    }

    response
        .json::<T>()
        .await
        .map_err(|error| ToolError::Decode { url: url.to_string(), message: error.to_string() })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{
        ContextOutput, ContextProviderTool, ContextRequest, GeneratorRequest, ToolCategory,
        ToolInstance,
    };
    use crate::errors::ToolError;

    struct EmptyFeed;

    #[async_trait]
    impl ContextProviderTool for EmptyFeed {
        fn name(&self) -> &str {
            "empty_feed"
        }

        async fn fetch(&self, _request: ContextRequest) -> Result<ContextOutput, ToolError> {
            Ok(ContextOutput { items: Vec::new(), source: "empty".to_string() })
        }
    }

    fn generator_request(keyword: &str) -> GeneratorRequest {
        GeneratorRequest {
            industry: "tech".to_string(),
            audience: "students".to_string(),
            keyword: keyword.to_string(),
            context: String::new(),
        }
    }

    #[test]
    fn context_limit_must_be_within_range() {
        assert!(ContextRequest { limit: 3 }.validate().is_ok());
        assert!(matches!(
            ContextRequest { limit: 0 }.validate(),
            Err(ToolError::InvalidInput(_))
        ));
        assert!(matches!(
            ContextRequest { limit: 51 }.validate(),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn generator_request_rejects_blank_keyword_but_allows_empty_context() {
        assert!(generator_request("cloud").validate().is_ok());
        let error = generator_request("  ").validate().expect_err("blank keyword");
        assert!(error.to_string().contains("keyword"));
    }

    #[tokio::test]
    async fn calling_a_context_tool_as_generator_is_a_category_mismatch() {
        let instance = ToolInstance::Context(Box::new(EmptyFeed));
        assert_eq!(instance.category(), ToolCategory::ContextProvider);

        let error = instance.generate(generator_request("cloud")).await.expect_err("mismatch");
        assert_eq!(
            error,
            ToolError::CategoryMismatch {
                tool: "empty_feed".to_string(),
                expected: ToolCategory::Generator,
            }
        );
    }

    #[tokio::test]
    async fn invalid_limit_is_rejected_before_the_tool_runs() {
        let instance = ToolInstance::Context(Box::new(EmptyFeed));
        let error = instance.fetch_context(ContextRequest { limit: 0 }).await.expect_err("limit");
        assert!(matches!(error, ToolError::InvalidInput(_)));
    }
}
