use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use pitchcraft_core::domain::mode::Mode;

use crate::llm::LlmClient;
use crate::runtime::AgentSettings;
use crate::tools::{HackerNewsTool, NewsApiTool, StartupSimulator, ToolInstance, ToolMetadata};

/// Builds a fresh tool instance. Called once per run so that per-tool HTTP
/// clients never outlive the run that used them.
pub type ToolConstructor = Arc<dyn Fn() -> ToolInstance + Send + Sync>;

#[derive(Clone)]
pub struct ToolRegistration {
    pub metadata: ToolMetadata,
    pub constructor: ToolConstructor,
}

impl fmt::Debug for ToolRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistration").field("metadata", &self.metadata).finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolRegistration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts under `metadata.name`. A second registration for the same
    /// name replaces the first.
    pub fn register<F>(&mut self, metadata: ToolMetadata, constructor: F)
    where
        F: Fn() -> ToolInstance + Send + Sync + 'static,
    {
        let name = metadata.name.clone();
        let registration = ToolRegistration { metadata, constructor: Arc::new(constructor) };
        if self.tools.insert(name.clone(), registration).is_some() {
            tracing::warn!(
                event_name = "agent.registry.tool_replaced",
                tool = %name,
                "tool registered twice; keeping the latest registration"
            );
        }
    }

    pub fn get_implementation(&self, name: &str) -> Option<ToolConstructor> {
        self.tools.get(name).map(|registration| Arc::clone(&registration.constructor))
    }

    pub fn metadata(&self, name: &str) -> Option<&ToolMetadata> {
        self.tools.get(name).map(|registration| &registration.metadata)
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Registers the four production tools, wired to `settings` and `llm`.
pub fn default_registry(settings: &AgentSettings, llm: Arc<dyn LlmClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    let hackernews_base_url = settings.hackernews_base_url.clone();
    registry.register(HackerNewsTool::metadata(), move || {
        ToolInstance::Context(Box::new(HackerNewsTool::new(hackernews_base_url.clone())))
    });

    let news_base_url = settings.news_api_base_url.clone();
    let news_api_key = settings.news_api_key.clone();
    let news_category = settings.news_category.clone();
    let news_country = settings.news_country.clone();
    registry.register(NewsApiTool::metadata(), move || {
        ToolInstance::Context(Box::new(NewsApiTool::new(
            news_base_url.clone(),
            news_api_key.clone(),
            news_category.clone(),
            news_country.clone(),
        )))
    });

    let silly_llm = Arc::clone(&llm);
    let temperature = settings.temperature;
    registry.register(StartupSimulator::metadata(Mode::Silly), move || {
        let llm = Arc::clone(&silly_llm);
        ToolInstance::Generator(Box::new(StartupSimulator::silly(llm, temperature)))
    });

    registry.register(StartupSimulator::metadata(Mode::Serious), move || {
        ToolInstance::Generator(Box::new(StartupSimulator::serious(Arc::clone(&llm))))
    });

    tracing::debug!(
        event_name = "agent.registry.built",
        tools = ?registry.list_names(),
        "tool registry built"
    );
    registry
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{default_registry, ToolRegistry};
    use crate::errors::{LlmError, ToolError};
    use crate::llm::{Completion, CompletionRequest, LlmClient};
    use crate::runtime::AgentSettings;
    use crate::tools::{
        ContextOutput, ContextProviderTool, ContextRequest, ToolCategory, ToolInstance,
        ToolMetadata, HACKERNEWS_TOOL, NEWS_API_TOOL, SERIOUS_STARTUP_SIMULATOR,
        STARTUP_SIMULATOR,
    };

    struct NamedFeed(&'static str);

    #[async_trait]
    impl ContextProviderTool for NamedFeed {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch(&self, _request: ContextRequest) -> Result<ContextOutput, ToolError> {
            Ok(ContextOutput { items: Vec::new(), source: self.0.to_string() })
        }
    }

    struct UnusedLlm;

    #[async_trait]
    impl LlmClient for UnusedLlm {
        fn model(&self) -> &str {
            "unused"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
            Err(LlmError::EmptyResponse)
        }
    }

    fn feed_metadata(description: &str) -> ToolMetadata {
        ToolMetadata::new("feed", description, ToolCategory::ContextProvider)
    }

    #[test]
    fn lookup_of_unknown_tool_is_none() {
        let registry = ToolRegistry::new();
        assert!(registry.get_implementation("missing").is_none());
        assert!(registry.metadata("missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn re_registration_is_last_write_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(feed_metadata("first"), || {
            ToolInstance::Context(Box::new(NamedFeed("first")))
        });
        registry.register(feed_metadata("second"), || {
            ToolInstance::Context(Box::new(NamedFeed("second")))
        });

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.metadata("feed").map(|meta| meta.description.as_str()), Some("second"));

        let constructor = registry.get_implementation("feed").expect("registered");
        assert_eq!(constructor().name(), "second");
    }

    #[test]
    fn default_registry_lists_all_four_tools_sorted() {
        let registry = default_registry(&AgentSettings::default(), Arc::new(UnusedLlm));

        assert_eq!(
            registry.list_names(),
            vec![
                HACKERNEWS_TOOL.to_string(),
                NEWS_API_TOOL.to_string(),
                SERIOUS_STARTUP_SIMULATOR.to_string(),
                STARTUP_SIMULATOR.to_string(),
            ]
        );

        let generator = registry.metadata(STARTUP_SIMULATOR).expect("silly generator");
        assert_eq!(generator.category, ToolCategory::Generator);
        assert!(generator.tags.contains("fun"));

        let news = registry.get_implementation(NEWS_API_TOOL).expect("news tool");
        assert_eq!(news().category(), ToolCategory::ContextProvider);
    }
}
