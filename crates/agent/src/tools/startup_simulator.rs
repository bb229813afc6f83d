use std::sync::Arc;

use async_trait::async_trait;
use pitchcraft_core::domain::mode::Mode;
use serde_json::json;
use tera::{Context, Tera};

use crate::errors::ToolError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::tools::{
    GeneratorRequest, GeneratorTool, PitchOutput, ToolCategory, ToolMetadata,
    SERIOUS_STARTUP_SIMULATOR, STARTUP_SIMULATOR,
};

pub const MAX_PITCH_CHARS: usize = 500;
pub const SERIOUS_TEMPERATURE: f32 = 0.3;

const SILLY_PROMPT: &str = "Generate a creative and engaging startup pitch for a {{ industry }} \
company targeting {{ audience }}. The pitch must include the word '{{ keyword }}' naturally. \
Make it fun, innovative, and memorable. Keep it under 500 characters total.\
{% if context %}\n\nUse these recent HackerNews stories for inspiration:\n{{ context }}{% endif %}";

const SERIOUS_PROMPT: &str = "Generate a professional startup business plan for a {{ industry }} \
company targeting {{ audience }}. The plan must incorporate the concept '{{ keyword }}' \
naturally. Be formal, avoid humor, and keep it under 500 characters total.\
{% if context %}\n\nUse these recent business news trends for market analysis:\n{{ context }}{% endif %}";

/// Pitch generator. The mode picks the prompt wording, the sampling
/// temperature and the registered tool name.
pub struct StartupSimulator {
    mode: Mode,
    llm: Arc<dyn LlmClient>,
    temperature: f32,
}

impl StartupSimulator {
    pub fn silly(llm: Arc<dyn LlmClient>, temperature: f32) -> Self {
        Self { mode: Mode::Silly, llm, temperature }
    }

    pub fn serious(llm: Arc<dyn LlmClient>) -> Self {
        Self { mode: Mode::Serious, llm, temperature: SERIOUS_TEMPERATURE }
    }

    pub fn tool_name(mode: Mode) -> &'static str {
        match mode {
            Mode::Silly => STARTUP_SIMULATOR,
            Mode::Serious => SERIOUS_STARTUP_SIMULATOR,
        }
    }

    pub fn metadata(mode: Mode) -> ToolMetadata {
        let (description, tags): (&str, &[&str]) = match mode {
            Mode::Silly => (
                "Generates a fun, creative startup pitch inspired by trending tech stories",
                &["startup", "generator", "openai", "fun"],
            ),
            Mode::Serious => (
                "Generates a formal startup business plan grounded in business news",
                &["startup", "business", "generator", "openai", "professional"],
            ),
        };

        ToolMetadata::new(Self::tool_name(mode), description, ToolCategory::Generator)
            .with_tags(tags.iter().copied())
            .with_schemas(
                json!({
                    "type": "object",
                    "properties": {
                        "industry": {"type": "string"},
                        "audience": {"type": "string"},
                        "keyword": {"type": "string"},
                        "context": {"type": "string"}
                    },
                    "required": ["industry", "audience", "keyword"]
                }),
                json!({
                    "type": "object",
                    "properties": {
                        "pitch": {"type": "string", "maxLength": MAX_PITCH_CHARS},
                        "character_count": {"type": "integer"},
                        "mode": {"type": "string", "enum": [mode.as_str()]},
                        "context_used": {"type": "boolean"},
                        "model": {"type": "string"}
                    }
                }),
            )
    }

    pub fn render_prompt(&self, request: &GeneratorRequest) -> Result<String, ToolError> {
        let template = match self.mode {
            Mode::Silly => SILLY_PROMPT,
            Mode::Serious => SERIOUS_PROMPT,
        };

        let mut context = Context::new();
        context.insert("industry", &request.industry);
        context.insert("audience", &request.audience);
        context.insert("keyword", &request.keyword);
        context.insert("context", request.context.trim());

        Tera::one_off(template, &context, false)
            .map_err(|error| ToolError::Template(error.to_string()))
    }
}

#[async_trait]
impl GeneratorTool for StartupSimulator {
    fn name(&self) -> &str {
        Self::tool_name(self.mode)
    }

    async fn generate(&self, request: GeneratorRequest) -> Result<PitchOutput, ToolError> {
        let prompt = self.render_prompt(&request)?;
        let completion = self
            .llm
            .complete(CompletionRequest::new(prompt).with_temperature(self.temperature))
            .await?;

        let text = completion.text.trim();
        if text.is_empty() {
            return Err(ToolError::EmptyOutput);
        }

        let pitch = truncate_chars(text, MAX_PITCH_CHARS);
        Ok(PitchOutput {
            character_count: pitch.chars().count(),
            pitch,
            mode: self.mode,
            context_used: !request.context.trim().is_empty(),
            model: completion.model,
            usage: completion.usage,
        })
    }
}

/// Keeps at most `max` characters of `text`, cutting on a `char` boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
