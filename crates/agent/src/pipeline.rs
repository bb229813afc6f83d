use pitchcraft_core::domain::mode::Mode;
use serde::Serialize;

use crate::tools::{
    ContextItem, HACKERNEWS_TOOL, NEWS_API_TOOL, SERIOUS_STARTUP_SIMULATOR, STARTUP_SIMULATOR,
};

/// The two tools a mode chains together and how context flows between them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelinePlan {
    pub mode: Mode,
    pub context_tool: &'static str,
    pub generator_tool: &'static str,
    pub context_limit: u32,
    pub context_param: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModePipeline {
    silly_story_limit: u32,
    serious_article_limit: u32,
}

impl Default for ModePipeline {
    fn default() -> Self {
        Self { silly_story_limit: 3, serious_article_limit: 5 }
    }
}

impl ModePipeline {
    pub fn new(silly_story_limit: u32, serious_article_limit: u32) -> Self {
        Self { silly_story_limit, serious_article_limit }
    }

    pub fn plan(&self, mode: Mode) -> PipelinePlan {
        match mode {
            Mode::Silly => PipelinePlan {
                mode,
                context_tool: HACKERNEWS_TOOL,
                generator_tool: STARTUP_SIMULATOR,
                context_limit: self.silly_story_limit,
                context_param: "hn_context",
            },
            Mode::Serious => PipelinePlan {
                mode,
                context_tool: NEWS_API_TOOL,
                generator_tool: SERIOUS_STARTUP_SIMULATOR,
                context_limit: self.serious_article_limit,
                context_param: "news_context",
            },
        }
    }
}

/// Bullet list handed to the generator. Silly lists titles only; serious adds
/// the publication in parentheses when one is known.
pub fn render_context(mode: Mode, items: &[ContextItem]) -> String {
    items
        .iter()
        .map(|item| match (mode, item.source.as_deref()) {
            (Mode::Serious, Some(source)) if !source.trim().is_empty() => {
                format!("- {} ({})", item.title, source)
            }
            _ => format!("- {}", item.title),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
