use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::errors::ToolError;
use crate::tools::{
    send_json, ContextItem, ContextOutput, ContextProviderTool, ContextRequest, ToolCategory,
    ToolMetadata, HACKERNEWS_TOOL,
};

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com";

/// Top stories from the Hacker News Firebase API.
pub struct HackerNewsTool {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct HnItem {
    title: Option<String>,
    url: Option<String>,
    by: Option<String>,
}

impl HackerNewsTool {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn metadata() -> ToolMetadata {
        ToolMetadata::new(
            HACKERNEWS_TOOL,
            "Fetches the current top Hacker News stories for creative inspiration",
            ToolCategory::ContextProvider,
        )
        .with_tags(["news", "api", "hackernews"])
        .with_schemas(
            json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "minimum": 1, "maximum": 50}
                },
                "required": ["limit"]
            }),
            json!({
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": {"type": "string"},
                                "url": {"type": "string"},
                                "source": {"type": "string"}
                            }
                        }
                    }
                }
            }),
        )
    }

    async fn top_story_ids(&self) -> Result<Vec<u64>, ToolError> {
        let url = format!("{}/v0/topstories.json", self.base_url);
        send_json(self.client.get(&url), &url).await
    }

    async fn story(&self, id: u64) -> Result<Option<HnItem>, ToolError> {
        let url = format!("{}/v0/item/{id}.json", self.base_url);
        send_json(self.client.get(&url), &url).await
    }
}

#[async_trait]
impl ContextProviderTool for HackerNewsTool {
    fn name(&self) -> &str {
        HACKERNEWS_TOOL
    }

    async fn fetch(&self, request: ContextRequest) -> Result<ContextOutput, ToolError> {
        let ids = self.top_story_ids().await?;
        let mut items = Vec::new();

        for id in ids.into_iter().take(request.limit as usize) {
            // Deleted stories come back as `null`.
            let Some(story) = self.story(id).await? else {
                tracing::debug!(event_name = "tool.hackernews.item_missing", story_id = id);
                continue;
            };
            let Some(title) = story.title.filter(|title| !title.trim().is_empty()) else {
                continue;
            };
            items.push(ContextItem { title, source: story.by, url: story.url });
        }

        Ok(ContextOutput { items, source: "hackernews".to_string() })
    }
}
