use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::errors::ToolError;
use crate::tools::{
    send_json, ContextItem, ContextOutput, ContextProviderTool, ContextRequest, ToolCategory,
    ToolMetadata, NEWS_API_TOOL,
};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";

/// Business headlines from NewsAPI's `top-headlines` endpoint.
pub struct NewsApiTool {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    category: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    status: String,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    url: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl NewsApiTool {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        category: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            category: category.into(),
            country: country.into(),
        }
    }

    pub fn metadata() -> ToolMetadata {
        ToolMetadata::new(
            NEWS_API_TOOL,
            "Fetches top business headlines for market analysis",
            ToolCategory::ContextProvider,
        )
        .with_tags(["news", "business", "market", "analysis"])
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
                                "source": {"type": "string"},
                                "url": {"type": "string"}
                            }
                        }
                    }
                }
            }),
        )
    }
}

#[async_trait]
impl ContextProviderTool for NewsApiTool {
    fn name(&self) -> &str {
        NEWS_API_TOOL
    }

    async fn fetch(&self, request: ContextRequest) -> Result<ContextOutput, ToolError> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or(ToolError::MissingCredential("NEWS_API_KEY"))?;

        let url = format!("{}/v2/top-headlines", self.base_url);
        let page_size = request.limit.to_string();
        let http_request = self
            .client
            .get(&url)
            .header("X-Api-Key", api_key.expose_secret())
            .query(&[
                ("country", self.country.as_str()),
                ("category", self.category.as_str()),
                ("pageSize", page_size.as_str()),
            ]);

        let response: HeadlinesResponse = send_json(http_request, &url).await?;
        if response.status == "error" {
            return Err(ToolError::Upstream(
                response.message.unwrap_or_else(|| "unknown NewsAPI error".to_string()),
            ));
        }

        let items = response
            .articles
            .into_iter()
            .filter_map(|article| {
                let title = article.title.filter(|title| !title.trim().is_empty())?;
                let source = article.source.and_then(|source| source.name);
                Some(ContextItem { title, source, url: article.url })
            })
            .take(request.limit as usize)
            .collect();

        Ok(ContextOutput { items, source: "newsapi".to_string() })
    }
}
