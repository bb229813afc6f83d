use pitchcraft_core::errors::{ApplicationError, DomainError};
use pitchcraft_core::flows::FlowTransitionError;
use thiserror::Error;

use crate::tools::ToolCategory;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Http(String),
    #[error("llm request timed out after {0}s")]
    Timeout(u64),
    #[error("llm endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response was not valid JSON: {0}")]
    InvalidJson(String),
    #[error("llm returned an empty response")]
    EmptyResponse,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid tool input: {0}")]
    InvalidInput(String),
    #[error("tool `{tool}` is not a {expected} tool")]
    CategoryMismatch { tool: String, expected: ToolCategory },
    #[error("missing credential `{0}`")]
    MissingCredential(&'static str),
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("upstream feed reported an error: {0}")]
    Upstream(String),
    #[error("prompt template failed: {0}")]
    Template(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("generator produced no text")]
    EmptyOutput,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("generator `{tool}` failed: {source}")]
    Generator {
        tool: String,
        #[source]
        source: ToolError,
    },
    #[error("tool `{tool}` timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
}

impl From<RunError> for ApplicationError {
    fn from(value: RunError) -> Self {
        match value {
            RunError::Domain(error) => Self::Domain(error),
            RunError::Flow(error) => Self::Domain(DomainError::FlowTransition(error)),
            error @ (RunError::Generator { .. } | RunError::Timeout { .. }) => {
                Self::Integration(error.to_string())
            }
        }
    }
}
