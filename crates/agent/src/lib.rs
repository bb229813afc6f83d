//! Agent Runtime - startup pitch orchestration
//!
//! This crate is the pitch agent itself:
//! - Declares the tool contracts (context providers and generators)
//! - Holds the tool registry and the four production tools
//! - Selects the tool pair for a mode and chains them
//! - Extracts the final pitch from whatever the generator produced
//!
//! # Architecture
//!
//! One run is a fixed sequence:
//! 1. **Context** (`tools::hackernews`, `tools::news_api`) - fetch trending items;
//!    any failure degrades to an empty context
//! 2. **Generation** (`tools::startup_simulator`) - prompt the LLM; failure is fatal
//! 3. **Formatting** (`formatter`) - pull the `pitch` out of the generator result
//!
//! # Key Types
//!
//! - `AgentRuntime` - the orchestrator (see `runtime` module)
//! - `ToolRegistry` - name to (metadata, constructor) lookup
//! - `LlmClient` - pluggable text generation endpoint
//! - `ResultFormatter` - pure extraction of the final pitch
//!
//! Observability goes through an injected `AuditSink`; a failing sink never
//! changes the pitch.

pub mod errors;
pub mod formatter;
pub mod llm;
pub mod pipeline;
pub mod runtime;
pub mod tools;

pub use errors::{LlmError, RunError, ToolError};
pub use formatter::{RawOutput, ResultFormatter, ToolInvocationResult, NO_PITCH_SENTINEL};
pub use llm::{Completion, CompletionRequest, LlmClient, OpenAiCompatibleClient, TokenUsage};
pub use pipeline::{render_context, ModePipeline, PipelinePlan};
pub use runtime::{AgentRuntime, AgentSettings, ExecutionStatus, RunEnvelope, RunReport};
pub use tools::{
    ContextItem, ContextOutput, ContextProviderTool, ContextRequest, GeneratorRequest,
    GeneratorTool, PitchOutput, ToolCategory, ToolInstance, ToolMetadata, ToolRegistry,
};
