use serde::{Deserialize, Serialize};

/// Lifecycle of a single pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Init,
    ContextFetched,
    ContextDegraded,
    Generated,
    Formatted,
    Done,
    Failed,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowEvent {
    ContextSucceeded,
    ContextFailed,
    GeneratorSucceeded,
    /// The mode's generator is not registered; formatting falls back to the
    /// no-pitch sentinel.
    GeneratorUnavailable,
    GeneratorFailed,
    ResultFormatted,
    RunCompleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAction {
    InvokeGenerator,
    FormatResult,
    EmitEnvelope,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FlowState,
    pub to: FlowState,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
