use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NO_PITCH_SENTINEL: &str = "No startup pitch generated.";

/// A tool's output as recorded for one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawOutput {
    Text(String),
    Record(Value),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub tool_name: String,
    pub output: RawOutput,
}

impl ToolInvocationResult {
    pub fn text(tool_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { tool_name: tool_name.into(), output: RawOutput::Text(text.into()) }
    }

    pub fn record(tool_name: impl Into<String>, record: Value) -> Self {
        Self { tool_name: tool_name.into(), output: RawOutput::Record(record) }
    }
}

pub struct ResultFormatter;

impl ResultFormatter {
    /// Pulls the pitch out of the first result produced by `generator_tool`.
    pub fn extract(generator_tool: &str, results: &[ToolInvocationResult]) -> String {
        let Some(result) = results.iter().find(|result| result.tool_name == generator_tool) else {
            return NO_PITCH_SENTINEL.to_string();
        };

        match &result.output {
            RawOutput::Text(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(record)) => pitch_field(record.get("pitch")),
                _ => text.clone(),
            },
            RawOutput::Record(Value::Object(record)) => pitch_field(record.get("pitch")),
            RawOutput::Record(Value::String(text)) => text.clone(),
            RawOutput::Record(other) => other.to_string(),
        }
    }
}

fn pitch_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(pitch)) => pitch.clone(),
        Some(other) => other.to_string(),
    }
}
