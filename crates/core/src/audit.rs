//! Structured run events and the sinks that receive them.
//!
//! The orchestrator reports run start, every tool invocation, flow transitions
//! and run completion as [`AuditEvent`]s. A sink is an external collaborator:
//! whatever it does with an event, a failing sink must never change the
//! outcome of a run, so callers go through [`emit_or_warn`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Longest preview of a tool input or output carried in an event.
pub const PREVIEW_CHARS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Run,
    Tool,
    Flow,
    Formatting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Degraded,
    Failed,
    Rejected,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub run_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(run_id: impl Into<String>, actor: impl Into<String>) -> Self {
        Self { run_id: run_id.into(), actor: actor.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub run_id: String,
    pub event_type: String,
    pub category: AuditCategory,
    pub actor: String,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        run_id: impl Into<String>,
        event_type: impl Into<String>,
        category: AuditCategory,
        actor: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            run_id: run_id.into(),
            event_type: event_type.into(),
            category,
            actor: actor.into(),
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("observability sink unavailable: {0}")]
    Unavailable(String),
    #[error("observability sink rejected event `{event_type}`: {reason}")]
    Rejected { event_type: String, reason: String },
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent) -> Result<(), SinkError>;
}

/// Hands `event` to `sink`, logging and discarding any sink failure.
pub fn emit_or_warn<S>(sink: &S, event: AuditEvent)
where
    S: AuditSink + ?Sized,
{
    let event_type = event.event_type.clone();
    let run_id = event.run_id.clone();
    if let Err(error) = sink.emit(event) {
        tracing::warn!(
            event_name = "system.audit.emit_failed",
            run_id = %run_id,
            audit_event = %event_type,
            error = %error,
            "observability sink failed; continuing without it"
        );
    }
}

/// Cuts `text` to at most [`PREVIEW_CHARS`] characters, marking the cut with `...`.
pub fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.event_type).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) -> Result<(), SinkError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes every event as a structured `tracing` record.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) -> Result<(), SinkError> {
        let metadata = serde_json::to_string(&event.metadata).map_err(|error| {
            SinkError::Rejected { event_type: event.event_type.clone(), reason: error.to_string() }
        })?;

        match event.outcome {
            AuditOutcome::Success => tracing::info!(
                event_name = %event.event_type,
                run_id = %event.run_id,
                actor = %event.actor,
                category = ?event.category,
                outcome = event.outcome.as_str(),
                metadata = %metadata,
                "run event"
            ),
            AuditOutcome::Degraded | AuditOutcome::Rejected => tracing::warn!(
                event_name = %event.event_type,
                run_id = %event.run_id,
                actor = %event.actor,
                category = ?event.category,
                outcome = event.outcome.as_str(),
                metadata = %metadata,
                "run event"
            ),
            AuditOutcome::Failed => tracing::error!(
                event_name = %event.event_type,
                run_id = %event.run_id,
                actor = %event.actor,
                category = ?event.category,
                outcome = event.outcome.as_str(),
                metadata = %metadata,
                "run event"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{
        emit_or_warn, preview, AuditCategory, AuditEvent, AuditOutcome, AuditSink,
        InMemoryAuditSink, SinkError, TracingAuditSink, PREVIEW_CHARS,
    };

    struct BrokenSink;

    impl AuditSink for BrokenSink {
        fn emit(&self, _event: AuditEvent) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("collector offline".to_string()))
        }
    }

    #[test]
    fn in_memory_sink_records_events_with_run_fields() {
        let sink = InMemoryAuditSink::default();
        sink.emit(
            AuditEvent::new(
                "run-123",
                "tool.invoked",
                AuditCategory::Tool,
                "startup-agent-silly",
                AuditOutcome::Success,
            )
            .with_metadata("tool", "hackernews_tool")
            .with_metadata("elapsed_ms", "12"),
        )
        .expect("in-memory sink never fails");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].run_id, "run-123");
        assert_eq!(events[0].metadata_value("tool"), Some("hackernews_tool"));
        assert_eq!(sink.event_types(), vec!["tool.invoked".to_string()]);
    }

    #[test]
    fn emit_or_warn_swallows_sink_failures() {
        emit_or_warn(
            &BrokenSink,
            AuditEvent::new(
                "run-1",
                "run.started",
                AuditCategory::Run,
                "tester",
                AuditOutcome::Success,
            ),
        );
    }

    #[test]
    fn tracing_sink_accepts_every_outcome() {
        for outcome in [
            AuditOutcome::Success,
            AuditOutcome::Degraded,
            AuditOutcome::Failed,
            AuditOutcome::Rejected,
        ] {
            let event = AuditEvent::new("run-9", "run.completed", AuditCategory::Run, "t", outcome);
            assert_eq!(TracingAuditSink.emit(event), Ok(()));
        }
    }

    #[test]
    fn preview_truncates_long_text_on_char_boundaries() {
        let short = "short output";
        assert_eq!(preview(short), short);

        let long = "é".repeat(PREVIEW_CHARS + 50);
        let cut = preview(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
    }
}
