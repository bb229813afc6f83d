use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{FlowAction, FlowEvent, FlowState, TransitionOutcome};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: FlowState, event: FlowEvent },
}

/// Transition table for one run: context phase, generation phase, formatting.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunFlow;

impl RunFlow {
    pub fn initial_state(&self) -> FlowState {
        FlowState::Init
    }

    pub fn apply(
        &self,
        current: &FlowState,
        event: &FlowEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition(current, event)
    }

    /// Applies the transition and reports it to `sink`. Sink failures are
    /// logged and otherwise ignored.
    pub fn apply_with_audit<S>(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event);
        let audit_event = match &result {
            Ok(outcome) => AuditEvent::new(
                audit.run_id.clone(),
                "flow.transition_applied",
                AuditCategory::Flow,
                audit.actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("from", format!("{:?}", outcome.from))
            .with_metadata("to", format!("{:?}", outcome.to))
            .with_metadata("event", format!("{:?}", outcome.event)),
            Err(error) => AuditEvent::new(
                audit.run_id.clone(),
                "flow.transition_rejected",
                AuditCategory::Flow,
                audit.actor.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("error", error.to_string()),
        };
        crate::audit::emit_or_warn(sink, audit_event);
        result
    }
}

fn transition(
    current: &FlowState,
    event: &FlowEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{EmitEnvelope, FormatResult, InvokeGenerator};
    use FlowEvent::{
        ContextFailed, ContextSucceeded, GeneratorFailed, GeneratorSucceeded,
        GeneratorUnavailable, ResultFormatted, RunCompleted,
    };
    use FlowState::{
        ContextDegraded, ContextFetched, Done, Failed, Formatted, Generated, Init,
    };

    let (to, actions) = match (current, event) {
        (Init, ContextSucceeded) => (ContextFetched, vec![InvokeGenerator]),
        (Init, ContextFailed) => (ContextDegraded, vec![InvokeGenerator]),
        (ContextFetched, GeneratorSucceeded)
        | (ContextDegraded, GeneratorSucceeded)
        | (ContextFetched, GeneratorUnavailable)
        | (ContextDegraded, GeneratorUnavailable) => (Generated, vec![FormatResult]),
        (ContextFetched, GeneratorFailed) | (ContextDegraded, GeneratorFailed) => {
            (Failed, Vec::new())
        }
        (Generated, ResultFormatted) => (Formatted, vec![EmitEnvelope]),
        (Formatted, RunCompleted) => (Done, Vec::new()),
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::flows::engine::{FlowTransitionError, RunFlow};
    use crate::flows::states::{FlowAction, FlowEvent, FlowState};

    fn drive(flow: &RunFlow, events: &[FlowEvent]) -> Vec<FlowState> {
        let mut state = flow.initial_state();
        let mut visited = vec![state];
        for event in events {
            state = flow.apply(&state, event).expect("valid transition").to;
            visited.push(state);
        }
        visited
    }

    #[test]
    fn happy_path_reaches_done() {
        let visited = drive(
            &RunFlow,
            &[
                FlowEvent::ContextSucceeded,
                FlowEvent::GeneratorSucceeded,
                FlowEvent::ResultFormatted,
                FlowEvent::RunCompleted,
            ],
        );

        assert_eq!(
            visited,
            vec![
                FlowState::Init,
                FlowState::ContextFetched,
                FlowState::Generated,
                FlowState::Formatted,
                FlowState::Done,
            ]
        );
        assert!(FlowState::Done.is_terminal());
    }

    #[test]
    fn degraded_context_still_invokes_generator() {
        let outcome = RunFlow
            .apply(&FlowState::Init, &FlowEvent::ContextFailed)
            .expect("init -> degraded");

        assert_eq!(outcome.to, FlowState::ContextDegraded);
        assert_eq!(outcome.actions, vec![FlowAction::InvokeGenerator]);

        let generated = RunFlow
            .apply(&outcome.to, &FlowEvent::GeneratorSucceeded)
            .expect("degraded -> generated");
        assert_eq!(generated.to, FlowState::Generated);
    }

    #[test]
    fn generator_failure_skips_formatting() {
        let failed = RunFlow
            .apply(&FlowState::ContextFetched, &FlowEvent::GeneratorFailed)
            .expect("fetched -> failed");
        assert_eq!(failed.to, FlowState::Failed);
        assert!(failed.actions.is_empty());

        let error = RunFlow
            .apply(&FlowState::Failed, &FlowEvent::ResultFormatted)
            .expect_err("failed runs are never formatted");
        assert!(matches!(
            error,
            FlowTransitionError::InvalidTransition {
                state: FlowState::Failed,
                event: FlowEvent::ResultFormatted
            }
        ));
    }

    #[test]
    fn generator_cannot_run_before_context_phase() {
        let error = RunFlow
            .apply(&FlowState::Init, &FlowEvent::GeneratorSucceeded)
            .expect_err("generator before context is invalid");
        assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn missing_generator_still_formats() {
        let outcome = RunFlow
            .apply(&FlowState::ContextDegraded, &FlowEvent::GeneratorUnavailable)
            .expect("degraded -> generated");
        assert_eq!(outcome.to, FlowState::Generated);
        assert_eq!(outcome.actions, vec![FlowAction::FormatResult]);
    }

    #[test]
    fn transitions_emit_audit_events() {
        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new("run-42", "startup-agent-silly");

        RunFlow
            .apply_with_audit(&FlowState::Init, &FlowEvent::ContextSucceeded, &sink, &context)
            .expect("transition should succeed");
        let _ = RunFlow.apply_with_audit(
            &FlowState::Done,
            &FlowEvent::ContextFailed,
            &sink,
            &context,
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].run_id, "run-42");
        assert_eq!(events[0].event_type, "flow.transition_applied");
        assert_eq!(events[1].event_type, "flow.transition_rejected");
    }
}
