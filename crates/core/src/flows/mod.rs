pub mod engine;
pub mod states;

pub use engine::{FlowTransitionError, RunFlow};
pub use states::{FlowAction, FlowEvent, FlowState, TransitionOutcome};
