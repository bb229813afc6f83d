pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    NoopAuditSink, SinkError, TracingAuditSink,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::mode::Mode;
pub use domain::pitch::PitchRequest;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FlowAction, FlowEvent, FlowState, FlowTransitionError, RunFlow, TransitionOutcome};
