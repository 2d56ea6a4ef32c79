//! Tracker engine: HTTP client for the download endpoints and the runtime
//! that executes requests and timers on behalf of the state machine.
mod api;
mod engine;
mod settings;
mod types;

pub use api::{ReqwestApi, TrackerApi};
pub use engine::{EngineCommand, EngineError, EngineHandle};
pub use settings::ApiSettings;
pub use types::{
    CommitResponse, EngineEvent, FailureKind, PreviewResponse, ProgressResponse, SubmissionId,
    TransportError,
};
