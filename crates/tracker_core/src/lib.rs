//! Tracker core: pure download-job state machine and view-model helpers.
mod effect;
mod msg;
mod preload;
mod progress;
mod settings;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{CommitReply, Msg, PreviewReply, TransportFailure};
pub use preload::{PreloadPhase, PreloadSet};
pub use progress::{human_size, percentage, remaining};
pub use settings::TrackerSettings;
pub use state::{FileId, Job, JobResult, JobState, SubmissionId, TrackerState};
pub use update::update;
pub use view_model::{Phase, PreloadView, ProgressView, TrackerViewModel};
