use crate::view_model::TrackerViewModel;
use crate::{PreloadPhase, PreloadSet, TrackerSettings};

/// Client-side sequence number of a submission. Zero means "no job yet".
pub type SubmissionId = u64;
/// Opaque job token handed out by the server on a successful preview.
pub type FileId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    /// Site-relative (or absolute) path of the finished image.
    Link(String),
    /// The result is access-restricted; only its owner is notified.
    OwnerEmail(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Previewing,
    Downloading,
    GivenUp,
    Completed(JobResult),
    Failed(String),
}

impl JobState {
    pub fn accepts_submission(&self) -> bool {
        !matches!(self, JobState::Previewing | JobState::Downloading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::GivenUp | JobState::Completed(_) | JobState::Failed(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Job {
    pub submission: SubmissionId,
    pub source_url: String,
    pub file_id: Option<FileId>,
    pub expected_size: Option<u64>,
    pub content_type: Option<String>,
    pub state: JobState,
    pub bytes_done: u64,
    pub poll_count: u32,
}

impl Job {
    /// Records a progress report, keeping the running maximum. Returns whether
    /// the displayed value changed.
    pub(crate) fn record_progress(&mut self, done: u64) -> bool {
        if done > self.bytes_done {
            self.bytes_done = done;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    settings: TrackerSettings,
    last_submission: SubmissionId,
    job: Job,
    preload: PreloadSet,
    controls_enabled: bool,
    error_panel: Option<String>,
    dirty: bool,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::new(TrackerSettings::default())
    }
}

impl TrackerState {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            last_submission: 0,
            job: Job::default(),
            preload: PreloadSet::new(),
            // A fresh tracker never inherits stuck controls.
            controls_enabled: true,
            error_panel: None,
            dirty: false,
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn preload(&self) -> &PreloadSet {
        &self.preload
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    /// True when the job is idle or terminal. A preload may still be running;
    /// the next submission abandons it.
    pub fn is_settled(&self) -> bool {
        matches!(self.job.state, JobState::Idle) || self.job.state.is_terminal()
    }

    /// True when the job is settled and its preload has nothing left worth
    /// waiting for: it ended, or every listed tile is already cached.
    pub fn is_finished(&self) -> bool {
        self.is_settled()
            && (self.preload.phase() == PreloadPhase::Inactive || self.preload.is_fully_ready())
    }

    pub fn view(&self) -> TrackerViewModel {
        TrackerViewModel::build(self)
    }

    pub(crate) fn error_panel(&self) -> Option<&str> {
        self.error_panel.as_deref()
    }

    pub(crate) fn is_current(&self, submission: SubmissionId) -> bool {
        submission != 0 && submission == self.job.submission
    }

    /// Replaces the current job with a fresh one in `Previewing`.
    pub(crate) fn begin_job(&mut self, source_url: String) -> SubmissionId {
        self.last_submission += 1;
        self.job = Job {
            submission: self.last_submission,
            source_url,
            state: JobState::Previewing,
            ..Job::default()
        };
        self.preload.stop();
        self.controls_enabled = false;
        self.error_panel = None;
        self.mark_dirty();
        self.last_submission
    }

    pub(crate) fn job_mut(&mut self) -> &mut Job {
        &mut self.job
    }

    pub(crate) fn preload_mut(&mut self) -> &mut PreloadSet {
        &mut self.preload
    }

    pub(crate) fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }

    pub(crate) fn show_error_panel(&mut self, message: String) {
        self.error_panel = Some(message);
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether the view changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
