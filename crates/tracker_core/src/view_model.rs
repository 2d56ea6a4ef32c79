use std::time::Duration;

use crate::{percentage, remaining, JobResult, JobState, PreloadPhase, TrackerState};

/// Coarse job phase, mirroring `JobState` without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Previewing,
    Downloading,
    GivenUp,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackerViewModel {
    pub phase: Phase,
    pub controls_enabled: bool,
    pub source_url: Option<String>,
    /// Inline error panel text for server-reported (business) errors.
    pub error_panel: Option<String>,
    pub progress: Option<ProgressView>,
    pub result_link: Option<String>,
    pub owner_email: Option<String>,
    pub preload: PreloadView,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressView {
    pub downloaded: u64,
    pub expected: Option<u64>,
    pub left: Option<u64>,
    pub percentage: Option<u8>,
    pub content_type: Option<String>,
    pub polls: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreloadView {
    pub active: bool,
    pub rounds: u32,
    pub loaded: usize,
    pub pending: usize,
    pub fully_ready: bool,
    /// Delay before the next round, while one is scheduled.
    pub next_round_in: Option<Duration>,
}

impl TrackerViewModel {
    pub(crate) fn build(state: &TrackerState) -> Self {
        let job = state.job();
        let phase = match &job.state {
            JobState::Idle => Phase::Idle,
            JobState::Previewing => Phase::Previewing,
            JobState::Downloading => Phase::Downloading,
            JobState::GivenUp => Phase::GivenUp,
            JobState::Completed(_) => Phase::Completed,
            JobState::Failed(_) => Phase::Failed,
        };

        let progress = (phase == Phase::Downloading).then(|| {
            let expected = job.expected_size.filter(|&total| total > 0);
            ProgressView {
                downloaded: job.bytes_done,
                expected,
                left: remaining(job.bytes_done, expected),
                percentage: percentage(job.bytes_done, expected),
                content_type: job.content_type.clone(),
                polls: job.poll_count,
            }
        });

        let (result_link, owner_email) = match &job.state {
            JobState::Completed(JobResult::Link(url)) => {
                (Some(state.settings().result_link(url)), None)
            }
            JobState::Completed(JobResult::OwnerEmail(email)) => (None, Some(email.clone())),
            _ => (None, None),
        };

        let preload = state.preload();
        Self {
            phase,
            controls_enabled: state.controls_enabled(),
            source_url: (phase != Phase::Idle).then(|| job.source_url.clone()),
            error_panel: state.error_panel().map(ToOwned::to_owned),
            progress,
            result_link,
            owner_email,
            preload: PreloadView {
                active: preload.phase() != PreloadPhase::Inactive,
                rounds: preload.rounds(),
                loaded: preload.loaded_count(),
                pending: preload.pending_count(),
                fully_ready: preload.is_fully_ready(),
                next_round_in: (preload.phase() == PreloadPhase::Waiting)
                    .then(|| preload.interval()),
            },
        }
    }
}
