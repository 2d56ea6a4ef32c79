use std::time::Duration;

use crate::{FileId, SubmissionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RequestPreview {
        submission: SubmissionId,
        url: String,
    },
    RequestCommit {
        submission: SubmissionId,
        file_id: FileId,
    },
    StartProgressTimer {
        submission: SubmissionId,
        interval: Duration,
    },
    StopProgressTimer,
    RequestProgress {
        submission: SubmissionId,
        file_id: FileId,
    },
    RequestPreloadList {
        submission: SubmissionId,
        file_id: FileId,
    },
    LoadTile {
        submission: SubmissionId,
        url: String,
    },
    SchedulePreloadRound {
        submission: SubmissionId,
        delay: Duration,
    },
    NotifyHit {
        submission: SubmissionId,
    },
    /// Blocking, user-visible notification for transport failures.
    Alert { message: String },
}
