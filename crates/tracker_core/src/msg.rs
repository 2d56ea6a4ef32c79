use crate::SubmissionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted a source URL (raw text from the input box).
    Submit(String),
    /// Preview endpoint answered with a well-formed body.
    PreviewReceived {
        submission: SubmissionId,
        reply: PreviewReply,
    },
    /// Preview request failed at the transport level.
    PreviewFailed {
        submission: SubmissionId,
        error: TransportFailure,
    },
    /// Progress timer fired.
    ProgressTick { submission: SubmissionId },
    /// Progress endpoint reported bytes written so far, and the total when
    /// the server has learned it.
    ProgressReceived {
        submission: SubmissionId,
        done: u64,
        expected: Option<u64>,
    },
    /// Progress request failed; the next tick polls again.
    ProgressFailed {
        submission: SubmissionId,
        error: TransportFailure,
    },
    /// Commit endpoint answered with a well-formed body.
    CommitReceived {
        submission: SubmissionId,
        reply: CommitReply,
    },
    /// Commit request failed at the transport level.
    CommitFailed {
        submission: SubmissionId,
        error: TransportFailure,
    },
    /// Scheduled preload round is due.
    PreloadRoundDue { submission: SubmissionId },
    /// Preload list endpoint returned the tiles available so far.
    PreloadListed {
        submission: SubmissionId,
        urls: Vec<String>,
    },
    /// Preload list request failed.
    PreloadListFailed {
        submission: SubmissionId,
        error: TransportFailure,
    },
    /// A single tile finished loading.
    TileLoaded { submission: SubmissionId, url: String },
    /// A single tile failed to load.
    TileFailed {
        submission: SubmissionId,
        url: String,
        error: TransportFailure,
    },
}

/// Business-level answer of the preview endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreviewReply {
    pub error: Option<String>,
    pub file_id: Option<String>,
    pub expected_size: Option<u64>,
    pub content_type: Option<String>,
}

/// Business-level answer of the commit endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitReply {
    pub error: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

/// Transport failure as shown to the user: a status label plus whatever body
/// text came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub status: String,
    pub body: Option<String>,
}

impl TransportFailure {
    pub fn new(status: impl Into<String>, body: Option<String>) -> Self {
        Self {
            status: status.into(),
            body,
        }
    }

    /// `"<status>: <body>"`, or just the status when no body text is available.
    pub fn alert_message(&self) -> String {
        match self.body.as_deref().map(str::trim) {
            Some(body) if !body.is_empty() => format!("{}: {}", self.status, body),
            _ => self.status.clone(),
        }
    }
}
