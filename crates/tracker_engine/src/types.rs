use std::fmt;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Client-side submission number echoed back on every event.
pub type SubmissionId = u64;

/// Body of the preview endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PreviewResponse {
    #[serde(default, deserialize_with = "non_empty")]
    pub error: Option<String>,
    #[serde(default, rename = "fileid", deserialize_with = "non_empty")]
    pub file_id: Option<String>,
    #[serde(default)]
    pub expected_size: Option<u64>,
    #[serde(default, deserialize_with = "non_empty")]
    pub content_type: Option<String>,
}

/// Body of the commit (download) endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CommitResponse {
    #[serde(default, deserialize_with = "non_empty")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub email: Option<String>,
}

/// Body of the progress endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ProgressResponse {
    pub done: u64,
    #[serde(default)]
    pub expected: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub(crate) struct PreloadListResponse {
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PreviewDone {
        submission: SubmissionId,
        result: Result<PreviewResponse, TransportError>,
    },
    CommitDone {
        submission: SubmissionId,
        result: Result<CommitResponse, TransportError>,
    },
    ProgressDone {
        submission: SubmissionId,
        result: Result<ProgressResponse, TransportError>,
    },
    PreloadListDone {
        submission: SubmissionId,
        result: Result<Vec<String>, TransportError>,
    },
    TileDone {
        submission: SubmissionId,
        url: String,
        result: Result<u64, TransportError>,
    },
    /// Progress timer fired.
    Tick { submission: SubmissionId },
    /// A scheduled preload round is due.
    RoundDue { submission: SubmissionId },
}

/// Transport-level failure: the request did not produce a usable body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
    /// Response body text, when the server sent one.
    pub body: Option<String>,
}

impl TransportError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: String) -> Self {
        if !body.trim().is_empty() {
            self.body = Some(body);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Decode,
    Client,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Client => write!(f, "http client setup failed"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Treats blank strings like absent fields, matching how the page checked
/// response fields for truthiness.
fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
