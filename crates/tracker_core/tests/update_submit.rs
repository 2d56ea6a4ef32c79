use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tracker_core::{
    update, CommitReply, Effect, JobState, Msg, Phase, PreviewReply, TrackerState,
    TransportFailure,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(tracker_logging::initialize_for_tests);
}

fn preview_ok(file_id: &str, expected_size: Option<u64>) -> PreviewReply {
    PreviewReply {
        file_id: Some(file_id.to_string()),
        expected_size,
        content_type: Some("image/jpeg".to_string()),
        ..PreviewReply::default()
    }
}

#[test]
fn blank_submission_is_ignored() {
    init_logging();
    let state = TrackerState::default();
    let (mut next, effects) = update(state, Msg::Submit("   \n".into()));

    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
    assert_eq!(next.view().phase, Phase::Idle);
    assert!(next.view().controls_enabled);
}

#[test]
fn submission_trims_and_requests_preview() {
    init_logging();
    let (mut state, effects) = update(
        TrackerState::default(),
        Msg::Submit("  http://example.com/x.jpg \n".into()),
    );

    assert_eq!(
        effects,
        vec![Effect::RequestPreview {
            submission: 1,
            url: "http://example.com/x.jpg".to_string(),
        }]
    );
    let view = state.view();
    assert_eq!(view.phase, Phase::Previewing);
    assert!(!view.controls_enabled);
    assert_eq!(view.source_url.as_deref(), Some("http://example.com/x.jpg"));
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn preview_success_starts_commit_and_polling() {
    init_logging();
    let (state, _) = update(TrackerState::default(), Msg::Submit("http://a/x.jpg".into()));
    let (state, effects) = update(
        state,
        Msg::PreviewReceived {
            submission: 1,
            reply: preview_ok("abc123", Some(2_000_000)),
        },
    );

    assert_eq!(
        effects,
        vec![
            Effect::RequestCommit {
                submission: 1,
                file_id: "abc123".to_string(),
            },
            Effect::StartProgressTimer {
                submission: 1,
                interval: Duration::from_secs(1),
            },
        ]
    );
    assert_eq!(state.job().state, JobState::Downloading);
    assert_eq!(state.job().file_id.as_deref(), Some("abc123"));
    let progress = state.view().progress.expect("progress panel");
    assert_eq!(progress.expected, Some(2_000_000));
    assert_eq!(progress.percentage, Some(0));
    assert_eq!(progress.content_type.as_deref(), Some("image/jpeg"));
}

#[test]
fn preview_error_shows_panel_and_reenables_controls() {
    init_logging();
    let (state, _) = update(TrackerState::default(), Msg::Submit("http://a/x.jpg".into()));
    let (state, effects) = update(
        state,
        Msg::PreviewReceived {
            submission: 1,
            reply: PreviewReply {
                error: Some("bad url".to_string()),
                ..PreviewReply::default()
            },
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.phase, Phase::Failed);
    assert_eq!(view.error_panel.as_deref(), Some("bad url"));
    assert!(view.controls_enabled);
    assert!(view.progress.is_none());
    assert_eq!(state.job().state, JobState::Failed("bad url".to_string()));
}

#[test]
fn preview_without_file_id_is_a_rejection() {
    init_logging();
    let (state, _) = update(TrackerState::default(), Msg::Submit("http://a/x.jpg".into()));
    let (state, effects) = update(
        state,
        Msg::PreviewReceived {
            submission: 1,
            reply: PreviewReply {
                expected_size: Some(10),
                ..PreviewReply::default()
            },
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.phase, Phase::Failed);
    assert!(view.error_panel.is_some());
    assert!(view.controls_enabled);
}

#[test]
fn preview_transport_failure_alerts() {
    init_logging();
    let (state, _) = update(TrackerState::default(), Msg::Submit("http://a/x.jpg".into()));
    let (state, effects) = update(
        state,
        Msg::PreviewFailed {
            submission: 1,
            error: TransportFailure::new("403 Forbidden", Some("XSRF cookie missing".into())),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::Alert {
            message: "403 Forbidden: XSRF cookie missing".to_string(),
        }]
    );
    let view = state.view();
    assert_eq!(view.phase, Phase::Failed);
    assert!(view.error_panel.is_none());
    assert!(view.controls_enabled);
}

#[test]
fn submission_rejected_while_job_active() {
    init_logging();
    let (state, _) = update(TrackerState::default(), Msg::Submit("http://a/1.jpg".into()));
    let (state, effects) = update(state, Msg::Submit("http://a/2.jpg".into()));
    assert!(effects.is_empty());
    assert_eq!(state.job().source_url, "http://a/1.jpg");

    let (state, _) = update(
        state,
        Msg::PreviewReceived {
            submission: 1,
            reply: preview_ok("abc123", None),
        },
    );
    let (state, effects) = update(state, Msg::Submit("http://a/2.jpg".into()));
    assert!(effects.is_empty());
    assert_eq!(state.job().state, JobState::Downloading);
}

#[test]
fn new_submission_after_failure_ignores_stale_replies() {
    init_logging();
    let (state, _) = update(TrackerState::default(), Msg::Submit("http://a/1.jpg".into()));
    let (state, _) = update(
        state,
        Msg::PreviewReceived {
            submission: 1,
            reply: PreviewReply {
                error: Some("quota exceeded".into()),
                ..PreviewReply::default()
            },
        },
    );

    let (state, effects) = update(state, Msg::Submit("http://a/2.jpg".into()));
    assert_eq!(
        effects,
        vec![Effect::RequestPreview {
            submission: 2,
            url: "http://a/2.jpg".to_string(),
        }]
    );
    assert!(state.view().error_panel.is_none());

    let (state, effects) = update(
        state,
        Msg::CommitReceived {
            submission: 1,
            reply: CommitReply {
                url: Some("/old".into()),
                ..CommitReply::default()
            },
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.job().state, JobState::Previewing);
}
