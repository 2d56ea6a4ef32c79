use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::{
    CommitReply, Effect, JobResult, JobState, Msg, PreloadPhase, PreviewReply, SubmissionId,
    TrackerState,
};

const MISSING_FILE_ID: &str = "The server did not accept the download. Please try again.";
const AMBIGUOUS_COMMIT: &str = "Unexpected response from server.";

enum Presentation {
    /// Server-reported error shown in the inline error panel.
    Inline,
    /// Transport failure shown as a blocking alert.
    Alert,
}

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: TrackerState, msg: Msg) -> (TrackerState, Vec<Effect>) {
    let effects = match msg {
        Msg::Submit(raw) => submit(&mut state, &raw),
        Msg::PreviewReceived { submission, reply } if state.is_current(submission) => {
            preview_received(&mut state, reply)
        }
        Msg::PreviewFailed { submission, error } if state.is_current(submission) => {
            if state.job().state == JobState::Previewing {
                fail(&mut state, error.alert_message(), Presentation::Alert)
            } else {
                Vec::new()
            }
        }
        Msg::ProgressTick { submission } if state.is_current(submission) => {
            progress_tick(&mut state)
        }
        Msg::ProgressReceived {
            submission,
            done,
            expected,
        } if state.is_current(submission) => {
            progress_received(&mut state, done, expected);
            Vec::new()
        }
        Msg::ProgressFailed { submission, error } if state.is_current(submission) => {
            tracker_warn!(
                "Progress poll failed for submission {}: {}",
                submission,
                error.alert_message()
            );
            Vec::new()
        }
        Msg::CommitReceived { submission, reply } if state.is_current(submission) => {
            commit_received(&mut state, reply)
        }
        Msg::CommitFailed { submission, error } if state.is_current(submission) => {
            if awaiting_commit(&state) {
                fail(&mut state, error.alert_message(), Presentation::Alert)
            } else {
                Vec::new()
            }
        }
        Msg::PreloadRoundDue { submission } if state.is_current(submission) => {
            if state.preload_mut().start_round() {
                state.mark_dirty();
                request_preload_list(&state, submission)
            } else {
                Vec::new()
            }
        }
        Msg::PreloadListed { submission, urls } if state.is_current(submission) => {
            preload_listed(&mut state, submission, urls)
        }
        Msg::PreloadListFailed { submission, error } if state.is_current(submission) => {
            tracker_warn!(
                "Preload list failed for submission {}: {}",
                submission,
                error.alert_message()
            );
            preload_listed(&mut state, submission, Vec::new())
        }
        Msg::TileLoaded { submission, url } if state.is_current(submission) => {
            if !state.preload().is_in_flight(&url) {
                return (state, Vec::new());
            }
            let next = state.preload_mut().mark_loaded(&url);
            state.mark_dirty();
            continue_preload(&mut state, submission, next)
        }
        Msg::TileFailed {
            submission,
            url,
            error,
        } if state.is_current(submission) => {
            if !state.preload().is_in_flight(&url) {
                return (state, Vec::new());
            }
            tracker_debug!("Tile {} failed: {}", url, error.alert_message());
            let next = state.preload_mut().mark_failed(&url);
            state.mark_dirty();
            continue_preload(&mut state, submission, next)
        }
        stale => {
            tracker_debug!("Ignoring message for a previous submission: {:?}", stale);
            Vec::new()
        }
    };

    (state, effects)
}

fn submit(state: &mut TrackerState, raw: &str) -> Vec<Effect> {
    let url = raw.trim();
    if url.is_empty() {
        return Vec::new();
    }
    if !state.job().state.accepts_submission() {
        tracker_warn!(
            "Submission of {} ignored: job {} is still {:?}",
            url,
            state.job().submission,
            state.job().state
        );
        return Vec::new();
    }

    let submission = state.begin_job(url.to_string());
    tracker_info!("Submission {} previewing {}", submission, url);
    vec![Effect::RequestPreview {
        submission,
        url: url.to_string(),
    }]
}

fn preview_received(state: &mut TrackerState, reply: PreviewReply) -> Vec<Effect> {
    if state.job().state != JobState::Previewing {
        return Vec::new();
    }
    if let Some(error) = reply.error {
        return fail(state, error, Presentation::Inline);
    }
    let Some(file_id) = reply.file_id.filter(|id| !id.trim().is_empty()) else {
        return fail(state, MISSING_FILE_ID.to_string(), Presentation::Inline);
    };

    let submission = state.job().submission;
    let interval = state.settings().poll_interval;
    let job = state.job_mut();
    job.file_id = Some(file_id.clone());
    job.expected_size = reply.expected_size.filter(|&size| size > 0);
    job.content_type = reply.content_type;
    job.state = JobState::Downloading;
    state.mark_dirty();
    tracker_info!(
        "Submission {} accepted as file {} (expected {:?} bytes)",
        submission,
        file_id,
        state.job().expected_size
    );

    vec![
        Effect::RequestCommit {
            submission,
            file_id,
        },
        Effect::StartProgressTimer {
            submission,
            interval,
        },
    ]
}

fn progress_tick(state: &mut TrackerState) -> Vec<Effect> {
    if state.job().state != JobState::Downloading {
        return Vec::new();
    }
    let Some(file_id) = state.job().file_id.clone() else {
        return Vec::new();
    };

    let submission = state.job().submission;
    let give_up_after = state.settings().give_up_after;
    let job = state.job_mut();
    job.poll_count += 1;
    let poll_count = job.poll_count;
    state.mark_dirty();

    let mut effects = vec![Effect::RequestProgress {
        submission,
        file_id,
    }];
    if poll_count >= give_up_after {
        tracker_warn!(
            "Giving up on submission {} after {} polls",
            submission,
            poll_count
        );
        state.job_mut().state = JobState::GivenUp;
        state.set_controls_enabled(true);
        effects.push(Effect::StopProgressTimer);
    }
    effects
}

fn progress_received(state: &mut TrackerState, done: u64, expected: Option<u64>) {
    if state.job().state != JobState::Downloading {
        return;
    }
    let job = state.job_mut();
    let mut changed = job.record_progress(done);
    // The preview estimate wins; the server total only fills a gap.
    if job.expected_size.is_none() {
        if let Some(total) = expected.filter(|&total| total > 0) {
            job.expected_size = Some(total);
            changed = true;
        }
    }
    if changed {
        state.mark_dirty();
    }
}

/// Commit answers are honoured while downloading and after a client-side
/// give-up; the server may still finish the job.
fn awaiting_commit(state: &TrackerState) -> bool {
    matches!(state.job().state, JobState::Downloading | JobState::GivenUp)
}

fn commit_received(state: &mut TrackerState, reply: CommitReply) -> Vec<Effect> {
    if !awaiting_commit(state) {
        return Vec::new();
    }
    if let Some(error) = reply.error {
        return fail(state, error, Presentation::Inline);
    }

    let submission = state.job().submission;
    let mut effects = stop_polling(state);
    if let Some(url) = reply.url {
        tracker_info!("Submission {} completed at {}", submission, url);
        complete(state, JobResult::Link(url));
        effects.push(Effect::NotifyHit { submission });
        if let Some(file_id) = state.job().file_id.clone() {
            let initial = state.settings().preload_initial_interval;
            state.preload_mut().begin(file_id, initial);
            effects.extend(request_preload_list(state, submission));
        }
        effects
    } else if let Some(email) = reply.email {
        tracker_info!(
            "Submission {} completed; result restricted to its owner",
            submission
        );
        complete(state, JobResult::OwnerEmail(email));
        effects
    } else {
        fail(state, AMBIGUOUS_COMMIT.to_string(), Presentation::Inline)
    }
}

fn complete(state: &mut TrackerState, result: JobResult) {
    state.job_mut().state = JobState::Completed(result);
    state.set_controls_enabled(true);
    state.mark_dirty();
}

fn stop_polling(state: &TrackerState) -> Vec<Effect> {
    if state.job().state == JobState::Downloading {
        vec![Effect::StopProgressTimer]
    } else {
        Vec::new()
    }
}

fn fail(state: &mut TrackerState, message: String, presentation: Presentation) -> Vec<Effect> {
    let mut effects = stop_polling(state);
    tracker_warn!("Submission {} failed: {}", state.job().submission, message);
    state.job_mut().state = JobState::Failed(message.clone());
    state.set_controls_enabled(true);
    match presentation {
        Presentation::Inline => state.show_error_panel(message),
        Presentation::Alert => effects.push(Effect::Alert { message }),
    }
    state.mark_dirty();
    effects
}

fn request_preload_list(state: &TrackerState, submission: SubmissionId) -> Vec<Effect> {
    match state.preload().file_id() {
        Some(file_id) => vec![Effect::RequestPreloadList {
            submission,
            file_id: file_id.to_string(),
        }],
        None => Vec::new(),
    }
}

fn preload_listed(
    state: &mut TrackerState,
    submission: SubmissionId,
    urls: Vec<String>,
) -> Vec<Effect> {
    if state.preload().phase() != PreloadPhase::Listing {
        return Vec::new();
    }
    tracker_debug!(
        "Preload round {} listed {} urls",
        state.preload().rounds(),
        urls.len()
    );
    let next = state.preload_mut().accept_listing(urls);
    state.mark_dirty();
    continue_preload(state, submission, next)
}

fn continue_preload(
    state: &mut TrackerState,
    submission: SubmissionId,
    next: Option<String>,
) -> Vec<Effect> {
    if let Some(url) = next {
        return vec![Effect::LoadTile { submission, url }];
    }
    if !state.preload().is_round_drained() {
        return Vec::new();
    }

    let max_rounds = state.settings().preload_max_rounds;
    let ceiling = state.settings().preload_max_interval;
    let outcome = state.preload_mut().finish_round(max_rounds, ceiling);
    if outcome.became_fully_ready {
        tracker_info!("All tiles for submission {} are preloaded", submission);
    }
    match outcome.next_delay {
        Some(delay) => vec![Effect::SchedulePreloadRound { submission, delay }],
        None => {
            tracker_info!(
                "Preload for submission {} finished after {} rounds ({} tiles cached)",
                submission,
                state.preload().rounds(),
                state.preload().loaded_count()
            );
            Vec::new()
        }
    }
}
