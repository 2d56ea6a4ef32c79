use std::time::Duration;

use tracker_core::{CommitReply, Effect, Msg, PreviewReply, TransportFailure};
use tracker_engine::{EngineCommand, EngineEvent, EngineHandle, TransportError};
use tracker_logging::{tracker_error, tracker_trace};

use super::render;

/// Bridges the state machine and the engine: effects go out as engine
/// commands, engine events come back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            if let Effect::Alert { message } = &effect {
                tracker_error!("{}", message);
                render::alert(message);
                continue;
            }
            if let Some(command) = effect_to_command(effect) {
                tracker_trace!("Engine command {:?}", command);
                self.engine.send(command);
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(event_to_msg)
    }
}

pub(crate) fn effect_to_command(effect: Effect) -> Option<EngineCommand> {
    let command = match effect {
        Effect::RequestPreview { submission, url } => EngineCommand::Preview { submission, url },
        Effect::RequestCommit {
            submission,
            file_id,
        } => EngineCommand::Commit {
            submission,
            file_id,
        },
        Effect::StartProgressTimer {
            submission,
            interval,
        } => EngineCommand::StartTicker {
            submission,
            interval,
        },
        Effect::StopProgressTimer => EngineCommand::StopTicker,
        Effect::RequestProgress {
            submission,
            file_id,
        } => EngineCommand::Progress {
            submission,
            file_id,
        },
        Effect::RequestPreloadList {
            submission,
            file_id,
        } => EngineCommand::PreloadList {
            submission,
            file_id,
        },
        Effect::LoadTile { submission, url } => EngineCommand::LoadTile { submission, url },
        Effect::SchedulePreloadRound { submission, delay } => {
            EngineCommand::ScheduleRound { submission, delay }
        }
        Effect::NotifyHit { .. } => EngineCommand::Hit,
        Effect::Alert { .. } => return None,
    };
    Some(command)
}

pub(crate) fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::PreviewDone { submission, result } => match result {
            Ok(response) => Msg::PreviewReceived {
                submission,
                reply: PreviewReply {
                    error: response.error,
                    file_id: response.file_id,
                    expected_size: response.expected_size,
                    content_type: response.content_type,
                },
            },
            Err(err) => Msg::PreviewFailed {
                submission,
                error: failure(err),
            },
        },
        EngineEvent::CommitDone { submission, result } => match result {
            Ok(response) => Msg::CommitReceived {
                submission,
                reply: CommitReply {
                    error: response.error,
                    url: response.url,
                    email: response.email,
                },
            },
            Err(err) => Msg::CommitFailed {
                submission,
                error: failure(err),
            },
        },
        EngineEvent::ProgressDone { submission, result } => match result {
            Ok(progress) => Msg::ProgressReceived {
                submission,
                done: progress.done,
                expected: progress.expected,
            },
            Err(err) => Msg::ProgressFailed {
                submission,
                error: failure(err),
            },
        },
        EngineEvent::PreloadListDone { submission, result } => match result {
            Ok(urls) => Msg::PreloadListed { submission, urls },
            Err(err) => Msg::PreloadListFailed {
                submission,
                error: failure(err),
            },
        },
        EngineEvent::TileDone {
            submission,
            url,
            result,
        } => match result {
            Ok(_) => Msg::TileLoaded { submission, url },
            Err(err) => Msg::TileFailed {
                submission,
                url,
                error: failure(err),
            },
        },
        EngineEvent::Tick { submission } => Msg::ProgressTick { submission },
        EngineEvent::RoundDue { submission } => Msg::PreloadRoundDue { submission },
    }
}

fn failure(err: TransportError) -> TransportFailure {
    TransportFailure::new(err.message, err.body)
}
