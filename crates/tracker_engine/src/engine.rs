use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracker_logging::{tracker_debug, tracker_warn};

use crate::api::{ReqwestApi, TrackerApi};
use crate::{ApiSettings, EngineEvent, SubmissionId, TransportError};

/// Work the engine performs on behalf of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Preview {
        submission: SubmissionId,
        url: String,
    },
    Commit {
        submission: SubmissionId,
        file_id: String,
    },
    Progress {
        submission: SubmissionId,
        file_id: String,
    },
    PreloadList {
        submission: SubmissionId,
        file_id: String,
    },
    LoadTile {
        submission: SubmissionId,
        url: String,
    },
    Hit,
    /// Replaces any running progress ticker.
    StartTicker {
        submission: SubmissionId,
        interval: Duration,
    },
    StopTicker,
    ScheduleRound {
        submission: SubmissionId,
        delay: Duration,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("http client: {0}")]
    Client(#[from] TransportError),
    #[error("tokio runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: ApiSettings) -> Result<Self, EngineError> {
        let api = ReqwestApi::new(settings)?;
        Self::with_api(Arc::new(api))
    }

    /// Runs the engine against any `TrackerApi`, e.g. a scripted one in tests.
    pub fn with_api(api: Arc<dyn TrackerApi>) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        thread::spawn(move || {
            let mut ticker: Option<CancellationToken> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::StartTicker {
                        submission,
                        interval,
                    } => {
                        if let Some(previous) = ticker.take() {
                            previous.cancel();
                        }
                        let token = CancellationToken::new();
                        runtime.spawn(run_ticker(
                            submission,
                            interval,
                            token.clone(),
                            event_tx.clone(),
                        ));
                        ticker = Some(token);
                    }
                    EngineCommand::StopTicker => {
                        if let Some(previous) = ticker.take() {
                            previous.cancel();
                        }
                    }
                    EngineCommand::ScheduleRound { submission, delay } => {
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            time::sleep(delay).await;
                            let _ = event_tx.send(EngineEvent::RoundDue { submission });
                        });
                    }
                    request => {
                        let api = api.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            handle_request(api.as_ref(), request, event_tx).await;
                        });
                    }
                }
            }
            if let Some(previous) = ticker {
                previous.cancel();
            }
            runtime.shutdown_background();
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn run_ticker(
    submission: SubmissionId,
    period: Duration,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    // First tick one period after start, like a browser interval.
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                if event_tx.send(EngineEvent::Tick { submission }).is_err() {
                    break;
                }
            }
        }
    }
    tracker_debug!("Progress ticker for submission {} stopped", submission);
}

async fn handle_request(
    api: &dyn TrackerApi,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::Preview { submission, url } => EngineEvent::PreviewDone {
            submission,
            result: api.preview(&url).await,
        },
        EngineCommand::Commit {
            submission,
            file_id,
        } => EngineEvent::CommitDone {
            submission,
            result: api.commit(&file_id).await,
        },
        EngineCommand::Progress {
            submission,
            file_id,
        } => EngineEvent::ProgressDone {
            submission,
            result: api.progress(&file_id).await,
        },
        EngineCommand::PreloadList {
            submission,
            file_id,
        } => EngineEvent::PreloadListDone {
            submission,
            result: api.preload_urls(&file_id).await,
        },
        EngineCommand::LoadTile { submission, url } => {
            let result = api.load_tile(&url).await;
            EngineEvent::TileDone {
                submission,
                url,
                result,
            }
        }
        EngineCommand::Hit => {
            if let Err(err) = api.hit().await {
                tracker_warn!("Hit notification failed: {}", err);
            }
            return;
        }
        EngineCommand::StartTicker { .. }
        | EngineCommand::StopTicker
        | EngineCommand::ScheduleRound { .. } => return,
    };
    let _ = event_tx.send(event);
}
