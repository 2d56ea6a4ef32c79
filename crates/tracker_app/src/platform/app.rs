use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracker_core::{update, Job, JobState, Msg, TrackerState};
use tracker_engine::EngineHandle;
use tracker_logging::{level_from_verbosity, tracker_debug, tracker_info};

use super::cli::Cli;
use super::effects::EffectRunner;
use super::logging;
use super::render::Renderer;

const EVENT_WAIT: Duration = Duration::from_millis(250);

pub fn run_app() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log, level_from_verbosity(cli.verbose));

    let tracker_settings = cli.tracker_settings()?;
    let engine = EngineHandle::new(cli.api_settings()).context("failed to start engine")?;
    let runner = EffectRunner::new(engine);

    let mut session = Session::new(TrackerState::new(tracker_settings), runner);
    let mut pending: VecDeque<String> = cli.urls.into();
    let mut outcomes = Outcomes::default();

    loop {
        if session.state.is_settled() {
            outcomes.record(session.state.job());
        }
        match next_step(&session.state, !pending.is_empty()) {
            Step::SubmitNext => {
                if let Some(url) = pending.pop_front() {
                    session.dispatch(Msg::Submit(url));
                }
            }
            Step::Finish => break,
            Step::Wait => {
                if let Some(msg) = session.runner.next_msg(EVENT_WAIT) {
                    session.dispatch(msg);
                }
            }
        }
    }

    tracker_info!(
        "Finished: {} completed, {} not completed",
        outcomes.completed,
        outcomes.unfinished
    );
    if outcomes.unfinished > 0 {
        anyhow::bail!(
            "{} of {} downloads did not complete",
            outcomes.unfinished,
            outcomes.completed + outcomes.unfinished
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    SubmitNext,
    Finish,
    Wait,
}

/// A settled job hands over to the next URL at once, abandoning its preload.
/// The last job is waited on until its preload has nothing left to add.
fn next_step(state: &TrackerState, has_pending: bool) -> Step {
    if !state.is_settled() {
        Step::Wait
    } else if has_pending {
        Step::SubmitNext
    } else if state.is_finished() {
        Step::Finish
    } else {
        Step::Wait
    }
}

struct Session {
    state: TrackerState,
    runner: EffectRunner,
    renderer: Renderer,
}

impl Session {
    fn new(state: TrackerState, runner: EffectRunner) -> Self {
        Self {
            state,
            runner,
            renderer: Renderer::default(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        tracker_debug!("Dispatching {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.run(effects);
        if state.consume_dirty() {
            self.renderer.draw(&state.view());
        }
        self.state = state;
    }
}

#[derive(Debug, Default)]
struct Outcomes {
    last_recorded: u64,
    completed: usize,
    unfinished: usize,
}

impl Outcomes {
    /// Counts each settled job once; the idle placeholder is not a job.
    fn record(&mut self, job: &Job) {
        if job.submission == 0 || job.submission == self.last_recorded {
            return;
        }
        self.last_recorded = job.submission;
        match job.state {
            JobState::Completed(_) => self.completed += 1,
            _ => self.unfinished += 1,
        }
    }
}
