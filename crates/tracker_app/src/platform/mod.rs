//! Command-line front end: argument parsing, the dispatch loop and terminal
//! rendering around the tracker state machine.
mod app;
mod cli;
mod effects;
mod logging;
mod render;

pub use app::run_app;
