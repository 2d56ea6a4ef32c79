use std::time::Duration;

use url::Url;

/// Timing and presentation knobs for the tracker state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Cadence of progress polls while a job is downloading.
    pub poll_interval: Duration,
    /// Number of polls after which the tracker gives up watching a job.
    pub give_up_after: u32,
    /// Delay before the second preload round; doubles once tiles load.
    pub preload_initial_interval: Duration,
    /// Total number of preload list requests for one completed job.
    pub preload_max_rounds: u32,
    /// Upper bound for the doubling preload interval. `None` lets it grow
    /// for every round.
    pub preload_max_interval: Option<Duration>,
    /// Origin used to turn a site-relative result path into a full link.
    pub site_origin: Option<Url>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            give_up_after: 60,
            preload_initial_interval: Duration::from_secs(1),
            preload_max_rounds: 20,
            preload_max_interval: None,
            site_origin: None,
        }
    }
}

impl TrackerSettings {
    /// Resolves a result path returned by the server against `site_origin`.
    ///
    /// Paths that cannot be joined are returned unchanged.
    pub fn result_link(&self, result_url: &str) -> String {
        self.site_origin
            .as_ref()
            .and_then(|origin| origin.join(result_url).ok())
            .map(|joined| joined.to_string())
            .unwrap_or_else(|| result_url.to_string())
    }
}
