//! Bookkeeping for the best-effort tile preload that follows a completed job.
//!
//! Tiles are loaded one at a time. The set of loaded URLs outlives individual
//! jobs so a tile is never fetched twice in one tracker session.

use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use crate::FileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreloadPhase {
    #[default]
    Inactive,
    /// Waiting for the list of available tiles.
    Listing,
    /// Loading the tiles of the current round, one at a time.
    Loading,
    /// Round finished; next round scheduled.
    Waiting,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreloadSet {
    loaded: BTreeSet<String>,
    queue: VecDeque<String>,
    in_flight: Option<String>,
    round_urls: Vec<String>,
    file_id: Option<FileId>,
    phase: PreloadPhase,
    rounds: u32,
    interval: Duration,
    fully_ready: bool,
}

/// What the caller should do once a round has drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RoundOutcome {
    pub became_fully_ready: bool,
    pub next_delay: Option<Duration>,
}

impl PreloadSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PreloadPhase {
        self.phase
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_fully_ready(&self) -> bool {
        self.fully_ready
    }

    pub fn is_loaded(&self, url: &str) -> bool {
        self.loaded.contains(url)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Tiles queued or in flight for the current round.
    pub fn pending_count(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight.is_some())
    }

    pub fn file_id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }

    /// Starts the first round for a freshly completed job.
    pub(crate) fn begin(&mut self, file_id: FileId, initial_interval: Duration) {
        self.stop();
        self.file_id = Some(file_id);
        self.interval = initial_interval;
        self.fully_ready = false;
        self.rounds = 1;
        self.phase = PreloadPhase::Listing;
    }

    /// Abandons any running round. The loaded set is kept.
    pub(crate) fn stop(&mut self) {
        self.queue.clear();
        self.in_flight = None;
        self.round_urls.clear();
        self.file_id = None;
        self.phase = PreloadPhase::Inactive;
        self.rounds = 0;
    }

    /// Moves a waiting preload into its next listing round.
    pub(crate) fn start_round(&mut self) -> bool {
        if self.phase != PreloadPhase::Waiting {
            return false;
        }
        self.rounds += 1;
        self.phase = PreloadPhase::Listing;
        true
    }

    /// Queues the URLs not yet loaded and returns the first one to fetch.
    ///
    /// `None` with `is_round_drained()` true means the round has nothing to do.
    pub(crate) fn accept_listing(&mut self, urls: Vec<String>) -> Option<String> {
        if self.phase != PreloadPhase::Listing {
            return None;
        }
        for url in &urls {
            let seen = self.loaded.contains(url) || self.queue.contains(url);
            if !seen {
                self.queue.push_back(url.clone());
            }
        }
        self.round_urls = urls;
        self.phase = PreloadPhase::Loading;
        self.advance()
    }

    /// Records a finished tile and returns the next one to fetch.
    pub(crate) fn mark_loaded(&mut self, url: &str) -> Option<String> {
        if !self.is_in_flight(url) {
            return None;
        }
        self.loaded.insert(url.to_string());
        self.in_flight = None;
        self.advance()
    }

    /// Skips a failed tile; it stays eligible for later rounds.
    pub(crate) fn mark_failed(&mut self, url: &str) -> Option<String> {
        if !self.is_in_flight(url) {
            return None;
        }
        self.in_flight = None;
        self.advance()
    }

    pub(crate) fn is_in_flight(&self, url: &str) -> bool {
        self.phase == PreloadPhase::Loading && self.in_flight.as_deref() == Some(url)
    }

    pub(crate) fn is_round_drained(&self) -> bool {
        self.phase == PreloadPhase::Loading && self.in_flight.is_none() && self.queue.is_empty()
    }

    /// Closes the current round: fires "fully ready" at most once, applies the
    /// backoff (never beyond `ceiling`) and decides whether another round
    /// follows.
    pub(crate) fn finish_round(
        &mut self,
        max_rounds: u32,
        ceiling: Option<Duration>,
    ) -> RoundOutcome {
        let round_complete = !self.round_urls.is_empty()
            && self.round_urls.iter().all(|url| self.loaded.contains(url));
        let became_fully_ready = round_complete && !self.fully_ready;
        if became_fully_ready {
            self.fully_ready = true;
        }

        if !self.loaded.is_empty() {
            self.interval = self.interval.saturating_mul(2);
            if let Some(ceiling) = ceiling {
                self.interval = self.interval.min(ceiling);
            }
        }

        let next_delay = if self.rounds < max_rounds {
            self.phase = PreloadPhase::Waiting;
            Some(self.interval)
        } else {
            self.phase = PreloadPhase::Inactive;
            None
        };

        RoundOutcome {
            became_fully_ready,
            next_delay,
        }
    }

    fn advance(&mut self) -> Option<String> {
        if self.in_flight.is_some() {
            return None;
        }
        let next = self.queue.pop_front()?;
        self.in_flight = Some(next.clone());
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn listing_dedupes_within_and_across_rounds() {
        let mut set = PreloadSet::new();
        set.begin("abc".into(), Duration::from_secs(1));

        assert_eq!(set.accept_listing(urls(&["a", "a", "b"])), Some("a".into()));
        assert_eq!(set.pending_count(), 2);
        assert_eq!(set.mark_loaded("a"), Some("b".into()));
        assert_eq!(set.mark_loaded("b"), None);
        assert!(set.is_round_drained());
        let outcome = set.finish_round(20, None);
        assert!(outcome.became_fully_ready);

        assert!(set.start_round());
        assert_eq!(set.accept_listing(urls(&["a", "b", "c"])), Some("c".into()));
        assert_eq!(set.mark_loaded("c"), None);
        assert_eq!(set.loaded_count(), 3);
    }

    #[test]
    fn out_of_turn_completion_is_ignored() {
        let mut set = PreloadSet::new();
        set.begin("abc".into(), Duration::from_secs(1));
        set.accept_listing(urls(&["a", "b"]));

        assert_eq!(set.mark_loaded("b"), None);
        assert!(!set.is_loaded("b"));
        assert_eq!(set.pending_count(), 2);
    }

    #[test]
    fn interval_only_doubles_after_something_loaded() {
        let mut set = PreloadSet::new();
        set.begin("abc".into(), Duration::from_secs(1));
        set.accept_listing(Vec::new());
        let outcome = set.finish_round(20, None);
        assert_eq!(outcome.next_delay, Some(Duration::from_secs(1)));
        assert!(!outcome.became_fully_ready);

        set.start_round();
        set.accept_listing(urls(&["a"]));
        set.mark_loaded("a");
        let outcome = set.finish_round(20, None);
        assert_eq!(outcome.next_delay, Some(Duration::from_secs(2)));
    }

    #[test]
    fn ceiling_caps_the_backoff() {
        let mut set = PreloadSet::new();
        set.begin("abc".into(), Duration::from_secs(1));
        let mut delays = Vec::new();
        for _ in 0..4 {
            set.accept_listing(urls(&["a"]));
            set.mark_loaded("a");
            delays.push(set.finish_round(20, Some(Duration::from_secs(4))).next_delay);
            set.start_round();
        }

        assert_eq!(
            delays,
            vec![
                Some(Duration::from_secs(2)),
                Some(Duration::from_secs(4)),
                Some(Duration::from_secs(4)),
                Some(Duration::from_secs(4)),
            ]
        );
        assert_eq!(set.interval(), Duration::from_secs(4));
    }

    #[test]
    fn failed_tile_is_retried_next_round() {
        let mut set = PreloadSet::new();
        set.begin("abc".into(), Duration::from_secs(1));
        assert_eq!(set.accept_listing(urls(&["a"])), Some("a".into()));
        assert_eq!(set.mark_failed("a"), None);
        let outcome = set.finish_round(20, None);
        assert!(!outcome.became_fully_ready);

        set.start_round();
        assert_eq!(set.accept_listing(urls(&["a"])), Some("a".into()));
    }

    #[test]
    fn last_round_ends_the_phase() {
        let mut set = PreloadSet::new();
        set.begin("abc".into(), Duration::from_secs(1));
        set.accept_listing(Vec::new());
        let outcome = set.finish_round(1, None);
        assert_eq!(outcome.next_delay, None);
        assert_eq!(set.phase(), PreloadPhase::Inactive);
        assert!(!set.start_round());
    }

    #[test]
    fn stop_keeps_loaded_urls() {
        let mut set = PreloadSet::new();
        set.begin("abc".into(), Duration::from_secs(1));
        set.accept_listing(urls(&["a", "b"]));
        set.mark_loaded("a");
        set.stop();

        assert_eq!(set.phase(), PreloadPhase::Inactive);
        assert_eq!(set.pending_count(), 0);
        assert!(set.is_loaded("a"));
    }
}
