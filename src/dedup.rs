//! Duplicate transcript suppression
//!
//! Continuous recognition can deliver the same final transcript twice when
//! the engine restarts mid-utterance. The suppressor remembers the last
//! accepted transcript (normalized) and rejects an identical one until the
//! suppression window that started at acceptance has elapsed.

use crate::command::parser::normalize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default suppression window
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(2000);

/// Last accepted transcript
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuppressedTranscript {
    /// Normalized text
    pub text: String,
    /// When it was accepted
    pub accepted_at: Instant,
}

/// Identity-based duplicate filter with an expiring memory
#[derive(Clone, Debug)]
pub struct DuplicateSuppressor {
    window: Duration,
    last: Option<SuppressedTranscript>,
}

impl Default for DuplicateSuppressor {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_WINDOW)
    }
}

impl DuplicateSuppressor {
    /// Create a suppressor with the given window
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// The suppression window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Last accepted transcript, if still remembered
    pub fn last(&self) -> Option<&SuppressedTranscript> {
        self.last.as_ref()
    }

    /// When the remembered transcript will be forgotten
    pub fn deadline(&self) -> Option<Instant> {
        self.last.as_ref().map(|l| l.accepted_at + self.window)
    }

    /// Forget the remembered transcript once its window has elapsed
    pub fn expire(&mut self, now: Instant) {
        if self.deadline().is_some_and(|deadline| now >= deadline) {
            debug!("Suppression window elapsed");
            self.last = None;
        }
    }

    /// Decide whether a final transcript should be processed
    ///
    /// Returns `true` and remembers the transcript when accepted. An identical
    /// transcript inside the window is rejected; rejection does not extend
    /// the window.
    pub fn accept(&mut self, transcript: &str, now: Instant) -> bool {
        self.expire(now);

        let normalized = normalize(transcript);
        if self.last.as_ref().is_some_and(|l| l.text == normalized) {
            debug!("Suppressing duplicate transcript '{}'", normalized);
            return false;
        }

        self.last = Some(SuppressedTranscript {
            text: normalized,
            accepted_at: now,
        });
        true
    }

    /// Drop the remembered transcript and its pending expiry
    pub fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_inside_window_rejected() {
        let mut dedup = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(dedup.accept("Check balance", t0));
        assert!(!dedup.accept("check balance ", t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_duplicate_after_window_accepted() {
        let mut dedup = DuplicateSuppressor::new(Duration::from_secs(2));
        let t0 = Instant::now();

        assert!(dedup.accept("check balance", t0));
        assert!(dedup.accept("check balance", t0 + Duration::from_secs(2)));
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let mut dedup = DuplicateSuppressor::new(Duration::from_secs(2));
        let t0 = Instant::now();

        assert!(dedup.accept("connect", t0));
        assert!(!dedup.accept("connect", t0 + Duration::from_millis(1900)));
        assert!(dedup.accept("connect", t0 + Duration::from_millis(2100)));
    }

    #[test]
    fn test_different_transcript_accepted() {
        let mut dedup = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(dedup.accept("connect", t0));
        assert!(dedup.accept("check balance", t0));
        // The newer transcript replaced the older one
        assert!(dedup.accept("connect", t0));
    }

    #[test]
    fn test_clear_forgets() {
        let mut dedup = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(dedup.accept("connect", t0));
        dedup.clear();
        assert!(dedup.last().is_none());
        assert!(dedup.accept("connect", t0));
    }

    #[test]
    fn test_deadline_and_expire() {
        let mut dedup = DuplicateSuppressor::new(Duration::from_secs(1));
        let t0 = Instant::now();
        assert_eq!(dedup.deadline(), None);

        dedup.accept("send 1 eth", t0);
        assert_eq!(dedup.deadline(), Some(t0 + Duration::from_secs(1)));

        dedup.expire(t0 + Duration::from_millis(999));
        assert!(dedup.last().is_some());
        dedup.expire(t0 + Duration::from_secs(1));
        assert!(dedup.last().is_none());
    }
}
