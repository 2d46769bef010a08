// Copyright (c) The Fusebox Project Authors.
// Licensed under the MIT License.

/// A snapshot of the counters a [`Breaker`][crate::Breaker] keeps for its
/// current generation.
///
/// Counts are cleared whenever a new generation begins: on every state change
/// and, while closed, at the end of each rolling interval. Outcomes reported
/// for calls admitted under an earlier generation are discarded and never
/// reach these counters.
///
/// The two streak counters are mutually exclusive: recording a success clears
/// `consecutive_failures`, and recording a failure clears
/// `consecutive_successes`, so at most one of them is nonzero at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct Counts {
    /// Number of calls admitted in the current generation.
    pub requests: u32,

    /// Number of successful outcomes recorded in the current generation.
    pub total_successes: u32,

    /// Number of failed outcomes recorded in the current generation.
    pub total_failures: u32,

    /// Length of the current run of successes.
    pub consecutive_successes: u32,

    /// Length of the current run of failures.
    pub consecutive_failures: u32,
}

impl Counts {
    pub(crate) fn record_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    pub(crate) fn record_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    pub(crate) fn record_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Counts: Send, Sync, Copy, Clone, Default, Eq, Debug);

    #[test]
    fn request_increments_only_requests() {
        let mut counts = Counts::default();

        counts.record_request();

        assert_eq!(counts.requests, 1);
        assert_eq!(counts.total_successes, 0);
        assert_eq!(counts.total_failures, 0);
    }

    #[test]
    fn success_clears_failure_streak() {
        let mut counts = Counts::default();

        counts.record_failure();
        counts.record_failure();
        counts.record_success();

        assert_eq!(counts.total_failures, 2);
        assert_eq!(counts.total_successes, 1);
        assert_eq!(counts.consecutive_successes, 1);
        assert_eq!(counts.consecutive_failures, 0);
    }

    #[test]
    fn failure_clears_success_streak() {
        let mut counts = Counts::default();

        counts.record_success();
        counts.record_success();
        counts.record_failure();

        assert_eq!(counts.total_successes, 2);
        assert_eq!(counts.total_failures, 1);
        assert_eq!(counts.consecutive_failures, 1);
        assert_eq!(counts.consecutive_successes, 0);
    }

    #[test]
    fn streaks_never_both_nonzero() {
        let mut counts = Counts::default();

        for i in 0..16 {
            if i % 3 == 0 {
                counts.record_failure();
            } else {
                counts.record_success();
            }
            assert!(counts.consecutive_successes == 0 || counts.consecutive_failures == 0);
        }
    }

    #[test]
    fn clear_resets_everything() {
        let mut counts = Counts::default();
        counts.record_request();
        counts.record_success();
        counts.record_failure();

        counts.clear();

        assert_eq!(counts, Counts::default());
    }
}
