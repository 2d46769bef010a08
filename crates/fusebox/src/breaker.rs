// Copyright (c) The Fusebox Project Authors.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use tick::Clock;

use crate::builder::{Builder, Settings};
use crate::constants::ERR_POISONED_LOCK;
use crate::counts::Counts;
use crate::error::{Error, Rejection};
use crate::state::State;

/// A concurrency-safe circuit breaker guarding calls to an unreliable
/// operation.
///
/// The breaker tracks the outcomes of the calls it admits and moves between
/// [`Closed`][State::Closed], [`Open`][State::Open], and
/// [`HalfOpen`][State::HalfOpen] according to the configured policy. While
/// open, calls fail fast with [`Rejection::Open`] instead of reaching the
/// guarded operation; while half-open, a bounded number of probe calls test
/// whether the dependency has recovered.
///
/// A breaker is generic over the error type `E` of the operation it guards,
/// so the configured success classifier can inspect the concrete error.
///
/// # Generations
///
/// Counting happens per *generation*. A new generation begins on every state
/// change and, while closed, whenever the configured rolling interval
/// elapses. Each admitted call is bound to the generation it was admitted
/// under; outcomes reported for a superseded generation are silently
/// discarded, so slow in-flight calls cannot corrupt the counters of a later
/// window.
///
/// # Time
///
/// The breaker runs no background tasks. Time-driven transitions (open →
/// half-open, closed-interval count resets) are evaluated lazily against the
/// [`Clock`] whenever the breaker is observed - by an admission check, an
/// outcome report, or a [`state`][Self::state] query.
///
/// # Concurrency
///
/// All mutable state lives behind a single internal lock that is only held
/// for short, non-blocking bookkeeping sections. The guarded operation
/// itself always runs outside the lock, so a slow call never stalls other
/// callers' admission checks. Share a breaker across threads by wrapping it
/// in an `Arc`.
pub struct Breaker<E> {
    pub(crate) settings: Settings<E>,
    clock: Clock,
    shared: Mutex<Shared>,
}

#[derive(Debug)]
struct Shared {
    state: State,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

impl<E> Breaker<E> {
    /// Starts configuring a breaker with the given diagnostic name.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> Builder<E> {
        Builder::new(name.into())
    }

    pub(crate) fn from_settings(settings: Settings<E>, clock: &Clock) -> Self {
        let now = clock.instant();
        let expiry = if settings.interval.is_zero() {
            None
        } else {
            now.checked_add(settings.interval)
        };

        Self {
            settings,
            clock: clock.clone(),
            shared: Mutex::new(Shared {
                state: State::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry,
            }),
        }
    }

    /// Returns the breaker's diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Returns the current state, advancing any time-driven transition that
    /// is due.
    ///
    /// This is the only side effect of the query: an open breaker whose
    /// cool-down has elapsed moves to half-open, and a closed breaker whose
    /// rolling interval has elapsed starts a fresh counting window.
    #[must_use]
    pub fn state(&self) -> State {
        let now = self.clock.instant();

        let mut shared = self.lock();
        self.reconcile(&mut shared, now);
        shared.state
    }

    /// Returns a snapshot of the counters for the current generation.
    #[must_use]
    pub fn counts(&self) -> Counts {
        self.lock().counts
    }

    /// Runs `operation` under the breaker's protection.
    ///
    /// Admission is checked first; a rejected call returns without invoking
    /// the operation at all. An admitted operation runs outside the
    /// breaker's lock, its outcome is classified (an `Ok` is a success, an
    /// `Err` is passed to the configured classifier) and recorded against
    /// the generation the call was admitted under, and its result is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] when the breaker refuses the call, and
    /// [`Error::Operation`] carrying the operation's own error when the
    /// operation ran and failed.
    ///
    /// # Panics
    ///
    /// A panic in `operation` is not caught: the attempt is recorded as a
    /// failure and the panic propagates to the caller unchanged.
    pub fn call<T>(&self, operation: impl FnOnce() -> Result<T, E>) -> Result<T, Error<E>> {
        let generation = self.before_request().map_err(Error::Rejected)?;

        let guard = FailureGuard {
            breaker: Some(self),
            generation,
        };
        let result = operation();
        guard.disarm();

        let success = match &result {
            Ok(_) => true,
            Err(error) => self.settings.is_successful.call(error),
        };
        self.after_request(generation, success);

        result.map_err(Error::Operation)
    }

    /// Admission check: decides whether a call may proceed and returns the
    /// generation the caller is now bound to.
    pub(crate) fn before_request(&self) -> Result<u64, Rejection> {
        let now = self.clock.instant();

        let mut shared = self.lock();
        self.reconcile(&mut shared, now);

        match shared.state {
            State::Open => {
                #[cfg(any(feature = "logs", test))]
                self.log_rejected(State::Open);
                Err(Rejection::Open)
            }
            State::HalfOpen if shared.counts.requests >= self.settings.max_requests => {
                #[cfg(any(feature = "logs", test))]
                self.log_rejected(State::HalfOpen);
                Err(Rejection::TooManyRequests)
            }
            State::Closed | State::HalfOpen => {
                shared.counts.record_request();
                Ok(shared.generation)
            }
        }
    }

    /// Outcome report for a call admitted under `generation`. Reports for a
    /// superseded generation are discarded.
    pub(crate) fn after_request(&self, generation: u64, success: bool) {
        let now = self.clock.instant();

        let mut shared = self.lock();
        self.reconcile(&mut shared, now);
        if shared.generation != generation {
            return;
        }

        if success {
            self.on_success(&mut shared, now);
        } else {
            self.on_failure(&mut shared, now);
        }
    }

    fn on_success(&self, shared: &mut Shared, now: Instant) {
        match shared.state {
            State::Closed => shared.counts.record_success(),
            State::HalfOpen => {
                shared.counts.record_success();
                if shared.counts.consecutive_successes >= self.settings.max_requests {
                    self.transition(shared, State::Closed, now);
                }
            }
            // Open admits nothing, so a same-generation report cannot
            // observe it.
            State::Open => {}
        }
    }

    fn on_failure(&self, shared: &mut Shared, now: Instant) {
        match shared.state {
            State::Closed => {
                shared.counts.record_failure();
                if self.settings.ready_to_trip.call(shared.counts) {
                    self.transition(shared, State::Open, now);
                }
            }
            // A single failed probe aborts recovery.
            State::HalfOpen => self.transition(shared, State::Open, now),
            State::Open => {}
        }
    }

    /// Advances time-driven transitions that are due at `now`.
    fn reconcile(&self, shared: &mut Shared, now: Instant) {
        match shared.state {
            State::Closed => {
                if shared.expiry.is_some_and(|expiry| expiry < now) {
                    self.new_generation(shared, now);
                }
            }
            State::Open => {
                if shared.expiry.is_some_and(|expiry| expiry < now) {
                    self.transition(shared, State::HalfOpen, now);
                }
            }
            State::HalfOpen => {}
        }
    }

    fn transition(&self, shared: &mut Shared, to: State, now: Instant) {
        if shared.state == to {
            return;
        }

        let from = shared.state;
        shared.state = to;
        self.new_generation(shared, now);

        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "fusebox.breaker.state_changed",
            tracing::Level::INFO,
            breaker.name = %self.settings.name,
            breaker.from = from.as_str(),
            breaker.to = to.as_str(),
        );

        if let Some(hook) = &self.settings.on_state_change {
            hook.call(&self.settings.name, from, to);
        }
    }

    fn new_generation(&self, shared: &mut Shared, now: Instant) {
        shared.generation = shared.generation.wrapping_add(1);
        shared.counts.clear();
        shared.expiry = match shared.state {
            State::Closed if self.settings.interval.is_zero() => None,
            State::Closed => now.checked_add(self.settings.interval),
            State::Open => now.checked_add(self.settings.timeout),
            State::HalfOpen => None,
        };
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().expect(ERR_POISONED_LOCK)
    }

    #[cfg(any(feature = "logs", test))]
    fn log_rejected(&self, state: State) {
        tracing::event!(
            name: "fusebox.breaker.rejected",
            tracing::Level::WARN,
            breaker.name = %self.settings.name,
            breaker.state = state.as_str(),
        );
    }
}

impl<E> fmt::Debug for Breaker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Breaker")
            .field("name", &self.settings.name)
            .field("shared", &self.shared)
            .finish_non_exhaustive()
    }
}

/// Records the attempt as a failure if the operation unwinds before its
/// outcome could be classified. Disarmed on the normal return path.
struct FailureGuard<'a, E> {
    breaker: Option<&'a Breaker<E>>,
    generation: u64,
}

impl<E> FailureGuard<'_, E> {
    fn disarm(mut self) {
        self.breaker = None;
    }
}

impl<E> Drop for FailureGuard<'_, E> {
    fn drop(&mut self) {
        if let Some(breaker) = self.breaker.take() {
            breaker.after_request(self.generation, false);
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "no need to be strict in tests")]

    use std::fmt::Debug;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use static_assertions::assert_impl_all;
    use tick::ClockControl;

    use super::*;

    assert_impl_all!(Breaker<&'static str>: Send, Sync, Debug);

    fn breaker(clock: &Clock) -> Breaker<&'static str> {
        Breaker::builder("test").build(clock)
    }

    /// Drives a breaker with default settings into the open state.
    fn open_breaker(breaker: &Breaker<&'static str>) {
        for _ in 0..6 {
            let _unused = breaker.call(|| Err::<(), _>("boom"));
        }
        assert_eq!(breaker.state(), State::Open);
    }

    #[test]
    fn starts_closed_with_zeroed_counts() {
        let breaker = breaker(&Clock::new_frozen());

        assert_eq!(breaker.state(), State::Closed);
        assert_eq!(breaker.counts(), Counts::default());
        assert_eq!(breaker.name(), "test");
    }

    #[test]
    fn admission_in_closed_counts_the_request() {
        let breaker = breaker(&Clock::new_frozen());

        let generation = breaker.before_request().unwrap();

        assert_eq!(generation, 0);
        assert_eq!(breaker.counts().requests, 1);
    }

    #[test]
    fn six_consecutive_failures_trip_the_breaker() {
        let breaker = breaker(&Clock::new_frozen());

        for _ in 0..5 {
            let _unused = breaker.call(|| Err::<(), _>("boom"));
        }
        assert_eq!(breaker.state(), State::Closed);

        let _unused = breaker.call(|| Err::<(), _>("boom"));
        assert_eq!(breaker.state(), State::Open);
    }

    #[test]
    fn open_rejects_without_running_the_operation() {
        let breaker = breaker(&Clock::new_frozen());
        open_breaker(&breaker);

        let invoked = AtomicUsize::new(0);
        let result = breaker.call(|| {
            invoked.fetch_add(1, Ordering::Relaxed);
            Ok::<_, &'static str>(1)
        });

        assert!(matches!(result, Err(Error::Rejected(Rejection::Open))));
        assert_eq!(invoked.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn cooldown_must_fully_elapse_before_probing() {
        let control = ClockControl::new();
        let breaker = breaker(&control.to_clock());
        open_breaker(&breaker);

        control.advance(Duration::from_secs(59));
        assert_eq!(breaker.state(), State::Open);

        // The boundary itself is not past the expiry yet.
        control.advance(Duration::from_secs(1));
        assert_eq!(breaker.state(), State::Open);

        control.advance(Duration::from_secs(1));
        assert_eq!(breaker.state(), State::HalfOpen);
    }

    #[test]
    fn half_open_caps_admitted_probes() {
        let control = ClockControl::new();
        let breaker = breaker(&control.to_clock());
        open_breaker(&breaker);
        control.advance(Duration::from_secs(61));

        let first = breaker.before_request();
        let second = breaker.before_request();

        assert!(first.is_ok());
        assert_eq!(second, Err(Rejection::TooManyRequests));
    }

    #[test]
    fn probe_successes_close_the_breaker() {
        let control = ClockControl::new();
        let breaker: Breaker<&'static str> = Breaker::builder("test")
            .max_requests(2)
            .timeout(Duration::from_secs(10))
            .build(&control.to_clock());

        for _ in 0..6 {
            let _unused = breaker.call(|| Err::<(), _>("boom"));
        }
        control.advance(Duration::from_secs(11));
        assert_eq!(breaker.state(), State::HalfOpen);

        let first = breaker.before_request().unwrap();
        let second = breaker.before_request().unwrap();
        breaker.after_request(first, true);
        assert_eq!(breaker.state(), State::HalfOpen);
        breaker.after_request(second, true);

        assert_eq!(breaker.state(), State::Closed);
        assert_eq!(breaker.counts(), Counts::default());
    }

    #[test]
    fn single_probe_failure_reopens_the_breaker() {
        let control = ClockControl::new();
        let breaker = breaker(&control.to_clock());
        open_breaker(&breaker);
        control.advance(Duration::from_secs(61));
        assert_eq!(breaker.state(), State::HalfOpen);

        let generation = breaker.before_request().unwrap();
        breaker.after_request(generation, false);

        assert_eq!(breaker.state(), State::Open);
    }

    #[test]
    fn stale_generation_report_is_discarded() {
        let breaker: Breaker<&'static str> = Breaker::builder("test")
            .ready_to_trip(|counts| counts.consecutive_failures >= 1)
            .build(&Clock::new_frozen());

        let stale = breaker.before_request().unwrap();
        let _unused = breaker.call(|| Err::<(), _>("boom"));
        assert_eq!(breaker.state(), State::Open);

        // The late success belongs to the pre-trip generation.
        breaker.after_request(stale, true);

        assert_eq!(breaker.state(), State::Open);
        assert_eq!(breaker.counts(), Counts::default());
    }

    #[test]
    fn interval_elapse_resets_counts_without_notification() {
        let transitions = std::sync::Arc::new(AtomicUsize::new(0));
        let hook_count = std::sync::Arc::clone(&transitions);

        let control = ClockControl::new();
        let breaker: Breaker<&'static str> = Breaker::builder("test")
            .interval(Duration::from_secs(30))
            .on_state_change(move |_, _, _| {
                hook_count.fetch_add(1, Ordering::Relaxed);
            })
            .build(&control.to_clock());

        let _unused = breaker.call(|| Ok::<_, &'static str>(1));
        assert_eq!(breaker.counts().total_successes, 1);

        control.advance(Duration::from_secs(31));
        assert_eq!(breaker.state(), State::Closed);
        assert_eq!(breaker.counts(), Counts::default());
        assert_eq!(transitions.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn call_passes_results_and_errors_through() {
        let breaker = breaker(&Clock::new_frozen());

        assert_eq!(breaker.call(|| Ok::<_, &'static str>(7)), Ok(7));
        assert_eq!(
            breaker.call(|| Err::<i32, _>("boom")),
            Err(Error::Operation("boom"))
        );

        let counts = breaker.counts();
        assert_eq!(counts.requests, 2);
        assert_eq!(counts.total_successes, 1);
        assert_eq!(counts.total_failures, 1);
    }

    #[test]
    fn classifier_can_count_an_error_as_success() {
        let breaker: Breaker<&'static str> = Breaker::builder("test")
            .is_successful(|error| *error == "cancelled")
            .build(&Clock::new_frozen());

        let result = breaker.call(|| Err::<(), _>("cancelled"));

        // The error is returned unchanged even though it counted as a success.
        assert_eq!(result, Err(Error::Operation("cancelled")));
        assert_eq!(breaker.counts().total_successes, 1);
        assert_eq!(breaker.counts().total_failures, 0);
    }

    #[test]
    fn panic_in_operation_is_recorded_as_failure_and_propagates() {
        let breaker = breaker(&Clock::new_frozen());

        let unwound = catch_unwind(AssertUnwindSafe(|| {
            let _unused = breaker.call(|| -> Result<(), &'static str> { panic!("boom") });
        }));

        assert!(unwound.is_err());
        let counts = breaker.counts();
        assert_eq!(counts.requests, 1);
        assert_eq!(counts.total_failures, 1);
        assert_eq!(counts.consecutive_failures, 1);
    }

    #[test]
    fn hook_observes_every_transition_in_order() {
        let log = std::sync::Arc::new(Mutex::new(Vec::new()));
        let hook_log = std::sync::Arc::clone(&log);

        let control = ClockControl::new();
        let breaker: Breaker<&'static str> = Breaker::builder("payments")
            .max_requests(1)
            .timeout(Duration::from_secs(10))
            .on_state_change(move |name, from, to| {
                hook_log.lock().unwrap().push((name.to_string(), from, to));
            })
            .build(&control.to_clock());

        for _ in 0..6 {
            let _unused = breaker.call(|| Err::<(), _>("boom"));
        }
        control.advance(Duration::from_secs(11));
        assert_eq!(breaker.state(), State::HalfOpen);
        let _unused = breaker.call(|| Ok::<_, &'static str>(1));

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                ("payments".to_string(), State::Closed, State::Open),
                ("payments".to_string(), State::Open, State::HalfOpen),
                ("payments".to_string(), State::HalfOpen, State::Closed),
            ]
        );
    }

    #[test]
    fn counts_query_is_a_plain_snapshot() {
        let control = ClockControl::new();
        let breaker: Breaker<&'static str> = Breaker::builder("test")
            .interval(Duration::from_secs(30))
            .build(&control.to_clock());

        let _unused = breaker.call(|| Ok::<_, &'static str>(1));
        control.advance(Duration::from_secs(31));

        // The counts query alone does not advance the window.
        assert_eq!(breaker.counts().total_successes, 1);

        // Observing the state does.
        assert_eq!(breaker.state(), State::Closed);
        assert_eq!(breaker.counts(), Counts::default());
    }
}
