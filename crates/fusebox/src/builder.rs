// Copyright (c) The Fusebox Project Authors.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use tick::Clock;

use crate::callbacks::{IsSuccessful, OnStateChange, ReadyToTrip};
use crate::constants::{DEFAULT_CONSECUTIVE_FAILURES, DEFAULT_INTERVAL, DEFAULT_MAX_REQUESTS, DEFAULT_TIMEOUT};
use crate::{Breaker, Counts, State};

/// Configures and constructs a [`Breaker`].
///
/// Created via [`Breaker::builder`]. Every option has a default, so the
/// minimal configuration is just a name and a clock:
///
/// ```rust
/// use fusebox::Breaker;
/// use tick::Clock;
///
/// # fn example(clock: &Clock) {
/// let breaker: Breaker<std::io::Error> = Breaker::builder("payments").build(clock);
/// # }
/// ```
///
/// # Defaults
///
/// | Option | Default | Meaning of the default |
/// |--------|---------|------------------------|
/// | [`max_requests`][Self::max_requests] | `1` | One probe call at a time while half-open |
/// | [`interval`][Self::interval] | `0` | Counts are never cleared while closed |
/// | [`timeout`][Self::timeout] | `60s` | Cool-down before an open breaker starts probing |
/// | [`ready_to_trip`][Self::ready_to_trip] | more than 5 consecutive failures | When a closed breaker opens |
/// | [`is_successful`][Self::is_successful] | every error is a failure | How reported errors are classified |
/// | [`on_state_change`][Self::on_state_change] | none | State transition notifications |
#[must_use]
pub struct Builder<E> {
    name: Cow<'static, str>,
    max_requests: u32,
    interval: Duration,
    timeout: Duration,
    ready_to_trip: Option<ReadyToTrip>,
    is_successful: Option<IsSuccessful<E>>,
    on_state_change: Option<OnStateChange>,
}

impl<E> Builder<E> {
    pub(crate) fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            max_requests: DEFAULT_MAX_REQUESTS,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            ready_to_trip: None,
            is_successful: None,
            on_state_change: None,
        }
    }

    /// Sets the number of calls admitted while the breaker is half-open.
    ///
    /// This caps concurrently admitted probe traffic per generation,
    /// independent of how many callers share the breaker. `0` is treated as
    /// `1`. Defaults to `1`.
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = if max_requests == 0 { DEFAULT_MAX_REQUESTS } else { max_requests };
        self
    }

    /// Sets the rolling interval after which a closed breaker clears its
    /// counts.
    ///
    /// [`Duration::ZERO`] means the counts are never cleared while the
    /// breaker stays closed. Defaults to zero.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the cool-down an open breaker waits before admitting probe
    /// calls.
    ///
    /// [`Duration::ZERO`] selects the default of 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        self
    }

    /// Sets the predicate that decides when a closed breaker trips open.
    ///
    /// The predicate is evaluated with the current [`Counts`] after every
    /// failure recorded in the closed state. Defaults to tripping after more
    /// than 5 consecutive failures.
    pub fn ready_to_trip<F>(mut self, ready_to_trip: F) -> Self
    where
        F: Fn(Counts) -> bool + Send + Sync + 'static,
    {
        self.ready_to_trip = Some(ReadyToTrip::new(ready_to_trip));
        self
    }

    /// Sets the classifier applied to errors reported by the guarded
    /// operation.
    ///
    /// Returning `true` records the attempt as a success even though the
    /// error is still returned to the caller unchanged; use this to keep
    /// expected errors (cancellation, not-found, ...) from tripping the
    /// breaker. Defaults to classifying every error as a failure.
    pub fn is_successful<F>(mut self, is_successful: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.is_successful = Some(IsSuccessful::new(is_successful));
        self
    }

    /// Sets a hook invoked on every state transition with the breaker's
    /// name, the previous state, and the new state.
    ///
    /// The hook runs synchronously while the breaker's internal lock is
    /// held, after the transition has been committed. It must not call back
    /// into the breaker; doing so deadlocks. Keep it short - every caller
    /// of the breaker waits while it runs.
    pub fn on_state_change<F>(mut self, on_state_change: F) -> Self
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        self.on_state_change = Some(OnStateChange::new(on_state_change));
        self
    }

    /// Builds the breaker, substituting defaults for unset options.
    ///
    /// The breaker starts closed with zeroed counts. The clock is the
    /// breaker's only source of time; pass a controlled clock in tests to
    /// drive time-based transitions deterministically.
    pub fn build(self, clock: &Clock) -> Breaker<E> {
        let settings = Settings {
            name: self.name,
            max_requests: self.max_requests,
            interval: self.interval,
            timeout: self.timeout,
            ready_to_trip: self
                .ready_to_trip
                .unwrap_or_else(|| ReadyToTrip::new(|counts| counts.consecutive_failures > DEFAULT_CONSECUTIVE_FAILURES)),
            is_successful: self.is_successful.unwrap_or_else(|| IsSuccessful::new(|_| false)),
            on_state_change: self.on_state_change,
        };

        Breaker::from_settings(settings, clock)
    }
}

impl<E> fmt::Debug for Builder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("name", &self.name)
            .field("max_requests", &self.max_requests)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Resolved breaker configuration, immutable after construction.
pub(crate) struct Settings<E> {
    pub(crate) name: Cow<'static, str>,
    pub(crate) max_requests: u32,
    pub(crate) interval: Duration,
    pub(crate) timeout: Duration,
    pub(crate) ready_to_trip: ReadyToTrip,
    pub(crate) is_successful: IsSuccessful<E>,
    pub(crate) on_state_change: Option<OnStateChange>,
}
