// Copyright (c) The Fusebox Project Authors.
// Licensed under the MIT License.

use crate::breaker::Breaker;
use crate::counts::Counts;
use crate::error::Rejection;
use crate::state::State;

/// A [`Breaker`] adapter that splits the call protocol into an explicit
/// admission step and a separate outcome report.
///
/// [`Breaker::call`] suits operations expressible as a single closure. When
/// the work cannot be shaped that way - the outcome arrives through a
/// completion signal, a stream ends much later, the call spans an await
/// point in foreign code - use [`allow`][Self::allow] to perform only the
/// admission check. On success it hands back a [`Permit`] bound to the
/// admitted generation; report the outcome through the permit once it is
/// known.
///
/// ```rust
/// use fusebox::{Breaker, TwoStepBreaker};
/// use tick::Clock;
///
/// # fn example(clock: &Clock) {
/// let breaker = TwoStepBreaker::new(
///     Breaker::<std::io::Error>::builder("ledger").build(clock),
/// );
///
/// match breaker.allow() {
///     Ok(permit) => {
///         // Start the work; once its outcome is known:
///         permit.report(true);
///     }
///     Err(_rejection) => {
///         // Fail fast without touching the downstream dependency.
///     }
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct TwoStepBreaker<E> {
    inner: Breaker<E>,
}

impl<E> TwoStepBreaker<E> {
    /// Wraps a breaker in the two-step protocol.
    #[must_use]
    pub fn new(breaker: Breaker<E>) -> Self {
        Self { inner: breaker }
    }

    /// Returns the wrapped breaker.
    #[must_use]
    pub fn into_inner(self) -> Breaker<E> {
        self.inner
    }

    /// Returns the breaker's diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the current state, advancing any time-driven transition that
    /// is due.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.state()
    }

    /// Returns a snapshot of the counters for the current generation.
    #[must_use]
    pub fn counts(&self) -> Counts {
        self.inner.counts()
    }

    /// Performs the admission check and returns a [`Permit`] for reporting
    /// the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] when the breaker refuses the call; no
    /// permit is issued and nothing needs to be reported.
    pub fn allow(&self) -> Result<Permit<'_, E>, Rejection> {
        let generation = self.inner.before_request()?;
        Ok(Permit {
            breaker: &self.inner,
            generation,
        })
    }
}

/// An admitted call waiting for its outcome to be reported.
///
/// The permit captures the generation it was admitted under by value;
/// reporting consumes the permit, so an outcome cannot be reported twice.
/// Reporting after the breaker has moved to a new generation is silently
/// discarded.
///
/// Dropping a permit without reporting is a caller contract violation the
/// breaker does not detect: the admission stays counted against the current
/// generation, which in the half-open state permanently consumes one of the
/// generation's probe slots.
#[derive(Debug)]
#[must_use = "an admitted call must have its outcome reported through the permit"]
pub struct Permit<'a, E> {
    breaker: &'a Breaker<E>,
    generation: u64,
}

impl<E> Permit<'_, E> {
    /// Reports whether the admitted call succeeded.
    pub fn report(self, success: bool) {
        self.breaker.after_request(self.generation, success);
    }
}
