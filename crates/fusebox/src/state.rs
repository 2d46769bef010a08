// Copyright (c) The Fusebox Project Authors.
// Licensed under the MIT License.

use std::fmt::{self, Display};

/// The operating state of a [`Breaker`][crate::Breaker].
///
/// A breaker moves between three states based on the outcomes it records and
/// the passage of time:
///
/// - [`Closed`][Self::Closed]: normal operation, calls pass through.
/// - [`Open`][Self::Open]: calls are rejected without running the guarded
///   operation.
/// - [`HalfOpen`][Self::HalfOpen]: a bounded number of probe calls are
///   admitted to test whether the downstream dependency has recovered.
///
/// State transitions are driven lazily: the breaker reconciles its state
/// against the clock whenever it is observed, so no background timer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum State {
    /// Normal operation; calls are admitted and their outcomes counted.
    Closed,

    /// Recovery testing; a limited number of probe calls are admitted.
    HalfOpen,

    /// The breaker has tripped; all calls are rejected until the cool-down
    /// elapses.
    Open,
}

impl State {
    /// Returns the state as a static lowercase string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::HalfOpen => "half-open",
            Self::Open => "open",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
