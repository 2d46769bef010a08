// Copyright (c) The Fusebox Project Authors.
// Licensed under the MIT License.

use std::fmt::{self, Display};

/// The reason a [`Breaker`][crate::Breaker] refused to admit a call.
///
/// Rejections are produced by the admission check only; once a call has been
/// admitted, the breaker never fails it. Rejected calls fail fast: the
/// guarded operation is not invoked at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The breaker is open; all calls are rejected until the cool-down
    /// elapses.
    Open,

    /// The breaker is half-open and the probe cap for the current generation
    /// has already been reached.
    TooManyRequests,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("circuit breaker is open"),
            Self::TooManyRequests => f.write_str("too many requests"),
        }
    }
}

impl std::error::Error for Rejection {}

/// The error returned by [`Breaker::call`][crate::Breaker::call].
///
/// Distinguishes calls the breaker rejected at admission from calls that ran
/// and failed. An [`Operation`][Self::Operation] error is the guarded
/// operation's own error, passed through unchanged - even when the configured
/// success classifier decided it should be counted as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// The call was rejected at admission; the operation never ran.
    Rejected(Rejection),

    /// The operation ran and returned this error.
    Operation(E),
}

impl<E> Error<E> {
    /// Returns the rejection reason, if the call was rejected at admission.
    #[must_use]
    pub const fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(rejection) => Some(*rejection),
            Self::Operation(_) => None,
        }
    }
}

impl<E> From<Rejection> for Error<E> {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl<E: Display> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(rejection) => Display::fmt(rejection, f),
            Self::Operation(error) => Display::fmt(error, f),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Error<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(_) => None,
            Self::Operation(error) => error.source(),
        }
    }
}
