// Copyright (c) The Fusebox Project Authors.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A concurrency-safe circuit breaker for guarding calls to unreliable
//! operations.
//!
//! A circuit breaker sits in front of an operation that may fail - a network
//! call, a database query, anything fallible - and tracks its recent
//! outcomes. When failures accumulate past a configurable policy, the
//! breaker *trips*: further calls fail fast without touching the downstream
//! dependency, giving it time to recover. After a cool-down the breaker
//! admits a bounded amount of probe traffic to test the waters, and closes
//! again once the probes succeed.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use fusebox::{Breaker, Error};
//! use tick::Clock;
//!
//! # fn example(clock: &Clock) {
//! let breaker: Breaker<std::io::Error> = Breaker::builder("payments")
//!     .timeout(Duration::from_secs(30))
//!     .build(clock);
//!
//! match breaker.call(|| fetch_balance()) {
//!     Ok(balance) => println!("balance: {balance}"),
//!     Err(Error::Rejected(rejection)) => println!("failed fast: {rejection}"),
//!     Err(Error::Operation(error)) => println!("operation failed: {error}"),
//! }
//! # }
//! # fn fetch_balance() -> Result<u64, std::io::Error> { Ok(42) }
//! ```
//!
//! > **Note**: The breaker takes its time from a [`Clock`][tick::Clock]
//! > provided by the [`tick`] crate. In tests, construct the breaker from a
//! > controlled clock to drive time-based transitions deterministically; see
//! > [Testing](#testing).
//!
//! # States and Transitions
//!
//! The breaker operates in three states:
//!
//! ```text
//! ┌────────┐      Trip predicate fires       ┌──────────┐
//! │ Closed │ ───────────────────────────────▶│   Open   │
//! └────────┘                                 └──────────┘
//!      ▲                                            │
//!      │                                            │
//!      │          ┌────────────────┐                │
//!      └──────────│   Half-Open    │◀───────────────┘
//!      Probing    └────────────────┘     Cool-down
//!      successful                        elapsed
//! ```
//!
//! - **Closed**: calls pass through and their outcomes are counted. After a
//!   failure, the configured trip predicate inspects the [`Counts`]; when it
//!   fires, the breaker opens.
//! - **Open**: calls are rejected with [`Rejection::Open`] without invoking
//!   the operation. Once the cool-down elapses the breaker moves to
//!   half-open.
//! - **Half-Open**: up to `max_requests` probe calls are admitted per
//!   counting window; further admissions are rejected with
//!   [`Rejection::TooManyRequests`]. A run of `max_requests` consecutive
//!   probe successes closes the breaker; a single probe failure reopens it.
//!
//! There is no background timer: time-driven transitions happen lazily,
//! whenever the breaker is next observed by an admission check, an outcome
//! report, or a state query.
//!
//! # Generations
//!
//! Counters are scoped to a *generation* that changes on every state
//! transition (and, while closed, at every rolling-interval elapse). A call
//! is bound to the generation it was admitted under; if the breaker has
//! moved on by the time the call's outcome arrives, the report is silently
//! discarded. Slow in-flight calls from a previous window therefore never
//! distort the current window's counts.
//!
//! # Two-Step Protocol
//!
//! When the guarded work cannot be expressed as a single closure - the
//! outcome arrives via a completion signal or on another thread - use
//! [`TwoStepBreaker`]: [`allow`][TwoStepBreaker::allow] performs only the
//! admission check and returns a [`Permit`] whose
//! [`report`][Permit::report] records the outcome later.
//!
//! # Defaults
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `max_requests` | `1` | Probe calls admitted per half-open window |
//! | `interval` | `0` (never) | Rolling count-reset period while closed |
//! | `timeout` | `60s` | Cool-down before an open breaker probes |
//! | `ready_to_trip` | > 5 consecutive failures | Closed → Open condition |
//! | `is_successful` | every error fails | Outcome classification |
//! | `on_state_change` | none | Transition notification hook |
//!
//! See [`Builder`] for details on each option.
//!
//! # Concurrency
//!
//! A breaker (and its two-step adapter) is `Send + Sync`; share one instance
//! across threads with an `Arc`. Internally all bookkeeping happens in short
//! critical sections behind a single lock, and the guarded operation always
//! runs outside that lock. The half-open probe cap bounds *concurrently
//! admitted* probes, not completed ones, so probe traffic stays limited no
//! matter how many callers pile up.
//!
//! # Testing
//!
//! Because the breaker reads time only through its clock, tests can jump
//! through cool-downs instantly with [`ClockControl`][tick::ClockControl]
//! (enable tick's `test-util` feature in `dev-dependencies`):
//!
//! ```rust
//! use std::time::Duration;
//!
//! use fusebox::{Breaker, State};
//! use tick::ClockControl;
//!
//! let control = ClockControl::new();
//! let breaker: Breaker<std::io::Error> = Breaker::builder("flaky")
//!     .timeout(Duration::from_secs(30))
//!     .build(&control.to_clock());
//!
//! for _ in 0..6 {
//!     let _ = breaker.call(|| Err::<(), _>(std::io::Error::other("down")));
//! }
//! assert_eq!(breaker.state(), State::Open);
//!
//! control.advance(Duration::from_secs(31));
//! assert_eq!(breaker.state(), State::HalfOpen);
//! ```
//!
//! # Features
//!
//! - **`logs`** - Emits [tracing](https://crates.io/crates/tracing) events
//!   on state transitions and rejected calls.
//! - **`serde`** - Adds serialization support for [`State`] and [`Counts`]
//!   via [serde](https://serde.rs/).

mod breaker;
mod builder;
mod callbacks;
mod constants;
mod counts;
mod error;
mod state;
mod two_step;

pub use breaker::Breaker;
pub use builder::Builder;
pub use counts::Counts;
pub use error::{Error, Rejection};
pub use state::State;
pub use two_step::{Permit, TwoStepBreaker};
