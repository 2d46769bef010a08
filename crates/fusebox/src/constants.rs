// Copyright (c) The Fusebox Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

/// Default number of probe calls admitted while the breaker is half-open.
pub(crate) const DEFAULT_MAX_REQUESTS: u32 = 1;

/// Default rolling interval after which a closed breaker clears its counts.
///
/// Zero means the counts are never cleared while the breaker stays closed.
pub(crate) const DEFAULT_INTERVAL: Duration = Duration::ZERO;

/// Default cool-down an open breaker waits before admitting probe calls.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of consecutive failures beyond which the default trip predicate
/// opens the breaker.
pub(crate) const DEFAULT_CONSECUTIVE_FAILURES: u32 = 5;

pub(crate) const ERR_POISONED_LOCK: &str =
    "poisoned lock - cannot continue execution because the breaker state can no longer be trusted";
