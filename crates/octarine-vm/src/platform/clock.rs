// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Monotonic clock and sleep primitives.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Nanoseconds elapsed on a monotonic clock since its first use in this process.
#[must_use]
pub fn nano_timestamp() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Sleep for `millis` milliseconds.
///
/// A zero duration yields the rest of the time slice to the scheduler.
pub fn sleep_millis(millis: u64) {
    if millis == 0 {
        std::thread::yield_now();
    } else {
        std::thread::sleep(Duration::from_millis(millis));
    }
}

/// Sleep for at least `nanos` nanoseconds.
pub fn sleep_nanos(nanos: u64) {
    let start = nano_timestamp();
    std::thread::sleep(Duration::from_nanos(nanos));
    // Some platforms round short sleeps down; make up the difference.
    while nano_timestamp().saturating_sub(start) < nanos {
        std::thread::yield_now();
    }
}
