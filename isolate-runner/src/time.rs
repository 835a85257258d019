// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stopwatch for timing a run.
//!
//! Pairs a realtime clock (for the XML report timestamp) with a monotonic
//! clock (for elapsed times). The two reads happen imperceptibly close to
//! each other, which is good enough for our purposes.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

pub(crate) fn stopwatch() -> StopwatchStart {
    StopwatchStart {
        start_time: Local::now(),
        instant: Instant::now(),
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: DateTime<Local>,
    instant: Instant,
}

impl StopwatchStart {
    pub(crate) fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let start = stopwatch();
        std::thread::sleep(Duration::from_millis(10));
        let first = start.elapsed();
        let second = start.elapsed();
        assert!(first >= Duration::from_millis(10));
        assert!(second >= first);
    }
}
