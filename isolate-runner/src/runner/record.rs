// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test runtime state.
//!
//! A [`TestRecord`] exists from the moment a child is spawned until it is
//! reaped and classified, at which point it is released into the finished
//! collection as a [`FinishedTest`].

use crate::list::TestCase;
use std::{
    io::{self, PipeReader, Read},
    process::{Child, ExitStatus},
    time::{Duration, Instant},
};

/// Size of a single non-blocking read from a child's output pipe.
const READ_BUFFER_SIZE: usize = 2048;

/// How long to keep draining a reaped child's pipe before giving up on a
/// wedged writer.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Classification of a finished test.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum TestResult {
    /// Exited with code 0.
    Pass,
    /// Exited non-zero or was terminated by a signal.
    Fail,
    /// Exceeded the deadline and was killed.
    Timeout,
    /// Expected to fail, and did.
    Xfail,
    /// Expected to fail, but passed.
    Xpass,
}

/// Outcome of a single non-blocking read.
pub(super) enum ReadStatus {
    /// The pipe may produce more data.
    KeepOpen,
    /// EOF; the read end has been closed.
    Closed,
}

/// Outcome of draining a reaped child's pipe.
pub(super) enum DrainResult {
    /// EOF was reached.
    Drained,
    /// The pipe was still open after the drain timeout.
    Wedged,
}

/// All runtime state for one spawned test.
#[derive(Debug)]
pub(super) struct TestRecord {
    pub(super) test: TestCase,
    /// The displayed identifier, `<suite><name>`.
    pub(super) name: String,
    /// Position in the catalog.
    pub(super) test_index: usize,
    /// Worker slot occupied while running.
    pub(super) slot: usize,
    pub(super) child: Child,
    reader: Option<PipeReader>,
    start: Instant,
    time_taken: Option<Duration>,
    output: Vec<u8>,
    pub(super) result: Option<TestResult>,
    pub(super) slow: bool,
}

impl TestRecord {
    pub(super) fn new(
        test: TestCase,
        test_index: usize,
        slot: usize,
        child: Child,
        reader: PipeReader,
    ) -> Self {
        let name = test.full_name();
        Self {
            test,
            name,
            test_index,
            slot,
            child,
            reader: Some(reader),
            start: Instant::now(),
            time_taken: None,
            output: Vec::new(),
            result: None,
            slow: false,
        }
    }

    /// Wall-clock time since spawn.
    pub(super) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stops the record's clock. Called exactly once, at reap.
    pub(super) fn stop(&mut self) {
        self.time_taken = Some(self.start.elapsed());
    }

    /// Non-hanging wait for this record's child.
    pub(super) fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    pub(super) fn append_output(&mut self, text: &str) {
        self.output.extend_from_slice(text.as_bytes());
    }

    /// Whether this test is expected to fail (see
    /// [`TestCase::expected_failure`]).
    pub(super) fn expected_failure(&self) -> bool {
        self.test.expected_failure()
    }

    /// Performs one non-blocking read of up to [`READ_BUFFER_SIZE`] bytes.
    ///
    /// A would-block result keeps the pipe open; EOF closes the read end.
    /// Interrupted reads are retried.
    pub(super) fn read(&mut self) -> io::Result<ReadStatus> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            let result = match self.reader.as_mut() {
                None => return Ok(ReadStatus::Closed),
                Some(reader) => reader.read(&mut buffer),
            };
            match result {
                Ok(0) => {
                    self.reader = None;
                    return Ok(ReadStatus::Closed);
                }
                Ok(n) => {
                    self.output.extend_from_slice(&buffer[..n]);
                    return Ok(ReadStatus::KeepOpen);
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadStatus::KeepOpen);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }
    }

    /// Reads the remaining output of a reaped child until EOF, bounded by
    /// [`DRAIN_TIMEOUT`] in case something is keeping the write end open.
    pub(super) fn read_until_closed(&mut self) -> io::Result<DrainResult> {
        let drain_start = Instant::now();
        while self.reader.is_some() {
            if let ReadStatus::Closed = self.read()? {
                break;
            }
            if drain_start.elapsed() > DRAIN_TIMEOUT {
                self.reader = None;
                return Ok(DrainResult::Wedged);
            }
        }
        Ok(DrainResult::Drained)
    }

    /// Releases this record into the finished collection.
    ///
    /// The pipe is closed by this point and the classification has been
    /// assigned.
    pub(super) fn into_finished(self) -> FinishedTest {
        debug_assert!(self.reader.is_none());
        FinishedTest {
            suite: self.test.suite().to_owned(),
            test_name: self.test.name().to_owned(),
            name: self.name,
            test_index: self.test_index,
            result: self
                .result
                .expect("classification is assigned before a record is finished"),
            slow: self.slow,
            time_taken: self
                .time_taken
                .expect("the clock is stopped before a record is finished"),
            output: self.output,
        }
    }
}

/// The immutable remains of a test whose child has been reaped and
/// classified.
#[derive(Clone, Debug)]
pub(crate) struct FinishedTest {
    /// Suite name, with its trailing `.`.
    pub(crate) suite: String,
    /// Test name within the suite.
    pub(crate) test_name: String,
    /// Displayed identifier, `<suite><test_name>`.
    pub(crate) name: String,
    /// Position in the catalog.
    pub(crate) test_index: usize,
    pub(crate) result: TestResult,
    pub(crate) slow: bool,
    pub(crate) time_taken: Duration,
    /// Merged stdout/stderr of the child, plus any appended diagnostics.
    pub(crate) output: Vec<u8>,
}

#[cfg(test)]
impl FinishedTest {
    pub(crate) fn for_tests(
        suite: &str,
        test_name: &str,
        test_index: usize,
        result: TestResult,
        time_taken: Duration,
        output: &str,
    ) -> Self {
        Self {
            suite: suite.to_owned(),
            test_name: test_name.to_owned(),
            name: format!("{suite}{test_name}"),
            test_index,
            result,
            slow: false,
            time_taken,
            output: output.as_bytes().to_vec(),
        }
    }
}
