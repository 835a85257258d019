// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test scheduler.
//!
//! [`TestRunner::execute`] drives a single-threaded cooperative loop: each
//! tick launches children into free worker slots, drains their output pipes
//! with a zero-timeout poll, reaps and classifies whatever finished,
//! enforces the deadline and slow thresholds, and services pending signals,
//! then sleeps a few milliseconds. Parallelism comes entirely from the
//! child processes; nothing in the loop blocks on any single child.

mod record;
mod unix;

pub(crate) use record::{FinishedTest, TestResult};

use crate::{
    config::{RunnerOpts, TestCommand},
    errors::RunnerError,
    helpers::signal_description,
    list::TestList,
    reporter::{junit, TestReporter},
    signal::{self, SignalEvent, SignalHandlerGuard},
    time,
};
use record::{DrainResult, TestRecord};
use std::{
    collections::BTreeMap,
    io,
    os::fd::AsRawFd,
    os::unix::process::ExitStatusExt,
    process::{ExitStatus, Stdio},
    thread,
    time::Duration,
};
use tracing::{debug, warn};
use unix::PollSet;

/// How long the loop sleeps between ticks.
const TICK_INTERVAL: Duration = Duration::from_millis(5);

/// Aggregate counters for one iteration of a run.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    /// Tests that passed.
    pub passed: usize,
    /// Tests that failed (non-zero exit or signal termination).
    pub failed: usize,
    /// Tests killed for exceeding the deadline.
    pub timed_out: usize,
    /// Expected failures that failed.
    pub xfailed: usize,
    /// Expected failures that passed.
    pub xpassed: usize,
    /// Passing tests that exceeded the slow threshold.
    pub slow: usize,
}

impl RunStats {
    /// True if every test in the iteration was classified pass or xfail.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.timed_out == 0 && self.xpassed == 0
    }
}

/// The outcome of [`TestRunner::execute`]: one [`RunStats`] per iteration.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Per-iteration counters, in iteration order.
    pub iterations: Vec<RunStats>,
}

impl RunSummary {
    /// True if every iteration succeeded.
    pub fn is_success(&self) -> bool {
        self.iterations.iter().all(RunStats::is_success)
    }
}

/// Runs every test in a catalog, each in its own process.
#[derive(Debug)]
pub struct TestRunner<'a> {
    opts: &'a RunnerOpts,
    command: &'a TestCommand,
    test_list: &'a TestList,
    job_count: usize,
    reporter: TestReporter,
}

impl<'a> TestRunner<'a> {
    /// Creates a new runner over the given catalog.
    pub fn new(opts: &'a RunnerOpts, command: &'a TestCommand, test_list: &'a TestList) -> Self {
        let job_count = opts.job_count.unwrap_or_else(num_cpus::get).max(1);
        Self {
            opts,
            command,
            test_list,
            job_count,
            reporter: TestReporter::new(opts),
        }
    }

    /// Executes all configured iterations, streaming live output to
    /// `writer`.
    ///
    /// SIGINT/SIGQUIT handlers are installed for the duration of the run
    /// and restored afterwards.
    pub fn execute(&self, writer: &mut impl io::Write) -> Result<RunSummary, RunnerError> {
        let _signal_guard =
            SignalHandlerGuard::install().map_err(RunnerError::SignalSetup)?;

        let mut iterations = Vec::new();
        let mut iteration: i64 = 0;
        while self.opts.num_iterations < 0 || iteration < self.opts.num_iterations {
            if iteration > 0 {
                write!(
                    writer,
                    "\nRepeating all tests (iteration {}) . . .\n\n",
                    iteration + 1
                )
                .map_err(RunnerError::WriteOutput)?;
            }
            self.reporter
                .write_run_started(writer, self.test_list, self.job_count)
                .map_err(RunnerError::WriteOutput)?;
            writer.flush().map_err(RunnerError::WriteOutput)?;

            let watch = time::stopwatch();
            let (stats, finished) = Scheduler::new(self).run(writer)?;
            let elapsed = watch.elapsed();

            self.reporter
                .write_footer(writer, self.test_list, &stats, &finished, elapsed)
                .map_err(RunnerError::WriteOutput)?;
            writer.flush().map_err(RunnerError::WriteOutput)?;

            if let Some(path) = &self.opts.xml_path {
                junit::write_report(
                    path,
                    self.test_list,
                    &finished,
                    &stats,
                    watch.start_time(),
                    elapsed,
                )?;
            }

            iterations.push(stats);
            iteration += 1;
        }

        Ok(RunSummary { iterations })
    }
}

/// Per-iteration scheduler state.
struct Scheduler<'a> {
    runner: &'a TestRunner<'a>,
    /// Cursor into the catalog; tests are launched in catalog order.
    next_index: usize,
    /// Free worker slots, reused LIFO.
    free_slots: Vec<usize>,
    /// Slot index to live record.
    running: Vec<Option<TestRecord>>,
    poll_set: PollSet,
    /// Finished records, keyed by catalog index.
    finished: BTreeMap<usize, FinishedTest>,
    stats: RunStats,
}

impl<'a> Scheduler<'a> {
    fn new(runner: &'a TestRunner<'a>) -> Self {
        let jobs = runner.job_count;
        Self {
            runner,
            next_index: 0,
            free_slots: (0..jobs).collect(),
            running: (0..jobs).map(|_| None).collect(),
            poll_set: PollSet::new(jobs),
            finished: BTreeMap::new(),
            stats: RunStats::default(),
        }
    }

    fn run(
        mut self,
        writer: &mut impl io::Write,
    ) -> Result<(RunStats, BTreeMap<usize, FinishedTest>), RunnerError> {
        let total = self.runner.test_list.len();
        while self.finished.len() < total {
            self.launch_tests()?;
            self.drain_outputs()?;
            self.reap_finished(writer)?;
            self.enforce_deadlines();
            self.handle_signals(writer)?;
            if self.finished.len() < total {
                thread::sleep(TICK_INTERVAL);
            }
        }
        Ok((self.stats, self.finished))
    }

    /// Launch phase: fill free slots from the catalog cursor.
    fn launch_tests(&mut self) -> Result<(), RunnerError> {
        while !self.free_slots.is_empty() && self.next_index < self.runner.test_list.len() {
            let test = self
                .runner
                .test_list
                .get(self.next_index)
                .expect("cursor is within the catalog")
                .clone();
            let test_name = test.full_name();

            let (reader, pipe_writer) = io::pipe().map_err(|error| RunnerError::CreatePipe {
                test: test_name.clone(),
                error,
            })?;
            unix::set_nonblocking(reader.as_raw_fd()).map_err(|error| {
                RunnerError::CreatePipe {
                    test: test_name.clone(),
                    error,
                }
            })?;
            let stdout_writer =
                pipe_writer
                    .try_clone()
                    .map_err(|error| RunnerError::CreatePipe {
                        test: test_name.clone(),
                        error,
                    })?;

            let mut cmd = self.runner.command.command();
            // Both standard streams share the one pipe, so the child's
            // output interleaves the way it was written. The filter must
            // come only from the command line.
            cmd.arg(format!("--gtest_filter={test_name}"))
                .env_remove("GTEST_FILTER")
                .stdin(Stdio::null())
                .stdout(stdout_writer)
                .stderr(pipe_writer);
            unix::reset_child_signals(&mut cmd);

            let child = cmd.spawn().map_err(|error| RunnerError::Spawn {
                test: test_name.clone(),
                error,
            })?;
            // The command holds the parent's copies of the write end; they
            // have to go away for EOF to be observable.
            drop(cmd);

            let slot = self.free_slots.pop().expect("loop condition holds a free slot");
            debug!(test = %test_name, slot, pid = child.id(), "launched test");
            self.poll_set.register(slot, reader.as_raw_fd());
            self.running[slot] =
                Some(TestRecord::new(test, self.next_index, slot, child, reader));
            self.next_index += 1;
        }
        Ok(())
    }

    /// Drain phase: zero-timeout poll, then one non-blocking read per
    /// readable slot.
    fn drain_outputs(&mut self) -> Result<(), RunnerError> {
        let ready = self.poll_set.poll().map_err(RunnerError::Poll)?;
        if ready == 0 {
            return Ok(());
        }
        for slot in 0..self.running.len() {
            if !self.poll_set.is_readable(slot) {
                continue;
            }
            let record = self.running[slot]
                .as_mut()
                .expect("a readable slot holds a live record");
            match record.read() {
                Ok(record::ReadStatus::KeepOpen) => {}
                Ok(record::ReadStatus::Closed) => {
                    // The record stays alive until its child is reaped.
                    self.poll_set.clear(slot);
                }
                Err(error) => {
                    return Err(RunnerError::Read {
                        test: record.name.clone(),
                        error,
                    });
                }
            }
        }
        Ok(())
    }

    /// Reap phase: non-hanging wait over every live record, so that any
    /// number of children finishing between ticks is handled in one pass.
    fn reap_finished(&mut self, writer: &mut impl io::Write) -> Result<(), RunnerError> {
        for slot in 0..self.running.len() {
            let status = {
                let Some(record) = self.running[slot].as_mut() else {
                    continue;
                };
                match record.try_wait() {
                    Ok(Some(status)) => status,
                    Ok(None) => continue,
                    Err(error) => {
                        return Err(RunnerError::Wait {
                            test: record.name.clone(),
                            error,
                        });
                    }
                }
            };
            self.finalize_test(slot, status, writer)?;
        }
        Ok(())
    }

    /// Classifies a reaped record, prints it, and releases its slot.
    fn finalize_test(
        &mut self,
        slot: usize,
        status: ExitStatus,
        writer: &mut impl io::Write,
    ) -> Result<(), RunnerError> {
        let mut record = self.running[slot]
            .take()
            .expect("a reaped slot holds a live record");
        debug_assert_eq!(record.slot, slot);
        record.stop();

        match record.read_until_closed() {
            Ok(DrainResult::Drained) => {}
            Ok(DrainResult::Wedged) => {
                warn!(test = %record.name, "output pipe still open 2 seconds after exit");
                writeln!(writer, "Reading of done process did not finish after 2 seconds.")
                    .map_err(RunnerError::WriteOutput)?;
            }
            Err(error) => {
                return Err(RunnerError::Read {
                    test: record.name.clone(),
                    error,
                });
            }
        }

        let name = record.name.clone();
        if record.result.is_none() {
            if let Some(signal) = status.signal() {
                record.append_output(&format!(
                    "{name} terminated by signal: {}.\n",
                    signal_description(signal)
                ));
                record.result = Some(TestResult::Fail);
            } else {
                let exit_code = status
                    .code()
                    .expect("a reaped process either exited or was signaled");
                if exit_code != 0 {
                    record.append_output(&format!("{name} exited with exitcode {exit_code}.\n"));
                    record.result = Some(TestResult::Fail);
                } else {
                    record.result = Some(TestResult::Pass);
                }
            }
        } else if record.result == Some(TestResult::Timeout) {
            let deadline_ms = self.runner.opts.deadline_threshold.as_millis();
            record.append_output(&format!(
                "{name} killed because of timeout at {deadline_ms} ms.\n"
            ));
        }

        if record.expected_failure() {
            match record.result {
                Some(TestResult::Fail) => record.result = Some(TestResult::Xfail),
                Some(TestResult::Pass) => record.result = Some(TestResult::Xpass),
                _ => {}
            }
        }

        let finished = record.into_finished();
        self.runner
            .reporter
            .write_test(writer, &finished)
            .map_err(RunnerError::WriteOutput)?;
        debug!(test = %name, result = ?finished.result, "test finished");

        match finished.result {
            TestResult::Pass => {
                self.stats.passed += 1;
                if finished.slow {
                    self.stats.slow += 1;
                }
            }
            TestResult::Fail => self.stats.failed += 1,
            TestResult::Timeout => self.stats.timed_out += 1,
            TestResult::Xfail => self.stats.xfailed += 1,
            TestResult::Xpass => self.stats.xpassed += 1,
        }

        self.poll_set.clear(slot);
        self.free_slots.push(slot);
        self.finished.insert(finished.test_index, finished);
        Ok(())
    }

    /// Deadline phase: time out or flag slow every still-unclassified live
    /// record.
    fn enforce_deadlines(&mut self) {
        let deadline = self.runner.opts.deadline_threshold;
        let slow = self.runner.opts.slow_threshold;
        for record in self.running.iter_mut().flatten() {
            if record.result.is_some() {
                continue;
            }
            let elapsed = record.elapsed();
            if elapsed > deadline {
                record.result = Some(TestResult::Timeout);
                // A timed-out test is never also slow.
                record.slow = false;
                debug!(test = %record.name, "deadline exceeded, killing");
                if let Err(error) = record.child.kill() {
                    // The child may have exited in the meantime; it will be
                    // reaped on the next tick either way.
                    debug!(test = %record.name, %error, "kill after deadline failed");
                }
            } else if !record.slow && elapsed > slow {
                record.slow = true;
            }
        }
    }

    /// Signal phase: at most one pending signal is serviced per tick.
    fn handle_signals(&mut self, writer: &mut impl io::Write) -> Result<(), RunnerError> {
        match signal::take_signal() {
            None => {}
            Some(SignalEvent::Interrupt) => {
                writeln!(writer, "Terminating due to signal...")
                    .map_err(RunnerError::WriteOutput)?;
                let _ = writer.flush();
                for record in self.running.iter_mut().flatten() {
                    let _ = record.child.kill();
                }
                std::process::exit(1);
            }
            Some(SignalEvent::Quit) => {
                writeln!(writer, "List of current running tests:")
                    .map_err(RunnerError::WriteOutput)?;
                let mut live: Vec<_> = self
                    .running
                    .iter()
                    .flatten()
                    .map(|record| (record.test_index, &record.name, record.elapsed()))
                    .collect();
                live.sort_by_key(|(test_index, ..)| *test_index);
                for (_, name, elapsed) in live {
                    writeln!(writer, "  {name} (elapsed time {} ms)", elapsed.as_millis())
                        .map_err(RunnerError::WriteOutput)?;
                }
                let _ = writer.flush();
            }
        }
        Ok(())
    }
}
