// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for a test run.
//!
//! The CLI builds a [`RunnerOpts`] record up front; the runner itself never
//! looks at the process arguments.

use camino::Utf8PathBuf;
use std::{process::Command, time::Duration};

/// Default per-test deadline, in milliseconds.
pub const DEFAULT_DEADLINE_THRESHOLD_MS: u64 = 90_000;

/// Default threshold above which a passing test is reported as slow, in
/// milliseconds.
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 2_000;

/// Options recognized by the scheduler.
#[derive(Clone, Debug)]
pub struct RunnerOpts {
    /// Maximum number of concurrently running children. `None` means the
    /// host CPU count.
    pub job_count: Option<usize>,

    /// Wall-clock limit per test. A test exceeding it is killed and
    /// classified as a timeout.
    pub deadline_threshold: Duration,

    /// Wall-clock threshold above which a passing test is additionally
    /// flagged as slow.
    pub slow_threshold: Duration,

    /// Number of times to repeat the entire run. Negative means repeat
    /// indefinitely.
    pub num_iterations: i64,

    /// Test filter, forwarded to the child's listing mode.
    pub filter: Option<String>,

    /// Include `DISABLED_`-prefixed tests in the run.
    pub allow_disabled_tests: bool,

    /// Use the per-test `[ RUN ]` / `[ OK ]` layout instead of a single
    /// line per test.
    pub gtest_format: bool,

    /// Print per-test elapsed times in the live output.
    pub print_time: bool,

    /// Colorize the bracketed output tags.
    pub should_colorize: bool,

    /// Path to write a JUnit-compatible XML report to.
    pub xml_path: Option<Utf8PathBuf>,
}

impl Default for RunnerOpts {
    fn default() -> Self {
        Self {
            job_count: None,
            deadline_threshold: Duration::from_millis(DEFAULT_DEADLINE_THRESHOLD_MS),
            slow_threshold: Duration::from_millis(DEFAULT_SLOW_THRESHOLD_MS),
            num_iterations: 1,
            filter: None,
            allow_disabled_tests: false,
            gtest_format: false,
            print_time: true,
            should_colorize: false,
            xml_path: None,
        }
    }
}

/// The child test binary plus the arguments forwarded to it verbatim.
///
/// The same command vector is used for the listing invocation and for every
/// per-test run; the runner only ever appends `--gtest_list_tests` or a
/// `--gtest_filter=<test>` argument to it.
#[derive(Clone, Debug)]
pub struct TestCommand {
    program: Utf8PathBuf,
    args: Vec<String>,
}

impl TestCommand {
    /// Creates a new `TestCommand` from the binary path and its forwarded
    /// arguments.
    pub fn new(program: Utf8PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    /// The path to the test binary.
    pub fn program(&self) -> &Utf8PathBuf {
        &self.program
    }

    /// Builds a [`Command`] ready for extra arguments and stdio wiring.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(self.program.as_std_path());
        cmd.args(&self.args);
        cmd
    }

    /// The command line as a displayable string, for diagnostics.
    pub(crate) fn display_with(&self, extra_args: &[&str]) -> String {
        let mut out = self.program.to_string();
        for arg in self.args.iter().map(String::as_str).chain(extra_args.iter().copied()) {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_joins_arguments() {
        let command = TestCommand::new("/bin/suite".into(), vec!["--flag".to_owned()]);
        assert_eq!(
            command.display_with(&["--gtest_list_tests"]),
            "/bin/suite --flag --gtest_list_tests"
        );
    }
}
