// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{self, Color};
use camino::Utf8PathBuf;
use clap::Parser;
use color_eyre::eyre::{bail, Result};
use isolate_runner::{
    config::{
        RunnerOpts, TestCommand, DEFAULT_DEADLINE_THRESHOLD_MS, DEFAULT_SLOW_THRESHOLD_MS,
    },
    errors::EnumerateError,
    list::TestList,
    runner::TestRunner,
};
use std::{io, process::ExitCode, time::Duration};

/// Run every test in a gtest binary as its own process, in parallel.
///
/// Each test runs in its own address space, so a crash, hang or leak in one
/// test cannot affect any other. Arguments after the test binary path are
/// forwarded to it verbatim.
#[derive(Debug, Parser)]
#[command(name = "gtest-isolate", version)]
pub(crate) struct Opts {
    /// Number of tests to run simultaneously [default: CPU count]
    #[arg(short = 'j', value_name = "JOBS")]
    jobs: Option<usize>,

    /// Per-test wall-clock deadline in milliseconds; a test exceeding it is
    /// killed and reported as a timeout
    #[arg(
        long = "deadline_threshold_ms",
        value_name = "MS",
        default_value_t = DEFAULT_DEADLINE_THRESHOLD_MS
    )]
    deadline_threshold_ms: u64,

    /// Threshold in milliseconds above which a passing test is reported as
    /// slow
    #[arg(
        long = "slow_threshold_ms",
        value_name = "MS",
        default_value_t = DEFAULT_SLOW_THRESHOLD_MS
    )]
    slow_threshold_ms: u64,

    /// Run only the tests matching this filter (also applied when listing)
    #[arg(long = "gtest_filter", value_name = "EXPR")]
    gtest_filter: Option<String>,

    /// Also run DISABLED_-prefixed tests
    #[arg(long = "gtest_also_run_disabled_tests")]
    gtest_also_run_disabled_tests: bool,

    /// Print a [ RUN ] / [ OK ] pair per test instead of a single line
    #[arg(long = "gtest_format")]
    gtest_format: bool,

    /// Color the output: yes, no, auto
    #[arg(long = "gtest_color", value_name = "WHEN", default_value_t)]
    gtest_color: Color,

    /// Print per-test elapsed times (0 disables them)
    #[arg(long = "gtest_print_time", value_name = "BOOL", default_value_t = 1)]
    gtest_print_time: i64,

    /// Write a JUnit-compatible report; the format is xml:<path>
    #[arg(long = "gtest_output", value_name = "xml:PATH")]
    gtest_output: Option<String>,

    /// Repeat the whole run COUNT times; a negative count repeats forever
    #[arg(
        long = "gtest_repeat",
        value_name = "COUNT",
        default_value_t = 1,
        allow_hyphen_values = true
    )]
    gtest_repeat: i64,

    /// Path to the gtest binary to run
    #[arg(value_name = "TEST_BINARY")]
    test_binary: Utf8PathBuf,

    /// Arguments forwarded to the test binary verbatim
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    child_args: Vec<String>,
}

impl Opts {
    pub(crate) fn exec(self) -> Result<ExitCode> {
        output::init_logger();

        let should_colorize = self
            .gtest_color
            .should_colorize(supports_color::Stream::Stdout);

        let xml_path = match &self.gtest_output {
            None => None,
            Some(output) => match output.strip_prefix("xml:") {
                Some(path) if !path.is_empty() => Some(Utf8PathBuf::from(path)),
                _ => bail!("unrecognized --gtest_output value `{output}`, expected xml:<path>"),
            },
        };

        let command = TestCommand::new(self.test_binary, self.child_args);
        let test_list = match TestList::from_command(
            &command,
            self.gtest_filter.as_deref(),
            self.gtest_also_run_disabled_tests,
        ) {
            Ok(test_list) => test_list,
            Err(error @ EnumerateError::UnexpectedLine { .. }) => {
                println!("{error}");
                return Ok(ExitCode::FAILURE);
            }
            Err(error) => return Err(error.into()),
        };

        let opts = RunnerOpts {
            job_count: self.jobs,
            deadline_threshold: Duration::from_millis(self.deadline_threshold_ms),
            slow_threshold: Duration::from_millis(self.slow_threshold_ms),
            num_iterations: self.gtest_repeat,
            filter: self.gtest_filter,
            allow_disabled_tests: self.gtest_also_run_disabled_tests,
            gtest_format: self.gtest_format,
            print_time: self.gtest_print_time != 0,
            should_colorize,
            xml_path,
        };

        let runner = TestRunner::new(&opts, &command, &test_list);
        let stdout = io::stdout();
        let summary = runner.execute(&mut stdout.lock())?;

        Ok(if summary.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}
