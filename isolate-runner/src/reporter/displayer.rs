// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The live banner stream and the final textual summary.
//!
//! Output mirrors the layout gtest users expect: bracketed status tags,
//! one section per outcome kind in the footer, and a right-aligned trailer
//! block counting each non-pass outcome.

use crate::{
    config::RunnerOpts,
    helpers::{plural, plural_upper},
    list::TestList,
    runner::{FinishedTest, RunStats, TestResult},
};
use owo_colors::{OwoColorize, Style};
use std::{collections::BTreeMap, io, time::Duration};

/// Styles for the bracketed tags. All plain unless colorized.
#[derive(Clone, Debug, Default)]
struct Styles {
    pass: Style,
    fail: Style,
    warning: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.pass = Style::new().green();
        self.fail = Style::new().red();
        self.warning = Style::new().yellow();
    }
}

/// Converts test records and aggregate counters into run output.
#[derive(Debug)]
pub(crate) struct TestReporter {
    styles: Box<Styles>,
    gtest_format: bool,
    print_time: bool,
    slow_threshold: Duration,
}

impl TestReporter {
    pub(crate) fn new(opts: &RunnerOpts) -> Self {
        let mut styles = Box::<Styles>::default();
        if opts.should_colorize {
            styles.colorize();
        }
        Self {
            styles,
            gtest_format: opts.gtest_format,
            print_time: opts.print_time,
            slow_threshold: opts.slow_threshold,
        }
    }

    /// The iteration banner.
    pub(crate) fn write_run_started(
        &self,
        writer: &mut impl io::Write,
        test_list: &TestList,
        job_count: usize,
    ) -> io::Result<()> {
        write!(writer, "{}", "[==========]".style(self.styles.pass))?;
        writeln!(
            writer,
            " Running {} from {} ({}).",
            plural(test_list.len(), "test"),
            plural(test_list.suite_count(), "test case"),
            plural(job_count, "job"),
        )
    }

    /// One finished test, in the live stream. The record's entire captured
    /// output is written with it, so tests never interleave.
    pub(crate) fn write_test(
        &self,
        writer: &mut impl io::Write,
        test: &FinishedTest,
    ) -> io::Result<()> {
        if self.gtest_format {
            return self.write_test_gtest_format(writer, test);
        }

        // Expected failures fold into OK and unexpected passes into FAILED
        // here; the footer still breaks them out into their own sections.
        let (tag, style) = match test.result {
            TestResult::Pass | TestResult::Xfail => ("[    OK    ]", self.styles.pass),
            TestResult::Fail | TestResult::Xpass => ("[  FAILED  ]", self.styles.fail),
            TestResult::Timeout => ("[ TIMEOUT  ]", self.styles.fail),
        };
        write!(writer, "{}", tag.style(style))?;
        write!(writer, " {}", test.name)?;
        self.write_time(writer, test)?;
        writeln!(writer)?;
        writer.write_all(&test.output)?;
        writer.flush()
    }

    fn write_test_gtest_format(
        &self,
        writer: &mut impl io::Write,
        test: &FinishedTest,
    ) -> io::Result<()> {
        write!(writer, "{}", "[ RUN      ]".style(self.styles.pass))?;
        writeln!(writer, " {}", test.name)?;
        writer.write_all(&test.output)?;

        let (tag, style) = match test.result {
            TestResult::Pass | TestResult::Xfail => ("[       OK ]", self.styles.pass),
            _ => ("[  FAILED  ]", self.styles.fail),
        };
        write!(writer, "{}", tag.style(style))?;
        write!(writer, " {}", test.name)?;
        self.write_time(writer, test)?;
        writeln!(writer)?;
        writer.flush()
    }

    fn write_time(&self, writer: &mut impl io::Write, test: &FinishedTest) -> io::Result<()> {
        if self.print_time {
            write!(writer, " ({} ms)", test.time_taken.as_millis())?;
        }
        Ok(())
    }

    /// The end-of-iteration summary.
    pub(crate) fn write_footer(
        &self,
        writer: &mut impl io::Write,
        test_list: &TestList,
        stats: &RunStats,
        finished: &BTreeMap<usize, FinishedTest>,
        elapsed: Duration,
    ) -> io::Result<()> {
        write!(writer, "{}", "[==========]".style(self.styles.pass))?;
        writeln!(
            writer,
            " {} from {} ran. ({} ms total)",
            plural(test_list.len(), "test"),
            plural(test_list.suite_count(), "test case"),
            elapsed.as_millis(),
        )?;

        write!(writer, "{}", "[   PASS   ]".style(self.styles.pass))?;
        write!(writer, " {}.", plural(stats.passed + stats.xfailed, "test"))?;
        if stats.xfailed != 0 {
            write!(writer, " ({})", plural(stats.xfailed, "expected failure"))?;
        }
        writeln!(writer)?;

        // Each section appends its count to a shared trailer block that is
        // printed after all the sections.
        let mut trailer = String::new();

        if stats.slow != 0 {
            self.write_results(
                writer,
                stats.slow,
                self.styles.warning,
                "[   SLOW   ]",
                "SLOW TEST",
                &mut trailer,
                finished,
                |test| test.slow,
                |test| {
                    Some(format!(
                        " ({} ms, exceeded {} ms)",
                        test.time_taken.as_millis(),
                        self.slow_threshold.as_millis()
                    ))
                },
            )?;
        }
        if stats.xpassed != 0 {
            self.write_results(
                writer,
                stats.xpassed,
                self.styles.fail,
                "[  XPASS   ]",
                "SHOULD HAVE FAILED TEST",
                &mut trailer,
                finished,
                |test| test.result == TestResult::Xpass,
                |_| None,
            )?;
        }
        if stats.timed_out != 0 {
            self.write_results(
                writer,
                stats.timed_out,
                self.styles.fail,
                "[ TIMEOUT  ]",
                "TIMEOUT TEST",
                &mut trailer,
                finished,
                |test| test.result == TestResult::Timeout,
                |test| Some(format!(" (stopped at {} ms)", test.time_taken.as_millis())),
            )?;
        }
        if stats.failed != 0 {
            self.write_results(
                writer,
                stats.failed,
                self.styles.fail,
                "[   FAIL   ]",
                "FAILED TEST",
                &mut trailer,
                finished,
                |test| test.result == TestResult::Fail,
                |_| None,
            )?;
        }

        if !trailer.is_empty() {
            write!(writer, "\n{trailer}")?;
        }

        if test_list.disabled_count() != 0 {
            if trailer.is_empty() {
                writeln!(writer)?;
            }
            let notice = format!(
                "  YOU HAVE {}",
                plural_upper(test_list.disabled_count(), "DISABLED TEST")
            );
            writeln!(writer, "{}", notice.style(self.styles.warning))?;
            writeln!(writer)?;
        }

        writer.flush()
    }

    /// One footer section: a header line, the matching tests in catalog
    /// order, and the section's trailer entry (right-aligned for counts
    /// under 10).
    #[allow(clippy::too_many_arguments)]
    fn write_results(
        &self,
        writer: &mut impl io::Write,
        total: usize,
        style: Style,
        prefix: &str,
        trailer_noun: &str,
        trailer: &mut String,
        finished: &BTreeMap<usize, FinishedTest>,
        matches: impl Fn(&FinishedTest) -> bool,
        detail: impl Fn(&FinishedTest) -> Option<String>,
    ) -> io::Result<()> {
        write!(writer, "{}", prefix.style(style))?;
        writeln!(writer, " {}, listed below:", plural(total, "test"))?;
        for test in finished.values().filter(|test| matches(test)) {
            write!(writer, "{}", prefix.style(style))?;
            write!(writer, " {}", test.name)?;
            if let Some(detail) = detail(test) {
                write!(writer, "{detail}")?;
            }
            writeln!(writer)?;
        }

        if total < 10 {
            trailer.push(' ');
        }
        trailer.push_str(&plural_upper(total, trailer_noun));
        trailer.push('\n');
        Ok(())
    }
}
