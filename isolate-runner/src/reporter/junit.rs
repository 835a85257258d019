// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JUnit-compatible XML output.
//!
//! One `<testsuite>` per distinct suite in first-encounter order, tests in
//! catalog order. Expected failures are omitted: they count as passing for
//! the run, and JUnit consumers have no way to express them.

use crate::{
    errors::JunitError,
    list::TestList,
    runner::{FinishedTest, RunStats, TestResult},
};
use camino::Utf8Path;
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Writer,
};
use std::{collections::BTreeMap, fs::File, io, time::Duration};
use tracing::debug;

static TESTSUITES_TAG: &str = "testsuites";
static TESTSUITE_TAG: &str = "testsuite";
static TESTCASE_TAG: &str = "testcase";
static FAILURE_TAG: &str = "failure";

/// Writes the XML report for one finished iteration.
pub(crate) fn write_report(
    path: &Utf8Path,
    test_list: &TestList,
    finished: &BTreeMap<usize, FinishedTest>,
    stats: &RunStats,
    start_time: DateTime<Local>,
    elapsed: Duration,
) -> Result<(), JunitError> {
    debug!("writing JUnit report to {path}");
    let file = File::create(path).map_err(|error| JunitError::Create {
        path: path.to_owned(),
        error,
    })?;
    serialize_report(file, test_list, finished, stats, start_time, elapsed).map_err(|error| {
        JunitError::Write {
            path: path.to_owned(),
            error,
        }
    })
}

struct SuiteEntry<'a> {
    tests: Vec<&'a FinishedTest>,
    failures: usize,
    time: Duration,
}

fn serialize_report(
    writer: impl io::Write,
    test_list: &TestList,
    finished: &BTreeMap<usize, FinishedTest>,
    stats: &RunStats,
    start_time: DateTime<Local>,
    elapsed: Duration,
) -> quick_xml::Result<()> {
    // Group the catalog-ordered records by suite, first encounter first.
    let mut suites: IndexMap<&str, SuiteEntry<'_>> = IndexMap::new();
    for test in finished.values() {
        if test.result == TestResult::Xfail {
            continue;
        }
        let entry = suites.entry(test.suite.as_str()).or_insert_with(|| SuiteEntry {
            tests: Vec::new(),
            failures: 0,
            time: Duration::ZERO,
        });
        entry.tests.push(test);
        entry.time += test.time_taken;
        if test.result != TestResult::Pass {
            entry.failures += 1;
        }
    }

    let mut writer = Writer::new_with_indent(writer, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut testsuites_tag = BytesStart::new(TESTSUITES_TAG);
    testsuites_tag.extend_attributes([
        ("tests", test_list.len().to_string().as_str()),
        (
            "failures",
            (stats.failed + stats.timed_out + stats.xpassed)
                .to_string()
                .as_str(),
        ),
        ("disabled", "0"),
        ("errors", "0"),
        (
            "timestamp",
            start_time.format("%Y-%m-%dT%H:%M:%S").to_string().as_str(),
        ),
        ("time", format_seconds(elapsed).as_str()),
        ("name", "AllTests"),
    ]);
    writer.write_event(Event::Start(testsuites_tag))?;

    for (suite, entry) in &suites {
        // The listing format's trailing "." is not part of the JUnit name.
        let suite_name = suite.strip_suffix('.').unwrap_or(suite);

        let mut testsuite_tag = BytesStart::new(TESTSUITE_TAG);
        testsuite_tag.extend_attributes([
            ("name", suite_name),
            ("tests", entry.tests.len().to_string().as_str()),
            ("failures", entry.failures.to_string().as_str()),
            ("disabled", "0"),
            ("errors", "0"),
            ("time", format_seconds(entry.time).as_str()),
        ]);
        writer.write_event(Event::Start(testsuite_tag))?;

        for test in &entry.tests {
            let mut testcase_tag = BytesStart::new(TESTCASE_TAG);
            testcase_tag.extend_attributes([
                ("name", test.test_name.as_str()),
                ("status", "run"),
                ("time", format_seconds(test.time_taken).as_str()),
                ("classname", suite_name),
            ]);
            if test.result == TestResult::Pass {
                writer.write_event(Event::Empty(testcase_tag))?;
            } else {
                writer.write_event(Event::Start(testcase_tag))?;

                let mut failure_tag = BytesStart::new(FAILURE_TAG);
                let message = String::from_utf8_lossy(&test.output);
                failure_tag.push_attribute(("message", message.as_ref()));
                failure_tag.push_attribute(("type", ""));
                writer.write_event(Event::Start(failure_tag))?;
                writer.write_event(Event::End(BytesEnd::new(FAILURE_TAG)))?;

                writer.write_event(Event::End(BytesEnd::new(TESTCASE_TAG)))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new(TESTSUITE_TAG)))?;
    }

    writer.write_event(Event::End(BytesEnd::new(TESTSUITES_TAG)))?;

    let mut inner = writer.into_inner();
    io::Write::write_all(&mut inner, b"\n").map_err(quick_xml::Error::from)?;
    io::Write::flush(&mut inner).map_err(quick_xml::Error::from)
}

/// Seconds with three decimals, the format JUnit consumers expect.
fn format_seconds(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64())
}
