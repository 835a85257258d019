// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test discovery: enumerating the catalog from the child binary.
//!
//! The child binary is invoked once with `--gtest_list_tests` appended and
//! its stdout is parsed into an ordered, immutable catalog of
//! (suite, test) pairs.

use crate::{config::TestCommand, errors::EnumerateError};
use std::process::Stdio;
use tracing::debug;

/// A single test: suite name plus test name.
///
/// The suite name keeps the trailing `.` separator that the gtest listing
/// format emits, so the displayed identifier is just the concatenation of
/// the two parts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestCase {
    suite: Box<str>,
    name: Box<str>,
}

impl TestCase {
    #[cfg(test)]
    pub(crate) fn new(suite: &str, name: &str) -> Self {
        Self {
            suite: suite.into(),
            name: name.into(),
        }
    }

    /// The suite name, including its trailing `.`.
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// The test name within the suite.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full displayed identifier, `<suite><name>`.
    pub fn full_name(&self) -> String {
        format!("{}{}", self.suite, self.name)
    }

    /// Whether this test is expected to fail when run.
    ///
    /// Tests grouped under a `DISABLED_`-prefixed suite are treated as
    /// known failures once `--gtest_also_run_disabled_tests` surfaces them:
    /// failing is expected, passing is reported as XPASS.
    pub(crate) fn expected_failure(&self) -> bool {
        self.suite.starts_with("DISABLED_")
    }
}

/// The immutable catalog of tests discovered from the child binary, in
/// listing order.
#[derive(Clone, Debug)]
pub struct TestList {
    tests: Vec<TestCase>,
    suite_count: usize,
    disabled_count: usize,
}

impl TestList {
    /// Enumerates the catalog by running the child binary in listing mode.
    ///
    /// The filter, when present, is the only option that changes what gets
    /// listed, so it is the only one forwarded.
    pub fn from_command(
        command: &TestCommand,
        filter: Option<&str>,
        allow_disabled: bool,
    ) -> Result<Self, EnumerateError> {
        let filter_arg = filter.map(|filter| format!("--gtest_filter={filter}"));
        let mut extra_args: Vec<&str> = Vec::new();
        if let Some(filter_arg) = &filter_arg {
            extra_args.push(filter_arg);
        }
        extra_args.push("--gtest_list_tests");
        let display_str: String = command.display_with(&extra_args);
        debug!("enumerating tests: {}", display_str);

        let mut cmd = command.command();
        cmd.args(&extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let output = cmd.spawn().and_then(|child| child.wait_with_output()).map_err(|error| {
            EnumerateError::Spawn {
                command: display_str.clone(),
                error,
            }
        })?;

        Self::parse(&String::from_utf8_lossy(&output.stdout), &display_str, allow_disabled)
    }

    /// Parses listing output into a catalog.
    ///
    /// The grammar: a line starting with a non-space character is a suite
    /// header (first whitespace-delimited token), a line starting with
    /// exactly two spaces is a test name under the current suite, and
    /// anything else is a hard error. Trailing listing metadata (type
    /// parameters, `# GetParam()` comments) is truncated at the first
    /// space.
    pub fn parse(
        list_output: &str,
        command: &str,
        allow_disabled: bool,
    ) -> Result<Self, EnumerateError> {
        let mut tests = Vec::new();
        let mut suite_count = 0;
        let mut disabled_count = 0;

        let mut suite = String::new();
        // Set when the current suite is disabled wholesale; its tests are
        // skipped without being tallied individually.
        let mut skip_suite = false;
        // Set until the current suite contributes its first test.
        let mut new_suite = false;

        for line in list_output.lines() {
            if let Some(rest) = line.strip_prefix("  ") {
                if rest.starts_with(char::is_whitespace) {
                    return Err(Self::unexpected_line(command, line));
                }
                let Some(name) = rest.split_whitespace().next() else {
                    return Err(Self::unexpected_line(command, line));
                };
                if skip_suite {
                    continue;
                }
                if allow_disabled || !name.starts_with("DISABLED_") {
                    tests.push(TestCase {
                        suite: suite.as_str().into(),
                        name: name.into(),
                    });
                    if new_suite {
                        suite_count += 1;
                        new_suite = false;
                    }
                } else {
                    disabled_count += 1;
                }
            } else if !line.starts_with(' ') {
                let Some(header) = line.split_whitespace().next() else {
                    return Err(Self::unexpected_line(command, line));
                };
                suite = header.to_owned();
                if !allow_disabled && suite.starts_with("DISABLED_") {
                    skip_suite = true;
                } else {
                    skip_suite = false;
                    new_suite = true;
                }
            } else {
                return Err(Self::unexpected_line(command, line));
            }
        }

        Ok(Self {
            tests,
            suite_count,
            disabled_count,
        })
    }

    fn unexpected_line(command: &str, line: &str) -> EnumerateError {
        EnumerateError::UnexpectedLine {
            command: command.to_owned(),
            line: line.to_owned(),
        }
    }

    /// The number of tests in the catalog.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// The number of suites that contributed at least one test.
    pub fn suite_count(&self) -> usize {
        self.suite_count
    }

    /// The number of `DISABLED_`-prefixed tests that were filtered out.
    pub fn disabled_count(&self) -> usize {
        self.disabled_count
    }

    /// The test at the given catalog index.
    pub fn get(&self, index: usize) -> Option<&TestCase> {
        self.tests.get(index)
    }

    /// Iterates over the catalog in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &TestCase> + '_ {
        self.tests.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(output: &str, allow_disabled: bool) -> TestList {
        TestList::parse(output, "binary --gtest_list_tests", allow_disabled)
            .expect("listing output should parse")
    }

    #[test]
    fn parse_basic_listing() {
        let output = indoc! {"
            Basics.
              one
              two
            Timeouts.
              sleepy
        "};

        let list = parse(output, false);
        assert_eq!(list.len(), 3);
        assert_eq!(list.suite_count(), 2);
        assert_eq!(list.disabled_count(), 0);

        let names: Vec<_> = list.iter().map(TestCase::full_name).collect();
        assert_eq!(names, ["Basics.one", "Basics.two", "Timeouts.sleepy"]);
        assert_eq!(list.get(2).map(TestCase::suite), Some("Timeouts."));
        assert_eq!(list.get(2).map(TestCase::name), Some("sleepy"));
    }

    #[test]
    fn parse_truncates_listing_metadata() {
        // Typed and value-parameterized suites carry trailing comments; the
        // first whitespace-delimited token is the name.
        let output = indoc! {"
            Typed/0.  # TypeParam = int
              grows
              shrinks/0  # GetParam() = 4
        "};

        let list = parse(output, false);
        let names: Vec<_> = list.iter().map(TestCase::full_name).collect();
        assert_eq!(names, ["Typed/0.grows", "Typed/0.shrinks/0"]);
    }

    #[test]
    fn parse_skips_disabled_tests() {
        let output = indoc! {"
            Basics.
              one
              DISABLED_two
              DISABLED_three
        "};

        let list = parse(output, false);
        assert_eq!(list.len(), 1);
        assert_eq!(list.suite_count(), 1);
        assert_eq!(list.disabled_count(), 2);

        let list = parse(output, true);
        assert_eq!(list.len(), 3);
        assert_eq!(list.disabled_count(), 0);
        assert!(!list.get(1).unwrap().expected_failure());
    }

    #[test]
    fn parse_skips_disabled_suite_without_tally() {
        let output = indoc! {"
            DISABLED_Flaky.
              one
              two
            Basics.
              three
        "};

        let list = parse(output, false);
        assert_eq!(list.len(), 1);
        assert_eq!(list.suite_count(), 1);
        assert_eq!(list.disabled_count(), 0);

        let list = parse(output, true);
        assert_eq!(list.len(), 3);
        assert_eq!(list.suite_count(), 2);
        assert!(list.get(0).unwrap().expected_failure());
        assert!(!list.get(2).unwrap().expected_failure());
    }

    #[test]
    fn parse_counts_suites_with_included_tests_only() {
        let output = indoc! {"
            AllFilteredOut.
              DISABLED_one
            Basics.
              two
        "};

        let list = parse(output, false);
        assert_eq!(list.len(), 1);
        assert_eq!(list.suite_count(), 1);
        assert_eq!(list.disabled_count(), 1);
    }

    #[test]
    fn parse_rejects_single_space_indent() {
        let output = "Basics.\n bad_line\n";
        let err = TestList::parse(output, "binary --gtest_list_tests", false).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unexpected output from test listing."));
        assert!(message.contains(" bad_line"));
    }

    #[test]
    fn parse_empty_output() {
        let list = parse("", false);
        assert!(list.is_empty());
        assert_eq!(list.suite_count(), 0);
    }
}
