// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A stand-in gtest binary for integration tests.
//!
//! Supports just enough of the gtest command-line contract for the runner:
//! `--gtest_list_tests` prints the suite/test listing, and
//! `--gtest_filter=<patterns>` selects tests by colon-separated glob
//! patterns. Each test's behavior is keyed by its name.

use std::{env, process::ExitCode, thread, time::Duration};

#[derive(Copy, Clone)]
enum Behavior {
    Pass,
    FailAssert,
    Crash,
    Hang,
    SleepMs(u64),
    MixedOutput,
}

static TESTS: &[(&str, &str, Behavior)] = &[
    ("Basics.", "pass_one", Behavior::Pass),
    ("Basics.", "pass_two", Behavior::Pass),
    ("Basics.", "fail_assert", Behavior::FailAssert),
    ("Basics.", "crash_segv", Behavior::Crash),
    ("Basics.", "mixed_output", Behavior::MixedOutput),
    ("Basics.", "DISABLED_skipped", Behavior::Pass),
    ("Timeouts.", "sleep_forever", Behavior::Hang),
    ("Timeouts.", "slow_pass", Behavior::SleepMs(400)),
    ("DISABLED_Known.", "always_fails", Behavior::FailAssert),
    ("DISABLED_Known.", "sneaky_pass", Behavior::Pass),
];

fn main() -> ExitCode {
    let mut list_tests = false;
    let mut filter: Option<String> = None;
    for arg in env::args().skip(1) {
        if arg == "--gtest_list_tests" {
            list_tests = true;
        } else if let Some(patterns) = arg.strip_prefix("--gtest_filter=") {
            // Last filter wins, like gtest.
            filter = Some(patterns.to_owned());
        }
    }
    let filter = filter.or_else(|| env::var("GTEST_FILTER").ok());

    let selected: Vec<(&str, &str, Behavior)> = TESTS
        .iter()
        .copied()
        .filter(|(suite, name, _)| {
            let full_name = format!("{suite}{name}");
            filter
                .as_deref()
                .is_none_or(|patterns| filter_match(patterns, &full_name))
        })
        .collect();

    if list_tests {
        let mut current_suite = "";
        for (suite, name, _) in selected.iter().copied() {
            if suite != current_suite {
                println!("{suite}");
                current_suite = suite;
            }
            println!("  {name}");
        }
        return ExitCode::SUCCESS;
    }

    let mut failed = false;
    for (suite, name, behavior) in selected.iter().copied() {
        match behavior {
            Behavior::Pass => {}
            Behavior::FailAssert => {
                println!("fake_test.cc:(42) Failure in test {suite}{name}");
                println!("Expected equality of these values:");
                println!("  1");
                println!("  0");
                failed = true;
            }
            Behavior::Crash => {
                // SAFETY: deliberately dying the way a crashing test does.
                unsafe { libc::raise(libc::SIGSEGV) };
            }
            Behavior::Hang => loop {
                thread::sleep(Duration::from_secs(1));
            },
            Behavior::SleepMs(ms) => thread::sleep(Duration::from_millis(ms)),
            Behavior::MixedOutput => {
                println!("stdout line");
                eprintln!("stderr line");
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// gtest-style filter matching: colon-separated glob patterns with `*` and
/// `?`. (Negative patterns are not needed here.)
fn filter_match(patterns: &str, full_name: &str) -> bool {
    patterns
        .split(':')
        .any(|pattern| glob_match(pattern, full_name))
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_at(&pattern, &text)
}

fn glob_match_at(pattern: &[char], text: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('*') => {
            (0..=text.len()).any(|skip| glob_match_at(&pattern[1..], &text[skip..]))
        }
        Some('?') => !text.is_empty() && glob_match_at(&pattern[1..], &text[1..]),
        Some(c) => text.first() == Some(c) && glob_match_at(&pattern[1..], &text[1..]),
    }
}
