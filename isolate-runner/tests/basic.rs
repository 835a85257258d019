// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests driving the real scheduler against the `fake-gtest`
//! helper binary.
//!
//! Timing digits in the output are sanitized to `XX` before comparison, the
//! same way the upstream system tests do it.

use isolate_runner::{
    config::{RunnerOpts, TestCommand},
    list::TestList,
    runner::{RunSummary, TestRunner},
};
use regex::Regex;
use std::time::Duration;

fn fake_gtest() -> TestCommand {
    TestCommand::new(env!("CARGO_BIN_EXE_fake-gtest").into(), Vec::new())
}

fn base_opts(filter: &str) -> RunnerOpts {
    RunnerOpts {
        job_count: Some(20),
        filter: Some(filter.to_owned()),
        allow_disabled_tests: true,
        ..RunnerOpts::default()
    }
}

fn run(opts: &RunnerOpts) -> (String, RunSummary) {
    let command = fake_gtest();
    let test_list = TestList::from_command(
        &command,
        opts.filter.as_deref(),
        opts.allow_disabled_tests,
    )
    .expect("enumeration succeeds");
    let runner = TestRunner::new(opts, &command, &test_list);
    let mut out = Vec::new();
    let summary = runner.execute(&mut out).expect("run succeeds");
    (String::from_utf8(out).expect("output is UTF-8"), summary)
}

fn sanitize(output: &str) -> String {
    let output = Regex::new(r"\((\d+) ms")
        .unwrap()
        .replace_all(output, "(XX ms");
    Regex::new(r"at (\d+) ms")
        .unwrap()
        .replace_all(&output, "at XX ms")
        .into_owned()
}

#[test]
fn verify_pass() {
    let (output, summary) = run(&base_opts("*.pass_one"));
    assert_eq!(
        sanitize(&output),
        "[==========] Running 1 test from 1 test case (20 jobs).\n\
         [    OK    ] Basics.pass_one (XX ms)\n\
         [==========] 1 test from 1 test case ran. (XX ms total)\n\
         [   PASS   ] 1 test.\n"
    );
    assert!(summary.is_success());
    assert_eq!(summary.iterations.len(), 1);
    assert_eq!(summary.iterations[0].passed, 1);
}

#[test]
fn verify_pass_no_print_time() {
    let opts = RunnerOpts {
        print_time: false,
        ..base_opts("*.pass_one")
    };
    let (output, _) = run(&opts);
    assert_eq!(
        sanitize(&output),
        "[==========] Running 1 test from 1 test case (20 jobs).\n\
         [    OK    ] Basics.pass_one\n\
         [==========] 1 test from 1 test case ran. (XX ms total)\n\
         [   PASS   ] 1 test.\n"
    );
}

#[test]
fn verify_pass_gtest_format() {
    let opts = RunnerOpts {
        gtest_format: true,
        ..base_opts("*.pass_one")
    };
    let (output, _) = run(&opts);
    assert_eq!(
        sanitize(&output),
        "[==========] Running 1 test from 1 test case (20 jobs).\n\
         [ RUN      ] Basics.pass_one\n\
         [       OK ] Basics.pass_one (XX ms)\n\
         [==========] 1 test from 1 test case ran. (XX ms total)\n\
         [   PASS   ] 1 test.\n"
    );
}

#[test]
fn verify_fail() {
    let (output, summary) = run(&base_opts("*.fail_assert"));
    assert_eq!(
        sanitize(&output),
        "[==========] Running 1 test from 1 test case (20 jobs).\n\
         [  FAILED  ] Basics.fail_assert (XX ms)\n\
         fake_test.cc:(42) Failure in test Basics.fail_assert\n\
         Expected equality of these values:\n\
         \x20\x201\n\
         \x20\x200\n\
         Basics.fail_assert exited with exitcode 1.\n\
         [==========] 1 test from 1 test case ran. (XX ms total)\n\
         [   PASS   ] 0 tests.\n\
         [   FAIL   ] 1 test, listed below:\n\
         [   FAIL   ] Basics.fail_assert\n\
         \n\
         \x201 FAILED TEST\n"
    );
    assert!(!summary.is_success());
    assert_eq!(summary.iterations[0].failed, 1);
}

#[test]
fn verify_crash() {
    let (output, summary) = run(&base_opts("*.crash_segv"));
    assert!(
        output.contains("Basics.crash_segv terminated by signal: Segmentation fault.\n"),
        "{output}"
    );
    assert!(output.contains("[  FAILED  ] Basics.crash_segv"), "{output}");
    assert_eq!(summary.iterations[0].failed, 1);
    assert!(!summary.is_success());
}

#[test]
fn verify_timeout() {
    let opts = RunnerOpts {
        deadline_threshold: Duration::from_millis(500),
        ..base_opts("*.sleep_forever")
    };
    let (output, summary) = run(&opts);
    assert_eq!(
        sanitize(&output),
        "[==========] Running 1 test from 1 test case (20 jobs).\n\
         [ TIMEOUT  ] Timeouts.sleep_forever (XX ms)\n\
         Timeouts.sleep_forever killed because of timeout at XX ms.\n\
         [==========] 1 test from 1 test case ran. (XX ms total)\n\
         [   PASS   ] 0 tests.\n\
         [ TIMEOUT  ] 1 test, listed below:\n\
         [ TIMEOUT  ] Timeouts.sleep_forever (stopped at XX ms)\n\
         \n\
         \x201 TIMEOUT TEST\n"
    );
    let stats = summary.iterations[0];
    assert_eq!(stats.timed_out, 1);
    // A timed-out test is never also slow.
    assert_eq!(stats.slow, 0);
}

#[test]
fn verify_slow() {
    let opts = RunnerOpts {
        slow_threshold: Duration::from_millis(100),
        ..base_opts("*.slow_pass")
    };
    let (output, summary) = run(&opts);
    assert_eq!(
        sanitize(&output),
        "[==========] Running 1 test from 1 test case (20 jobs).\n\
         [    OK    ] Timeouts.slow_pass (XX ms)\n\
         [==========] 1 test from 1 test case ran. (XX ms total)\n\
         [   PASS   ] 1 test.\n\
         [   SLOW   ] 1 test, listed below:\n\
         [   SLOW   ] Timeouts.slow_pass (XX ms, exceeded 100 ms)\n\
         \n\
         \x201 SLOW TEST\n"
    );
    let stats = summary.iterations[0];
    assert_eq!(stats.passed, 1);
    assert_eq!(stats.slow, 1);
    assert!(summary.is_success());
}

#[test]
fn verify_xfail() {
    let (output, summary) = run(&base_opts("*.always_fails"));
    assert_eq!(
        sanitize(&output),
        "[==========] Running 1 test from 1 test case (20 jobs).\n\
         [    OK    ] DISABLED_Known.always_fails (XX ms)\n\
         fake_test.cc:(42) Failure in test DISABLED_Known.always_fails\n\
         Expected equality of these values:\n\
         \x20\x201\n\
         \x20\x200\n\
         DISABLED_Known.always_fails exited with exitcode 1.\n\
         [==========] 1 test from 1 test case ran. (XX ms total)\n\
         [   PASS   ] 1 test. (1 expected failure)\n"
    );
    assert!(summary.is_success());
    assert_eq!(summary.iterations[0].xfailed, 1);
}

#[test]
fn verify_xpass() {
    let (output, summary) = run(&base_opts("*.sneaky_pass"));
    assert_eq!(
        sanitize(&output),
        "[==========] Running 1 test from 1 test case (20 jobs).\n\
         [  FAILED  ] DISABLED_Known.sneaky_pass (XX ms)\n\
         [==========] 1 test from 1 test case ran. (XX ms total)\n\
         [   PASS   ] 0 tests.\n\
         [  XPASS   ] 1 test, listed below:\n\
         [  XPASS   ] DISABLED_Known.sneaky_pass\n\
         \n\
         \x201 SHOULD HAVE FAILED TEST\n"
    );
    assert!(!summary.is_success());
    assert_eq!(summary.iterations[0].xpassed, 1);
}

#[test]
fn verify_merged_output_streams() {
    let (output, _) = run(&base_opts("*.mixed_output"));
    assert!(output.contains("stdout line\nstderr line\n"), "{output}");
}

#[test]
fn verify_final_report_in_catalog_order() {
    // Every Basics test runs concurrently; completion order varies, but
    // the footer must list failures in catalog order.
    let (output, _) = run(&base_opts("Basics.*"));
    let fail_section: Vec<_> = output
        .lines()
        .filter(|line| line.starts_with("[   FAIL   ] Basics."))
        .collect();
    assert_eq!(
        fail_section,
        ["[   FAIL   ] Basics.fail_assert", "[   FAIL   ] Basics.crash_segv"],
        "{output}"
    );
}

#[test]
fn verify_parallel_matches_serial() {
    let parallel = run(&base_opts("Basics.*")).1;
    let serial = run(&RunnerOpts {
        job_count: Some(1),
        ..base_opts("Basics.*")
    })
    .1;
    assert_eq!(parallel.iterations, serial.iterations);

    let stats = parallel.iterations[0];
    assert_eq!(stats.passed, 4);
    assert_eq!(stats.failed, 2);
}

#[test]
fn verify_disabled_tests_filtered_out() {
    let command = fake_gtest();
    let test_list = TestList::from_command(&command, None, false).expect("enumeration succeeds");
    // DISABLED_skipped is tallied; the DISABLED_Known suite is skipped
    // wholesale.
    assert_eq!(test_list.len(), 7);
    assert_eq!(test_list.suite_count(), 2);
    assert_eq!(test_list.disabled_count(), 1);

    let opts = RunnerOpts {
        allow_disabled_tests: false,
        filter: None,
        deadline_threshold: Duration::from_millis(2000),
        ..base_opts("*")
    };
    let (output, _) = run(&opts);
    assert!(output.ends_with("  YOU HAVE 1 DISABLED TEST\n\n"), "{output}");
}

#[test]
fn verify_empty_catalog() {
    let (output, summary) = run(&base_opts("*.does_not_exist"));
    assert_eq!(
        sanitize(&output),
        "[==========] Running 0 tests from 0 test cases (20 jobs).\n\
         [==========] 0 tests from 0 test cases ran. (XX ms total)\n\
         [   PASS   ] 0 tests.\n"
    );
    assert!(summary.is_success());
}

#[test]
fn verify_repeat() {
    let opts = RunnerOpts {
        num_iterations: 3,
        ..base_opts("*.pass_one")
    };
    let (output, summary) = run(&opts);
    assert_eq!(summary.iterations.len(), 3);
    assert!(summary.is_success());
    assert_eq!(
        output
            .matches("Repeating all tests (iteration ")
            .count(),
        2
    );
    assert!(output.contains("\nRepeating all tests (iteration 2) . . .\n\n"), "{output}");
    assert!(output.contains("\nRepeating all tests (iteration 3) . . .\n\n"), "{output}");
    assert_eq!(output.matches("[    OK    ] Basics.pass_one").count(), 3);
}

#[test]
fn verify_xml_report() {
    let xml_path = std::env::temp_dir().join(format!(
        "isolate-runner-junit-{}.xml",
        std::process::id()
    ));
    let opts = RunnerOpts {
        xml_path: Some(
            xml_path
                .to_str()
                .expect("temp path is UTF-8")
                .into(),
        ),
        ..base_opts("*.pass_one:*.fail_assert")
    };
    let (_, summary) = run(&opts);
    assert!(!summary.is_success());

    let report = std::fs::read_to_string(&xml_path).expect("XML report exists");
    std::fs::remove_file(&xml_path).ok();

    assert!(report.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"), "{report}");
    assert!(
        report.contains("<testsuites tests=\"2\" failures=\"1\" disabled=\"0\" errors=\"0\""),
        "{report}"
    );
    assert!(
        report.contains("<testcase name=\"pass_one\" status=\"run\""),
        "{report}"
    );
    assert!(report.contains("classname=\"Basics\""), "{report}");
    assert!(
        report.contains("Basics.fail_assert exited with exitcode 1."),
        "{report}"
    );
    assert!(report.contains("type=\"\""), "{report}");
}
