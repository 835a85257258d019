// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the isolation runner.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while enumerating tests from the child binary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnumerateError {
    /// The child binary could not be spawned in listing mode.
    #[error("error spawning `{command}` to list tests")]
    Spawn {
        /// The command line that failed to spawn.
        command: String,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A line of the listing output did not match the gtest listing grammar.
    ///
    /// The `Display` form matches what the original gtest output printer
    /// emits, so the CLI can print it verbatim before exiting.
    #[error("Unexpected output from test listing.\nCommand:\n{command}\nLine:\n{line}")]
    UnexpectedLine {
        /// The listing command line.
        command: String,
        /// The line that could not be parsed.
        line: String,
    },
}

/// An error that occurred while executing a test run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    /// Creating the merged-output pipe for a child failed.
    #[error("error creating output pipe for {test}")]
    CreatePipe {
        /// The test being dispatched.
        test: String,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The child process for a test could not be spawned.
    #[error("error spawning test process for {test}")]
    Spawn {
        /// The test being dispatched.
        test: String,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Polling the child output pipes failed.
    #[error("error polling test output pipes")]
    Poll(#[source] io::Error),

    /// Reading from a child's output pipe failed.
    #[error("error reading output of {test}")]
    Read {
        /// The test whose pipe failed.
        test: String,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A non-hanging wait for a child process failed.
    #[error("error waiting for test process of {test}")]
    Wait {
        /// The test being reaped.
        test: String,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Installing the SIGINT/SIGQUIT handlers failed.
    #[error("error installing signal handlers")]
    SignalSetup(#[source] io::Error),

    /// Writing to the run output stream failed.
    #[error("error writing run output")]
    WriteOutput(#[source] io::Error),

    /// Writing the JUnit XML report failed.
    #[error(transparent)]
    Junit(#[from] JunitError),
}

/// An error that occurred while writing the JUnit XML report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JunitError {
    /// The report file could not be created.
    #[error("cannot open xml file `{path}`")]
    Create {
        /// The configured report path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Serializing the report failed.
    #[error("error writing xml file `{path}`")]
    Write {
        /// The configured report path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: quick_xml::Error,
    },
}
