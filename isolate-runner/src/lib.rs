// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [gtest-isolate](https://crates.io/crates/gtest-isolate).
//!
//! Given a test binary built against a gtest-style unit test library, this
//! crate enumerates the tests it declares and re-runs each one as its own
//! process, up to a configurable number at a time. Crashes, hangs and global
//! state corruption stay contained in the process that caused them; the
//! scheduler reaps each child, classifies the outcome, and assembles the
//! textual summary and optional JUnit XML report.
//!
//! The scheduler is a single-threaded cooperative loop: all parallelism comes
//! from child processes, all pipe reads are non-blocking, and all waits are
//! non-hanging. See [`runner::TestRunner`] for the entry point.

pub mod config;
pub mod errors;
mod helpers;
pub mod list;
mod reporter;
pub mod runner;
mod signal;
mod time;
