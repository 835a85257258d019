// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use std::process::ExitCode;

mod dispatch;
mod output;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    dispatch::Opts::parse().exec()
}
