// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::ValueEnum;
use std::fmt;
use supports_color::Stream;
use tracing_subscriber::EnvFilter;

/// Color policy for run output, in gtest spelling.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub(crate) enum Color {
    #[default]
    Auto,
    #[value(alias = "always")]
    Yes,
    #[value(alias = "never")]
    No,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Color::Auto => "auto",
            Color::Yes => "yes",
            Color::No => "no",
        };
        write!(f, "{s}")
    }
}

impl Color {
    pub(crate) fn should_colorize(self, stream: Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Yes => true,
            Color::No => false,
        }
    }
}

/// Initializes diagnostics from the `ISOLATE_LOG` environment variable.
/// Diagnostics go to stderr; run output owns stdout.
pub(crate) fn init_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("ISOLATE_LOG"))
        .with_writer(std::io::stderr)
        .init();
}
