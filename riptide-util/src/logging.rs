// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Logging setup using the `tracing` ecosystem.

use tracing_subscriber::EnvFilter;

/// Initialize riptide's logging system.
///
/// Sets up tracing-subscriber with an environment filter read from
/// `RIPTIDE_LOG_LEVEL` or `RUST_LOG`, falling back to the verbosity level.
pub fn init_logging(component: &str, verbosity: i32) {
    let filter = EnvFilter::try_from_env("RIPTIDE_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| {
            let level = match verbosity {
                0 => "info",
                1 => "debug",
                _ => "trace",
            };
            EnvFilter::new(level)
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!(component, "riptide logging initialized");
}
