// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Octarine process entry point.
//!
//! Installs logging, constructs the runtime and lets it tear down on exit.
//! Log verbosity is taken from `OCTARINE_LOG` (default `info`).

use std::process::ExitCode;

use octarine_vm::{Runtime, VERSION};
use tracing_subscriber::EnvFilter;

fn setup_tracing() {
    let filter = EnvFilter::try_from_env("OCTARINE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    setup_tracing();
    tracing::info!(version = VERSION, "starting octarine");

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "runtime construction failed");
            return ExitCode::FAILURE;
        }
    };

    match runtime.current_namespace() {
        Ok(ns) => tracing::info!(namespace = %ns.name(), "root namespace ready"),
        Err(e) => {
            tracing::error!(error = %e, "no current namespace");
            return ExitCode::FAILURE;
        }
    }

    drop(runtime);
    tracing::info!("octarine stopped");
    ExitCode::SUCCESS
}
