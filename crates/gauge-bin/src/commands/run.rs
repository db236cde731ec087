// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use tracing::info;

use crate::cli::{Cli, RunArgs};
use crate::error::BinResult;
use crate::runtime::RuntimeBuilder;

/// Executes the `run` command to start the data core.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    info!("Starting Gauge...");

    // Build the runtime
    let runtime = RuntimeBuilder::new()
        .config_path(&cli.config)
        .skip_connect(args.skip_connect)
        .build()?;

    // Run until shutdown
    runtime.run().await
}
