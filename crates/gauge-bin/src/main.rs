// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Gauge - Modbus TCP HMI data core
//!
//! Main binary entry point for the Gauge CLI.

use gauge_bin::cli::Cli;
use gauge_bin::error::report_error_and_exit;
use gauge_bin::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.effective_log_level(), cli.log_format);

    if let Err(error) = gauge_bin::commands::execute(cli).await {
        report_error_and_exit(error);
    }
}
