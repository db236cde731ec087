// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! This module contains the implementation of all CLI commands:
//!
//! - `run`: Start the data core
//! - `validate`: Validate configuration file
//! - `version`: Show version information
//! - `read`: Poll the device once and print tag values
//! - `write`: Write a value to one tag

mod read;
mod run;
mod validate;
mod version;
mod write;

pub use read::read;
pub use run::run;
pub use validate::validate;
pub use version::version;
pub use write::write;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::run(&cli, args).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
        Commands::Read(args) => read::read(&cli, args).await,
        Commands::Write(args) => write::write(&cli, args).await,
    }
}
