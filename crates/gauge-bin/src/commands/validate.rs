// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use gauge_core::TagRegistry;

use crate::cli::{Cli, ValidateArgs};
use crate::error::{BinError, BinResult};
use crate::runtime::tags_from_config;

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    // Load and validate configuration (a missing file is an error here,
    // unlike at startup).
    let config = gauge_config::load_config(config_path)?;

    // Registry-level checks catch what the schema cannot, e.g. polled
    // tags with overlapping addresses.
    let registry = TagRegistry::new(tags_from_config(&config))?;
    let polled = registry.all_polled_tags().len();

    // Collect validation warnings
    let mut warnings: Vec<String> = Vec::new();
    if config.tags.is_empty() {
        warnings.push("No tags configured".to_string());
    } else if polled == 0 {
        warnings.push("No polled tags; the poller will idle".to_string());
    }

    println!("✓ Configuration is valid: {}", config_path.display());
    println!();
    println!("Summary:");
    println!(
        "  Device: {}:{} (unit {})",
        config.modbus.host, config.modbus.port, config.modbus.unit_id
    );
    println!("  Poll interval: {} ms", config.poller.poll_interval_ms);
    println!("  Tags: {} ({} polled)", config.tags.len(), polled);
    if config.modbus.auto_reconnect {
        println!(
            "  Auto-reconnect: every {} s",
            config.modbus.reconnect_delay_secs
        );
    } else {
        println!("  Auto-reconnect: disabled");
    }

    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &warnings {
            println!("  ⚠ {}", warning);
        }
    }

    if args.show_config {
        println!();
        println!("Parsed configuration:");
        println!(
            "{}",
            serde_json::to_string_pretty(&config)
                .unwrap_or_else(|_| "(serialization error)".to_string())
        );
    }

    // In strict mode, treat warnings as errors
    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}
