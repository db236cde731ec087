// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! This module provides the command-line interface for Gauge using clap.
//! It supports multiple subcommands for different operations:
//!
//! - `run`: Start the data core (default)
//! - `validate`: Validate configuration file
//! - `version`: Show version information
//! - `read`: Poll the device once and print tag values
//! - `write`: Write a value to one tag

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Gauge - Modbus TCP HMI data core
///
/// Polls a register map from a Modbus TCP device at a fixed period and
/// gates operator writes, with supervised reconnects in between.
#[derive(Parser, Debug)]
#[command(
    name = "gauge",
    author = "Sylvex <contact@sylvex.io>",
    version = gauge_core::VERSION,
    about = "Modbus TCP HMI data core",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "gauge.yaml",
        env = "GAUGE_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "info",
        env = "GAUGE_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "GAUGE_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the Gauge CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the data core
    ///
    /// This is the default command when no subcommand is specified.
    /// It connects to the configured device, starts the background
    /// poller, and runs until a termination signal arrives.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration file without touching the
    /// device. Useful for checking configuration before deployment.
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,

    /// Poll the device once and print tag values
    ///
    /// Connects, runs a single poll cycle, prints the requested tag (or
    /// all polled tags), and disconnects.
    Read(ReadArgs),

    /// Write a value to one tag
    ///
    /// Connects, submits the write through the gateway, and disconnects.
    /// Values: `true`/`false`/`on`/`off` for coils, a number for single
    /// registers, comma-separated words for register blocks.
    Write(WriteArgs),
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Skip the initial connection attempt on startup
    #[arg(long)]
    pub skip_connect: bool,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `read` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ReadArgs {
    /// Tag to read (all polled tags when omitted)
    pub tag: Option<String>,
}

/// Arguments for the `write` command.
#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    /// Tag to write
    pub tag: String,

    /// Value to write
    pub value: String,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Check if verbose logging is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
