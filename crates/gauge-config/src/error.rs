// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// The file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file content could not be parsed.
    #[error("failed to parse config file '{path}': {message}")]
    Parse {
        /// Path to the file.
        path: PathBuf,
        /// Parser error message.
        message: String,
    },

    /// The file extension names no supported format.
    #[error("unsupported config format: {format}")]
    UnsupportedFormat {
        /// The unrecognized extension.
        format: String,
    },

    /// A field holds a structurally invalid value.
    #[error("validation failed for '{field}': {message}")]
    Validation {
        /// The offending field, dotted path form.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A numeric field is outside its allowed range.
    #[error("value out of range for '{field}': {value} (expected {min}..={max})")]
    OutOfRange {
        /// The offending field, dotted path form.
        field: String,
        /// The rejected value.
        value: String,
        /// Lower bound, inclusive.
        min: String,
        /// Upper bound, inclusive.
        max: String,
    },
}

impl ConfigError {
    /// Creates a [`ConfigError::NotFound`].
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a [`ConfigError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a [`ConfigError::Parse`].
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a [`ConfigError::UnsupportedFormat`].
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a [`ConfigError::Validation`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a [`ConfigError::OutOfRange`].
    pub fn out_of_range<T: std::fmt::Display>(
        field: impl Into<String>,
        value: T,
        min: T,
        max: T,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Returns `true` for errors that fault the config CONTENT rather
    /// than the file; these never fall back to built-in defaults.
    pub fn is_invalid_content(&self) -> bool {
        matches!(
            self,
            ConfigError::Validation { .. } | ConfigError::OutOfRange { .. }
        )
    }

    /// Returns the error kind as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            ConfigError::NotFound { .. } => "not_found",
            ConfigError::Io { .. } => "io",
            ConfigError::Parse { .. } => "parse",
            ConfigError::UnsupportedFormat { .. } => "unsupported_format",
            ConfigError::Validation { .. } => "validation",
            ConfigError::OutOfRange { .. } => "out_of_range",
        }
    }
}

/// A Result type with [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
