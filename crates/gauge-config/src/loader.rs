// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration file loading.
//!
//! The loader reads a file, resolves `${VAR}` environment placeholders
//! in the raw text, parses it according to its extension, and runs
//! schema validation. [`load_config_or_default`] adds the fallback
//! policy used at startup: an unreadable file degrades to the built-in
//! defaults with a warning, while a file that parses but fails
//! validation stays a hard error.

use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::GaugeConfig;

// ============================================================================
// Format detection
// ============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML (`.yaml`, `.yml`).
    Yaml,
    /// TOML (`.toml`).
    Toml,
    /// JSON (`.json`).
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            "" => Err(ConfigError::unsupported_format("<no extension>")),
            other => Err(ConfigError::unsupported_format(other)),
        }
    }

    /// The canonical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    fn file_format(&self) -> config::FileFormat {
        match self {
            ConfigFormat::Yaml => config::FileFormat::Yaml,
            ConfigFormat::Toml => config::FileFormat::Toml,
            ConfigFormat::Json => config::FileFormat::Json,
        }
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Loads and validates [`GaugeConfig`] files.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with environment placeholder resolution enabled.
    pub fn new() -> Self {
        Self {
            resolve_env_vars: true,
        }
    }

    /// Enables or disables `${VAR}` placeholder resolution.
    pub fn with_env_vars(mut self, resolve: bool) -> Self {
        self.resolve_env_vars = resolve;
        self
    }

    /// Loads a configuration file, inferring the format from its
    /// extension.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<GaugeConfig> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading configuration");

        if !path.exists() {
            return Err(ConfigError::not_found(path));
        }
        let format = ConfigFormat::from_path(path)?;
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::io(path, source))?;

        let config = self
            .parse(&content, format)
            .map_err(|message| ConfigError::parse(path, message))?;
        config.validate()?;

        tracing::debug!(
            tags = config.tags.len(),
            format = format.extension(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parses configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<GaugeConfig> {
        let config = self
            .parse(content, format)
            .map_err(|message| ConfigError::parse("<inline>", message))?;
        config.validate()?;
        Ok(config)
    }

    fn parse(&self, content: &str, format: ConfigFormat) -> Result<GaugeConfig, String> {
        let content = if self.resolve_env_vars {
            resolve_env_placeholders(content)
        } else {
            content.to_string()
        };
        config::Config::builder()
            .add_source(config::File::from_str(&content, format.file_format()))
            .build()
            .map_err(|err| err.to_string())?
            .try_deserialize()
            .map_err(|err| err.to_string())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Environment placeholders
// ============================================================================

/// Replaces `${VAR}` and `${VAR:default}` placeholders with environment
/// variable values. A placeholder with no value and no default is kept
/// verbatim so the parse error points at it.
fn resolve_env_placeholders(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let placeholder = &after[..end];
                let (name, default) = match placeholder.split_once(':') {
                    Some((name, default)) => (name, Some(default)),
                    None => (placeholder, None),
                };
                match std::env::var(name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => match default {
                        Some(default) => result.push_str(default),
                        None => {
                            tracing::warn!(
                                variable = name,
                                "Environment variable not set and no default given, \
                                 keeping placeholder"
                            );
                            result.push_str(&rest[start..start + 2 + end + 1]);
                        }
                    },
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated placeholder, keep the tail verbatim.
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Loads a configuration file with the default loader.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<GaugeConfig> {
    ConfigLoader::new().load(path)
}

/// Parses configuration from a string with the default loader.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<GaugeConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

/// Loads a configuration file, falling back to [`GaugeConfig::default`]
/// when the file is missing or unreadable.
///
/// Content errors do NOT fall back: a file that parses but carries
/// invalid values is a mistake the operator has to see, not paper over.
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<GaugeConfig> {
    let path = path.as_ref();
    match load_config(path) {
        Ok(config) => Ok(config),
        Err(err) if err.is_invalid_content() => Err(err),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                error_type = err.error_type(),
                "Could not load config, using built-in defaults"
            );
            Ok(GaugeConfig::default())
        }
    }
}
