//! Logging System
//!
//! Structured logging via the `tracing` crate: configurable level, text or
//! JSON format, stdout or file output. Environment variables win over the
//! configuration file (`REPOSYNC_LOG`, `REPOSYNC_LOG_FORMAT`,
//! `REPOSYNC_LOG_OUTPUT`).

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (if output is "file")
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Enable colored output (text format, stdout only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stdout".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("reposync.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: default_true(),
        }
    }
}

/// Initialize the logging system.
///
/// Priority order (highest to lowest): environment variables, configuration,
/// defaults.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), SyncError> {
    let filter = build_env_filter(config);
    let format = determine(
        "REPOSYNC_LOG_FORMAT",
        config.map(|c| c.format.as_str()),
        "text",
        &["json", "text"],
    )?;
    let output = determine(
        "REPOSYNC_LOG_OUTPUT",
        config.map(|c| c.output.as_str()),
        "stdout",
        &["stdout", "file"],
    )?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let base = Registry::default().with(filter);

    if output == "file" {
        let log_file = config
            .map(|c| c.file.clone())
            .unwrap_or_else(default_log_file);
        if let Some(parent) = log_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let writer = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        if format == "json" {
            base.with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .init();
        } else {
            base.with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .init();
        }
    } else if format == "json" {
        base.with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(std::io::stdout),
        )
        .init();
    } else {
        base.with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(use_color)
                .with_writer(std::io::stdout),
        )
        .init();
    }

    Ok(())
}

/// Build the level filter from `REPOSYNC_LOG` or the configured level.
fn build_env_filter(config: Option<&LoggingConfig>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env("REPOSYNC_LOG") {
        return filter;
    }
    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    EnvFilter::new(level)
}

/// Resolve a setting from an env var, falling back to config, validating
/// against the allowed values.
fn determine(
    env_var: &str,
    configured: Option<&str>,
    default: &str,
    allowed: &[&str],
) -> Result<String, SyncError> {
    let value = std::env::var(env_var)
        .ok()
        .or_else(|| configured.map(String::from))
        .unwrap_or_else(|| default.to_string());
    if !allowed.contains(&value.as_str()) {
        return Err(SyncError::Config(format!(
            "Invalid {} value: {} (must be one of {:?})",
            env_var, value, allowed
        )));
    }
    Ok(value)
}
