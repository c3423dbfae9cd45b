// ABOUTME: Environment-based configuration management for deployment-specific settings
// ABOUTME: Parses ports, secrets, and upload paths from the process environment at startup
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Environment-only configuration management
//!
//! All runtime configuration comes from the process environment; there is no
//! configuration file. [`ServerConfig::from_env`] is called once at startup
//! and the resulting value is shared behind an `Arc` for the process lifetime.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages (default)
    #[default]
    Info,
    /// Debug output
    Debug,
    /// Full trace output
    Trace,
}

impl LogLevel {
    /// Convert to a `tracing::Level`
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback to `Info`
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Default HTTP port when `HTTP_PORT` is unset
const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default directory for persisted uploads
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default timeout for outbound model calls, in seconds
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP server binds to (`HTTP_PORT`)
    pub http_port: u16,
    /// Secret protecting session cookie integrity (`SECRET_KEY`)
    pub session_secret: String,
    /// Directory where uploaded documents are persisted (`UPLOAD_DIR`)
    pub upload_dir: PathBuf,
    /// Timeout applied to outbound model calls (`LLM_TIMEOUT_SECS`)
    pub llm_timeout_secs: u64,
    /// Model override for the LLM provider (`GEMINI_MODEL`), `None` for the
    /// provider default
    pub llm_model: Option<String>,
    /// Log level (`LOG_LEVEL`)
    pub log_level: LogLevel,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `SECRET_KEY` is missing or a numeric variable
    /// fails to parse.
    pub fn from_env() -> Result<Self> {
        let http_port = match env::var("HTTP_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("Invalid HTTP_PORT value: {value}"))?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        let session_secret = env::var("SECRET_KEY")
            .context("SECRET_KEY environment variable not set (required for session integrity)")?;

        let upload_dir =
            PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_owned()));

        let llm_timeout_secs = match env::var("LLM_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("Invalid LLM_TIMEOUT_SECS value: {value}"))?,
            Err(_) => DEFAULT_LLM_TIMEOUT_SECS,
        };

        let llm_model = env::var("GEMINI_MODEL").ok().filter(|v| !v.is_empty());

        let log_level = env::var("LOG_LEVEL")
            .map(|v| LogLevel::from_str_or_default(&v))
            .unwrap_or_default();

        Ok(Self {
            http_port,
            session_secret,
            upload_dir,
            llm_timeout_secs,
            llm_model,
            log_level,
        })
    }

    /// One-line startup summary that never exposes secrets
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "http_port={} upload_dir={} llm_timeout={}s llm_model={} log_level={}",
            self.http_port,
            self.upload_dir.display(),
            self.llm_timeout_secs,
            self.llm_model.as_deref().unwrap_or("provider-default"),
            self.log_level
        )
    }
}
