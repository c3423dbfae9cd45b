// ABOUTME: Unified error handling with standard error codes and HTTP response formatting
// ABOUTME: Every fallible path in the crate surfaces an AppError with a stable wire code
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Unified Error Handling
//!
//! Centralized error types for the chat server. Each error carries a stable
//! [`ErrorCode`] that maps to an HTTP status and a `SCREAMING_SNAKE` wire
//! name, so every handler returns consistent JSON error bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication (1000-1999)
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized = 1000,
    #[serde(rename = "INVALID_CREDENTIALS")]
    InvalidCredentials = 1001,

    // Account management (2000-2999)
    #[serde(rename = "USER_ALREADY_EXISTS")]
    AlreadyExists = 2000,

    // Upload validation (3000-3999)
    #[serde(rename = "NO_FILE")]
    NoFile = 3000,
    #[serde(rename = "EMPTY_FILENAME")]
    EmptyFilename = 3001,
    #[serde(rename = "UNSUPPORTED_TYPE")]
    UnsupportedType = 3002,

    // Preferences (4000-4999)
    #[serde(rename = "UNKNOWN_PREFERENCE")]
    UnknownPreference = 4000,

    // External services (5000-5999)
    #[serde(rename = "GENERATION_FAILURE")]
    GenerationFailure = 5000,
    #[serde(rename = "EXTERNAL_RATE_LIMITED")]
    ExternalRateLimited = 5001,

    // Configuration (6000-6999)
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,

    // Internal (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9001,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            // 400 Bad Request
            Self::NoFile
            | Self::EmptyFilename
            | Self::UnsupportedType
            | Self::UnknownPreference => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,

            // 409 Conflict
            Self::AlreadyExists => StatusCode::CONFLICT,

            // 502 Bad Gateway
            Self::GenerationFailure => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            Self::ExternalRateLimited => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::ConfigError | Self::InternalError | Self::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a user-facing description of this error code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Unauthorized => "Authentication is required to access this resource",
            Self::InvalidCredentials => "The provided credentials are invalid",
            Self::AlreadyExists => "A user with this name already exists",
            Self::NoFile => "No file payload was supplied",
            Self::EmptyFilename => "The uploaded file has an empty filename",
            Self::UnsupportedType => "The uploaded file type is not supported",
            Self::UnknownPreference => "The preference key is not recognized",
            Self::GenerationFailure => "The language model call failed",
            Self::ExternalRateLimited => "External service rate limit exceeded",
            Self::ConfigError => "Configuration error encountered",
            Self::InternalError => "An internal server error occurred",
            Self::StorageError => "Storage operation failed",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Stable machine-readable error code
    pub code: ErrorCode,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            error: error.message.clone(),
            code: error.code,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        (self.http_status(), Json(body)).into_response()
    }
}

/// Convenience constructors for common errors
impl AppError {
    /// Authentication required
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "Unauthorized")
    }

    /// Invalid login credentials
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials, "Invalid credentials")
    }

    /// Signup collision
    pub fn already_exists(username: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::AlreadyExists,
            format!("User '{}' already exists", username.into()),
        )
    }

    /// Remote generation failure
    pub fn generation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GenerationFailure, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Storage (filesystem) error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::new(ErrorCode::StorageError, error.to_string()).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(
            ErrorCode::Unauthorized.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::AlreadyExists.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::NoFile.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::GenerationFailure.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let error = AppError::already_exists("alice");
        let body = ErrorResponse::from(&error);

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("USER_ALREADY_EXISTS"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn test_unauthorized_message_matches_wire_contract() {
        // The /send endpoint promises exactly {"error": "Unauthorized"}.
        let error = AppError::unauthorized();
        assert_eq!(error.message, "Unauthorized");
        assert_eq!(error.http_status(), StatusCode::UNAUTHORIZED);
    }
}
