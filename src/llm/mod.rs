// ABOUTME: LLM provider abstraction layer for pluggable generative model integration
// ABOUTME: Defines the chat completion contract the conversation engine calls through
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # LLM Provider Service Provider Interface
//!
//! The conversation engine never talks to a model API directly; it goes
//! through the [`LlmProvider`] trait. The only shipped implementation is
//! [`GeminiProvider`], but the trait is the seam for swapping providers (and
//! for the scripted mocks the tests use).
//!
//! Roles follow the Gemini wire convention: `user` and `model`. There is no
//! system role in this product; injected document context travels inside the
//! user turn text instead.

mod gemini;

pub use gemini::GeminiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Role of a message in a model conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End-user input
    User,
    /// Model output
    Model,
}

impl MessageRole {
    /// Wire representation for API calls
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// A single message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a model message
    #[must_use]
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Model, content)
    }
}

/// Configuration for a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Prior conversation turns, oldest first; the final entry is the
    /// message being sent this turn
    pub messages: Vec<ChatMessage>,
    /// Model identifier (provider-specific), `None` for the provider default
    pub model: Option<String>,
}

impl ChatRequest {
    /// Create a new chat request with messages
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
        }
    }
}

/// Response from a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated message content
    pub content: String,
    /// Model used for generation
    pub model: String,
    /// Finish reason if the API reported one
    pub finish_reason: Option<String>,
}

/// LLM provider trait for chat completion
///
/// The call is synchronous from the caller's perspective: the request
/// handler awaits completion, and a timeout inside the provider surfaces as
/// a generation failure rather than hanging the request forever.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Unique provider identifier (e.g. "gemini")
    fn name(&self) -> &'static str;

    /// Default model used when the request does not name one
    fn default_model(&self) -> &str;

    /// Perform a chat completion
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError>;

    /// Check that the provider is reachable and the API key is valid
    async fn health_check(&self) -> Result<bool, AppError>;
}
