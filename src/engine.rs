// ABOUTME: Conversation engine: turn protocol between session transcripts and the model
// ABOUTME: Builds replay history, injects document context, appends exchanges atomically
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Conversation Engine
//!
//! The turn-taking state machine. Each model invocation is stateless: the
//! provider sees exactly the session transcript as it stood before the turn,
//! flattened in original order, followed by the outbound message. On success
//! the user/model pair is appended in one step; on failure the transcript is
//! left untouched and the error propagates to the caller.
//!
//! When document context is loaded, it is prepended to the outbound text of
//! every turn (`context + "\nUser: " + message`). The context travels with
//! each request because the remote call is reconstructed from the transcript
//! every time; there is no server-side model conversation object that could
//! remember it.

use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider, MessageRole};
use crate::session::{ChatEntry, ChatRole, SessionState};

/// Timestamp format stored on transcript entries
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Drives conversation turns against an LLM provider
pub struct ConversationEngine {
    provider: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationEngine")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl ConversationEngine {
    /// Create an engine over the given provider
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Map the stored transcript to provider messages, order and roles
    /// preserved verbatim
    fn build_replay_history(chat: &[ChatEntry]) -> Vec<ChatMessage> {
        chat.iter()
            .map(|entry| {
                let role = match entry.role {
                    ChatRole::User => MessageRole::User,
                    ChatRole::Model => MessageRole::Model,
                };
                ChatMessage::new(role, entry.text.clone())
            })
            .collect()
    }

    /// Build the literal text sent for this turn
    fn build_outbound(context: &str, message: &str) -> String {
        if context.is_empty() {
            message.to_owned()
        } else {
            format!("{context}\nUser: {message}")
        }
    }

    /// Run one conversation turn
    ///
    /// The caller must hold the session lock across this call; the await on
    /// the model happens under it, which is what serializes turns per
    /// session and keeps replay history and the appended pair consistent.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when the session carries no identity (state untouched),
    /// or the provider's generation failure (state untouched, no retry).
    pub async fn send(&self, session: &mut SessionState, message: &str) -> AppResult<String> {
        if !session.is_authenticated() {
            return Err(AppError::unauthorized());
        }

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let outbound = Self::build_outbound(&session.context, message);

        let mut messages = Self::build_replay_history(&session.chat);
        messages.push(ChatMessage::user(outbound));

        debug!(
            turns = session.chat.len(),
            has_context = !session.context.is_empty(),
            "Dispatching conversation turn"
        );

        let response = self.provider.complete(&ChatRequest::new(messages)).await?;

        session.push_exchange(message.to_owned(), response.content.clone(), &timestamp);
        info!(provider = self.provider.name(), "Conversation turn completed");

        Ok(response.content)
    }

    /// Check the underlying provider's health
    pub async fn health_check(&self) -> AppResult<bool> {
        self.provider.health_check().await
    }

    /// Name of the underlying provider
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}
