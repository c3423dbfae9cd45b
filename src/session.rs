// ABOUTME: Per-client session state: identity, transcript, injected context, UI preferences
// ABOUTME: Server-side store keyed by opaque session id with per-session mutation locking
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Session State
//!
//! One [`SessionState`] record exists per browser session, held in a
//! process-wide [`SessionStore`] keyed by the opaque id carried in the
//! session cookie. State is transient: nothing survives a restart.
//!
//! Each record sits behind its own `tokio::sync::Mutex`. Handlers lock the
//! session for the duration of any mutating operation, which serializes
//! conversation turns per session and keeps the transcript's strict
//! user/model alternation intact even if a client fires concurrent requests.

use crate::errors::{AppError, AppResult, ErrorCode};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Message typed by the user
    User,
    /// Reply produced by the model
    Model,
}

impl ChatRole {
    /// Wire representation used for model replay and rendering
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// A single immutable transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Who authored the entry
    pub role: ChatRole,
    /// Raw message text (Markdown, rendered at display time)
    pub text: String,
    /// Wall-clock timestamp, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

/// UI color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme (default)
    #[default]
    Light,
    /// Dark theme
    Dark,
}

impl Theme {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// The other theme
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Boolean voice preferences recognized by the toggle endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePreference {
    /// Microphone dictation for composing messages
    Input,
    /// Spoken playback of model replies
    Output,
}

impl VoicePreference {
    /// Parse the wire name of a preference key
    ///
    /// # Errors
    ///
    /// Returns `UnknownPreference` for anything other than the two
    /// recognized keys.
    pub fn parse(name: &str) -> AppResult<Self> {
        match name {
            "voiceInput" => Ok(Self::Input),
            "voiceOutput" => Ok(Self::Output),
            other => Err(AppError::new(
                ErrorCode::UnknownPreference,
                format!("Unknown preference key: {other}"),
            )),
        }
    }

    /// Wire name of the preference key
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Input => "voiceInput",
            Self::Output => "voiceOutput",
        }
    }
}

/// Per-client session record
///
/// `Default` yields the canonical fresh session: anonymous, empty transcript,
/// no context, both voice preferences on, light theme. The store applies it
/// exactly once per session id; existing fields are never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Authenticated username; `None` means anonymous
    pub username: Option<String>,
    /// Ordered conversation transcript, append-only between resets
    pub chat: Vec<ChatEntry>,
    /// Injected document context, empty when none is loaded
    pub context: String,
    /// Voice dictation preference
    pub voice_input: bool,
    /// Voice playback preference
    pub voice_output: bool,
    /// UI theme
    pub theme: Theme,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            username: None,
            chat: Vec::new(),
            context: String::new(),
            voice_input: true,
            voice_output: true,
            theme: Theme::Light,
        }
    }
}

impl SessionState {
    /// Whether the session carries an authenticated identity
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    /// Attach an authenticated identity
    ///
    /// Call only after the credential store verified the password (or right
    /// after a successful registration).
    pub fn authenticate(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    /// Clear the transcript and any injected document context
    pub fn reset_conversation(&mut self) {
        self.chat.clear();
        self.context.clear();
    }

    /// Replace the injected document context wholesale
    pub fn set_context(&mut self, context: String) {
        self.context = context;
    }

    /// Append a completed user/model exchange
    ///
    /// Both entries land in one call so a failed model invocation can never
    /// leave a dangling user-only turn in the transcript.
    pub fn push_exchange(&mut self, user_text: String, model_text: String, timestamp: &str) {
        self.chat.push(ChatEntry {
            role: ChatRole::User,
            text: user_text,
            timestamp: timestamp.to_owned(),
        });
        self.chat.push(ChatEntry {
            role: ChatRole::Model,
            text: model_text,
            timestamp: timestamp.to_owned(),
        });
    }

    /// Flip a voice preference, returning the new value
    pub fn toggle_preference(&mut self, preference: VoicePreference) -> bool {
        let slot = match preference {
            VoicePreference::Input => &mut self.voice_input,
            VoicePreference::Output => &mut self.voice_output,
        };
        *slot = !*slot;
        *slot
    }

    /// Flip the theme, returning the new value
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}

/// Handle to one session's state
pub type SharedSession = Arc<Mutex<SessionState>>;

/// Process-wide store of live sessions
///
/// Keyed by the opaque session id from the signed cookie. Records are
/// created lazily with defaults on first resolution and removed entirely on
/// logout; cookie expiry on the client side orphans records, which is
/// acceptable for this transient, in-process design.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, SharedSession>,
}

impl SessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a session id to its state, creating defaults on first sight
    ///
    /// This is the "ensure defaults" step from the pre-request hook: it runs
    /// before any handler logic and never overwrites an existing record.
    #[must_use]
    pub fn resolve(&self, session_id: &str) -> SharedSession {
        self.sessions
            .entry(session_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::default())))
            .clone()
    }

    /// Drop a session record entirely, returning it to an anonymous,
    /// default-free state (the next resolution re-applies defaults)
    pub fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Number of live sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = SessionState::default();
        assert!(state.username.is_none());
        assert!(state.chat.is_empty());
        assert!(state.context.is_empty());
        assert!(state.voice_input);
        assert!(state.voice_output);
        assert_eq!(state.theme, Theme::Light);
    }

    #[test]
    fn test_toggle_preference_starts_from_true() {
        let mut state = SessionState::default();
        assert!(!state.toggle_preference(VoicePreference::Input));
        assert!(state.toggle_preference(VoicePreference::Input));
    }

    #[test]
    fn test_unknown_preference_key_rejected() {
        let err = VoicePreference::parse("volume").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownPreference);
    }

    #[test]
    fn test_reset_conversation_clears_chat_and_context() {
        let mut state = SessionState::default();
        state.push_exchange("hi".into(), "hello".into(), "2025-01-01 00:00:00");
        state.set_context("doc text".into());

        state.reset_conversation();
        assert!(state.chat.is_empty());
        assert!(state.context.is_empty());

        // Idempotent.
        state.reset_conversation();
        assert!(state.chat.is_empty());
    }

    #[test]
    fn test_store_resolve_is_lazy_and_stable() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let first = store.resolve("sid-1");
        {
            let mut guard = first.try_lock().unwrap();
            guard.authenticate("alice");
        }

        // Second resolution returns the same record, not fresh defaults.
        let second = store.resolve("sid-1");
        assert!(second.try_lock().unwrap().is_authenticated());
        assert_eq!(store.len(), 1);

        store.clear("sid-1");
        assert!(store.is_empty());
        let third = store.resolve("sid-1");
        assert!(!third.try_lock().unwrap().is_authenticated());
    }
}
