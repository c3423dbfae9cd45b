// ABOUTME: Shared test utilities: scripted LLM provider and resource factory
// ABOUTME: Keeps integration tests hermetic; no real network calls are made
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `palaver`
//!
//! Provides a scripted in-process LLM provider and a factory for fully wired
//! server resources, so route and engine tests never touch the network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use tempfile::TempDir;

use palaver::config::{LogLevel, ServerConfig};
use palaver::errors::AppError;
use palaver::llm::{ChatRequest, ChatResponse, LlmProvider};
use palaver::server::ServerResources;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// An LLM provider that replays scripted replies and records requests
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    /// Provider that answers every call with the same reply
    pub fn always(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
        .with_default_reply(reply)
    }

    fn with_default_reply(self, reply: &str) -> Self {
        // An empty queue falls back to this reply; stash it as a sentinel.
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(reply.to_owned()));
        self
    }

    /// Provider that replays the given results in order, then repeats the
    /// last one
    pub fn scripted(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider whose every call fails with a generation error
    pub fn failing(message: &str) -> Self {
        Self::scripted(vec![Err(message.to_owned())])
    }

    /// Requests observed so far, in call order
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.requests.lock().unwrap().push(request.clone());

        let mut replies = self.replies.lock().unwrap();
        let next = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };

        match next {
            Some(Ok(content)) => Ok(ChatResponse {
                content,
                model: "scripted-model".to_owned(),
                finish_reason: Some("STOP".to_owned()),
            }),
            Some(Err(message)) => Err(AppError::generation(message)),
            None => Err(AppError::generation("No scripted reply left")),
        }
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

/// Test configuration pointing uploads at a temp directory
pub fn test_config(upload_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        http_port: 0,
        session_secret: "test-secret-key".to_owned(),
        upload_dir: upload_dir.path().to_path_buf(),
        llm_timeout_secs: 5,
        llm_model: None,
        log_level: LogLevel::Warn,
    }
}

/// Fully wired server resources over a scripted provider
///
/// Returns the temp upload dir alongside the resources; dropping it removes
/// the directory, so keep it alive for the duration of the test.
pub fn create_test_resources(provider: Arc<dyn LlmProvider>) -> (Arc<ServerResources>, TempDir) {
    init_test_logging();
    let upload_dir = tempfile::tempdir().unwrap();
    let resources = Arc::new(ServerResources::new(test_config(&upload_dir), provider));
    (resources, upload_dir)
}
