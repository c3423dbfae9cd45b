// ABOUTME: Integration tests for the conversation engine turn protocol
// ABOUTME: Uses the scripted provider; asserts transcript and replay invariants
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::ScriptedProvider;
use palaver::engine::ConversationEngine;
use palaver::errors::ErrorCode;
use palaver::llm::MessageRole;
use palaver::session::{ChatRole, SessionState};

fn authenticated_session() -> SessionState {
    let mut session = SessionState::default();
    session.authenticate("alice");
    session
}

#[tokio::test]
async fn test_turn_appends_user_model_pair() {
    common::init_test_logging();
    let provider = Arc::new(ScriptedProvider::always("Hello there"));
    let engine = ConversationEngine::new(provider);

    let mut session = authenticated_session();
    let reply = engine.send(&mut session, "Hi").await.unwrap();

    assert_eq!(reply, "Hello there");
    assert_eq!(session.chat.len(), 2);
    assert_eq!(session.chat[0].role, ChatRole::User);
    assert_eq!(session.chat[0].text, "Hi");
    assert_eq!(session.chat[1].role, ChatRole::Model);
    assert_eq!(session.chat[1].text, "Hello there");
    assert_eq!(session.chat[0].timestamp, session.chat[1].timestamp);
}

#[tokio::test]
async fn test_transcript_alternates_over_many_turns() {
    common::init_test_logging();
    let provider = Arc::new(ScriptedProvider::always("ack"));
    let engine = ConversationEngine::new(provider);

    let mut session = authenticated_session();
    for i in 0..5 {
        engine.send(&mut session, &format!("turn {i}")).await.unwrap();
    }

    assert_eq!(session.chat.len(), 10);
    for (i, entry) in session.chat.iter().enumerate() {
        let expected = if i % 2 == 0 {
            ChatRole::User
        } else {
            ChatRole::Model
        };
        assert_eq!(entry.role, expected);
    }
}

#[tokio::test]
async fn test_replay_includes_prior_turns_and_context() {
    common::init_test_logging();
    let provider = Arc::new(ScriptedProvider::always("Paris"));
    let engine = ConversationEngine::new(provider.clone());

    let mut session = authenticated_session();
    session.set_context("Paris is the capital of France.".to_owned());

    engine.send(&mut session, "What is the capital?").await.unwrap();
    engine.send(&mut session, "Are you sure?").await.unwrap();

    let requests = provider.recorded_requests();
    assert_eq!(requests.len(), 2);

    // First call: just the context-prefixed message.
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(
        requests[0].messages[0].content,
        "Paris is the capital of France.\nUser: What is the capital?"
    );

    // Second call replays the stored transcript (raw message text, no
    // context prefix) and re-sends the context on the new turn only.
    let second = &requests[1].messages;
    assert_eq!(second.len(), 3);
    assert_eq!(second[0].role, MessageRole::User);
    assert_eq!(second[0].content, "What is the capital?");
    assert_eq!(second[1].role, MessageRole::Model);
    assert_eq!(second[1].content, "Paris");
    assert_eq!(
        second[2].content,
        "Paris is the capital of France.\nUser: Are you sure?"
    );
}

#[tokio::test]
async fn test_unauthenticated_send_rejected_without_side_effects() {
    common::init_test_logging();
    let provider = Arc::new(ScriptedProvider::always("never"));
    let engine = ConversationEngine::new(provider.clone());

    let mut session = SessionState::default();
    let err = engine.send(&mut session, "Hi").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::Unauthorized);
    assert!(session.chat.is_empty());
    assert!(provider.recorded_requests().is_empty());
}

#[tokio::test]
async fn test_failed_generation_leaves_transcript_untouched() {
    common::init_test_logging();
    let provider = Arc::new(ScriptedProvider::scripted(vec![
        Ok("first".to_owned()),
        Err("model exploded".to_owned()),
    ]));
    let engine = ConversationEngine::new(provider);

    let mut session = authenticated_session();
    engine.send(&mut session, "one").await.unwrap();
    let err = engine.send(&mut session, "two").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::GenerationFailure);
    // Only the successful turn's pair is stored; no dangling user entry.
    assert_eq!(session.chat.len(), 2);
    assert_eq!(session.chat[1].text, "first");
}
