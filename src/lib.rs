// ABOUTME: Session-scoped LLM chat server: auth, transcripts, context injection, rendering
// ABOUTME: Library crate; the palaver-server binary wires configuration and runs it
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Palaver
//!
//! A server-rendered chat application that proxies conversations to a
//! generative language model. Each browser session gets a transient,
//! server-side transcript; uploaded `.txt`/`.pdf` documents become context
//! injected into every subsequent turn; the transcript is rendered from
//! Markdown for page loads.
//!
//! The crate is organized as a small set of focused modules: [`credentials`]
//! and [`session`] hold state, [`engine`] drives conversation turns through
//! the [`llm`] provider seam, [`context`] handles uploads, [`render`] is the
//! display transform, and [`routes`]/[`server`] expose it all over HTTP.

#![deny(unsafe_code)]

pub mod config;
pub mod context;
pub mod credentials;
pub mod engine;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod render;
pub mod routes;
pub mod security;
pub mod server;
pub mod session;
