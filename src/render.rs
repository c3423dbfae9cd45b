// ABOUTME: Presentation adapter rendering transcript entries to display HTML
// ABOUTME: Markdown-to-HTML transform only; stored transcript text is never mutated
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Transcript Rendering
//!
//! Pure transform from stored transcript entries to display entries. Message
//! text is treated as Markdown and converted with `pulldown-cmark`; the
//! stored entries keep the raw text, so rendering is idempotent and the model
//! replay never sees HTML.

use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;

use crate::session::ChatEntry;

/// A transcript entry prepared for display
#[derive(Debug, Clone, Serialize)]
pub struct RenderedEntry {
    /// Author role, `user` or `model`
    pub role: &'static str,
    /// Message text rendered to HTML
    pub html: String,
    /// Timestamp carried over verbatim
    pub timestamp: String,
}

/// Render Markdown text to an HTML fragment
#[must_use]
pub fn render_markdown(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES);
    let mut out = String::with_capacity(text.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Render a transcript for display, order preserved
#[must_use]
pub fn render_transcript(chat: &[ChatEntry]) -> Vec<RenderedEntry> {
    chat.iter()
        .map(|entry| RenderedEntry {
            role: entry.role.as_str(),
            html: render_markdown(&entry.text),
            timestamp: entry.timestamp.clone(),
        })
        .collect()
}
