// ABOUTME: Chat routes: the rendered chat page, message turns, reset, upload, toggles
// ABOUTME: JSON endpoints mirror the page's fetch calls; the page itself is server-rendered
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Chat Routes
//!
//! The core product surface. `GET /` renders the transcript for the
//! authenticated user (anonymous sessions are redirected to `/auth`);
//! `POST /send` runs one conversation turn; `GET /reset` clears the
//! conversation; `POST /upload` loads document context; the toggle endpoints
//! flip per-session UI preferences. Every mutating endpoint refuses
//! anonymous sessions with 401 before touching any state.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{attach_session_cookie, require_authenticated, resolve_session};
use crate::errors::{AppError, ErrorCode};
use crate::render;
use crate::server::ServerResources;
use crate::session::{SessionState, VoicePreference};

/// Request body for `POST /send`
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// The user's message for this turn
    pub message: String,
}

/// Response body for `POST /send`
#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    /// The model's reply
    pub response: String,
}

/// Request body for `POST /toggle-voice`
#[derive(Debug, Deserialize)]
pub struct ToggleVoiceRequest {
    /// Preference key, `voiceInput` or `voiceOutput`
    pub setting: String,
}

/// Response body for `POST /toggle-theme`
#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleThemeResponse {
    /// The theme now in effect
    pub theme: String,
}

/// Response body for `POST /upload`
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Confirmation message
    pub message: String,
}

/// Chat route handlers
pub struct ChatRoutes;

impl ChatRoutes {
    /// Build the chat router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/send", post(send))
            .route("/reset", get(reset))
            .route("/upload", post(upload))
            .route("/toggle-theme", post(toggle_theme))
            .route("/toggle-voice", post(toggle_voice))
            .with_state(resources)
    }
}

/// Render the chat page for an authenticated session
fn render_chat_page(session: &SessionState, username: &str) -> String {
    let mut transcript = String::new();
    for entry in render::render_transcript(&session.chat) {
        // entry.html is already rendered HTML; only metadata needs escaping.
        let _ = write!(
            transcript,
            r#"<div class="message {role}"><span class="timestamp">{timestamp}</span>{html}</div>"#,
            role = entry.role,
            timestamp = html_escape::encode_text(&entry.timestamp),
            html = entry.html,
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Palaver</title>
</head>
<body class="theme-{theme}" data-voice-input="{voice_input}" data-voice-output="{voice_output}">
  <header>
    <h1>Palaver</h1>
    <span class="user">{username}</span>
    <a href="/logout">Log out</a>
  </header>
  <main id="chat">{transcript}</main>
  <footer>
    <form id="send-form">
      <input id="message" autocomplete="off" placeholder="Say something...">
      <button type="submit">Send</button>
    </form>
    <form id="upload-form" enctype="multipart/form-data">
      <input id="file" name="file" type="file" accept=".txt,.pdf">
      <button type="submit">Add context</button>
    </form>
    <button id="reset">Reset</button>
    <button id="theme">Theme</button>
    <button id="voice-input">Mic</button>
    <button id="voice-output">Speaker</button>
  </footer>
  <script>
    const chat = document.getElementById('chat');
    document.getElementById('send-form').addEventListener('submit', async (e) => {{
      e.preventDefault();
      const input = document.getElementById('message');
      const message = input.value.trim();
      if (!message) return;
      input.value = '';
      const res = await fetch('/send', {{
        method: 'POST',
        headers: {{'Content-Type': 'application/json'}},
        body: JSON.stringify({{message}}),
      }});
      const body = await res.json();
      const text = res.ok ? body.response : body.error;
      chat.insertAdjacentHTML('beforeend',
        `<div class="message user"><p></p></div><div class="message model"><p></p></div>`);
      const nodes = chat.querySelectorAll('.message p');
      nodes[nodes.length - 2].textContent = message;
      nodes[nodes.length - 1].textContent = text;
    }});
    document.getElementById('upload-form').addEventListener('submit', async (e) => {{
      e.preventDefault();
      const data = new FormData();
      const file = document.getElementById('file').files[0];
      if (file) data.append('file', file);
      const res = await fetch('/upload', {{method: 'POST', body: data}});
      const body = await res.json();
      alert(res.ok ? body.message : body.error);
    }});
    document.getElementById('reset').addEventListener('click', async () => {{
      await fetch('/reset');
      chat.innerHTML = '';
    }});
    document.getElementById('theme').addEventListener('click', async () => {{
      const res = await fetch('/toggle-theme', {{method: 'POST'}});
      const body = await res.json();
      document.body.className = 'theme-' + body.theme;
    }});
    for (const setting of ['voiceInput', 'voiceOutput']) {{
      const id = setting === 'voiceInput' ? 'voice-input' : 'voice-output';
      document.getElementById(id).addEventListener('click', () => {{
        fetch('/toggle-voice', {{
          method: 'POST',
          headers: {{'Content-Type': 'application/json'}},
          body: JSON.stringify({{setting}}),
        }});
      }});
    }}
  </script>
</body>
</html>"#,
        theme = session.theme.as_str(),
        voice_input = session.voice_input,
        voice_output = session.voice_output,
        username = html_escape::encode_text(username),
        transcript = transcript,
    )
}

/// `GET /` - chat page, or redirect to `/auth` for anonymous sessions
async fn index(State(resources): State<Arc<ServerResources>>, headers: HeaderMap) -> Response {
    let resolved = resolve_session(&resources, &headers);
    let session = resolved.state.lock().await;

    let response = match &session.username {
        Some(username) => Html(render_chat_page(&session, username)).into_response(),
        None => Redirect::to("/auth").into_response(),
    };

    drop(session);
    attach_session_cookie(response, &resolved)
}

/// `POST /send` - run one conversation turn
async fn send(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(payload): Json<SendRequest>,
) -> Response {
    let resolved = resolve_session(&resources, &headers);
    // Lock held across the model call: turns are serialized per session.
    let mut session = resolved.state.lock().await;

    let response = match resources.engine.send(&mut session, &payload.message).await {
        Ok(text) => Json(SendResponse { response: text }).into_response(),
        Err(error) => error.into_response(),
    };

    drop(session);
    attach_session_cookie(response, &resolved)
}

/// `GET /reset` - clear the transcript and document context
async fn reset(State(resources): State<Arc<ServerResources>>, headers: HeaderMap) -> Response {
    let resolved = resolve_session(&resources, &headers);
    if let Err(error) = require_authenticated(&resolved).await {
        return attach_session_cookie(error.into_response(), &resolved);
    }
    resolved.state.lock().await.reset_conversation();

    attach_session_cookie("Chat reset.".into_response(), &resolved)
}

/// `POST /upload` - load document context from an uploaded file
async fn upload(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let resolved = resolve_session(&resources, &headers);
    if let Err(error) = require_authenticated(&resolved).await {
        return attach_session_cookie(error.into_response(), &resolved);
    }

    let response = match read_file_field(&mut multipart).await {
        Ok((filename, bytes)) => match resources.context_loader.load(&filename, bytes).await {
            Ok(text) => {
                resolved.state.lock().await.set_context(text);
                Json(UploadResponse {
                    message: "File uploaded and context added.".to_owned(),
                })
                .into_response()
            }
            Err(error) => error.into_response(),
        },
        Err(error) => error.into_response(),
    };

    attach_session_cookie(response, &resolved)
}

/// Pull the `file` field out of the multipart body
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::internal(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::internal(format!("Failed to read upload: {e}")))?;
        return Ok((filename, bytes.to_vec()));
    }

    warn!("Upload request without a file part");
    Err(AppError::new(ErrorCode::NoFile, "No file part"))
}

/// `POST /toggle-theme` - flip the session theme
async fn toggle_theme(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> Response {
    let resolved = resolve_session(&resources, &headers);
    if let Err(error) = require_authenticated(&resolved).await {
        return attach_session_cookie(error.into_response(), &resolved);
    }
    let theme = resolved.state.lock().await.toggle_theme();

    attach_session_cookie(
        Json(ToggleThemeResponse {
            theme: theme.as_str().to_owned(),
        })
        .into_response(),
        &resolved,
    )
}

/// `POST /toggle-voice` - flip a voice preference
async fn toggle_voice(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(payload): Json<ToggleVoiceRequest>,
) -> Response {
    let resolved = resolve_session(&resources, &headers);
    if let Err(error) = require_authenticated(&resolved).await {
        return attach_session_cookie(error.into_response(), &resolved);
    }

    let response = match VoicePreference::parse(&payload.setting) {
        Ok(preference) => {
            let value = resolved.state.lock().await.toggle_preference(preference);
            let mut body = serde_json::Map::new();
            body.insert(preference.key().to_owned(), serde_json::Value::Bool(value));
            Json(serde_json::Value::Object(body)).into_response()
        }
        Err(error) => error.into_response(),
    };

    attach_session_cookie(response, &resolved)
}
