// ABOUTME: HTTP route modules and the shared session resolution step
// ABOUTME: Every handler resolves the signed session cookie before touching state
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # HTTP Routes
//!
//! Route handlers grouped by concern: authentication, chat, health. All of
//! them share the session resolution step below, which validates (or mints)
//! the signed session cookie and ensures the session record exists with
//! defaults before any handler logic runs.

pub mod auth;
pub mod chat;
pub mod health;

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;

use crate::errors::{AppError, AppResult};
use crate::security::{self, SESSION_COOKIE};
use crate::server::ServerResources;
use crate::session::SharedSession;

/// A session resolved from (or minted for) an incoming request
pub(crate) struct ResolvedSession {
    /// Opaque session id
    pub id: String,
    /// Handle to the session record
    pub state: SharedSession,
    /// `Set-Cookie` value to attach when the session was freshly minted
    pub fresh_cookie: Option<String>,
}

/// Resolve the request's session, minting a fresh one when the cookie is
/// absent, unsigned, or tampered with
pub(crate) fn resolve_session(
    resources: &ServerResources,
    headers: &HeaderMap,
) -> ResolvedSession {
    let verified = security::get_cookie_value(headers, SESSION_COOKIE)
        .and_then(|value| resources.signer.verify(&value));

    match verified {
        Some(id) => ResolvedSession {
            state: resources.sessions.resolve(&id),
            id,
            fresh_cookie: None,
        },
        None => {
            let (id, cookie_value) = resources.signer.mint();
            ResolvedSession {
                state: resources.sessions.resolve(&id),
                id,
                fresh_cookie: Some(security::session_cookie_header(&cookie_value)),
            }
        }
    }
}

/// Refuse the request unless the session carries an authenticated identity
///
/// Session-mutating endpoints call this before touching any state; only the
/// auth pages and signup/login are reachable anonymously.
pub(crate) async fn require_authenticated(resolved: &ResolvedSession) -> AppResult<()> {
    if resolved.state.lock().await.is_authenticated() {
        Ok(())
    } else {
        Err(AppError::unauthorized())
    }
}

/// Attach the freshly minted session cookie to a response, if any
pub(crate) fn attach_session_cookie(
    mut response: Response,
    resolved: &ResolvedSession,
) -> Response {
    if let Some(cookie) = &resolved.fresh_cookie {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}
