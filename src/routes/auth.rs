// ABOUTME: Authentication routes: signup, login, logout, and the auth page
// ABOUTME: Form-driven flow; failures re-render the form with an inline error
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Authentication Routes
//!
//! Browser-facing authentication. Signup and login are HTML form posts;
//! failures re-render the auth page with an inline error message rather than
//! returning a JSON body, successes attach the identity to the session and
//! redirect to the chat page. Logout drops the session record entirely and
//! expires the cookie.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tracing::{info, warn};

use super::{attach_session_cookie, resolve_session};
use crate::errors::AppError;
use crate::security;
use crate::server::ServerResources;

/// Credentials submitted by the auth forms
#[derive(Debug, Deserialize)]
pub struct AuthForm {
    /// Requested username
    pub username: String,
    /// Plaintext password, hashed or verified server-side
    pub password: String,
}

/// Authentication route handlers
pub struct AuthRoutes;

impl AuthRoutes {
    /// Build the authentication router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth", get(auth_page))
            .route("/signup", post(signup))
            .route("/login", post(login))
            .route("/logout", get(logout))
            .with_state(resources)
    }
}

/// Render the combined signup/login page, with an optional inline error
fn render_auth_page(error: Option<&str>) -> String {
    let error_block = error.map_or_else(String::new, |message| {
        format!(
            r#"<p class="error">{}</p>"#,
            html_escape::encode_text(message)
        )
    });

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Palaver - Sign in</title>
</head>
<body class="theme-light">
  <main class="auth">
    <h1>Palaver</h1>
    {error_block}
    <form method="post" action="/login">
      <h2>Log in</h2>
      <input name="username" placeholder="Username" required>
      <input name="password" type="password" placeholder="Password" required>
      <button type="submit">Log in</button>
    </form>
    <form method="post" action="/signup">
      <h2>Sign up</h2>
      <input name="username" placeholder="Username" required>
      <input name="password" type="password" placeholder="Password" required>
      <button type="submit">Create account</button>
    </form>
  </main>
</body>
</html>"#
    )
}

/// `GET /auth` - serve the auth page
async fn auth_page(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> Response {
    let resolved = resolve_session(&resources, &headers);
    attach_session_cookie(Html(render_auth_page(None)).into_response(), &resolved)
}

/// `POST /signup` - register a new user and authenticate the session
async fn signup(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Form(form): Form<AuthForm>,
) -> Response {
    let resolved = resolve_session(&resources, &headers);

    let response = if resources
        .credentials
        .register(&form.username, &form.password)
        .is_ok()
    {
        info!(username = %form.username, "User registered");
        let mut session = resolved.state.lock().await;
        session.authenticate(&form.username);
        Redirect::to("/").into_response()
    } else {
        Html(render_auth_page(Some("User already exists"))).into_response()
    };

    attach_session_cookie(response, &resolved)
}

/// `POST /login` - verify credentials and authenticate the session
async fn login(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Form(form): Form<AuthForm>,
) -> Response {
    let resolved = resolve_session(&resources, &headers);

    let response = if resources.credentials.verify(&form.username, &form.password) {
        info!(username = %form.username, "User logged in");
        let mut session = resolved.state.lock().await;
        session.authenticate(&form.username);
        Redirect::to("/").into_response()
    } else {
        // Same message for unknown user and wrong password.
        let error = AppError::invalid_credentials();
        warn!(username = %form.username, "Login rejected");
        Html(render_auth_page(Some(error.message.as_str()))).into_response()
    };

    attach_session_cookie(response, &resolved)
}

/// `GET /logout` - drop the session record and expire the cookie
async fn logout(State(resources): State<Arc<ServerResources>>, headers: HeaderMap) -> Response {
    let resolved = resolve_session(&resources, &headers);
    resources.sessions.clear(&resolved.id);

    let mut response = Redirect::to("/auth").into_response();
    if let Ok(value) = header::HeaderValue::from_str(&security::expired_session_cookie()) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}
