// ABOUTME: Session cookie integrity: HMAC-signed session ids and cookie header helpers
// ABOUTME: Tampered or unsigned cookies are treated as absent, minting a fresh session
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Session Cookie Security
//!
//! The session id is an opaque UUID stored client-side in the `session_id`
//! cookie as `<id>.<signature>`, where the signature is HMAC-SHA256 over the
//! id using the `SECRET_KEY` from the environment. The server never trusts
//! an unsigned id; verification failure is indistinguishable from a missing
//! cookie and simply yields a fresh session.

use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::hmac;
use uuid::Uuid;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_id";

/// Signs and verifies session id cookies
pub struct CookieSigner {
    key: hmac::Key,
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}

impl CookieSigner {
    /// Create a signer from the session secret
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
        }
    }

    /// Mint a fresh session id and its signed cookie value
    #[must_use]
    pub fn mint(&self) -> (String, String) {
        let session_id = Uuid::new_v4().to_string();
        let cookie_value = self.sign(&session_id);
        (session_id, cookie_value)
    }

    /// Produce the signed cookie value `<id>.<signature>` for a session id
    #[must_use]
    pub fn sign(&self, session_id: &str) -> String {
        let tag = hmac::sign(&self.key, session_id.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(tag.as_ref());
        format!("{session_id}.{signature}")
    }

    /// Recover the session id from a signed cookie value
    ///
    /// Returns `None` for malformed values or signature mismatches; `ring`
    /// performs the comparison in constant time.
    #[must_use]
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (session_id, signature) = cookie_value.rsplit_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(signature).ok()?;
        hmac::verify(&self.key, session_id.as_bytes(), &tag).ok()?;
        Some(session_id.to_owned())
    }
}

/// Extract a cookie value by name from request headers
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_owned())
    })
}

/// Build the `Set-Cookie` header value for a signed session cookie
#[must_use]
pub fn session_cookie_header(cookie_value: &str) -> String {
    format!("{SESSION_COOKIE}={cookie_value}; Path=/; HttpOnly; SameSite=Lax")
}

/// Build a `Set-Cookie` header value that expires the session cookie
#[must_use]
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
