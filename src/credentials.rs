// ABOUTME: Credential store abstraction for username/password authentication
// ABOUTME: In-memory implementation backed by a concurrent map with bcrypt hashes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Credential Store
//!
//! Maps usernames to one-way password hashes. The [`CredentialStore`] trait
//! is the seam for swapping the in-memory map for a real datastore without
//! touching calling code; handlers only ever see the trait.

use crate::errors::{AppError, AppResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

/// Store of registered users and their password hashes
///
/// Implementations must be safe to share across request handlers; `register`
/// must be an atomic check-and-insert so concurrent signups for the same
/// username cannot both succeed.
pub trait CredentialStore: Send + Sync {
    /// Check whether a username is registered
    fn exists(&self, username: &str) -> bool;

    /// Register a new user, hashing the password
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the username is taken (no side effect),
    /// or an internal error if hashing fails.
    fn register(&self, username: &str, password: &str) -> AppResult<()>;

    /// Verify a password against the stored hash
    ///
    /// Returns `false` for unknown usernames. Side-effect free.
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// In-memory credential store
///
/// Passwords are stored as bcrypt hashes; verification goes through
/// `bcrypt::verify`, which compares in constant time.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, String>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the store has no registered users
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn exists(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    fn register(&self, username: &str, password: &str) -> AppResult<()> {
        // Hash before taking the entry lock; bcrypt is deliberately slow.
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        match self.users.entry(username.to_owned()) {
            Entry::Occupied(_) => {
                warn!("Registration rejected, username taken: {username}");
                Err(AppError::already_exists(username))
            }
            Entry::Vacant(slot) => {
                slot.insert(hash);
                info!("User registered: {username}");
                Ok(())
            }
        }
    }

    fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|hash| bcrypt::verify(password, hash.value()).unwrap_or(false))
    }
}
