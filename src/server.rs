// ABOUTME: Server assembly: shared resources, router composition, bind and serve
// ABOUTME: Owns startup (upload dir creation) and graceful shutdown on ctrl-c
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Server Assembly
//!
//! [`ServerResources`] bundles the shared dependencies every handler needs
//! behind one `Arc`, constructed once at startup. [`ChatServer`] composes the
//! routers, applies the tower layers, and runs the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::context::ContextLoader;
use crate::credentials::{CredentialStore, MemoryCredentialStore};
use crate::engine::ConversationEngine;
use crate::errors::AppResult;
use crate::llm::LlmProvider;
use crate::routes::auth::AuthRoutes;
use crate::routes::chat::ChatRoutes;
use crate::routes::health::HealthRoutes;
use crate::security::CookieSigner;
use crate::session::SessionStore;

/// Centralized container for all shared server dependencies
///
/// Constructed once at startup and injected into every route handler as
/// axum state. Cloning the `Arc` is the only sharing mechanism; none of the
/// fields are wrapped individually.
pub struct ServerResources {
    /// Runtime configuration
    pub config: ServerConfig,
    /// User credential store
    pub credentials: Arc<dyn CredentialStore>,
    /// Live session records
    pub sessions: SessionStore,
    /// Conversation engine over the configured LLM provider
    pub engine: ConversationEngine,
    /// Session cookie signer
    pub signer: CookieSigner,
    /// Upload validation and text extraction
    pub context_loader: ContextLoader,
}

impl std::fmt::Debug for ServerResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerResources")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl ServerResources {
    /// Build the resource container from configuration and a provider
    #[must_use]
    pub fn new(config: ServerConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let signer = CookieSigner::new(&config.session_secret);
        let context_loader = ContextLoader::new(config.upload_dir.clone());

        Self {
            config,
            credentials: Arc::new(MemoryCredentialStore::new()),
            sessions: SessionStore::new(),
            engine: ConversationEngine::new(provider),
            signer,
            context_loader,
        }
    }

    /// Swap in an alternative credential store
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }
}

/// The HTTP chat server
pub struct ChatServer {
    resources: Arc<ServerResources>,
}

impl ChatServer {
    /// Create a server over the given resources
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Compose the full application router
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .merge(AuthRoutes::routes(self.resources.clone()))
            .merge(ChatRoutes::routes(self.resources.clone()))
            .merge(HealthRoutes::routes(self.resources.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Run the server until shutdown
    ///
    /// Creates the upload directory, binds the configured port, and serves
    /// until ctrl-c.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created or the
    /// port cannot be bound.
    pub async fn run(&self) -> AppResult<()> {
        self.resources.context_loader.init().await?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.resources.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            address = %addr,
            provider = self.resources.engine.provider_name(),
            "Chat server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Chat server stopped");
        Ok(())
    }
}

/// Resolve when the process receives ctrl-c
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
