// ABOUTME: Server binary: parses flags, loads configuration, and runs the chat server
// ABOUTME: All configuration beyond the port override comes from the environment
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Entry point for the `palaver-server` binary
//!
//! Wires logging, environment configuration, and the Gemini provider
//! together, then serves until shutdown.

#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use palaver::config::ServerConfig;
use palaver::llm::GeminiProvider;
use palaver::logging;
use palaver::server::{ChatServer, ServerResources};

/// Command-line arguments for the server binary
#[derive(Parser)]
#[command(name = "palaver-server")]
#[command(about = "Session-scoped LLM chat server")]
#[command(version)]
struct Args {
    /// HTTP port to bind (overrides HTTP_PORT)
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    info!("Configuration loaded: {}", config.summary());

    let mut provider = GeminiProvider::from_env_with_timeout(Duration::from_secs(
        config.llm_timeout_secs,
    ))?;
    if let Some(model) = &config.llm_model {
        provider = provider.with_default_model(model.clone());
    }

    let resources = Arc::new(ServerResources::new(config, Arc::new(provider)));
    let server = ChatServer::new(resources);

    server.run().await?;
    Ok(())
}
