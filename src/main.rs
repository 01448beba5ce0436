// src/main.rs

//! # Verifiable Credential Portal Client
//!
//! Command line client for a credential portal that issues, stores and
//! verifies W3C verifiable credentials. Holders request presentations that
//! reveal only the claims they pick; the portal derives and signs them.
//!
//! ## Layers
//! 1. **Services**: portal API client, presentation flow, issuer and verifier
//! 2. **Wallet**: session context and the cache of stored credentials
//! 3. **Storage**: session token file and downloaded documents
//! 4. **Models**: credential documents, disclosure frames, accounts
//!
//! ## Configuration
//! See [`config::Settings`]. `RUST_LOG` controls log output (default `info`).

use crate::cli::{App, Cli};
use crate::config::Settings;
use crate::services::api_client::PortalClient;
use crate::storage::session_store::FileSessionStore;
use crate::wallet::session::SessionContext;
use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use log::{debug, error};
use std::process::ExitCode;
use std::sync::Arc;

mod cli;       // Command line parsing and dispatch
mod config;    // Layered settings
mod error;     // Error type shared by every layer
mod models;    // Data structures
mod services;  // API client and business logic
mod storage;   // Session file and downloads
mod utils;     // JSON helpers
mod wallet;    // Session context and credential cache

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    debug!("Settings: {:?}", settings);

    let store = FileSessionStore::new(settings.session_file.clone());
    debug!("Session file: {}", store.path().display());
    let session = SessionContext::new(Arc::new(store));
    let client = PortalClient::from_settings(&settings).context("failed to create API client")?;
    debug!("API routes under {}: {:?}", settings.api_base_url, client.routes());

    let app = App {
        settings,
        client,
        session,
    };
    cli.command.run(&app).await?;
    Ok(())
}
