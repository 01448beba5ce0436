// src/config.rs
//! Client settings.
//!
//! Layered, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional TOML file (`vc-portal.toml` unless `--config` says otherwise)
//! 3. `VC_PORTAL_*` environment variables, e.g. `VC_PORTAL_API_BASE_URL`
//!
//! `.env` is loaded by `main` before this runs, so its entries count as
//! environment variables.

use crate::error::PortalResult;
use crate::services::api_client::RouteLayout;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "vc-portal.toml";
pub const ENV_PREFIX: &str = "VC_PORTAL";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Base URL every route is appended to
    pub api_base_url: String,

    /// Which generation of endpoint paths the API exposes
    pub route_layout: RouteLayout,

    /// Claims a presentation request has to reveal besides the subject id
    pub minimum_claims: usize,

    /// Where downloaded documents are written
    pub download_dir: PathBuf,

    /// File holding the session token between runs
    pub session_file: PathBuf,

    /// Optional transport timeout; none by default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    /// Loads settings from `path` (or the default file, if present) and the
    /// environment.
    pub fn load(path: Option<&str>) -> PortalResult<Self> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Self::builder()?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    fn builder() -> PortalResult<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("api_base_url", "http://localhost:5001/api")?
            .set_default("route_layout", "scoped")?
            .set_default("minimum_claims", 1)?
            .set_default("download_dir", ".")?
            .set_default("session_file", ".vc-portal-session.json")?)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
