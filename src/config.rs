use crate::{error::QdocsError, lifecycle::Action};
use clap::Parser;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

/// Permission required for ordinary field edits unless configured otherwise.
pub const DEFAULT_EDIT_PERMISSION: &str = "documents.u";

#[derive(Debug, Clone, Parser)]
pub struct StartArgs {
    #[arg(short, long, default_value = "config.json")]
    pub config_path: String,

    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    #[arg(short, long, default_value = "3030")]
    pub port: u16,

    #[arg(short, long, default_value = "INFO")]
    pub log_level: tracing::Level,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// The remote document and request service.
    pub api: ApiConfig,

    pub session: SessionConfig,

    /// Maps lifecycle actions to the permission path a user must hold to
    /// trigger them. Unlisted actions use [Config::permission_for]'s defaults.
    #[serde(default)]
    pub action_permissions: HashMap<Action, String>,

    #[serde(default = "default_edit_permission")]
    pub edit_permission: String,
}

impl Config {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, QdocsError> {
        let config = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&config)?)
    }

    pub fn permission_for(&self, action: Action) -> &str {
        if let Some(path) = self.action_permissions.get(&action) {
            return path;
        }
        match action {
            Action::Submit | Action::Discard | Action::Checkout => "documents.u",
            Action::Endorse | Action::Reject | Action::Publish => "documents.review.u",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub base_url: String,

    /// Sent as `X-API-Key`. Overridden by `QDOCS_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub cookie_domain: String,

    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

fn default_edit_permission() -> String {
    DEFAULT_EDIT_PERMISSION.to_string()
}

fn default_ttl_minutes() -> i64 {
    60
}
