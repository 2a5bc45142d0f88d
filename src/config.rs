//! Application configuration
//!
//! Loaded from YAML; every field has a default so a missing or partial file still yields a
//! usable configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use smsbridge_core_types::{PermissionRight, PermissionStatus};
use tokio::fs;
use tracing::{info, warn};

const LOCAL_CONFIG: &str = "config/smsbridge.yaml";

/// How the scripted responder answers a permission prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptResponse {
    #[default]
    Grant,
    Deny,
}

impl PromptResponse {
    pub fn status(self) -> PermissionStatus {
        match self {
            PromptResponse::Grant => PermissionStatus::Granted,
            PromptResponse::Deny => PermissionStatus::Denied,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub response: PromptResponse,
    /// Per-right answers taking precedence over `response`.
    pub overrides: BTreeMap<PermissionRight, PromptResponse>,
    /// Time before the answer is delivered, e.g. `"20ms"`.
    pub delay: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            response: PromptResponse::Grant,
            overrides: BTreeMap::new(),
            delay: "0ms".to_string(),
        }
    }
}

impl PromptConfig {
    pub fn delay(&self) -> Result<Duration> {
        humantime::parse_duration(&self.delay)
            .with_context(|| format!("Invalid prompt delay '{}'", self.delay))
    }

    pub fn status_for(&self, right: PermissionRight) -> PermissionStatus {
        self.overrides
            .get(&right)
            .copied()
            .unwrap_or(self.response)
            .status()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// First permission request id handed to the host.
    pub request_id_base: i32,
    /// Permission-name map file; the built-in Android names are used when absent.
    pub permission_map: Option<PathBuf>,
    pub prompt: PromptConfig,
    /// Rights held before any prompt.
    pub pre_granted: Vec<PermissionRight>,
    /// Fixture describing the device; an empty device is used when absent.
    pub device: Option<PathBuf>,
    pub pretty: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            request_id_base: permissions_broker::DEFAULT_REQUEST_ID_BASE,
            permission_map: None,
            prompt: PromptConfig::default(),
            pre_granted: Vec::new(),
            device: None,
            pretty: false,
        }
    }
}

impl AppConfig {
    pub fn parse_str(raw: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(raw).context("Failed to parse config file")?;
        config.prompt.delay()?;
        Ok(config)
    }
}

fn default_config_path() -> Result<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(local);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("smsbridge");
    path.push("config.yaml");
    Ok(path)
}

pub async fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;
        let config = AppConfig::parse_str(&content)?;
        info!(
            target = "smsbridge",
            "Loaded configuration from: {}",
            config_path.display()
        );
        Ok(config)
    } else {
        warn!(
            target = "smsbridge",
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(AppConfig::default())
    }
}
