use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

static SETTINGS: OnceLock<Settings> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Auth {
    None,
    Token { token: String },
    Basic { username: String, password: String },
}

/// Process-wide console settings, evaluated once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub auth: Auth,
    /// Page size for list screens.
    pub page_size: u32,
    /// Page size used when pulling every node of a workflow.
    pub workflow_node_page_size: u32,
    /// Unset means no timeout, matching the UI's behaviour.
    pub request_timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8013".to_string(),
            auth: Auth::None,
            page_size: 20,
            workflow_node_page_size: 200,
            request_timeout_secs: None,
            user_agent: concat!("awx-console/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConsoleError::Config(format!("Failed to read settings from {}: {}", path.display(), e))
        })?;
        let settings = Self::from_yaml_str(&content)?;
        tracing::info!(path = %path.display(), base_url = %settings.base_url, "Loaded settings");
        Ok(settings)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty file is a valid "all defaults" document.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ConsoleError::Config("base_url must not be empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConsoleError::Config(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        if self.page_size == 0 || self.workflow_node_page_size == 0 {
            return Err(ConsoleError::Config("page sizes must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Installs the process-wide settings. Fails if settings were already installed
/// (or already read through [`get`]).
pub fn init(settings: Settings) -> Result<()> {
    settings.validate()?;
    SETTINGS
        .set(settings)
        .map_err(|_| ConsoleError::Config("settings already initialised".to_string()))
}

pub fn get() -> &'static Settings {
    SETTINGS.get_or_init(Settings::default)
}
