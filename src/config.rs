use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_BATCH_SIZE: usize = 16;
pub const DEFAULT_PAGE_SIZE: u32 = 30;
pub const DEFAULT_MAX_PAGES: u32 = 10;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub freshdesk: ConnectorConfig,
}

/// Freshdesk account credentials. Nothing is validated here; a missing value
/// first surfaces when a client is built from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub domain: Option<String>,
    pub api_key: Option<String>,
}

/// Read `freshdesk_api_key` and `freshdesk_domain` out of a credential map.
pub fn load_credentials(credentials: &HashMap<String, String>) -> Credentials {
    Credentials {
        domain: credentials.get("freshdesk_domain").cloned(),
        api_key: credentials.get("freshdesk_api_key").cloned(),
    }
}

/// Everything a poll needs. Passed by value into the connector and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectorConfig {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Send `updated_since` and drop tickets updated after the window end.
    #[serde(default)]
    pub filter_by_window: bool,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            filter_by_window: false,
        }
    }
}

impl ConnectorConfig {
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    /// `FD_DOMAIN` and `FD_API_KEY` win over values from the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(domain) = lookup("FD_DOMAIN").filter(|v| !v.is_empty()) {
            self.credentials.domain = Some(domain);
        }
        if let Some(key) = lookup("FD_API_KEY").filter(|v| !v.is_empty()) {
            self.credentials.api_key = Some(key);
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".freshdesk-connector")
        .join("config.toml")
}

/// Load the config file (defaults when it does not exist) and apply env overrides.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        parse_config(&contents)?
    } else {
        AppConfig::default()
    };
    config
        .freshdesk
        .apply_env_overrides(|name| std::env::var(name).ok());
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).with_context(|| "Failed to parse config.toml")
}
