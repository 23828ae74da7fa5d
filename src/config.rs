use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process settings, read once at startup and handed to each component.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
    pub gee: GeeConfig,
    pub catalog: CatalogConfig,
    pub register: RegisterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub uri: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: String::from("Earth Engine Adapter"),
            uri: String::from("http://localhost:5700"),
            port: 5700,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
        }
    }
}

impl LoggingConfig {
    pub fn tracing_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

/// Earth Engine connection and service-account identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeeConfig {
    pub api_base_url: String,
    /// Cloud project the requests are billed to.
    pub project: String,
    pub service_account: String,
    /// PEM private key, or a JSON service-account key file.
    pub privatekey_file: PathBuf,
    pub token_url: String,
    pub timeout_secs: u64,
    /// Result pages followed per query before giving up.
    pub max_pages: usize,
    /// Pre-issued access token. When set, no JWT exchange happens.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

impl Default for GeeConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::from("https://earthengine.googleapis.com"),
            project: String::from("earthengine-legacy"),
            service_account: String::new(),
            privatekey_file: PathBuf::from("privatekey.pem"),
            token_url: String::from("https://oauth2.googleapis.com/token"),
            timeout_secs: 60,
            max_pages: 1000,
            access_token: None,
        }
    }
}

impl GeeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Catalog microservice the dataset status is reported to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: String::from("http://localhost:9000"),
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegisterConfig {
    /// Surface probe or catalog failures to the caller of the register
    /// endpoint. When false the caller always gets 200.
    pub report_failures: bool,
}

impl Settings {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gee-adapter")
            .join("config.toml")
    }

    /// Load settings from `path`, falling back to defaults when it is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.service.port = port;
        }
        if let Some(level) = lookup("LOGGING_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Some(url) = lookup("CT_URL") {
            self.catalog.url = url;
        }
        if let Some(token) = lookup("CT_TOKEN") {
            self.catalog.token = Some(token);
        }
        if let Some(account) = lookup("GEE_SERVICE_ACCOUNT") {
            self.gee.service_account = account;
        }
        if let Some(path) = lookup("GEE_PRIVATEKEY_FILE") {
            self.gee.privatekey_file = PathBuf::from(path);
        }
        if let Some(project) = lookup("GEE_PROJECT") {
            self.gee.project = project;
        }
    }
}
