use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable prefix for overrides (`DOC_MERGER__RENDER__TIMEOUT_SECONDS=30`)
pub const ENV_PREFIX: &str = "DOC_MERGER";

/// Paper format used when printing rendered HTML to PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Paper {
    #[default]
    Letter,
    A4,
}

impl Paper {
    /// Paper size in inches (width, height), as expected by the print-to-PDF call
    pub const fn inches(self) -> (f64, f64) {
        match self {
            Self::Letter => (8.5, 11.0),
            Self::A4 => (8.27, 11.69),
        }
    }
}

/// Headless renderer configuration (used for DOCX conversion)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Chromium/Chrome binary; auto-detected when unset
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    /// Upper bound for one HTML render, including the wait for full load
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Run the browser with its sandbox enabled
    #[serde(default)]
    pub sandbox: bool,

    #[serde(default)]
    pub paper: Paper,
}

const fn default_timeout_seconds() -> u64 {
    60
}

impl RenderConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            timeout_seconds: default_timeout_seconds(),
            sandbox: false,
            paper: Paper::default(),
        }
    }
}

/// Request size policy, enforced by callers before the core runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum total decoded size of all files in one request
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

const fn default_max_payload_bytes() -> usize {
    10 * 1024 * 1024
}

impl LimitsConfig {
    /// Check a request's total size against the limit.
    pub fn check(&self, size: usize) -> Result<()> {
        if size > self.max_payload_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }
        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a single TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load with layered precedence: defaults, user config
    /// (~/.config/doc-merger/config.toml), ./doc-merger.toml, the explicit
    /// file if given, then `DOC_MERGER__*` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("doc-merger").join("config.toml");
            if user_config.exists() {
                tracing::debug!("Loading config from {}", user_config.display());
                builder = builder.add_source(config::File::from(user_config).required(false));
            }
        }

        builder = builder.add_source(config::File::with_name("doc-merger").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.render.timeout_seconds == 0 {
            return Err(Error::ConfigInvalid {
                field: "render.timeout_seconds".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.limits.max_payload_bytes == 0 {
            return Err(Error::ConfigInvalid {
                field: "limits.max_payload_bytes".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
