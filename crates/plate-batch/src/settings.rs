use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use plate_batch_client::{ClientOptions, Endpoint};
use plate_batch_redact::RedactionSettings;
use serde::Deserialize;

use crate::cli::SharedArgs;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_token: Option<String>,
    sdk_url: Option<String>,
    regions: Option<Vec<String>>,
    camera_id: Option<String>,
    mmc: Option<bool>,
    blur_amount: Option<u32>,
    blur_dir: Option<PathBuf>,
    request_interval_ms: Option<u64>,
    retry_backoff_ms: Option<u64>,
    max_attempts: Option<u32>,
}

/// Settings after merging the CLI over the optional TOML config file, with
/// every cross-option rule validated. Nothing past this point can fail for
/// configuration reasons.
#[derive(Debug)]
pub struct EffectiveSettings {
    pub endpoint: Endpoint,
    pub regions: Vec<String>,
    pub camera_id: Option<String>,
    pub mmc: bool,
    pub redaction: Option<RedactionSettings>,
    pub client_options: ClientOptions,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    NotFound {
        path: PathBuf,
    },
    Invalid {
        message: String,
    },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
            ConfigError::Invalid { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::NotFound { .. } | ConfigError::Invalid { .. } => None,
        }
    }
}

pub fn resolve_settings(cli: &SharedArgs) -> Result<EffectiveSettings, ConfigError> {
    let file = load_config(cli.config.as_deref())?;
    merge(cli, file)
}

fn load_config(path_override: Option<&Path>) -> Result<FileConfig, ConfigError> {
    if let Some(path) = path_override {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        return read_config(path);
    }

    let Some(default_path) = default_config_path() else {
        return Ok(FileConfig::default());
    };
    if !default_path.exists() {
        return Ok(FileConfig::default());
    }
    read_config(&default_path)
}

fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "plate-batch", "plate-batch")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn merge(cli: &SharedArgs, file: FileConfig) -> Result<EffectiveSettings, ConfigError> {
    let api_token = normalize(cli.api_token.clone()).or_else(|| normalize(file.api_token));
    let sdk_url = normalize(cli.sdk_url.clone()).or_else(|| normalize(file.sdk_url));
    let endpoint = Endpoint::from_options(api_token, sdk_url)
        .map_err(|err| ConfigError::invalid(err.to_string()))?;

    let regions = if cli.regions.is_empty() {
        file.regions.unwrap_or_default()
    } else {
        cli.regions.clone()
    };

    let camera_id = normalize(cli.camera_id.clone()).or_else(|| normalize(file.camera_id));
    let mmc = cli.mmc || file.mmc.unwrap_or(false);

    let blur_amount = cli.blur_amount.or(file.blur_amount);
    let blur_dir = cli.blur_dir.clone().or(file.blur_dir);
    let redaction = RedactionSettings::from_options(blur_amount, blur_dir)
        .map_err(|err| ConfigError::invalid(err.to_string()))?;

    let defaults = ClientOptions::default();
    let request_interval = cli
        .request_interval_ms
        .or(file.request_interval_ms)
        .map(Duration::from_millis)
        .unwrap_or(defaults.request_interval);
    let retry_backoff = file
        .retry_backoff_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.retry_backoff);
    let max_attempts = file.max_attempts.unwrap_or(defaults.max_attempts);
    if max_attempts == 0 {
        return Err(ConfigError::invalid("max_attempts must be at least 1"));
    }

    Ok(EffectiveSettings {
        endpoint,
        regions,
        camera_id,
        mmc,
        redaction,
        client_options: ClientOptions {
            max_attempts,
            retry_backoff,
            request_interval,
        },
    })
}

fn normalize(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
