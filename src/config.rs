use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

const APP_DIR: &str = "capped-todos";
const DEFAULT_BIND: &str = "127.0.0.1:3000";

fn validate_storage_path(path: &str) -> Result<PathBuf, ConfigError> {
    if path.contains('\0') {
        return Err(ConfigError::InvalidConfig(
            "Path contains invalid characters".to_string(),
        ));
    }

    let path = shellexpand::tilde(path);
    let path = PathBuf::from(path.as_ref());

    if path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "Path cannot be empty".to_string(),
        ));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ConfigError::InvalidConfig(format!(
                "Parent directory does not exist: {}",
                parent.display()
            )));
        }
    }

    Ok(path)
}

fn validate_bind(value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| {
        ConfigError::InvalidConfig(format!(
            "server.bind must be a socket address such as {}",
            DEFAULT_BIND
        ))
    })
}

fn validate_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidConfig(format!(
            "{} must be true or false",
            key
        ))),
    }
}

/// Values explicitly set in the config file. Unset keys fall back to
/// [`Config::with_defaults`].
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub server_bind: Option<String>,
    #[serde(default)]
    pub log_json: Option<bool>,
}

impl Config {
    pub fn with_defaults() -> Self {
        Self {
            storage_path: Some(default_storage_path().to_string_lossy().to_string()),
            server_bind: Some(DEFAULT_BIND.to_string()),
            log_json: Some(false),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref bind) = self.server_bind {
            validate_bind(bind)?;
        }
        if let Some(ref path) = self.storage_path {
            if path.is_empty() || path.contains('\0') {
                return Err(ConfigError::InvalidConfig(
                    "storage.path is not a usable path".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_config_path() -> PathBuf {
    app_dir().join("config.json")
}

pub fn default_storage_path() -> PathBuf {
    app_dir().join("todos.db")
}

/// Reads and writes the JSON config file and resolves effective settings.
pub struct ConfigManager {
    path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Loads `config_path` (or the default location). A missing or empty file
    /// yields an all-defaults configuration.
    pub fn new(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = config_path.map_or_else(default_config_path, |p| {
            PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref())
        });

        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Config::default()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            Config::default()
        };
        config.validate()?;

        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// The explicitly configured value for `key`, if any.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let config = &self.config;
        match key {
            "storage.path" => Ok(config.storage_path.clone()),
            "server.bind" => Ok(config.server_bind.clone()),
            "log.json" => Ok(config.log_json.map(|v| v.to_string())),
            _ => Err(ConfigError::InvalidKey(key.to_string())),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut config = self.config.clone();

        match key {
            "storage.path" => {
                let path = validate_storage_path(value)?;
                config.storage_path = Some(path.to_string_lossy().to_string());
            }
            "server.bind" => {
                validate_bind(value)?;
                config.server_bind = Some(value.to_string());
            }
            "log.json" => {
                config.log_json = Some(validate_bool(key, value)?);
            }
            _ => {
                return Err(ConfigError::InvalidKey(key.to_string()));
            }
        }
        config.validate()?;
        self.config = config;
        self.save()
    }

    pub fn unset(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "storage.path" => self.config.storage_path = None,
            "server.bind" => self.config.server_bind = None,
            "log.json" => self.config.log_json = None,
            _ => return Err(ConfigError::InvalidKey(key.to_string())),
        }
        self.save()
    }

    /// `(key, effective value, is_default)` for every known key.
    pub fn list(&self) -> Vec<(String, String, bool)> {
        let defaults = Config::with_defaults();
        let pick = |set: &Option<String>, default: &Option<String>| match set {
            Some(value) => (value.clone(), false),
            None => (default.clone().unwrap_or_else(|| "null".to_string()), true),
        };

        let (path, path_default) = pick(&self.config.storage_path, &defaults.storage_path);
        let (bind, bind_default) = pick(&self.config.server_bind, &defaults.server_bind);
        let (json, json_default) = pick(
            &self.config.log_json.map(|v| v.to_string()),
            &defaults.log_json.map(|v| v.to_string()),
        );

        vec![
            ("storage.path".to_string(), path, path_default),
            ("server.bind".to_string(), bind, bind_default),
            ("log.json".to_string(), json, json_default),
        ]
    }

    pub fn storage_path(&self) -> PathBuf {
        self.config
            .storage_path
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
            .unwrap_or_else(default_storage_path)
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        validate_bind(self.config.server_bind.as_deref().unwrap_or(DEFAULT_BIND))
    }

    pub fn log_json(&self) -> bool {
        self.config.log_json.unwrap_or(false)
    }
}
