//! Configuration loading from disk or strings.
//!
//! JSON is the native format; files ending in `.toml` are parsed as TOML.
//! With defaults enabled, the document is layered over a default config so
//! any field it omits (including nested ones) keeps its default value.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::config::schema::{AppConfig, ServerConfig};
use crate::config::validation::{validate_config, ValidationError};

const DEFAULT_MAX_IDLE_CONNS: u32 = 5;
const DEFAULT_MAX_OPEN_CONNS: u32 = 10;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Toml(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "Parse error: {}", e),
            ConfigError::Toml(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::Toml(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load, default and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = load_from_file(path, true)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load configuration from a file without validating it.
pub fn load_from_file(path: &Path, use_defaults: bool) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let document = if is_toml {
        let value: toml::Value = toml::from_str(&content).map_err(ConfigError::Toml)?;
        serde_json::to_value(value).map_err(ConfigError::Json)?
    } else {
        serde_json::from_str(&content).map_err(ConfigError::Json)?
    };
    from_document(document, use_defaults)
}

/// Load configuration from a JSON string without validating it.
pub fn load_from_str(content: &str, use_defaults: bool) -> Result<AppConfig, ConfigError> {
    let document: Value = serde_json::from_str(content).map_err(ConfigError::Json)?;
    from_document(document, use_defaults)
}

fn from_document(mut document: Value, use_defaults: bool) -> Result<AppConfig, ConfigError> {
    strip_nulls(&mut document);
    if !use_defaults {
        return serde_json::from_value(document).map_err(ConfigError::Json);
    }

    let mut merged = serde_json::to_value(default_config()).map_err(ConfigError::Json)?;
    merge(&mut merged, document);
    let mut config: AppConfig = serde_json::from_value(merged).map_err(ConfigError::Json)?;

    for db in config.db_configs.values_mut() {
        if db.max_idle_conns == 0 {
            db.max_idle_conns = DEFAULT_MAX_IDLE_CONNS;
        }
        if db.max_open_conns == 0 {
            db.max_open_conns = DEFAULT_MAX_OPEN_CONNS;
        }
    }
    Ok(config)
}

fn default_config() -> AppConfig {
    AppConfig {
        environment: "development".to_string(),
        http_server_config: ServerConfig::with_http_defaults(),
        ..AppConfig::default()
    }
}

/// Remove `null` object members so they read as "not set".
fn strip_nulls(value: &mut Value) {
    if let Value::Object(map) = value {
        map.retain(|_, member| !member.is_null());
        map.values_mut().for_each(strip_nulls);
    }
}

/// Overlay `patch` onto `base`, recursing into objects.
fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}
