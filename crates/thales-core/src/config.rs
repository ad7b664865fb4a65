//! Binding configuration and its layered loader.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Which registered routes get parameter binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every registered route is bound.
    #[default]
    Auto,
    /// Only routes explicitly marked typed are bound.
    Manual,
}

impl Mode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Process-wide binding settings.
///
/// ```
/// use thales_core::{BindingConfig, Mode};
///
/// let config = BindingConfig::default();
/// assert_eq!(config.validation_error_status, 400);
/// assert_eq!(config.mode, Mode::Auto);
/// assert!(config.is_ignored(&http::Method::HEAD));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    /// Status code of validation failure responses.
    pub validation_error_status: u16,
    /// Route selection mode.
    pub mode: Mode,
    /// Methods that are never bound nor documented.
    pub ignore_methods: Vec<String>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            validation_error_status: 400,
            mode: Mode::Auto,
            ignore_methods: vec!["HEAD".to_string(), "OPTIONS".to_string()],
        }
    }
}

impl BindingConfig {
    /// Whether `method` is excluded from binding and documentation.
    pub fn is_ignored(&self, method: &http::Method) -> bool {
        self.ignore_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method.as_str()))
    }

    /// Checks value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if http::StatusCode::from_u16(self.validation_error_status).is_err() {
            return Err(ConfigError::invalid_value(
                "validation_error_status",
                format!("{} is not a valid HTTP status", self.validation_error_status),
            ));
        }
        if let Some(bad) = self
            .ignore_methods
            .iter()
            .find(|m| http::Method::from_bytes(m.as_bytes()).is_err())
        {
            return Err(ConfigError::invalid_value(
                "ignore_methods",
                format!("'{bad}' is not an HTTP method"),
            ));
        }
        Ok(())
    }
}

/// Environment variable overriding the validation error status.
pub const ENV_VALIDATION_ERROR_STATUS: &str = "THALES_VALIDATION_ERROR_STATUS";
/// Environment variable overriding the mode.
pub const ENV_MODE: &str = "THALES_MODE";
/// Environment variable overriding the ignored methods, comma separated.
pub const ENV_IGNORE_METHODS: &str = "THALES_IGNORE_METHODS";

/// Layered configuration loader.
///
/// Layers apply in order, later ones overriding earlier ones:
/// 1. defaults,
/// 2. a TOML or JSON file,
/// 3. `THALES_*` environment variables.
///
/// ```
/// use thales_core::{ConfigLoader, Mode};
///
/// let config = ConfigLoader::new()
///     .with_string("mode = \"manual\"", "toml")
///     .unwrap()
///     .load()
///     .unwrap();
/// assert_eq!(config.mode, Mode::Manual);
/// assert_eq!(config.validation_error_status, 400);
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: BindingConfig,
    overrides: Vec<(String, String)>,
}

impl ConfigLoader {
    /// Starts from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a `.toml` or `.json` file.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        self.config = Self::parse(&content, &format)?;
        Ok(self)
    }

    /// Loads a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration text in the given format (`toml` or `json`).
    pub fn with_string(mut self, content: &str, format: &str) -> ConfigResult<Self> {
        self.config = Self::parse(content, &format.to_ascii_lowercase())?;
        Ok(self)
    }

    /// Captures `THALES_*` variables from the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_vars(env::vars())
    }

    /// Captures `THALES_*` overrides from an explicit variable list.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides.extend(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(k, _)| k.starts_with("THALES_")),
        );
        self
    }

    /// Applies overrides and validates the result.
    pub fn load(mut self) -> ConfigResult<BindingConfig> {
        for (key, value) in std::mem::take(&mut self.overrides) {
            self.apply_override(&key, &value)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    fn parse(content: &str, format: &str) -> ConfigResult<BindingConfig> {
        match format {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::invalid_value(
                "format",
                format!("unsupported configuration format: {other}"),
            )),
        }
    }

    fn apply_override(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        match key {
            ENV_VALIDATION_ERROR_STATUS => {
                self.config.validation_error_status = value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::invalid_value(key, "expected integer"))?;
            }
            ENV_MODE => {
                self.config.mode = Mode::parse(value)
                    .ok_or_else(|| ConfigError::invalid_value(key, "expected 'auto' or 'manual'"))?;
            }
            ENV_IGNORE_METHODS => {
                self.config.ignore_methods = value
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_ascii_uppercase)
                    .collect();
            }
            _ => tracing::debug!(key, "ignoring unknown configuration variable"),
        }
        Ok(())
    }
}
