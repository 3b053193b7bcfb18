//! Configuration management for the `SoilLab` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::FinderError;
use crate::models::Variant;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Root configuration structure for the `SoilLab` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilLabConfig {
    /// Gemini API configuration
    pub gemini: GeminiConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Lab finder behaviour
    pub finder: FinderConfig,
    /// Conversation history retention
    pub session: SessionConfig,
}

/// Gemini API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key, falls back to `GOOGLE_API_KEY`
    pub api_key: Option<String>,
    /// Base URL for the generative language API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_gemini_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient transport failures
    #[serde(default)]
    pub max_retries: u32,
}

/// HTTP server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// PEM certificate, enables HTTPS together with `tls_key`
    pub tls_cert: Option<PathBuf>,
    /// PEM private key
    pub tls_key: Option<PathBuf>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Lab finder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderConfig {
    /// Plain list or list plus map
    #[serde(default = "default_variant")]
    pub variant: Variant,
}

/// Chat session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Prompt/reply pairs kept as context, 0 keeps everything
    #[serde(default = "default_max_exchanges")]
    pub max_exchanges: usize,
}

// Default value functions
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}

fn default_gemini_timeout() -> u32 {
    60
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8501
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_variant() -> Variant {
    Variant::Map
}

fn default_max_exchanges() -> usize {
    20
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            timeout_seconds: default_gemini_timeout(),
            max_retries: 0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            variant: default_variant(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_exchanges: default_max_exchanges(),
        }
    }
}

impl SoilLabConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SOILLAB_GEMINI__API_KEY, SOILLAB_SERVER__PORT, ...
        builder = builder.add_source(
            Environment::with_prefix("SOILLAB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SoilLabConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        if config.gemini.api_key.is_none() {
            config.gemini.api_key = env::var("GOOGLE_API_KEY").ok();
        }

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("soillab").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.gemini.base_url.is_empty() {
            self.gemini.base_url = default_gemini_base_url();
        }
        if self.gemini.model.is_empty() {
            self.gemini.model = default_gemini_model();
        }
        if self.gemini.timeout_seconds == 0 {
            self.gemini.timeout_seconds = default_gemini_timeout();
        }
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.server.port == 0 {
            self.server.port = default_server_port();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_tls()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        let Some(api_key) = &self.gemini.api_key else {
            return Err(FinderError::config(
                "Gemini API key is missing. Set GOOGLE_API_KEY or SOILLAB_GEMINI__API_KEY.",
            )
            .into());
        };

        if api_key.trim().is_empty() {
            return Err(FinderError::config("Gemini API key cannot be empty").into());
        }

        if api_key.len() < 8 {
            return Err(FinderError::config(
                "Gemini API key appears to be invalid (too short). Please check your API key.",
            )
            .into());
        }

        if api_key.len() > 200 {
            return Err(FinderError::config(
                "Gemini API key appears to be invalid (too long). Please check your API key.",
            )
            .into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.gemini.timeout_seconds > 300 {
            return Err(FinderError::config("Gemini API timeout cannot exceed 300 seconds").into());
        }

        if self.gemini.max_retries > 10 {
            return Err(FinderError::config("Gemini API max retries cannot exceed 10").into());
        }

        if self.session.max_exchanges > 1000 {
            return Err(
                FinderError::config("Session history cannot exceed 1000 exchanges").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(FinderError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(FinderError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.gemini.base_url.starts_with("http://")
            && !self.gemini.base_url.starts_with("https://")
        {
            return Err(FinderError::config(
                "Gemini API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.gemini.model.contains('/') || self.gemini.model.contains(':') {
            return Err(FinderError::config(format!(
                "Invalid model name '{}'",
                self.gemini.model
            ))
            .into());
        }

        Ok(())
    }

    fn validate_tls(&self) -> Result<()> {
        match (&self.server.tls_cert, &self.server.tls_key) {
            (Some(_), None) | (None, Some(_)) => Err(FinderError::config(
                "Both server.tls_cert and server.tls_key must be set to enable HTTPS",
            )
            .into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config() -> SoilLabConfig {
        let mut config = SoilLabConfig::default();
        config.gemini.api_key = Some("valid_api_key_123".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = SoilLabConfig::default();
        assert_eq!(
            config.gemini.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(config.gemini.timeout_seconds, 60);
        assert_eq!(config.gemini.max_retries, 0);
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.finder.variant, Variant::Map);
        assert_eq!(config.session.max_exchanges, 20);
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_config_validation_missing_api_key() {
        let config = SoilLabConfig::default();
        let result = config.validate_api_keys();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_config_validation_valid_api_key() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = valid_config();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[rstest]
    #[case::timeout(|c: &mut SoilLabConfig| { c.gemini.timeout_seconds = 500 }, "timeout cannot exceed")]
    #[case::retries(|c: &mut SoilLabConfig| { c.gemini.max_retries = 11 }, "max retries cannot exceed")]
    #[case::history(|c: &mut SoilLabConfig| { c.session.max_exchanges = 5000 }, "cannot exceed 1000")]
    fn test_config_validation_numeric_ranges(
        #[case] mutate: fn(&mut SoilLabConfig),
        #[case] expected: &str,
    ) {
        let mut config = valid_config();
        mutate(&mut config);
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains(expected));
    }

    #[test]
    fn test_config_validation_base_url() {
        let mut config = valid_config();
        config.gemini.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_half_tls() {
        let mut config = valid_config();
        config.server.tls_cert = Some(PathBuf::from("cert.pem"));
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("tls_key"));
    }

    #[test]
    fn test_apply_defaults_fills_blanks() {
        let mut config = valid_config();
        config.gemini.model = String::new();
        config.server.port = 0;
        config.logging.format = String::new();
        config.apply_defaults();
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_path_layers_file_and_environment() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[gemini]\nmodel = \"gemini-1.5-flash\"\ntimeout_seconds = 30\n\n[finder]\nvariant = \"list\""
        )
        .unwrap();

        // SAFETY: no other test reads or writes these variables
        unsafe {
            env::remove_var("SOILLAB_GEMINI__API_KEY");
            env::set_var("GOOGLE_API_KEY", "fallback_key_123");
            env::set_var("SOILLAB_GEMINI__TIMEOUT_SECONDS", "45");
            env::set_var("SOILLAB_SERVER__PORT", "9100");
        }

        let fallback = SoilLabConfig::load_from_path(Some(file.path().to_path_buf()));

        // SAFETY: as above
        unsafe {
            env::set_var("SOILLAB_GEMINI__API_KEY", "explicit_key_456");
        }

        let explicit = SoilLabConfig::load_from_path(Some(file.path().to_path_buf()));

        // SAFETY: test cleanup
        unsafe {
            env::remove_var("SOILLAB_GEMINI__API_KEY");
            env::remove_var("GOOGLE_API_KEY");
            env::remove_var("SOILLAB_GEMINI__TIMEOUT_SECONDS");
            env::remove_var("SOILLAB_SERVER__PORT");
        }

        let config = fallback.unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("fallback_key_123"));
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.timeout_seconds, 45);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.finder.variant, Variant::List);
        assert_eq!(config.session.max_exchanges, 20);

        let config = explicit.unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("explicit_key_456"));
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = SoilLabConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("soillab"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
