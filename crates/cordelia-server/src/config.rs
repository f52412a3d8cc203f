//! Configuration file parsing for the server.
//!
//! Settings come from an optional TOML file and are then overlaid with
//! environment variables, so a deployment can run with no file at all.

use cordelia_gatekeeper::{GateConfig, ScoringMode};
use cordelia_llm::ollama::DEFAULT_ENDPOINT;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// An environment override could not be parsed
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },

    /// Settings are individually valid but do not fit together
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which generator to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    /// In-process stub navigator
    #[default]
    Stub,
    /// Local Ollama model
    Ollama,
}

/// Which validator to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorBackend {
    /// No independent validator (score mode only)
    #[default]
    None,
    /// Local Ollama model
    Ollama,
}

/// Capability backend selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Generator backend
    pub generator: GeneratorBackend,
    /// Validator backend
    pub validator: ValidatorBackend,
    /// Ollama API endpoint, shared by both roles
    pub ollama_endpoint: String,
    /// Model used by the Ollama navigator
    pub navigator_model: String,
    /// Model used by the Ollama arbiter
    pub arbiter_model: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorBackend::Stub,
            validator: ValidatorBackend::None,
            ollama_endpoint: DEFAULT_ENDPOINT.to_string(),
            navigator_model: "llama3".to_string(),
            arbiter_model: "llama3".to_string(),
        }
    }
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (default: 5000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Shared secret expected in `X-Sovereign-Key`; unset fails every request
    #[serde(default)]
    pub architect_key: Option<String>,

    /// Gate thresholds, weights and timeouts
    #[serde(default)]
    pub gate: GateConfig,

    /// Capability backends
    #[serde(default)]
    pub backends: BackendConfig,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            architect_key: None,
            gate: GateConfig::default(),
            backends: BackendConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Create a configuration for testing
    ///
    /// Binds to localhost with a fixed key and the stub generator.
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 5000,
            architect_key: Some("test-key-do-not-use-in-production".to_string()),
            ..Self::default()
        }
    }

    /// Overlay process environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Overlay values from `lookup`, keyed by environment variable name
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("ARCHITECT_KEY") {
            self.architect_key = Some(key);
        }
        if let Some(host) = get("HOST") {
            self.bind_address = host;
        }
        if let Some(port) = get("PORT") {
            self.bind_port = parse_env("PORT", port)?;
        }
        if let Some(count) = get("RATE_LIMIT_COUNT") {
            self.gate.rate_limit_count = parse_env("RATE_LIMIT_COUNT", count)?;
        }
        if let Some(period) = get("RATE_LIMIT_PERIOD") {
            self.gate.rate_limit_period_secs = parse_env("RATE_LIMIT_PERIOD", period)?;
        }
        if let Some(max) = get("MAX_PROMPT_LENGTH") {
            self.gate.max_prompt_length = parse_env("MAX_PROMPT_LENGTH", max)?;
        }
        if let Some(mode) = get("SCORING_MODE") {
            self.gate.scoring_mode = ScoringMode::parse(&mode).ok_or(ConfigError::InvalidEnv {
                var: "SCORING_MODE",
                value: mode,
            })?;
        }
        if let Some(weight) = get("KINETIC_WEIGHT") {
            self.gate.kinetic_weight = parse_env("KINETIC_WEIGHT", weight)?;
        }
        if let Some(weight) = get("POTENTIAL_WEIGHT") {
            self.gate.potential_weight = parse_env("POTENTIAL_WEIGHT", weight)?;
        }
        if let Some(backend) = get("GENERATOR_BACKEND") {
            self.backends.generator = match backend.trim().to_ascii_lowercase().as_str() {
                "stub" => GeneratorBackend::Stub,
                "ollama" => GeneratorBackend::Ollama,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "GENERATOR_BACKEND",
                        value: backend,
                    })
                }
            };
        }
        if let Some(backend) = get("VALIDATOR_BACKEND") {
            self.backends.validator = match backend.trim().to_ascii_lowercase().as_str() {
                "none" => ValidatorBackend::None,
                "ollama" => ValidatorBackend::Ollama,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "VALIDATOR_BACKEND",
                        value: backend,
                    })
                }
            };
        }
        if let Some(endpoint) = get("OLLAMA_ENDPOINT") {
            self.backends.ollama_endpoint = endpoint;
        }
        if let Some(model) = get("NAVIGATOR_MODEL") {
            self.backends.navigator_model = model;
        }
        if let Some(model) = get("ARBITER_MODEL") {
            self.backends.arbiter_model = model;
        }

        Ok(())
    }

    /// Check the settings fit together
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gate.validate().map_err(ConfigError::Invalid)?;

        if self.gate.scoring_mode == ScoringMode::Review
            && self.backends.validator == ValidatorBackend::None
        {
            return Err(ConfigError::Invalid(
                "scoring_mode = \"review\" requires a validator backend".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether a non-empty shared secret is configured
    pub fn has_architect_key(&self) -> bool {
        self.architect_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert!(!config.has_architect_key());
        assert_eq!(config.gate.rate_limit_count, 10);
        assert_eq!(config.backends.generator, GeneratorBackend::Stub);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_test_config() {
        let config = ServerConfig::default_test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
        assert!(config.has_architect_key());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "127.0.0.1"
            bind_port = 9000
            architect_key = "sovereign"

            [gate]
            rate_limit_count = 3
            scoring_mode = "review"

            [backends]
            generator = "ollama"
            validator = "ollama"
            arbiter_model = "mistral"
        "#;

        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.architect_key.as_deref(), Some("sovereign"));
        assert_eq!(config.gate.rate_limit_count, 3);
        assert_eq!(config.gate.max_prompt_length, 2048);
        assert_eq!(config.gate.scoring_mode, ScoringMode::Review);
        assert_eq!(config.backends.validator, ValidatorBackend::Ollama);
        assert_eq!(config.backends.arbiter_model, "mistral");
        assert_eq!(config.backends.navigator_model, "llama3");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_port = 7070\n[gate]\nmax_prompt_length = 64").unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_port, 7070);
        assert_eq!(config.gate.max_prompt_length, 64);
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_from_file_errors() {
        assert!(matches!(
            ServerConfig::from_file("/nonexistent/cordelia.toml"),
            Err(ConfigError::FileRead(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_port = \"not a port\"").unwrap();
        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config
            .apply_overrides(lookup(&[
                ("ARCHITECT_KEY", "from-env"),
                ("PORT", "8081"),
                ("RATE_LIMIT_COUNT", "20"),
                ("RATE_LIMIT_PERIOD", "30"),
                ("MAX_PROMPT_LENGTH", "100"),
                ("SCORING_MODE", "Review"),
                ("KINETIC_WEIGHT", "1.5"),
                ("VALIDATOR_BACKEND", "ollama"),
                ("ARBITER_MODEL", "mistral"),
            ]))
            .unwrap();

        assert_eq!(config.architect_key.as_deref(), Some("from-env"));
        assert_eq!(config.bind_port, 8081);
        assert_eq!(config.gate.rate_limit_count, 20);
        assert_eq!(config.gate.rate_limit_period_secs, 30);
        assert_eq!(config.gate.max_prompt_length, 100);
        assert_eq!(config.gate.scoring_mode, ScoringMode::Review);
        assert_eq!(config.gate.kinetic_weight, 1.5);
        assert_eq!(config.backends.validator, ValidatorBackend::Ollama);
        assert_eq!(config.backends.arbiter_model, "mistral");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = ServerConfig::default_test_config();
        config
            .apply_overrides(lookup(&[("ARCHITECT_KEY", ""), ("PORT", "  ")]))
            .unwrap();
        assert!(config.has_architect_key());
        assert_eq!(config.bind_port, 5000);
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_overrides(lookup(&[("RATE_LIMIT_COUNT", "ten")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                var: "RATE_LIMIT_COUNT",
                ..
            }
        ));

        assert!(config
            .apply_overrides(lookup(&[("SCORING_MODE", "hybrid")]))
            .is_err());
        assert!(config
            .apply_overrides(lookup(&[("GENERATOR_BACKEND", "gemini")]))
            .is_err());
    }

    #[test]
    fn test_review_without_validator_is_invalid() {
        let mut config = ServerConfig::default();
        config.gate.scoring_mode = ScoringMode::Review;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_limit_is_invalid() {
        let mut config = ServerConfig::default();
        config.gate.rate_limit_count = 0;
        assert!(config.validate().is_err());
    }
}
