use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_API_URL: &str = "http://127.0.0.1:11434/api/generate";
const DEFAULT_OLLAMA_VERSION_URL: &str = "http://127.0.0.1:11434/api/version";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 10;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Configuration was installed more than once.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for the student service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Generation endpoint of the Ollama runtime.
    pub ollama_api_url: String,
    /// Version endpoint polled as a liveness check before generating.
    pub ollama_version_url: String,
    /// Model identifier sent with every generation request.
    pub ollama_model: String,
    /// Whether the summary endpoint talks to Ollama at all.
    pub ollama_enabled: bool,
    /// Timeout applied to the liveness check.
    pub ollama_health_timeout: Duration,
    /// Timeout applied to the generation request.
    pub ollama_generate_timeout: Duration,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_api_url: DEFAULT_OLLAMA_API_URL.to_string(),
            ollama_version_url: DEFAULT_OLLAMA_VERSION_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            ollama_enabled: true,
            ollama_health_timeout: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
            ollama_generate_timeout: Duration::from_secs(DEFAULT_GENERATE_TIMEOUT_SECS),
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            ollama_api_url: get("OLLAMA_API_URL").unwrap_or(defaults.ollama_api_url),
            ollama_version_url: get("OLLAMA_VERSION_URL").unwrap_or(defaults.ollama_version_url),
            ollama_model: get("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            ollama_enabled: get("OLLAMA_ENABLED")
                .map(|value| parse_flag(&value).ok_or_else(|| invalid("OLLAMA_ENABLED")))
                .transpose()?
                .unwrap_or(defaults.ollama_enabled),
            ollama_health_timeout: get("OLLAMA_HEALTH_TIMEOUT_SECS")
                .map(|value| parse_secs(&value, "OLLAMA_HEALTH_TIMEOUT_SECS"))
                .transpose()?
                .unwrap_or(defaults.ollama_health_timeout),
            ollama_generate_timeout: get("OLLAMA_GENERATE_TIMEOUT_SECS")
                .map(|value| parse_secs(&value, "OLLAMA_GENERATE_TIMEOUT_SECS"))
                .transpose()?
                .unwrap_or(defaults.ollama_generate_timeout),
            server_port: get("SERVER_PORT")
                .map(|value| value.trim().parse().map_err(|_| invalid("SERVER_PORT")))
                .transpose()?,
        })
    }
}

fn invalid(key: &str) -> ConfigError {
    ConfigError::InvalidValue(key.to_string())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_secs(value: &str, key: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(invalid(key)),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, falling back to defaults when never initialized.
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    Ok(get_config())
}
