use std::env;
use std::path::PathBuf;

/// Address the server binds to when `BIND_ADDR` is unset
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
/// Directory records are written under when `DATA_DIR` is unset
pub const DEFAULT_DATA_DIR: &str = "database";
/// Largest accepted upload body, 25 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
/// Public endpoint of the generative language API
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Runtime configuration, read once at process start
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    /// Credential for the AI service. `None` disables summaries.
    pub api_key: Option<String>,
    pub ai_base_url: String,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            api_key: None,
            ai_base_url: DEFAULT_AI_BASE_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Read the configuration from the process environment
    ///
    /// Recognised variables: `API_KEY`, `BIND_ADDR`, `DATA_DIR`,
    /// `MAX_UPLOAD_BYTES` and `AI_BASE_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup, falling back to defaults
    /// for unset or blank values
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!(
                    "Ignoring invalid MAX_UPLOAD_BYTES value '{}', using {}",
                    raw,
                    defaults.max_upload_bytes
                );
                defaults.max_upload_bytes
            }),
            None => defaults.max_upload_bytes,
        };

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            api_key: get("API_KEY"),
            ai_base_url: get("AI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.ai_base_url),
            max_upload_bytes,
        }
    }
}
