use std::path::{Path, PathBuf};

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub extract: ExtractConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub preferred_langs: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-call timeout for both upstream requests, in seconds.
    pub timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { bind: "0.0.0.0:8000".to_string() }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig { preferred_langs: vec!["en".to_string()] }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            timeout_secs: 10,
            retry_attempts: 3,
            retry_base_delay_ms: 200,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { ttl_secs: 3600, capacity: 256 }
    }
}

impl Config {
    /// Load config from the given path, or the default location if it
    /// exists; missing files yield the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytcaps")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[server]
bind = "127.0.0.1:9000"

[extract]
preferred_langs = ["es", "en"]

[upstream]
timeout_secs = 5
retry_attempts = 2
retry_base_delay_ms = 100

[cache]
ttl_secs = 600
capacity = 32
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.extract.preferred_langs, vec!["es", "en"]);
        assert_eq!(config.upstream.timeout_secs, 5);
        assert_eq!(config.upstream.retry_attempts, 2);
        assert_eq!(config.cache.ttl_secs, 600);
        assert_eq!(config.cache.capacity, 32);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.extract.preferred_langs, vec!["en"]);
        assert_eq!(config.upstream.timeout_secs, 10);
        assert_eq!(config.cache.capacity, 256);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[extract]
preferred_langs = ["fr"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.extract.preferred_langs, vec!["fr"]);
        assert_eq!(config.server.bind, "0.0.0.0:8000");
    }
}
