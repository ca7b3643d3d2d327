//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/glossa/config.toml)
//! 3. Environment variables (GLOSSA_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::RetryPolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "GLOSSA";

/// Where stars are kept
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StarStorage {
    /// Process-local; lost on restart
    #[default]
    Memory,
    /// The `stars` table of the entry store
    Store,
}

impl FromStr for StarStorage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StarStorage::Memory),
            "store" => Ok(StarStorage::Store),
            other => bail!("Invalid star storage '{}'. Use 'memory' or 'store'.", other),
        }
    }
}

impl fmt::Display for StarStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StarStorage::Memory => write!(f, "memory"),
            StarStorage::Store => write!(f, "store"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (SQLite db)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Prefix of every keyword link
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Redis server for the entry counter (in-process counter when unset)
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Spam verdict service (everything is accepted when empty)
    #[serde(default = "default_spam_check_url")]
    pub spam_check_url: String,

    #[serde(default)]
    pub star_storage: StarStorage,

    /// Entries per front page
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    #[serde(default)]
    pub cache_retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            base_url: default_base_url(),
            redis_url: None,
            spam_check_url: default_spam_check_url(),
            star_storage: StarStorage::default(),
            per_page: default_per_page(),
            cache_retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (GLOSSA_DATA_DIR, GLOSSA_BASE_URL, ...)
    /// 2. Config file (~/.config/glossa/config.toml or GLOSSA_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit `--config` path when given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }

        if let Some(val) = env_var("BASE_URL") {
            self.base_url = val;
        }

        // Empty string clears it
        if let Some(val) = env_var("REDIS_URL") {
            self.redis_url = non_empty(val);
        }

        if let Some(val) = env_var("SPAM_CHECK_URL") {
            self.spam_check_url = val;
        }

        if let Some(val) = env_var("STAR_STORAGE") {
            self.star_storage = val
                .parse()
                .with_context(|| format!("Invalid {}_STAR_STORAGE", ENV_PREFIX))?;
        }

        if let Some(val) = env_var("PER_PAGE") {
            self.per_page = val
                .parse()
                .with_context(|| format!("Invalid {}_PER_PAGE: {:?}", ENV_PREFIX, val))?;
        }

        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with GLOSSA_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glossa")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("glossa.db")
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

fn non_empty(val: String) -> Option<String> {
    if val.is_empty() {
        None
    } else {
        Some(val)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glossa")
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_spam_check_url() -> String {
    "http://localhost:5050".to_string()
}

fn default_per_page() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "GLOSSA_DATA_DIR",
        "GLOSSA_BASE_URL",
        "GLOSSA_REDIS_URL",
        "GLOSSA_SPAM_CHECK_URL",
        "GLOSSA_STAR_STORAGE",
        "GLOSSA_PER_PAGE",
        "GLOSSA_CONFIG",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.data_dir.ends_with("glossa"));
        assert_eq!(config.base_url, "http://localhost:5000");
        assert!(config.redis_url.is_none());
        assert_eq!(config.spam_check_url, "http://localhost:5050");
        assert_eq!(config.star_storage, StarStorage::Memory);
        assert_eq!(config.per_page, 10);
        assert_eq!(config.cache_retry, RetryPolicy::default());
    }

    #[test]
    fn test_sqlite_path() {
        let config = Config::default();
        assert!(config.sqlite_path().ends_with("glossa.db"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GLOSSA_DATA_DIR", "/tmp/glossa-test");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/glossa-test"));
    }

    #[test]
    fn test_env_override_endpoints() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GLOSSA_REDIS_URL", "redis://cache:6379/");
        env::set_var("GLOSSA_SPAM_CHECK_URL", "");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379/"));
        assert!(config.spam_check_url.is_empty());

        // Empty string clears it
        env::set_var("GLOSSA_REDIS_URL", "");
        config.apply_env_overrides().unwrap();
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_env_override_star_storage_and_per_page() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GLOSSA_STAR_STORAGE", "Store");
        env::set_var("GLOSSA_PER_PAGE", "25");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.star_storage, StarStorage::Store);
        assert_eq!(config.per_page, 25);

        env::set_var("GLOSSA_PER_PAGE", "lots");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_star_storage_parse() {
        assert_eq!("memory".parse::<StarStorage>().unwrap(), StarStorage::Memory);
        assert_eq!("STORE".parse::<StarStorage>().unwrap(), StarStorage::Store);
        assert!("disk".parse::<StarStorage>().is_err());
        assert_eq!(StarStorage::Store.to_string(), "store");
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/glossa"),
            base_url: "https://glossary.example.com".to_string(),
            redis_url: Some("redis://127.0.0.1/".to_string()),
            spam_check_url: String::new(),
            star_storage: StarStorage::Store,
            per_page: 20,
            cache_retry: RetryPolicy::none(),
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("star_storage = \"store\""));
        assert!(toml_str.contains("[cache_retry]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.redis_url, config.redis_url);
        assert_eq!(parsed.star_storage, config.star_storage);
        assert!(parsed.spam_check_url.is_empty());
        assert_eq!(parsed.per_page, 20);
        assert_eq!(parsed.cache_retry, RetryPolicy::none());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            base_url = "http://wiki.local"
            star_storage = "store"

            [cache_retry]
            max_attempts = 5
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.base_url, "http://wiki.local");
        assert_eq!(config.star_storage, StarStorage::Store);
        assert_eq!(config.cache_retry.max_attempts, 5);
        assert_eq!(config.cache_retry.base_delay_ms, 50);
        // Keys left out keep their defaults
        assert_eq!(config.per_page, 10);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("GLOSSA_DATA_DIR", temp_dir.path().join("data"));

        let path = temp_dir.path().join("missing.toml");
        let config = Config::load_from_path(&path).unwrap();

        // Defaults, plus the data directory gets created
        assert_eq!(config.per_page, 10);
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_and_reload_with_cli_override() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            per_page: 3,
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded.per_page, 3);
        assert_eq!(loaded.data_dir, temp_dir.path().join("data"));
    }

    #[test]
    fn test_config_file_path_env_override() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("GLOSSA_CONFIG", "/etc/glossa.toml");
        assert_eq!(Config::config_file_path(), PathBuf::from("/etc/glossa.toml"));

        env::remove_var("GLOSSA_CONFIG");
        assert!(Config::config_file_path().ends_with("glossa/config.toml"));
    }
}
