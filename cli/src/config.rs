use anyhow::{Context, Result};
use rulemancer::ResourceLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "rulemancer.json";

/// Settings read from the JSON config file. Every field is optional;
/// command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rule_pool: PathBuf,
    pub test_pool: PathBuf,
    pub debug: bool,
    pub host: String,
    pub port: u16,
    /// Rule directories served as games, each declaring a `game-config`
    pub games: Vec<PathBuf>,
    pub tls_cert_file: Option<PathBuf>,
    pub tls_key_file: Option<PathBuf>,
    /// Key API tokens are signed with
    pub jwt_secret: Option<String>,
    pub limits: ResourceLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rule_pool: PathBuf::from("rulepool"),
            test_pool: PathBuf::from("testpool"),
            debug: false,
            host: "127.0.0.1".to_string(),
            port: 3000,
            games: Vec::new(),
            tls_cert_file: None,
            tls_key_file: None,
            jwt_secret: None,
            limits: ResourceLimits::default(),
        }
    }
}

impl Config {
    /// Read `path`, or the default config file when `path` is `None`.
    ///
    /// An explicitly named file must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}
