//! Server configuration.
//!
//! Values come from three layers, later ones winning:
//! built-in defaults, an optional YAML file named by `PUSHPARSE_CONFIG`,
//! then individual environment variables.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::error::StartupError;
use crate::http::policy::{ParsePolicy, ParserOptions};

pub const CONFIG_PATH_ENV: &str = "PUSHPARSE_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host name or address to resolve.
    pub host: String,
    /// Port number or service name.
    pub service: String,
    pub backlog: u32,
    /// Size of the per-connection read buffer.
    pub read_buffer_size: usize,
    pub max_connections: usize,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    /// Value of the `Server` response header.
    pub server_name: String,
    pub parse_policy: ParsePolicy,
    pub max_header_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            service: "8080".to_string(),
            backlog: 1024,
            read_buffer_size: 1024,
            max_connections: 256,
            read_timeout_secs: 30,
            write_timeout_secs: 30,
            server_name: "pushparse".to_string(),
            parse_policy: ParsePolicy::Lenient,
            max_header_size: None,
        }
    }
}

impl Config {
    /// Loads the file named by `PUSHPARSE_CONFIG` (if set), then applies
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        let cfg = base.with_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Defaults plus overrides taken from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(lookup)
    }

    /// Applies `LISTEN_HOST`, `LISTEN_SERVICE`, `READ_BUFFER_SIZE`,
    /// `MAX_CONNECTIONS`, `READ_TIMEOUT_SECS`, `WRITE_TIMEOUT_SECS`,
    /// `SERVER_NAME`, `PARSE_POLICY` and `MAX_HEADER_SIZE`.
    pub fn with_overrides<F>(mut self, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("LISTEN_HOST") {
            self.host = host;
        }
        if let Some(service) = lookup("LISTEN_SERVICE") {
            self.service = service;
        }
        if let Some(name) = lookup("SERVER_NAME") {
            self.server_name = name;
        }
        if let Some(policy) = lookup("PARSE_POLICY") {
            self.parse_policy = ParsePolicy::from_name(&policy)
                .with_context(|| format!("PARSE_POLICY must be lenient or strict, got {policy:?}"))?;
        }

        parse_var(&lookup, "READ_BUFFER_SIZE", &mut self.read_buffer_size)?;
        parse_var(&lookup, "MAX_CONNECTIONS", &mut self.max_connections)?;
        parse_var(&lookup, "READ_TIMEOUT_SECS", &mut self.read_timeout_secs)?;
        parse_var(&lookup, "WRITE_TIMEOUT_SECS", &mut self.write_timeout_secs)?;

        if let Some(raw) = lookup("MAX_HEADER_SIZE") {
            let limit = raw
                .parse()
                .with_context(|| format!("MAX_HEADER_SIZE must be a number, got {raw:?}"))?;
            self.max_header_size = Some(limit);
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), StartupError> {
        if self.read_buffer_size == 0 {
            return Err(StartupError::Config("read_buffer_size must be > 0".into()));
        }
        if self.max_connections == 0 {
            return Err(StartupError::Config("max_connections must be > 0".into()));
        }
        if self.host.is_empty() {
            return Err(StartupError::Config("host must not be empty".into()));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            policy: self.parse_policy,
            max_header_size: self.max_header_size,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, slot: &mut T) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}"))?;
    }
    Ok(())
}
