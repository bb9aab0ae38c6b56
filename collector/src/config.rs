use std::{env, path::PathBuf, time::Duration};

use serde_json::Value;

use crate::error::{CollectorErr, Result};

/// Startup configuration. Every field has a default; a JSON config file
/// and then the `HOST`/`PORT` environment variables override it, in that
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub address: String,
    pub port: u16,
    /// Idle window in seconds after which a worker assumes its client is
    /// gone.
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 3000,
            timeout_secs: 300,
            output_dir: PathBuf::from("model"),
        }
    }
}

impl CollectorConfig {
    /// Loads configuration from a JSON file; absent fields keep their
    /// defaults.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the file cannot be read or parsed, or a
    /// present field has the wrong shape.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("cannot read '{path}': {e}")))?;

        let val: Value =
            serde_json::from_str(&content).map_err(|e| invalid(format!("invalid JSON: {e}")))?;

        let defaults = Self::default();

        let address = match &val["address"] {
            Value::Null => defaults.address,
            v => v
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid("address must be a string"))?,
        };

        let port = match &val["port"] {
            Value::Null => defaults.port,
            v => v
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .ok_or_else(|| invalid("port must be an integer port number"))?,
        };

        let timeout_secs = match &val["timeout"] {
            Value::Null => defaults.timeout_secs,
            v => v
                .as_u64()
                .ok_or_else(|| invalid("timeout must be a non-negative integer"))?,
        };

        let output_dir = match &val["output_dir"] {
            Value::Null => defaults.output_dir,
            v => v
                .as_str()
                .map(PathBuf::from)
                .ok_or_else(|| invalid("output_dir must be a string"))?,
        };

        Ok(Self {
            address,
            port,
            timeout_secs,
            output_dir,
        })
    }

    /// Applies the `HOST` / `PORT` environment overrides.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `PORT` is set but not a port number.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(host) = env::var("HOST") {
            self.address = host;
        }

        if let Ok(port) = env::var("PORT") {
            self.port = port
                .parse()
                .map_err(|e| invalid(format!("PORT must be a port number: {e}")))?;
        }

        Ok(self)
    }

    /// The idle window as a duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

fn invalid(msg: impl Into<String>) -> CollectorErr {
    CollectorErr::InvalidConfig(msg.into())
}
