// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_BATCH_COUNT, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RECONNECT_DELAY_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Client configuration.
///
/// Everything except `api_root` has a default, so the smallest valid file is
/// a single line.
///
/// # Example
/// ```yaml
/// api_root: http://127.0.0.1:8188
/// user: steve
/// reconnect_delay_ms: 300
/// poll_interval_ms: 1000
/// request_timeout_secs: 30
/// dev_mode: false
/// session_file: .dagwood/session.json
/// auto_queue:
///   mode: change
///   batch_count: 2
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClientConfig {
    pub api_root: String,
    /// Operator identity sent with every request; unrelated to the session id
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Annotate compiled nodes with their titles
    #[serde(default)]
    pub dev_mode: bool,
    /// Persist the session identity here; in memory when absent
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    #[serde(default)]
    pub auto_queue: AutoQueueSettings,
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_batch_count() -> u32 {
    DEFAULT_BATCH_COUNT
}

impl ClientConfig {
    /// Configuration with defaults for everything but the API root.
    pub fn new(api_root: impl Into<String>) -> Self {
        Self {
            api_root: api_root.into(),
            user: String::new(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            dev_mode: false,
            session_file: None,
            auto_queue: AutoQueueSettings::default(),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Collect every problem with this configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match Url::parse(&self.api_root) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "api_root '{}' must use http or https, not '{}'",
                self.api_root,
                url.scheme()
            )),
            Err(e) => errors.push(format!("api_root '{}' is not a valid url: {}", self.api_root, e)),
        }
        if self.reconnect_delay_ms == 0 {
            errors.push("reconnect_delay_ms must be greater than zero".to_string());
        }
        if self.poll_interval_ms == 0 {
            errors.push("poll_interval_ms must be greater than zero".to_string());
        }
        if self.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be greater than zero".to_string());
        }
        if self.auto_queue.batch_count == 0 {
            errors.push("auto_queue.batch_count must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Automatic re-queueing.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct AutoQueueSettings {
    #[serde(default)]
    pub mode: AutoQueueMode,
    #[serde(default = "default_batch_count")]
    pub batch_count: u32,
}

impl Default for AutoQueueSettings {
    fn default() -> Self {
        Self {
            mode: AutoQueueMode::default(),
            batch_count: DEFAULT_BATCH_COUNT,
        }
    }
}

/// When auto queue submits on its own.
///
/// # Variants
/// * `Disabled` - Never
/// * `Instant` - Whenever the engine's pending count drops to zero without an error
/// * `Change` - When the graph changes, deferred until the engine is idle
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AutoQueueMode {
    #[default]
    Disabled,
    Instant,
    Change,
}

/// Load a config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let cfg: ClientConfig = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

/// Load and validate a config from a YAML file
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let cfg = load_config(path)?;
    cfg.validate().map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg: ClientConfig = serde_yaml::from_str("api_root: http://127.0.0.1:8188").unwrap();

        assert_eq!(cfg, ClientConfig::new("http://127.0.0.1:8188"));
        assert_eq!(cfg.reconnect_delay(), Duration::from_millis(300));
        assert_eq!(cfg.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.auto_queue.mode, AutoQueueMode::Disabled);
        assert_eq!(cfg.auto_queue.batch_count, 1);
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
api_root: https://engine.local/base/
user: steve
reconnect_delay_ms: 500
poll_interval_ms: 2000
request_timeout_secs: 5
dev_mode: true
session_file: /tmp/session.json
auto_queue:
  mode: change
  batch_count: 3
"#;
        let cfg: ClientConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(cfg.user, "steve");
        assert_eq!(cfg.reconnect_delay_ms, 500);
        assert!(cfg.dev_mode);
        assert_eq!(cfg.session_file, Some(PathBuf::from("/tmp/session.json")));
        assert_eq!(
            cfg.auto_queue,
            AutoQueueSettings {
                mode: AutoQueueMode::Change,
                batch_count: 3
            }
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_and_validate_reports_every_problem() {
        let file = write_config(
            r#"
api_root: ftp://engine.local
poll_interval_ms: 0
auto_queue:
  batch_count: 0
"#,
        );

        let error = load_and_validate_config(file.path()).unwrap_err();
        let ConfigError::Invalid(problems) = &error else {
            panic!("expected validation failure, got {error:?}");
        };
        assert_eq!(problems.len(), 3);
        assert!(error.to_string().starts_with("Configuration validation failed:"));
        assert!(error.to_string().contains("must use http or https"));
    }

    #[test]
    fn unknown_auto_queue_mode_is_a_parse_error() {
        let file = write_config("api_root: http://x\nauto_queue:\n  mode: sometimes\n");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(dir.path().join("absent.yaml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn unparseable_root_is_rejected() {
        let problems = ClientConfig::new("not a url").validate().unwrap_err();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("not a valid url"));
    }
}
