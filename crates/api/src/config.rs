//! Service configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `PROCTOR__SECTION__KEY` environment variables.

use std::path::{Path, PathBuf};

use alerting::AlertConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use session::SessionConfig;
use tracing::info;

/// File read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "proctor.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub alerting: AlertConfig,
    pub store: StoreConfig,
}

/// HTTP server and logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_address: String,
    /// Default log filter; `RUST_LOG` overrides it
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Dataset export target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory exported datasets are written to
    pub export_dir: PathBuf,
    /// File name used by the save command
    pub dataset_filename: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("./exports"),
            dataset_filename: "proctor-dataset.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration; a missing file is not an error
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let config: AppConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("PROCTOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        info!("Configuration loaded (file: {})", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posture::Label;

    #[test]
    fn test_defaults_without_file() {
        let missing = std::env::temp_dir().join(format!("{}.toml", uuid::Uuid::new_v4()));
        let config = AppConfig::load(Some(&missing)).unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.session.posture_interval_ms, 200);
        assert_eq!(config.session.detection_interval_ms, 500);
        assert_eq!(config.alerting.confidence_threshold, 0.8);
        assert_eq!(config.alerting.phone_class, "cell phone");
        assert_eq!(config.alerting.cue_duration_ms, 3000);
        assert_eq!(config.store.dataset_filename, "proctor-dataset.json");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("proctor-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
[server]
json_logs = true

[session]
training_examples = 10
required_labels = ["normal_posture", "absent"]

[alerting]
phone_min_score = 0.6
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(config.server.json_logs);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.session.training_examples, 10);
        assert_eq!(config.session.required_labels, vec![Label::NormalPosture, Label::Absent]);
        assert_eq!(config.session.countdown_tick_ms, 1000);
        assert_eq!(config.alerting.phone_min_score, Some(0.6));
    }
}
