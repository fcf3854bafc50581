use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::TimeRange;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub tick_ms: u64,
    /// Dashboard summary refresh; 0 turns auto-refresh off.
    pub dashboard_refresh_secs: u64,
    pub live_stats_secs: u64,
    pub capture_refresh_secs: u64,
    pub protocol_refresh_secs: u64,
    pub packets_per_page: u32,
    pub flows_per_page: u32,
    pub anomalies_per_page: u32,
    pub top_talkers_limit: u32,
    pub default_time_range: TimeRange,
    /// Where packet CSV exports are written.
    pub export_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub directory: PathBuf,
    pub filter: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            dashboard_refresh_secs: 5,
            live_stats_secs: 2,
            capture_refresh_secs: 5,
            protocol_refresh_secs: 30,
            packets_per_page: 50,
            flows_per_page: 50,
            anomalies_per_page: 10,
            top_talkers_limit: 10,
            default_time_range: TimeRange::Hour,
            export_dir: PathBuf::from("."),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("trafficscope"),
            filter: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            ui: UiConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl UiConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }

    /// Refresh intervals are kept within the 1-30 second polling window.
    pub fn clamp_secs(secs: u64) -> Duration {
        Duration::from_secs(secs.clamp(1, 30))
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    #[cfg(test)]
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `--config` wins over `$TRAFFICSCOPE_CONFIG`; `--base-url` wins over
    /// `$TRAFFICSCOPE_URL` and the file.
    pub fn resolve(cli_config: Option<PathBuf>, cli_base_url: Option<String>) -> Result<Self> {
        let mut config = if let Some(path) = cli_config {
            Self::load_from_file(path)?
        } else if let Ok(path) = std::env::var("TRAFFICSCOPE_CONFIG") {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };

        if let Some(url) = cli_base_url {
            config.api.base_url = url;
        } else if let Ok(url) = std::env::var("TRAFFICSCOPE_URL") {
            config.api.base_url = url;
        }

        Ok(config)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log.directory.join("trafficscope.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"http://10.1.1.1:8080\"\n\n[ui]\nanomalies_per_page = 25\ndefault_time_range = \"24h\"\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.api.base_url, "http://10.1.1.1:8080");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.ui.anomalies_per_page, 25);
        assert_eq!(config.ui.default_time_range, TimeRange::Day);
        assert_eq!(config.ui.flows_per_page, 50);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.ui.dashboard_refresh_secs = 0;
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn cli_url_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to_file(&path).unwrap();
        let config =
            Config::resolve(Some(path), Some("http://backend:5000".to_string())).unwrap();
        assert_eq!(config.api.base_url, "http://backend:5000");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load_from_file("/nonexistent/trafficscope.toml").unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }

    #[test]
    fn refresh_is_clamped() {
        assert_eq!(UiConfig::clamp_secs(0), Duration::from_secs(1));
        assert_eq!(UiConfig::clamp_secs(90), Duration::from_secs(30));
    }
}
