//! Configuration for tablog.
//!
//! Loaded from `~/.config/tablog/config.toml` when present, with environment
//! overrides on top. Everything has a default so the binary runs without any
//! config file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Columns shown in the table, in order. Dotted paths address nested
    /// fields of the flattened record.
    pub columns: Vec<String>,
    /// Separator used when flattening nested keys.
    pub separator: String,
    /// Automatic sync interval in minutes.
    pub refresh_interval_minutes: u64,
    /// Severity value (lowercased) → hex color like "#FF0000".
    pub severity_colors: HashMap<String, String>,
    /// Whether severity row coloring starts enabled.
    pub severity_colors_enabled: bool,
    /// Whether the table follows new rows by default.
    pub auto_scroll: bool,
}

impl Default for Config {
    fn default() -> Self {
        let severity_colors = HashMap::from([
            ("low".to_string(), "#00FF00".to_string()),
            ("medium".to_string(), "#FFFF00".to_string()),
            ("high".to_string(), "#FF0000".to_string()),
        ]);
        Self {
            columns: vec![
                "source_info.ip".to_string(),
                "severity".to_string(),
                "type".to_string(),
                "name".to_string(),
                "id".to_string(),
                "group".to_string(),
                "rt".to_string(),
                "dhost".to_string(),
                "endpoint_id".to_string(),
                "endpoint_type".to_string(),
            ],
            separator: ".".to_string(),
            refresh_interval_minutes: 60,
            severity_colors,
            severity_colors_enabled: true,
            auto_scroll: true,
        }
    }
}

impl Config {
    /// Config file, then environment overrides, then defaults.
    pub fn load() -> Self {
        let mut config = Self::from_file().unwrap_or_default();

        if let Ok(minutes) = std::env::var("TABLOG_REFRESH_MINUTES") {
            match minutes.parse::<u64>() {
                Ok(m) if m >= 1 => config.refresh_interval_minutes = m,
                _ => warn!("ignoring invalid TABLOG_REFRESH_MINUTES={minutes}"),
            }
        }
        if let Ok(columns) = std::env::var("TABLOG_COLUMNS") {
            let columns: Vec<String> = columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            if !columns.is_empty() {
                config.columns = columns;
            }
        }

        config
    }

    fn from_file() -> Option<Self> {
        let path = Self::config_path()?;
        let content = std::fs::read_to_string(&path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("failed to parse {}: {e}", path.display());
                None
            }
        }
    }

    fn config_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("tablog").join("config.toml"))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_minutes.saturating_mul(60))
    }
}
