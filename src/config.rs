use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::ThemePreset;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RUSTY_DASH_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "rusty-dash.json";

/// Startup configuration. Every field has a default, so a partial file works.
///
/// ```json
/// { "coffee_csv": "data/Coffee_sales.csv", "theme": "Forest Green" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub coffee_csv: PathBuf,
    pub student_csv: PathBuf,
    pub theme: ThemePreset,
    /// Buckets per continuous axis in cross-tab heatmaps.
    pub bucket_count: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            coffee_csv: PathBuf::from("data/Coffee_sales.csv"),
            student_csv: PathBuf::from("data/StudentPerformanceFactors.csv"),
            theme: ThemePreset::default(),
            bucket_count: 5,
        }
    }
}

impl DashboardConfig {
    /// Parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// `$RUSTY_DASH_CONFIG`, else `./rusty-dash.json`, else defaults.
    ///
    /// A missing default file is fine; a missing file named by the
    /// environment variable, or any malformed file, is an error.
    pub fn discover() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(path);
            log::info!("Using config from ${CONFIG_ENV}: {}", path.display());
            return Self::from_file(&path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            log::info!("Using config {}", local.display());
            return Self::from_file(local);
        }
        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            bail!("bucket_count must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "{text}").unwrap();
        tmp
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let tmp = write_config(r#"{ "theme": "Forest Green" }"#);
        let config = DashboardConfig::from_file(tmp.path()).unwrap();
        assert_eq!(config.theme, ThemePreset::ForestGreen);
        assert_eq!(config.bucket_count, 5);
        assert_eq!(config.coffee_csv, PathBuf::from("data/Coffee_sales.csv"));
    }

    #[test]
    fn unknown_theme_is_rejected() {
        let tmp = write_config(r#"{ "theme": "Neon" }"#);
        assert!(DashboardConfig::from_file(tmp.path()).is_err());
    }

    #[test]
    fn zero_buckets_is_rejected() {
        let tmp = write_config(r#"{ "bucket_count": 0 }"#);
        assert!(DashboardConfig::from_file(tmp.path()).is_err());
    }
}
