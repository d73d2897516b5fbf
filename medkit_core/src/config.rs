//! Configuration file support for medkit.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/medkit/config.toml`.

use crate::stock::StockStatus;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub pharmacy: PharmacyConfig,

    #[serde(default)]
    pub stock: StockConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Pharmacy finder configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PharmacyConfig {
    /// CSV directory file; defaults to `pharmacies.csv` in the data dir
    #[serde(default)]
    pub directory_path: Option<PathBuf>,

    #[serde(default = "default_search_radius_km")]
    pub search_radius_km: f64,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for PharmacyConfig {
    fn default() -> Self {
        Self {
            directory_path: None,
            search_radius_km: default_search_radius_km(),
            max_results: default_max_results(),
        }
    }
}

impl PharmacyConfig {
    pub fn directory_path(&self, data_dir: &Path) -> PathBuf {
        self.directory_path
            .clone()
            .unwrap_or_else(|| data_dir.join("pharmacies.csv"))
    }
}

/// Stock level thresholds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StockConfig {
    #[serde(default = "default_low_threshold")]
    pub low_threshold: u32,

    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: u32,

    /// Units added by a scan when no amount is given
    #[serde(default = "default_refill_amount")]
    pub default_refill_amount: u32,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            medium_threshold: default_medium_threshold(),
            default_refill_amount: default_refill_amount(),
        }
    }
}

impl StockConfig {
    pub fn status(&self, quantity: u32) -> StockStatus {
        StockStatus::classify(quantity, self.low_threshold, self.medium_threshold)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("medkit")
}

fn default_search_radius_km() -> f64 {
    5.0
}

fn default_max_results() -> usize {
    3
}

fn default_low_threshold() -> u32 {
    7
}

fn default_medium_threshold() -> u32 {
    15
}

fn default_refill_amount() -> u32 {
    30
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the rest of the system cannot work with
    pub fn validate(&self) -> Result<()> {
        let radius = self.pharmacy.search_radius_km;
        if !radius.is_finite() || radius < 0.0 {
            return Err(Error::Config(format!(
                "pharmacy.search_radius_km must be a non-negative number, got {}",
                radius
            )));
        }
        if self.stock.low_threshold > self.stock.medium_threshold {
            return Err(Error::Config(format!(
                "stock.low_threshold ({}) exceeds stock.medium_threshold ({})",
                self.stock.low_threshold, self.stock.medium_threshold
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("medkit").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pharmacy.search_radius_km, 5.0);
        assert_eq!(config.pharmacy.max_results, 3);
        assert_eq!(config.stock.low_threshold, 7);
        assert_eq!(config.stock.medium_threshold, 15);
        assert_eq!(config.stock.default_refill_amount, 30);
        assert!(config.data.data_dir.ends_with("medkit"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.pharmacy.search_radius_km = 12.5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.pharmacy.search_radius_km, 12.5);
        assert_eq!(loaded.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[stock]
low_threshold = 3
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stock.low_threshold, 3);
        assert_eq!(config.stock.medium_threshold, 15); // default
        assert_eq!(config.stock.status(3), StockStatus::Low);
        assert_eq!(config.stock.status(4), StockStatus::Medium);
    }

    #[test]
    fn test_directory_path_defaults_to_data_dir() {
        let config = Config::default();
        let data_dir = PathBuf::from("/tmp/medkit-data");
        assert_eq!(
            config.pharmacy.directory_path(&data_dir),
            data_dir.join("pharmacies.csv")
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[stock]\nlow_threshold = 20\nmedium_threshold = 10\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, "[pharmacy]\nsearch_radius_km = -1.0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
