use crate::cart::MissingPrice;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Storefront configuration.
///
/// Everything is optional in the config file; missing fields fall back to
/// the defaults below. There are no other flags or environment variables
/// (`RUST_LOG` drives the logger only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog spreadsheet (XLSX or CSV).
    pub data_path: PathBuf,

    /// Directory of per-product images named `<Kode>.jpg`.
    pub image_folder: PathBuf,

    /// Store label embedded in invoice filenames.
    pub store_name: String,

    /// Address the web server listens on.
    pub bind_addr: String,

    /// What a missing price contributes to cart and invoice totals.
    pub missing_price: MissingPrice,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_path: PathBuf::from("data/data_master.xlsx"),
            image_folder: PathBuf::from("data/images"),
            store_name: "mbakdike".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            missing_price: MissingPrice::Zero,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_stock_layout() {
        let config = Config::default();
        assert_eq!(config.data_path, PathBuf::from("data/data_master.xlsx"));
        assert_eq!(config.image_folder, PathBuf::from("data/images"));
        assert_eq!(config.store_name, "mbakdike");
        assert_eq!(config.missing_price, MissingPrice::Zero);
    }

    #[test]
    fn partial_config_file_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"store_name": "tokosaya", "missing_price": "skip"}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.store_name, "tokosaya");
        assert_eq!(config.missing_price, MissingPrice::Skip);
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
    }

    #[test]
    fn malformed_config_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
