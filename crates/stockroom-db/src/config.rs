//! # Stockroom Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKROOM_DB_PATH=/srv/stockroom/stock.db                          │
//! │     STOCKROOM_VAT_RATE_BPS=1500                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockroom/stockroom.toml (Linux)                         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Eight shops, Master warehouse, 15% VAT, MUR                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [engine]
//! locations = ["Master", "Plouis", "Bagatelle"]
//! master_location = "Master"
//! guest_customer_name = "Guest"
//! default_min_quantity = 5
//! vat_rate_bps = 1500
//! currency_code = "MUR"
//!
//! [database]
//! path = "/srv/stockroom/stockroom.db"
//! max_connections = 4
//!
//! [persistence]
//! queue_capacity = 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use stockroom_core::EngineConfig;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `stockroom.db` in the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    /// Configured path, else the data dir, else the working directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "stockroom", "stockroom")
                .map(|dirs| dirs.data_dir().join("stockroom.db"))
                .unwrap_or_else(|| PathBuf::from("stockroom.db"))
        })
    }
}

// =============================================================================
// Persistence Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// Flush and shutdown requests the background writer can have waiting.
    /// Snapshots never queue: the writer keeps only the newest unsaved one.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        PersistenceSettings {
            queue_capacity: default_queue_capacity(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockroomConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub persistence: PersistenceSettings,
}

impl StockroomConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stockroom.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading stockroom config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load stockroom config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Stockroom config saved");
        Ok(())
    }

    pub fn validate(&self) -> DbResult<()> {
        self.engine
            .validate()
            .map_err(|e| DbError::InvalidConfig(format!("engine: {}", e)))?;

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.persistence.queue_capacity == 0 {
            return Err(DbError::InvalidConfig(
                "queue_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `STOCKROOM_*` overrides read through `var`. Unparseable
    /// numbers are logged and ignored.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("STOCKROOM_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(rate) = var("STOCKROOM_VAT_RATE_BPS") {
            match rate.parse::<u32>() {
                Ok(bps) => self.engine.vat_rate_bps = bps,
                Err(_) => warn!(value = %rate, "Ignoring invalid STOCKROOM_VAT_RATE_BPS"),
            }
        }

        if let Some(currency) = var("STOCKROOM_CURRENCY") {
            self.engine.currency_code = currency;
        }

        if let Some(name) = var("STOCKROOM_GUEST_NAME") {
            self.engine.guest_customer_name = name;
        }

        if let Some(capacity) = var("STOCKROOM_QUEUE_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(n) => self.persistence.queue_capacity = n,
                Err(_) => warn!(value = %capacity, "Ignoring invalid STOCKROOM_QUEUE_CAPACITY"),
            }
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockroom", "stockroom")
            .map(|dirs| dirs.config_dir().join("stockroom.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use stockroom_core::LocationId;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("stockroom-config-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = StockroomConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.master_location, LocationId::new("Master"));
        assert_eq!(config.persistence.queue_capacity, 64);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: StockroomConfig = toml::from_str(
            r#"
            [engine]
            locations = ["Master", "Plouis"]
            vat_rate_bps = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.locations.len(), 2);
        assert_eq!(config.engine.vat_rate_bps, 1000);
        assert_eq!(config.engine.currency_code, "MUR");
        assert_eq!(config.database.max_connections, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = StockroomConfig::default();
        config.persistence.queue_capacity = 0;
        assert!(matches!(config.validate(), Err(DbError::InvalidConfig(_))));

        let mut config = StockroomConfig::default();
        config.engine.master_location = LocationId::new("Atlantis");
        assert!(matches!(config.validate(), Err(DbError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STOCKROOM_DB_PATH", "/srv/stock.db"),
            ("STOCKROOM_VAT_RATE_BPS", "1250"),
            ("STOCKROOM_GUEST_NAME", "Walk-in"),
            ("STOCKROOM_QUEUE_CAPACITY", "lots"),
        ]
        .into_iter()
        .collect();

        let mut config = StockroomConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/srv/stock.db")));
        assert_eq!(config.engine.vat_rate_bps, 1250);
        assert_eq!(config.engine.guest_customer_name, "Walk-in");
        assert_eq!(config.persistence.queue_capacity, 64);
        assert_eq!(config.engine.currency_code, "MUR");
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("stockroom.toml");
        let mut config = StockroomConfig::default();
        config.database.path = Some(PathBuf::from("/tmp/shops.db"));
        config.engine.default_min_quantity = 2;

        config.save(Some(path.clone())).unwrap();
        let loaded = StockroomConfig::load(Some(path.clone())).unwrap();

        // Environment may override fields on a developer machine
        assert_eq!(loaded.engine.default_min_quantity, 2);
        assert_eq!(loaded.engine.locations, config.engine.locations);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_bad_file_falls_back_to_defaults() {
        let path = temp_path("broken.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[engine\nlocations = 3").unwrap();

        assert!(StockroomConfig::load(Some(path.clone())).is_err());
        let config = StockroomConfig::load_or_default(Some(path.clone()));
        assert_eq!(config.engine.locations.len(), 8);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_resolved_path_prefers_configured() {
        let settings = DatabaseSettings {
            path: Some(PathBuf::from("here.db")),
            ..Default::default()
        };
        assert_eq!(settings.resolved_path(), PathBuf::from("here.db"));
        assert!(DatabaseSettings::default()
            .resolved_path()
            .ends_with("stockroom.db"));
    }
}
