//! Configuration management

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::DuplicatePolicy;

// Content hashes the message and address book stores are filed under inside
// a device backup.
const MESSAGE_STORE: &str = "3d0d7e5fb2ce288813306e4d4636395e047a3d28";
const ADDRESS_STORE: &str = "31bb7ba8914766d4ba40d6dfb6113c8b614be442";

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backup store locations
    pub backup: BackupConfig,
    /// Merge pipeline behavior
    pub merge: MergeConfig,
    /// Logging behavior
    pub logging: LoggingConfig,
}

/// Where the backup's sqlite stores live. The caller supplies the paths;
/// locating backups on a machine is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Path to the message store
    pub message_db: String,
    /// Path to the address book store
    pub address_db: String,
}

/// Merge pipeline options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Identifier of the backup owner
    pub owner: String,
    /// Contact index duplicate policy name (keep-first, keep-last, reject)
    pub duplicate_policy: String,
}

/// Logging options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Console format, "text" or "json"
    pub format: String,
    /// Optional log file location
    #[serde(default)]
    pub file_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backup: BackupConfig {
                message_db: format!("backup/{MESSAGE_STORE}"),
                address_db: format!("backup/{ADDRESS_STORE}"),
            },
            merge: MergeConfig {
                owner: "me".to_string(),
                duplicate_policy: DuplicatePolicy::default().name().to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                file_path: None,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let config = Config::builder()
            // Start with default values
            .set_default("backup.message_db", defaults.backup.message_db)?
            .set_default("backup.address_db", defaults.backup.address_db)?
            .set_default("merge.owner", defaults.merge.owner)?
            .set_default("merge.duplicate_policy", defaults.merge.duplicate_policy)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("MSG_MERGE").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {e}"))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        self.merge.duplicate_policy.parse::<DuplicatePolicy>()?;

        if self.merge.owner.trim().is_empty() {
            return Err(anyhow::anyhow!("owner identifier must not be empty"));
        }

        if self.backup.message_db.trim().is_empty() || self.backup.address_db.trim().is_empty() {
            return Err(anyhow::anyhow!("backup store paths must not be empty"));
        }

        Ok(())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// The configured duplicate policy, parsed.
    pub fn duplicate_policy(&self) -> Result<DuplicatePolicy> {
        Ok(self.merge.duplicate_policy.parse()?)
    }
}
