//! # Config Loader
//!
//! Loads the run configuration of the parking syncer.
//!
//! Responsibilities:
//! - Expand `${NAME}` environment references so secrets stay out of the file
//! - Parse TOML/JSON into a `SyncBlueprint`
//! - Structural validation (URLs, positive tuning values, tenant path)
//! - Credential checks, run separately once CLI/env overrides are applied
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("Organism: {}", blueprint.sensor_api.organism);
//! ```

mod parser;
mod validator;

pub use contracts::SyncBlueprint;
pub use parser::{interpolate, ConfigFormat};
pub use validator::validate_credentials;

use contracts::SyncError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<SyncBlueprint, SyncError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// Credentials are not checked here; see [`validate_credentials`].
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<SyncBlueprint, SyncError> {
        Self::parse_and_validate(content, format)
    }

    /// Re-run structural validation, e.g. after CLI overrides
    pub fn validate(blueprint: &SyncBlueprint) -> Result<(), SyncError> {
        validator::validate(blueprint)
    }

    /// Serialize SyncBlueprint to TOML string
    pub fn to_toml(blueprint: &SyncBlueprint) -> Result<String, SyncError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| SyncError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize SyncBlueprint to JSON string
    pub fn to_json(blueprint: &SyncBlueprint) -> Result<String, SyncError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| SyncError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, SyncError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            SyncError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| SyncError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, SyncError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<SyncBlueprint, SyncError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}
