//! Loading [`DataSourceInput`] from configuration files.
//!
//! A configuration file holds the same keys as [`DataSourceInput`]; keys it
//! leaves out fall back to the `DB_*` environment when the input is resolved.
//!
//! ```toml
//! db_type = "postgres"
//! host = "db.internal"
//! database = "shop"
//! logs = true
//! ```

use std::path::Path;

use crate::error::{HysteriaError, HysteriaResult};
use crate::settings::{DataSourceInput, DataSourceSettings};

/// Parses a TOML document into a [`DataSourceInput`].
pub fn from_toml_str(toml_str: &str) -> HysteriaResult<DataSourceInput> {
    toml::from_str(toml_str)
        .map_err(|e| HysteriaError::Configuration(format!("Failed to parse TOML: {e}")))
}

/// Reads and parses a TOML file into a [`DataSourceInput`].
pub fn from_toml_file(path: impl AsRef<Path>) -> HysteriaResult<DataSourceInput> {
    from_toml_str(&read(path.as_ref())?)
}

/// Parses a JSON document into a [`DataSourceInput`].
pub fn from_json_str(json_str: &str) -> HysteriaResult<DataSourceInput> {
    serde_json::from_str(json_str)
        .map_err(|e| HysteriaError::Configuration(format!("Failed to parse JSON: {e}")))
}

/// Reads and parses a JSON file into a [`DataSourceInput`].
pub fn from_json_file(path: impl AsRef<Path>) -> HysteriaResult<DataSourceInput> {
    from_json_str(&read(path.as_ref())?)
}

/// Loads a TOML file and resolves it over the process environment.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> HysteriaResult<DataSourceSettings> {
    DataSourceSettings::resolve(from_toml_file(path)?)
}

fn read(path: &Path) -> HysteriaResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        HysteriaError::Configuration(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })
}
