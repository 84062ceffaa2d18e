//! Engine configuration via `kifudb.toml`
//!
//! Every tunable of the facade lives in one flat config file. Missing keys
//! fall back to their defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use kifudb_core::{Error, Result};
use kifudb_storage::{BatchOptions, DEFAULT_PARALLELISM};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "kifudb.toml";

/// Engine configuration loaded from `kifudb.toml`.
///
/// # Example
///
/// ```toml
/// parallelism = 2
/// batch_write_unit = 25
/// batch_get_unit = 100
/// updated_index = "recent"
/// search_channel_capacity = 16
/// # query_page_size = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KifuDbConfig {
    /// Concurrent store calls per batch or fan-out operation
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Entries per batch write/delete call
    #[serde(default = "default_batch_write_unit")]
    pub batch_write_unit: usize,
    /// Keys per batch get call
    #[serde(default = "default_batch_get_unit")]
    pub batch_get_unit: usize,
    /// Page size requested from partition queries; store default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_page_size: Option<usize>,
    /// Secondary index ordering headers by last write
    #[serde(default = "default_updated_index")]
    pub updated_index: String,
    /// Capacity of the scanner-to-fetcher channel of each search branch
    #[serde(default = "default_search_channel_capacity")]
    pub search_channel_capacity: usize,
}

fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

fn default_batch_write_unit() -> usize {
    25
}

fn default_batch_get_unit() -> usize {
    100
}

fn default_updated_index() -> String {
    "recent".to_string()
}

fn default_search_channel_capacity() -> usize {
    16
}

impl Default for KifuDbConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            batch_write_unit: default_batch_write_unit(),
            batch_get_unit: default_batch_get_unit(),
            query_page_size: None,
            updated_index: default_updated_index(),
            search_channel_capacity: default_search_channel_capacity(),
        }
    }
}

impl KifuDbConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set entries per batch write/delete call
    pub fn with_batch_write_unit(mut self, unit: usize) -> Self {
        self.batch_write_unit = unit;
        self
    }

    /// Set keys per batch get call
    pub fn with_batch_get_unit(mut self, unit: usize) -> Self {
        self.batch_get_unit = unit;
        self
    }

    /// Set the partition query page size
    pub fn with_query_page_size(mut self, page_size: usize) -> Self {
        self.query_page_size = Some(page_size);
        self
    }

    /// Set the recency index name
    pub fn with_updated_index(mut self, index: impl Into<String>) -> Self {
        self.updated_index = index.into();
        self
    }

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if a count is zero or the index name is empty.
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("parallelism", self.parallelism),
            ("batch_write_unit", self.batch_write_unit),
            ("batch_get_unit", self.batch_get_unit),
            ("search_channel_capacity", self.search_channel_capacity),
            ("query_page_size", self.query_page_size.unwrap_or(1)),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(Error::validation(format!("{} must be at least 1", name)));
            }
        }
        if self.updated_index.is_empty() {
            return Err(Error::validation("updated_index is empty"));
        }
        Ok(())
    }

    /// Options for batch writes and deletes
    pub fn write_options(&self) -> BatchOptions {
        BatchOptions::new(self.parallelism, self.batch_write_unit)
    }

    /// Options for batch gets
    pub fn get_options(&self) -> BatchOptions {
        BatchOptions::new(self.parallelism, self.batch_get_unit)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# kifudb configuration

# Concurrent store calls per batch or search fan-out (default: 2)
parallelism = 2

# Entries per batch write/delete call (default: 25)
batch_write_unit = 25

# Keys per batch get call (default: 100)
batch_get_unit = 100

# Secondary index ordering record headers by last write (default: "recent")
updated_index = "recent"

# Buffered matches between the scanner and fetcher of a search branch
search_channel_capacity = 16

# Page size for partition queries; the store default applies when unset
# query_page_size = 100
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::internal(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: KifuDbConfig = toml::from_str(&content).map_err(|e| {
            Error::validation(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::internal(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::internal(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
