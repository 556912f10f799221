//! Record loading service
//!
//! Reads record documents (JSON or TOML) and hands them to the tree builder.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::TreeBuilder;
use crate::infrastructure::traits::FileSystem;

/// On-disk format of a record document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Top-level array, or an object with a `records` array
    Json,
    /// `[[records]]` array of tables
    Toml,
}

impl RecordFormat {
    /// Pick the format from the file extension; anything but `.toml` is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => RecordFormat::Toml,
            _ => RecordFormat::Json,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordDocument {
    List(Vec<Value>),
    Table { records: Vec<Value> },
}

impl RecordDocument {
    fn into_records(self) -> Vec<Value> {
        match self {
            RecordDocument::List(records) | RecordDocument::Table { records } => records,
        }
    }
}

/// Service for loading records and preparing tree builders.
pub struct RecordService {
    fs: Arc<dyn FileSystem>,
}

impl RecordService {
    /// Create a new record service.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Parse a record document already held in memory.
    pub fn parse(content: &str, format: RecordFormat, path: &Path) -> ApplicationResult<Vec<Value>> {
        let document: RecordDocument = match format {
            RecordFormat::Json => serde_json::from_str(content).map_err(|e| ApplicationError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            RecordFormat::Toml => toml::from_str(content).map_err(|e| ApplicationError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
        };
        Ok(document.into_records())
    }

    /// Load the records of a JSON or TOML file, in file order.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<Vec<Value>> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::FileNotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read records", path)?;
        let records = Self::parse(&content, RecordFormat::from_path(path), path)?;
        debug!("load: {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Load records and wrap them in a builder configured by `settings`.
    pub fn builder(&self, path: &Path, settings: &Settings) -> ApplicationResult<TreeBuilder<Value>> {
        let records = self.load(path)?;
        let fields = settings.link_fields();
        if settings.strict {
            Ok(TreeBuilder::strict(records, fields)?)
        } else {
            Ok(TreeBuilder::with_fields(records, fields))
        }
    }
}
