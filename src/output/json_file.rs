//! Timestamped JSON output files
//!
//! Every file of a run shares one timestamp and carries the same header
//! fields, so files from the same run sort together and can be matched up.

use crate::HarvestError;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes the JSON documents of one run into an output directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    directory: PathBuf,
    timestamp: DateTime<Local>,
    order_count: u32,
    total_files: usize,
}

impl JsonFileSink {
    pub fn new(
        directory: impl Into<PathBuf>,
        timestamp: DateTime<Local>,
        order_count: u32,
        total_files: usize,
    ) -> Self {
        Self {
            directory: directory.into(),
            timestamp,
            order_count,
            total_files,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name for the `file_number`-th document of this run
    pub fn file_name(&self, file_number: usize, data_type: &str) -> String {
        format!(
            "{}__orderData__{}-of-{}__{}__orderCount-{}.json",
            self.timestamp.format("%Y-%m-%d__%H-%M-%S"),
            file_number,
            self.total_files,
            data_type,
            self.order_count
        )
    }

    /// Builds the document written for `data`
    pub fn document<T: Serialize>(&self, data_type: &str, data: &T) -> Result<Value, HarvestError> {
        let mut document = json!({
            "_createdTimestamp": self.timestamp.timestamp_millis(),
            "_params": {"orderCount": self.order_count},
        });
        document[data_type] = serde_json::to_value(data)?;
        Ok(document)
    }

    /// Writes a pretty-printed document and returns its path
    ///
    /// The output directory is created if it does not exist.
    pub fn write<T: Serialize>(
        &self,
        file_number: usize,
        data_type: &str,
        data: &T,
    ) -> Result<PathBuf, HarvestError> {
        fs::create_dir_all(&self.directory)?;

        let path = self.directory.join(self.file_name(file_number, data_type));
        let document = self.document(data_type, data)?;

        tracing::info!("Writing to JSON file: {}", path.display());
        fs::write(&path, serde_json::to_string_pretty(&document)?)?;

        Ok(path)
    }
}
