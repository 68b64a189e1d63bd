//! Append-only CSV log of generated insights.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{Error, Result};
use crate::types::InsightRecord;

pub const HEADER: [&str; 3] = ["timestamp", "query", "insight"];
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct InsightLog {
    path: PathBuf,
}

impl InsightLog {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    /// Append one row stamped with the local time.
    pub fn append(&self, query: &str, insight: &str) -> Result<InsightRecord> {
        let record = InsightRecord {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            query: query.to_string(),
            insight: insight.to_string(),
        };
        self.append_record(&record)?;
        Ok(record)
    }

    /// Append `record`, writing the header first when the log does not exist yet.
    pub fn append_record(&self, record: &InsightRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let is_new = !self.path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let csv_err = |source| Error::Csv { path: self.path.clone(), source };
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(HEADER).map_err(csv_err)?;
        }
        writer
            .write_record([record.timestamp.as_str(), record.query.as_str(), record.insight.as_str()])
            .map_err(csv_err)?;
        writer.flush()?;
        Ok(())
    }

    /// Every logged row, oldest first. A missing log reads as empty.
    pub fn read_all(&self) -> Result<Vec<InsightRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let csv_err = |source| Error::Csv { path: self.path.clone(), source };
        let mut reader = csv::Reader::from_path(&self.path).map_err(csv_err)?;
        reader.deserialize().collect::<std::result::Result<Vec<InsightRecord>, _>>().map_err(csv_err)
    }
}
