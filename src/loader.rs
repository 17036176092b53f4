//! Delivery CSV ingestion
//!
//! Reads the dispatch export, maps its column codes onto [`DeliveryRecord`]
//! and parses the delivery date. A load either yields the whole table or an
//! error; a partially read file is never handed to the pipeline.

use crate::models::{CsvRecord, DeliveryRecord};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Error type for delivery loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("File not found: {path}: {source}")]
    FileNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read CSV header in {path}: {message}")]
    Header { path: PathBuf, message: String },

    #[error("Malformed row {line} in {path}: {message}")]
    Row {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("Invalid delivery date {value:?} on row {line} in {path}")]
    InvalidDate {
        path: PathBuf,
        line: u64,
        value: String,
    },
}

/// Load every delivery record from `path`.
pub fn load_deliveries(path: &Path) -> Result<Vec<DeliveryRecord>, LoadError> {
    info!("Reading deliveries from {:?}", path);

    let file = File::open(path).map_err(|source| LoadError::FileNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(BufReader::new(file));

    reader.headers().map_err(|e| LoadError::Header {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<CsvRecord>().enumerate() {
        // header occupies line 1
        let line = i as u64 + 2;
        let raw = row.map_err(|e| LoadError::Row {
            path: path.to_path_buf(),
            line: e.position().map(|p| p.line()).unwrap_or(line),
            message: e.to_string(),
        })?;

        let value = raw.delivery_date.clone();
        let record = raw.to_delivery().ok_or_else(|| LoadError::InvalidDate {
            path: path.to_path_buf(),
            line,
            value,
        })?;
        records.push(record);
    }

    info!("Parsed {} delivery records", records.len());
    Ok(records)
}
