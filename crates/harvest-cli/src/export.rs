//! Export sink
//!
//! Writes the artifacts a rendering stage loads without re-fetching:
//!
//! - dataset manifest (`{"total", "fetched", "timestamp", "data"}`)
//! - flattened CSV, identifier column first, other columns sorted
//! - classification summary JSON
//! - attachment metadata CSV
//!
//! Each writer overwrites one path. Output is deterministic for the same input.

use crate::classify::{AttachmentRow, ScanSummary};
use crate::collect::Collection;
use crate::error::Result;
use chrono::{DateTime, Utc};
use harvest_common::record::{cell_text, column_order, flatten};
use harvest_common::Record;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Identifier column used when none is given
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Dataset manifest for one endpoint
#[derive(Debug, Serialize)]
pub struct DatasetManifest<'a> {
    pub total: u64,
    pub fetched: u64,
    pub timestamp: String,
    pub data: &'a [Record],
}

impl<'a> DatasetManifest<'a> {
    pub fn new(collection: &'a Collection, fetched_at: DateTime<Utc>) -> Self {
        Self {
            total: collection.total,
            fetched: collection.fetched(),
            timestamp: fetched_at.to_rfc3339(),
            data: &collection.records,
        }
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write the dataset manifest as compact JSON
pub fn write_manifest(path: &Path, manifest: &DatasetManifest<'_>) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer(&mut writer, manifest)?;
    writer.flush()?;
    debug!(path = %path.display(), records = manifest.data.len(), "Manifest written");
    Ok(())
}

/// Write records as a flat CSV; returns the number of data rows
///
/// Columns are the union of every record's flattened keys. Missing values are empty.
pub fn write_flat_csv(path: &Path, records: &[Record], id_field: &str) -> Result<usize> {
    let flat: Vec<BTreeMap<String, serde_json::Value>> = records.iter().map(flatten).collect();
    let keys: BTreeSet<&String> = flat.iter().flat_map(|row| row.keys()).collect();
    let columns = column_order(keys, id_field);

    let mut file = create(path)?;
    if columns.is_empty() {
        file.flush()?;
        return Ok(0);
    }

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&columns)?;
    for row in &flat {
        writer.write_record(
            columns
                .iter()
                .map(|column| row.get(column).map(cell_text).unwrap_or_default()),
        )?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = flat.len(), columns = columns.len(), "CSV written");
    Ok(flat.len())
}

/// Write the classification summary as pretty JSON
pub fn write_summary(path: &Path, summary: &ScanSummary) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.flush()?;
    Ok(())
}

/// Write the attachment metadata CSV; returns the number of rows
pub fn write_attachment_rows(path: &Path, rows: &[AttachmentRow]) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    if rows.is_empty() {
        writer.write_record([
            "id",
            "filename",
            "storage_key",
            "size",
            "mime",
            "category",
            "storage",
            "url",
        ])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}
