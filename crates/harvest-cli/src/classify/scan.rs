//! Attachment scan
//!
//! Each attachment record goes through three steps:
//!
//! 1. records whose MIME type is on the skip-list are counted and dropped
//! 2. the record is tagged accessible or restricted from its object URL
//! 3. the filename is classified and the category bucket is updated
//!
//! The scan is consumed by [`AttachmentScan::finish`], so buckets cannot change once
//! the summary exists.

use crate::classify::rules::Classifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Spreadsheet MIME types excluded from classification (XLSX, XLS)
pub const DEFAULT_SKIP_MIMES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
];

/// Filenames kept per bucket
pub const SAMPLE_LIMIT: usize = 5;

/// Display name for records without a filename
pub const UNKNOWN_FILENAME: &str = "unknown";

/// Where a record's file lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    /// Directly downloadable store
    Accessible,
    /// Gated store; metadata only
    Restricted,
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLocation::Accessible => write!(f, "accessible"),
            StorageLocation::Restricted => write!(f, "restricted"),
        }
    }
}

/// Host fragment identifying the directly downloadable store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageMarker {
    fragment: String,
}

impl StorageMarker {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }

    pub fn locate(&self, url: &str) -> StorageLocation {
        if !self.fragment.is_empty() && url.contains(&self.fragment) {
            StorageLocation::Accessible
        } else {
            StorageLocation::Restricted
        }
    }
}

/// Fields pulled out of an attachment record by convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub id: String,
    /// `objectDetails.originalFileName`, falling back to `objectDetails.fileName`
    pub filename: Option<String>,
    /// `objectDetails.fileName`, the key inside the store
    pub storage_key: String,
    pub size: u64,
    /// Lowercased `objectDetails.mimeType`
    pub mime: String,
    pub url: String,
}

impl AttachmentRecord {
    pub fn from_record(record: &Value) -> Self {
        let details = record.get("objectDetails").filter(|d| d.is_object());
        let detail_text = |key: &str| {
            details
                .and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let size = details
            .and_then(|d| d.get("size"))
            .and_then(|s| s.as_u64().or_else(|| s.as_f64().map(|f| f.max(0.0) as u64)))
            .unwrap_or(0);

        let id = match record.get("_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        Self {
            id,
            filename: detail_text("originalFileName").or_else(|| detail_text("fileName")),
            storage_key: detail_text("fileName").unwrap_or_default(),
            size,
            mime: detail_text("mimeType").unwrap_or_default().to_lowercase(),
            url: record
                .get("objectUrl")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// One line of the attachment metadata export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRow {
    pub id: String,
    pub filename: String,
    pub storage_key: String,
    pub size: u64,
    pub mime: String,
    pub category: String,
    pub storage: StorageLocation,
    pub url: String,
}

impl AttachmentRow {
    pub fn has_filename(&self) -> bool {
        !self.filename.is_empty() && self.filename != UNKNOWN_FILENAME
    }
}

/// Aggregate for one category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub count: u64,
    pub accessible: u64,
    pub restricted: u64,
    pub total_size_bytes: u64,
    pub samples: Vec<String>,
}

impl Bucket {
    fn add(&mut self, storage: StorageLocation, size: u64, filename: &str) {
        self.count += 1;
        match storage {
            StorageLocation::Accessible => self.accessible += 1,
            StorageLocation::Restricted => self.restricted += 1,
        }
        self.total_size_bytes += size;
        if self.samples.len() < SAMPLE_LIMIT {
            self.samples.push(filename.to_string());
        }
    }
}

/// What happened to one observed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// MIME type on the skip-list
    Skipped,
    Classified {
        category: String,
        storage: StorageLocation,
    },
}

/// Classification summary handed to the rendering stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub scan_date: String,
    pub total_files: u64,
    pub accessible_count: u64,
    pub restricted_count: u64,
    pub skipped_count: u64,
    pub categories: BTreeMap<String, Bucket>,
}

impl ScanSummary {
    /// Files in any category other than the catch-all
    pub fn sensitive_count(&self) -> u64 {
        self.categories
            .iter()
            .filter(|(name, _)| name.as_str() != crate::classify::CATCH_ALL)
            .map(|(_, bucket)| bucket.count)
            .sum()
    }

    /// Categories by descending file count, ties by name
    pub fn categories_by_count(&self) -> Vec<(&str, &Bucket)> {
        let mut ordered: Vec<(&str, &Bucket)> = self
            .categories
            .iter()
            .map(|(name, bucket)| (name.as_str(), bucket))
            .collect();
        ordered.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        ordered
    }
}

/// Final scan output
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub summary: ScanSummary,
    /// Classified records in arrival order
    pub rows: Vec<AttachmentRow>,
}

impl ScanReport {
    pub fn accessible_rows(&self) -> impl Iterator<Item = &AttachmentRow> {
        self.rows
            .iter()
            .filter(|row| row.storage == StorageLocation::Accessible)
    }
}

/// Accumulates buckets over a full pass of attachment records
pub struct AttachmentScan {
    classifier: Classifier,
    marker: StorageMarker,
    skip_mimes: BTreeSet<String>,
    buckets: BTreeMap<String, Bucket>,
    rows: Vec<AttachmentRow>,
    skipped: u64,
}

impl AttachmentScan {
    pub fn new(classifier: Classifier, marker: StorageMarker) -> Self {
        Self {
            classifier,
            marker,
            skip_mimes: DEFAULT_SKIP_MIMES.iter().map(|m| m.to_string()).collect(),
            buckets: BTreeMap::new(),
            rows: Vec::new(),
            skipped: 0,
        }
    }

    /// Replace the MIME skip-list
    pub fn with_skip_mimes<I, M>(mut self, mimes: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        self.skip_mimes = mimes
            .into_iter()
            .map(|m| m.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    pub fn observe(&mut self, record: &Value) -> Disposition {
        let attachment = AttachmentRecord::from_record(record);

        if self.skip_mimes.contains(&attachment.mime) {
            self.skipped += 1;
            return Disposition::Skipped;
        }

        let storage = self.marker.locate(&attachment.url);
        let category = self
            .classifier
            .classify(attachment.filename.as_deref())
            .to_string();
        let filename = attachment
            .filename
            .unwrap_or_else(|| UNKNOWN_FILENAME.to_string());

        self.buckets
            .entry(category.clone())
            .or_default()
            .add(storage, attachment.size, &filename);

        self.rows.push(AttachmentRow {
            id: attachment.id,
            filename,
            storage_key: attachment.storage_key,
            size: attachment.size,
            mime: attachment.mime,
            category: category.clone(),
            storage,
            url: attachment.url,
        });

        Disposition::Classified { category, storage }
    }

    pub fn observe_all<'a>(&mut self, records: impl IntoIterator<Item = &'a Value>) {
        for record in records {
            self.observe(record);
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn finish(self, scan_date: DateTime<Utc>) -> ScanReport {
        let accessible_count = self
            .rows
            .iter()
            .filter(|r| r.storage == StorageLocation::Accessible)
            .count() as u64;
        let total_files = self.rows.len() as u64;

        ScanReport {
            summary: ScanSummary {
                scan_date: scan_date.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                total_files,
                accessible_count,
                restricted_count: total_files - accessible_count,
                skipped_count: self.skipped,
                categories: self.buckets,
            },
            rows: self.rows,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const MARKER: &str = "dev-bucket";

    fn attachment(id: &str, name: Option<&str>, mime: &str, size: u64, host: &str) -> Value {
        let mut details = json!({"mimeType": mime, "size": size, "fileName": format!("{}.bin", id)});
        if let Some(name) = name {
            details["originalFileName"] = json!(name);
        }
        json!({
            "_id": id,
            "objectUrl": format!("https://{}/files/{}", host, id),
            "objectDetails": details,
        })
    }

    fn scan() -> AttachmentScan {
        AttachmentScan::new(Classifier::default(), StorageMarker::new(MARKER))
    }

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_storage_marker() {
        let marker = StorageMarker::new(MARKER);
        assert_eq!(
            marker.locate("https://dev-bucket.s3.amazonaws.com/a.pdf"),
            StorageLocation::Accessible
        );
        assert_eq!(marker.locate("https://cdn.example.com/a.pdf"), StorageLocation::Restricted);
        assert_eq!(StorageMarker::new("").locate("anything"), StorageLocation::Restricted);
    }

    #[test]
    fn test_record_field_extraction() {
        let record = json!({
            "_id": "abc123",
            "objectUrl": "https://cdn.example.com/k",
            "objectDetails": {"fileName": "k.pdf", "size": 2048.0, "mimeType": "Application/PDF"}
        });
        let parsed = AttachmentRecord::from_record(&record);
        assert_eq!(parsed.id, "abc123");
        assert_eq!(parsed.filename.as_deref(), Some("k.pdf"));
        assert_eq!(parsed.storage_key, "k.pdf");
        assert_eq!(parsed.size, 2048);
        assert_eq!(parsed.mime, "application/pdf");
    }

    #[test]
    fn test_null_details_tolerated() {
        let parsed = AttachmentRecord::from_record(&json!({"_id": 7, "objectDetails": null}));
        assert_eq!(parsed.id, "7");
        assert_eq!(parsed.filename, None);
        assert_eq!(parsed.size, 0);
        assert_eq!(parsed.url, "");
    }

    #[test]
    fn test_excel_is_skipped_regardless_of_name() {
        let mut scan = scan();
        let disposition = scan.observe(&attachment(
            "x1",
            Some("Aadhaar list.xls"),
            "application/vnd.ms-excel",
            9_000,
            MARKER,
        ));

        assert_eq!(disposition, Disposition::Skipped);
        let report = scan.finish(date());
        assert_eq!(report.summary.skipped_count, 1);
        assert_eq!(report.summary.total_files, 0);
        assert!(report.summary.categories.is_empty());
        assert!(report.rows.is_empty());
    }

    #[test]
    fn test_buckets_accumulate() {
        let mut scan = scan();
        scan.observe_all(&[
            attachment("a", Some("Report_ECG_2024.pdf"), "application/pdf", 100, MARKER),
            attachment("b", Some("mri scan.png"), "image/png", 250, "cdn.example.com"),
            attachment("c", Some("IMG_01.jpg"), "image/jpeg", 10, MARKER),
        ]);

        let report = scan.finish(date());
        let summary = &report.summary;

        assert_eq!(summary.scan_date, "2026-03-01T12:00:00Z");
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.accessible_count, 2);
        assert_eq!(summary.restricted_count, 1);

        let reports = &summary.categories["medical_report"];
        assert_eq!(reports.count, 2);
        assert_eq!(reports.accessible, 1);
        assert_eq!(reports.restricted, 1);
        assert_eq!(reports.total_size_bytes, 350);
        assert_eq!(reports.samples, vec!["Report_ECG_2024.pdf", "mri scan.png"]);
        assert_eq!(summary.categories["other"].count, 1);
        assert_eq!(summary.sensitive_count(), 2);
    }

    #[test]
    fn test_samples_capped() {
        let mut scan = scan();
        for i in 0..8 {
            let name = format!("passport_{}.jpg", i);
            scan.observe(&attachment(&format!("p{}", i), Some(name.as_str()), "image/jpeg", 1, MARKER));
        }

        let report = scan.finish(date());
        let bucket = &report.summary.categories["passport"];
        assert_eq!(bucket.count, 8);
        assert_eq!(bucket.samples.len(), SAMPLE_LIMIT);
        assert_eq!(bucket.samples[0], "passport_0.jpg");
    }

    #[test]
    fn test_missing_filename_is_other_and_unknown() {
        let mut scan = scan();
        let record = json!({"_id": "z", "objectUrl": "https://dev-bucket/x", "objectDetails": {"mimeType": "image/png"}});

        let disposition = scan.observe(&record);

        assert_eq!(
            disposition,
            Disposition::Classified {
                category: "other".to_string(),
                storage: StorageLocation::Accessible
            }
        );
        let report = scan.finish(date());
        assert_eq!(report.rows[0].filename, UNKNOWN_FILENAME);
        assert!(!report.rows[0].has_filename());
    }

    #[test]
    fn test_custom_skip_list() {
        let mut scan = scan().with_skip_mimes(["Image/PNG"]);
        scan.observe(&attachment("a", Some("x.png"), "image/png", 1, MARKER));
        scan.observe(&attachment("b", Some("y.xls"), "application/vnd.ms-excel", 1, MARKER));

        assert_eq!(scan.skipped(), 1);
        assert_eq!(scan.finish(date()).rows[0].id, "b");
    }

    #[test]
    fn test_rows_keep_arrival_order_and_accessible_filter() {
        let mut scan = scan();
        scan.observe(&attachment("r1", Some("a.pdf"), "application/pdf", 1, "cdn.example.com"));
        scan.observe(&attachment("r2", Some("b.pdf"), "application/pdf", 1, MARKER));
        scan.observe(&attachment("r3", Some("c.pdf"), "application/pdf", 1, MARKER));

        let report = scan.finish(date());
        let ids: Vec<&str> = report.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
        let accessible: Vec<&str> = report.accessible_rows().map(|r| r.id.as_str()).collect();
        assert_eq!(accessible, vec!["r2", "r3"]);
    }

    #[test]
    fn test_categories_by_count() {
        let mut scan = scan();
        scan.observe(&attachment("a", Some("invoice 1.pdf"), "application/pdf", 1, MARKER));
        scan.observe(&attachment("b", Some("passport.pdf"), "application/pdf", 1, MARKER));
        scan.observe(&attachment("c", Some("passport 2.pdf"), "application/pdf", 1, MARKER));

        let report = scan.finish(date());
        let order: Vec<&str> = report
            .summary
            .categories_by_count()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(order, vec!["passport", "invoice"]);
    }
}
