//! Attachment classification
//!
//! - [`rules`]: ordered keyword rules mapping a filename to a category
//! - [`scan`]: per-record storage tagging, MIME skip-list and bucket aggregation

pub mod rules;
pub mod scan;

pub use rules::{default_rules, CategoryRule, Classifier, CATCH_ALL};
pub use scan::{
    AttachmentRecord, AttachmentRow, AttachmentScan, Bucket, Disposition, ScanReport, ScanSummary,
    StorageLocation, StorageMarker, DEFAULT_SKIP_MIMES, SAMPLE_LIMIT, UNKNOWN_FILENAME,
};
