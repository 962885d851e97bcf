//! Keyword rules
//!
//! Rules are evaluated in declaration order and the first rule with any matching
//! keyword wins. Matching is case-insensitive substring containment with no word
//! boundaries, so `"rx "` also matches inside `"marx notes"`.

use serde::{Deserialize, Serialize};

/// Category for filenames no rule matches, and for records without a filename
pub const CATCH_ALL: &str = "other";

/// One `(category, keywords)` rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    /// Lowercase keywords
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            category: category.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// `lowered` must already be lowercase
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// The built-in rule list. Order matters: earlier rules win.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("aadhaar", &["aadhar", "aadhaar", "eaadhaar"]),
        CategoryRule::new("pan_card", &["pan card", "pan_card", "pancard"]),
        CategoryRule::new("passport", &["passport"]),
        CategoryRule::new("prescription", &["prescription", "rx ", "rx.", "rx_"]),
        CategoryRule::new(
            "medical_report",
            &[
                "report",
                "diagnosis",
                "lab_report",
                "blood test",
                "ecg",
                "mri",
                "xray",
                "x-ray",
                "ct_scan",
                "discharge",
            ],
        ),
        CategoryRule::new(
            "medical_doc",
            &["doctor", "medical", "health", "patient", "hospital", "consult"],
        ),
        CategoryRule::new("invoice", &["invoice", "order-"]),
        CategoryRule::new("license", &["fssai", "license", "licence", "gst"]),
        CategoryRule::new("resume", &["resume", "cv ", "cv.", "cv_"]),
        CategoryRule::new(
            "scanned_doc",
            &["scan", "adobe scan", "docscanner", "camscanner"],
        ),
    ]
}

/// Ordered rule evaluator
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
}

impl Classifier {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Category for a display filename; missing or empty names are [`CATCH_ALL`]
    pub fn classify(&self, filename: Option<&str>) -> &str {
        let Some(name) = filename.filter(|n| !n.is_empty()) else {
            return CATCH_ALL;
        };
        let lowered = name.to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.category.as_str())
            .unwrap_or(CATCH_ALL)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_order_is_pinned() {
        let rules = default_rules();
        let order: Vec<&str> = rules.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "aadhaar",
                "pan_card",
                "passport",
                "prescription",
                "medical_report",
                "medical_doc",
                "invoice",
                "license",
                "resume",
                "scanned_doc",
            ]
        );
    }

    #[test]
    fn test_report_ecg_is_medical_report() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify(Some("Report_ECG_2024.pdf")), "medical_report");
    }

    #[test]
    fn test_earlier_rule_wins_ties() {
        let classifier = Classifier::default();
        // "invoice" and "report" both match; medical_report is declared first
        assert_eq!(classifier.classify(Some("invoice_report.pdf")), "medical_report");
        // "passport" precedes "scan"
        assert_eq!(classifier.classify(Some("CamScanner passport.jpg")), "passport");
    }

    #[test]
    fn test_custom_order_changes_winner() {
        let classifier = Classifier::new(vec![
            CategoryRule::new("invoice", &["invoice"]),
            CategoryRule::new("medical_report", &["report"]),
        ]);
        assert_eq!(classifier.classify(Some("invoice_report.pdf")), "invoice");
    }

    #[test]
    fn test_case_insensitive() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify(Some("E-AADHAAR.PDF")), "aadhaar");
        assert_eq!(classifier.classify(Some("My PAN Card.png")), "pan_card");
        assert_eq!(classifier.classify(Some("Order-1182.pdf")), "invoice");
    }

    #[test]
    fn test_missing_or_unmatched_is_other() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify(None), CATCH_ALL);
        assert_eq!(classifier.classify(Some("")), CATCH_ALL);
        assert_eq!(classifier.classify(Some("IMG_2041.jpg")), CATCH_ALL);
    }

    #[test]
    fn test_deterministic() {
        let classifier = Classifier::default();
        let first = classifier.classify(Some("blood test results.pdf")).to_string();
        for _ in 0..10 {
            assert_eq!(classifier.classify(Some("blood test results.pdf")), first);
        }
    }

    #[test]
    fn test_keywords_match_without_word_boundaries() {
        // Incidental substring hits are kept as-is: "marx notes" contains "rx ".
        let classifier = Classifier::default();
        assert_eq!(classifier.classify(Some("Marx notes.pdf")), "prescription");
        assert_eq!(classifier.classify(Some("rx.jpg")), "prescription");
        assert_eq!(classifier.classify(Some("rxjpg")), CATCH_ALL);
    }
}
