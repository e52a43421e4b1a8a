//! Decides whether a document belongs to the configured user.

use crate::models::{FileRecord, OwnershipConfidence};
use crate::patterns::{collapse_whitespace, compact, NameVariant, PatternSet};
use serde::{Deserialize, Serialize};

/// How an `Unknown` verdict collapses into `is_user_document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOwnership {
    #[default]
    NotOwned,
    Owned,
}

impl UnknownOwnership {
    pub fn resolve(self, confidence: OwnershipConfidence) -> bool {
        match confidence {
            OwnershipConfidence::KnownTrue => true,
            OwnershipConfidence::KnownFalse => false,
            OwnershipConfidence::Unknown => self == UnknownOwnership::Owned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipVerdict {
    pub confidence: OwnershipConfidence,
    pub basis: &'static str,
}

impl OwnershipVerdict {
    fn new(confidence: OwnershipConfidence, basis: &'static str) -> Self {
        Self { confidence, basis }
    }
}

/// Pure function of the file name, the content head and the name tables.
///
/// Precedence: user name in the file name, another person's name in the
/// content, user name in the content. Empty content with a silent file name
/// yields `Unknown`.
pub fn detect_ownership(
    record: &FileRecord,
    content: &str,
    patterns: &PatternSet,
) -> OwnershipVerdict {
    let file_name = if record.name.is_empty() {
        record.path.as_str()
    } else {
        record.name.as_str()
    };
    if filename_matches(file_name, &patterns.name_variants) {
        return OwnershipVerdict::new(OwnershipConfidence::KnownTrue, "name in filename");
    }

    if content.trim().is_empty() {
        return OwnershipVerdict::new(
            OwnershipConfidence::Unknown,
            "no content, generic filename",
        );
    }

    let head = content_head(content, patterns.content_scan_chars);
    if content_matches(&head, &patterns.other_person_names) {
        return OwnershipVerdict::new(
            OwnershipConfidence::KnownFalse,
            "another person's name in content",
        );
    }
    if content_matches(&head, &patterns.name_variants) {
        return OwnershipVerdict::new(OwnershipConfidence::KnownTrue, "name in content");
    }
    OwnershipVerdict::new(OwnershipConfidence::KnownFalse, "name not found")
}

fn filename_matches(file_name: &str, variants: &[NameVariant]) -> bool {
    let name = compact(file_name);
    variants.iter().any(|v| name.contains(&v.compact))
}

fn content_matches(head: &str, variants: &[NameVariant]) -> bool {
    variants.iter().any(|v| head.contains(&v.spaced))
}

/// First `limit` characters, lower-cased with whitespace runs collapsed.
fn content_head(content: &str, limit: usize) -> String {
    let head: String = content.chars().take(limit).collect();
    collapse_whitespace(&head.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternConfig;

    fn patterns() -> PatternSet {
        let mut cfg = PatternConfig::default_english();
        cfg.name_variants = vec!["Jane Doe".into(), "Doe, Jane".into()];
        cfg.other_person_names = vec!["John Smith".into()];
        cfg.content_scan_chars = 200;
        cfg.compile(None).unwrap()
    }

    #[test]
    fn filename_match_ignores_separators_and_case() {
        let p = patterns();
        for name in [
            "Resume_JaneDoe.pdf",
            "jane-doe cv.docx",
            "JANE DOE.txt",
            "Doe_Jane_2023.pdf",
        ] {
            let v = detect_ownership(&FileRecord::new(format!("/r/{name}")), "", &p);
            assert_eq!(v.confidence, OwnershipConfidence::KnownTrue, "{name}");
        }
    }

    #[test]
    fn generic_filename_defers_to_content() {
        let p = patterns();
        let record = FileRecord::new("/r/resume.pdf");
        let v = detect_ownership(&record, "JANE\n  DOE\nSenior Engineer", &p);
        assert_eq!(v.confidence, OwnershipConfidence::KnownTrue);
        assert_eq!(v.basis, "name in content");

        let v = detect_ownership(&record, "Alex Roe\nSenior Engineer", &p);
        assert_eq!(v.confidence, OwnershipConfidence::KnownFalse);
    }

    #[test]
    fn empty_content_with_generic_filename_is_unknown() {
        let p = patterns();
        let v = detect_ownership(&FileRecord::new("/r/resume.pdf"), "  \n", &p);
        assert_eq!(v.confidence, OwnershipConfidence::Unknown);
        assert!(!UnknownOwnership::NotOwned.resolve(v.confidence));
        assert!(UnknownOwnership::Owned.resolve(v.confidence));
    }

    #[test]
    fn only_the_content_head_is_searched() {
        let p = patterns();
        let padding = "x ".repeat(150);
        let content = format!("{padding} Jane Doe");
        let v = detect_ownership(&FileRecord::new("/r/cv.txt"), &content, &p);
        assert_eq!(v.confidence, OwnershipConfidence::KnownFalse);
    }

    #[test]
    fn other_person_beats_user_mention_in_content() {
        let p = patterns();
        let content = "John Smith\nReferences: Jane Doe";
        let v = detect_ownership(&FileRecord::new("/r/cv.pdf"), content, &p);
        assert_eq!(v.confidence, OwnershipConfidence::KnownFalse);

        let owned = detect_ownership(&FileRecord::new("/r/JaneDoe_cv.pdf"), content, &p);
        assert_eq!(owned.confidence, OwnershipConfidence::KnownTrue);
    }
}
