//! Document type classification.
//!
//! Signals are computed once per document, then an ordered rule table is
//! evaluated; the first rule whose predicate holds decides the category.

use crate::models::{Category, Extension, FileRecord};
use crate::patterns::{count_matches, PatternSet, WordCountThresholds};

pub const EXTRACTION_FAILED: &str = "extraction_failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    pub extension: Extension,
    pub word_count: usize,
    pub jd_markers: usize,
    pub resume_headers: usize,
    pub cover_letter_phrases: usize,
    pub presentation_markers: usize,
}

impl Signals {
    pub fn collect(extension: Extension, content: &str, patterns: &PatternSet) -> Self {
        Self {
            extension,
            word_count: content.split_whitespace().count(),
            jd_markers: count_matches(&patterns.jd_markers, content),
            resume_headers: count_matches(&patterns.resume_section_headers, content),
            cover_letter_phrases: count_matches(&patterns.cover_letter_phrases, content),
            presentation_markers: count_matches(&patterns.presentation_markers, content),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "{} JD markers, {} resume headers, {} cover-letter phrases, wc={}",
            self.jd_markers, self.resume_headers, self.cover_letter_phrases, self.word_count
        )
    }
}

struct CategoryRule {
    name: &'static str,
    category: Category,
    applies: fn(&Signals, &WordCountThresholds) -> bool,
}

/// Evaluated top to bottom. Adding a category is an insertion here.
/// `presentation` only refines the reason of documents no earlier rule took.
const RULES: &[CategoryRule] = &[
    CategoryRule {
        name: "job_description",
        category: Category::JobDescription,
        applies: |s, t| s.jd_markers >= t.jd_marker_min && s.resume_headers == 0,
    },
    CategoryRule {
        name: "cover_letter",
        category: Category::CoverLetter,
        applies: |s, t| s.cover_letter_phrases >= 1 && s.word_count < t.cover_letter_max,
    },
    CategoryRule {
        name: "combined",
        category: Category::Combined,
        applies: |s, t| {
            s.word_count >= t.combined_min
                && s.resume_headers >= t.resume_header_min
                && s.cover_letter_phrases >= 1
        },
    },
    CategoryRule {
        name: "resume",
        category: Category::Resume,
        applies: |s, t| s.resume_headers >= t.resume_header_min && s.word_count >= t.resume_min,
    },
    CategoryRule {
        name: "presentation",
        category: Category::Other,
        applies: |s, t| {
            let lacks_resume_structure = s.resume_headers < t.resume_header_min;
            if s.extension == Extension::Pptx {
                lacks_resume_structure
            } else {
                s.presentation_markers >= t.presentation_marker_min && lacks_resume_structure
            }
        },
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub reason: String,
    pub signals: Option<Signals>,
}

pub fn classify_type(record: &FileRecord, content: &str, patterns: &PatternSet) -> Classification {
    if content.trim().is_empty() {
        return Classification {
            category: Category::Other,
            reason: EXTRACTION_FAILED.to_string(),
            signals: None,
        };
    }

    let signals = Signals::collect(record.extension, content, patterns);
    let (name, category) = RULES
        .iter()
        .find(|rule| (rule.applies)(&signals, &patterns.thresholds))
        .map(|rule| (rule.name, rule.category))
        .unwrap_or(("unclassified", Category::Other));

    Classification {
        category,
        reason: format!("{}: {}", name, signals.describe()),
        signals: Some(signals),
    }
}
