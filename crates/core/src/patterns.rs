//! Pattern configuration: the keyword tables that drive ownership and type
//! classification, and their compiled, read-only form.
//!
//! Plain entries are case-insensitive phrases matched on word boundaries, with
//! any whitespace run allowed between words. Entries prefixed with `re:` are
//! raw regular expressions.

use crate::models::Category;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const REGEX_PREFIX: &str = "re:";

/// Lists that must be present and non-empty in every pattern file.
pub const REQUIRED_LISTS: [&str; 3] = [
    "cover_letter_phrases",
    "resume_section_headers",
    "jd_markers",
];

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("cannot read pattern file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pattern configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("pattern configuration is missing required list `{0}`")]
    MissingList(&'static str),
    #[error("pattern configuration is missing `word_count_thresholds`")]
    MissingThresholds,
    #[error("no name variants configured and USER_NAME is not set")]
    MissingUserName,
    #[error("threshold `{0}` must be greater than zero")]
    InvalidThreshold(&'static str),
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("test case category `{0}` is not a known category")]
    UnknownTestCategory(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCountThresholds {
    pub cover_letter_max: usize,
    pub resume_min: usize,
    pub combined_min: usize,
    #[serde(default = "default_marker_min")]
    pub jd_marker_min: usize,
    #[serde(default = "default_marker_min")]
    pub resume_header_min: usize,
    #[serde(default = "default_presentation_marker_min")]
    pub presentation_marker_min: usize,
}

fn default_marker_min() -> usize {
    2
}

fn default_presentation_marker_min() -> usize {
    3
}

fn default_version() -> u32 {
    1
}

fn default_content_scan_chars() -> usize {
    3000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub name_variants: Vec<String>,
    pub cover_letter_phrases: Vec<String>,
    pub resume_section_headers: Vec<String>,
    pub jd_markers: Vec<String>,
    pub word_count_thresholds: WordCountThresholds,
    #[serde(default)]
    pub other_person_names: Vec<String>,
    #[serde(default)]
    pub presentation_markers: Vec<String>,
    #[serde(default = "default_content_scan_chars")]
    pub content_scan_chars: usize,
    /// Known filename -> category expectations, keyed by category name.
    #[serde(default)]
    pub test_cases: BTreeMap<String, Vec<String>>,
}

impl PatternConfig {
    pub fn load(path: &Path) -> Result<Self, PatternError> {
        let raw = fs::read_to_string(path).map_err(|source| PatternError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, PatternError> {
        let value: Value = serde_json::from_str(raw)?;
        for key in REQUIRED_LISTS {
            if value.get(key).map(Value::is_null).unwrap_or(true) {
                return Err(PatternError::MissingList(key));
            }
        }
        if value
            .get("word_count_thresholds")
            .map(Value::is_null)
            .unwrap_or(true)
        {
            return Err(PatternError::MissingThresholds);
        }
        let cfg: PatternConfig = serde_json::from_value(value)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PatternError> {
        let lists = [
            (REQUIRED_LISTS[0], &self.cover_letter_phrases),
            (REQUIRED_LISTS[1], &self.resume_section_headers),
            (REQUIRED_LISTS[2], &self.jd_markers),
        ];
        for (key, list) in lists {
            if list.iter().all(|e| e.trim().is_empty()) {
                return Err(PatternError::MissingList(key));
            }
        }
        let t = &self.word_count_thresholds;
        let checks = [
            ("cover_letter_max", t.cover_letter_max),
            ("resume_min", t.resume_min),
            ("combined_min", t.combined_min),
            ("jd_marker_min", t.jd_marker_min),
            ("resume_header_min", t.resume_header_min),
            ("presentation_marker_min", t.presentation_marker_min),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(PatternError::InvalidThreshold(name));
            }
        }
        if self.content_scan_chars == 0 {
            return Err(PatternError::InvalidThreshold("content_scan_chars"));
        }
        Ok(())
    }

    /// Built-in English tables. `config/classification_config.json` mirrors them.
    pub fn default_english() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            version: 1,
            name_variants: Vec::new(),
            cover_letter_phrases: list(&[
                r"re:dear\s+(?:hiring|recruiter|manager|team)",
                "i am writing to express",
                r"re:i\s+am\s+(?:excited|pleased|thrilled)\s+to\s+apply",
                "sincerely",
                "best regards",
                r"re:thank\s+you\s+for\s+(?:considering|your\s+time)",
                "i would welcome the opportunity",
                "i look forward to",
                "cover letter",
            ]),
            resume_section_headers: list(&[
                "experience",
                "education",
                "skills",
                "professional summary",
                "accomplishments",
                "work history",
                "employment",
                "certifications",
                "core capabilities",
            ]),
            jd_markers: list(&[
                "responsibilities",
                "qualifications",
                "we are looking for",
                "job description",
                "requirements",
                "about the role",
                "what you will do",
                "equal opportunity employer",
            ]),
            word_count_thresholds: WordCountThresholds {
                cover_letter_max: 600,
                resume_min: 150,
                combined_min: 600,
                jd_marker_min: 2,
                resume_header_min: 2,
                presentation_marker_min: 3,
            },
            other_person_names: Vec::new(),
            presentation_markers: list(&[
                r"re:\bslide\s*\d+",
                "presentation",
                "agenda",
                "conference",
                "summit",
                "workshop",
            ]),
            content_scan_chars: default_content_scan_chars(),
            test_cases: BTreeMap::new(),
        }
    }

    /// Compiles the tables once for the run. `user_name` seeds the name
    /// variants when the file lists none.
    pub fn compile(&self, user_name: Option<&str>) -> Result<PatternSet, PatternError> {
        self.validate()?;
        let mut variants = self.name_variants.clone();
        if variants.iter().all(|v| v.trim().is_empty()) {
            let seeded = user_name.map(seed_name_variants).unwrap_or_default();
            if seeded.is_empty() {
                return Err(PatternError::MissingUserName);
            }
            variants = seeded;
        }

        let mut expectations = Vec::new();
        for (category, names) in &self.test_cases {
            let category: Category = category
                .parse()
                .map_err(|_| PatternError::UnknownTestCategory(category.clone()))?;
            expectations.extend(names.iter().map(|file_name| Expectation {
                file_name: file_name.clone(),
                category,
            }));
        }

        Ok(PatternSet {
            version: self.version,
            name_variants: names(&variants),
            other_person_names: names(&self.other_person_names),
            cover_letter_phrases: compile_all(&self.cover_letter_phrases)?,
            resume_section_headers: compile_all(&self.resume_section_headers)?,
            jd_markers: compile_all(&self.jd_markers)?,
            presentation_markers: compile_all(&self.presentation_markers)?,
            thresholds: self.word_count_thresholds.clone(),
            content_scan_chars: self.content_scan_chars,
            expectations,
        })
    }
}

/// "First [Middle] Last" -> full name, "Last First", "Last, First", and
/// "First Last" when a middle name is present. Initials are never seeded.
pub fn seed_name_variants(user_name: &str) -> Vec<String> {
    let parts: Vec<&str> = user_name.split_whitespace().collect();
    let mut out = Vec::new();
    match parts.as_slice() {
        [] => {}
        [single] => out.push(single.to_string()),
        [first, .., last] => {
            out.push(parts.join(" "));
            out.push(format!("{last} {first}"));
            out.push(format!("{last}, {first}"));
            if parts.len() > 2 {
                out.push(format!("{first} {last}"));
            }
        }
    }
    out
}

/// A person's name in the two forms the ownership detector compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameVariant {
    pub display: String,
    /// Lower-cased with whitespace runs collapsed; compared against content.
    pub spaced: String,
    /// Lower-cased alphanumerics only; compared against file names.
    pub compact: String,
}

impl NameVariant {
    pub fn new(display: &str) -> Self {
        Self {
            display: display.trim().to_string(),
            spaced: collapse_whitespace(&display.to_lowercase()),
            compact: compact(display),
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn names(entries: &[String]) -> Vec<NameVariant> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(|e| NameVariant::new(e))
        .filter(|v| !v.compact.is_empty() && seen.insert(v.spaced.clone()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub label: String,
    regex: Regex,
}

impl Pattern {
    pub fn compile(entry: &str) -> Result<Self, PatternError> {
        let entry = entry.trim();
        let source = match entry.strip_prefix(REGEX_PREFIX) {
            Some(raw) => raw.trim().to_string(),
            None => phrase_regex(entry),
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|source| PatternError::InvalidPattern {
                pattern: entry.to_string(),
                source,
            })?;
        Ok(Self {
            label: entry.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

fn phrase_regex(phrase: &str) -> String {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    let body = words.join(r"\s+");
    let starts_word = phrase.chars().next().map(is_word_char).unwrap_or(false);
    let ends_word = phrase.chars().last().map(is_word_char).unwrap_or(false);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" }
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn compile_all(entries: &[String]) -> Result<Vec<Pattern>, PatternError> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|e| !e.trim().is_empty() && seen.insert(e.trim().to_lowercase()))
        .map(|e| Pattern::compile(e))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expectation {
    pub file_name: String,
    pub category: Category,
}

/// Compiled pattern tables; immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct PatternSet {
    pub version: u32,
    pub name_variants: Vec<NameVariant>,
    pub other_person_names: Vec<NameVariant>,
    pub cover_letter_phrases: Vec<Pattern>,
    pub resume_section_headers: Vec<Pattern>,
    pub jd_markers: Vec<Pattern>,
    pub presentation_markers: Vec<Pattern>,
    pub thresholds: WordCountThresholds,
    pub content_scan_chars: usize,
    pub expectations: Vec<Expectation>,
}

/// Number of distinct entries in `patterns` that occur in `text`.
pub fn count_matches(patterns: &[Pattern], text: &str) -> usize {
    patterns.iter().filter(|p| p.is_match(text)).count()
}
