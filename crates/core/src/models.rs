use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Declared file format. Unlisted extensions collapse to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Extension {
    Pdf,
    Docx,
    Doc,
    Pptx,
    Txt,
    #[default]
    Other,
}

impl Extension {
    pub fn as_str(self) -> &'static str {
        match self {
            Extension::Pdf => "pdf",
            Extension::Docx => "docx",
            Extension::Doc => "doc",
            Extension::Pptx => "pptx",
            Extension::Txt => "txt",
            Extension::Other => "other",
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Extension::from)
            .unwrap_or_default()
    }
}

impl From<&str> for Extension {
    fn from(s: &str) -> Self {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Extension::Pdf,
            "docx" => Extension::Docx,
            "doc" => Extension::Doc,
            "pptx" => Extension::Pptx,
            "txt" => Extension::Txt,
            _ => Extension::Other,
        }
    }
}

impl Serialize for Extension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Extension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Extension::from).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Resume,
    CoverLetter,
    Combined,
    JobDescription,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Resume,
        Category::CoverLetter,
        Category::Combined,
        Category::JobDescription,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Resume => "resume",
            Category::CoverLetter => "cover_letter",
            Category::Combined => "combined",
            Category::JobDescription => "job_description",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// How sure the ownership detector is that a document belongs to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipConfidence {
    KnownTrue,
    KnownFalse,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub extension: Extension,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(
        default,
        alias = "modified_date",
        with = "timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_user_document: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_confidence: Option<OwnershipConfidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_reason: Option<String>,
    /// Fields written by other stages, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no usable `path`")]
    MissingPath,
    #[error("record does not match the inventory schema: {0}")]
    Invalid(#[from] serde_json::Error),
}

impl FileRecord {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let p = Path::new(&path);
        let name = p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = Extension::from_path(p);
        Self {
            path,
            name,
            extension,
            size_bytes: 0,
            modified_time: None,
            is_directory: false,
            content: None,
            is_user_document: None,
            ownership_confidence: None,
            category: None,
            classification_reason: None,
            extra: Map::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Validates one raw inventory element. Name and extension are derived
    /// from the path when the element leaves them out.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let obj = value.as_object().ok_or(RecordError::NotAnObject)?;
        let has_path = obj
            .get("path")
            .and_then(Value::as_str)
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false);
        if !has_path {
            return Err(RecordError::MissingPath);
        }
        let has_extension = obj.contains_key("extension");
        let mut record: FileRecord = serde_json::from_value(value)?;
        let derived = FileRecord::new(record.path.clone());
        if record.name.is_empty() {
            record.name = derived.name;
        }
        if !has_extension {
            record.extension = derived.extension;
        }
        Ok(record)
    }

    /// Drops the fields this stage owns so a re-run starts clean.
    pub fn clear_classification(&mut self) {
        self.is_user_document = None;
        self.ownership_confidence = None;
        self.category = None;
        self.classification_reason = None;
    }
}

/// Accepts RFC 3339, naive ISO-8601 (read as UTC) or epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(n) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&n));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

mod timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Epoch(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.serialize_str(&t.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Epoch(secs)) => Utc
                .timestamp_opt(secs, 0)
                .single()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {secs}"))),
            Some(Raw::Text(s)) => parse_timestamp(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("unrecognised timestamp: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extension_accepts_dotted_and_mixed_case() {
        assert_eq!(Extension::from(".PDF"), Extension::Pdf);
        assert_eq!(Extension::from("docx"), Extension::Docx);
        assert_eq!(Extension::from(".xlsx"), Extension::Other);
        assert_eq!(Extension::from(""), Extension::Other);
    }

    #[test]
    fn scanner_record_round_trips_with_legacy_keys() {
        let raw = json!({
            "path": "/r/Resume_JaneDoe.pdf",
            "name": "Resume_JaneDoe.pdf",
            "extension": ".pdf",
            "size_bytes": 1024,
            "modified_date": "2024-03-01T09:30:00.123456",
            "is_directory": false,
            "scan_note": "kept"
        });
        let record = FileRecord::from_value(raw).unwrap();
        assert_eq!(record.extension, Extension::Pdf);
        assert_eq!(record.size_bytes, 1024);
        assert_eq!(
            record.modified_time.unwrap().to_rfc3339(),
            "2024-03-01T09:30:00.123456+00:00"
        );
        assert_eq!(record.extra.get("scan_note"), Some(&json!("kept")));

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["extension"], "pdf");
        assert_eq!(out["scan_note"], "kept");
        assert!(out.get("category").is_none());
    }

    #[test]
    fn name_and_extension_are_derived_from_path() {
        let record = FileRecord::from_value(json!({"path": "/x/Cover Letter.DOCX"})).unwrap();
        assert_eq!(record.name, "Cover Letter.DOCX");
        assert_eq!(record.extension, Extension::Docx);
    }

    #[test]
    fn epoch_seconds_are_accepted() {
        let record =
            FileRecord::from_value(json!({"path": "/a.txt", "modified_time": 0})).unwrap();
        assert_eq!(record.modified_time.unwrap().timestamp(), 0);
    }

    #[test]
    fn records_without_path_are_rejected() {
        assert!(matches!(
            FileRecord::from_value(json!({"name": "a.pdf"})),
            Err(RecordError::MissingPath)
        ));
        assert!(matches!(
            FileRecord::from_value(json!({"path": "  "})),
            Err(RecordError::MissingPath)
        ));
        assert!(matches!(
            FileRecord::from_value(json!("a.pdf")),
            Err(RecordError::NotAnObject)
        ));
        assert!(matches!(
            FileRecord::from_value(json!({"path": "/a.pdf", "size_bytes": "big"})),
            Err(RecordError::Invalid(_))
        ));
    }

    #[test]
    fn category_parses_its_own_names() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!("user_resumes".parse::<Category>().is_err());
    }
}
