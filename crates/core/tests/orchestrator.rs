use dossier_core::extractor::{ContentAccessor, ExtractError};
use dossier_core::models::{Category, Extension, FileRecord, OwnershipConfidence};
use dossier_core::ownership::UnknownOwnership;
use dossier_core::patterns::{PatternConfig, PatternSet};
use dossier_core::pipeline::{Orchestrator, PipelineOptions};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn patterns() -> PatternSet {
    let mut cfg = PatternConfig::default_english();
    cfg.name_variants = vec!["Jane Doe".into()];
    cfg.compile(None).unwrap()
}

fn options(workers: usize, timeout: Option<Duration>) -> PipelineOptions {
    PipelineOptions {
        workers,
        extraction_timeout: timeout,
        unknown_ownership: UnknownOwnership::NotOwned,
    }
}

/// `body` padded with filler until it has exactly `words` tokens.
fn doc(body: &str, words: usize) -> String {
    let have = body.split_whitespace().count();
    let filler = vec!["lorem"; words - have].join(" ");
    format!("{body} {filler}")
}

/// Serves text by file name; unknown names are read errors. Later files
/// answer sooner so completion order differs from input order.
struct ScriptedAccessor {
    texts: HashMap<String, String>,
    calls: AtomicUsize,
}

impl ScriptedAccessor {
    fn new(texts: HashMap<String, String>) -> Self {
        Self {
            texts,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ContentAccessor for ScriptedAccessor {
    fn load(&self, path: &Path, _extension: Extension) -> Result<String, ExtractError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20u64.saturating_sub(n as u64)));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.texts.get(&name).cloned().ok_or_else(|| {
            ExtractError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, name))
        })
    }
}

struct SlowAccessor;

impl ContentAccessor for SlowAccessor {
    fn load(&self, path: &Path, _extension: Extension) -> Result<String, ExtractError> {
        if path.ends_with("slow.pdf") {
            std::thread::sleep(Duration::from_millis(500));
        }
        Ok(doc("Experience Education Skills", 400))
    }
}

struct PanickingAccessor;

impl ContentAccessor for PanickingAccessor {
    fn load(&self, path: &Path, _extension: Extension) -> Result<String, ExtractError> {
        if path.ends_with("corrupt.pdf") {
            panic!("parser blew up");
        }
        Ok(doc("Dear Hiring Manager Sincerely", 200))
    }
}

fn category_of(records: &[FileRecord], name: &str) -> Option<Category> {
    records.iter().find(|r| r.name == name).and_then(|r| r.category)
}

#[tokio::test]
async fn known_document_shapes_from_preloaded_content() {
    let accessor = Arc::new(ScriptedAccessor::new(HashMap::new()));
    let orchestrator = Orchestrator::new(patterns(), accessor.clone(), options(4, None));
    let jd = "Responsibilities Qualifications Responsibilities Qualifications";
    let records = vec![
        FileRecord::new("/r/Resume_JaneDoe.pdf")
            .with_content(doc("Experience Education Skills", 850)),
        FileRecord::new("/r/cover_letter.docx")
            .with_content(doc("Dear Hiring Manager, I am glad. Sincerely", 280)),
        FileRecord::new("/r/SWE_JD_Acme.txt").with_content(doc(jd, 340)),
        FileRecord::new("/r/blank.pdf").with_content(""),
        FileRecord::new("/r/application.pdf").with_content(doc(
            "Experience Education Skills Dear Hiring Manager Sincerely",
            1300,
        )),
    ];

    let out = orchestrator.classify_records(&records).await;
    assert_eq!(accessor.calls.load(Ordering::SeqCst), 0);

    assert_eq!(out[0].category, Some(Category::Resume));
    assert_eq!(out[0].is_user_document, Some(true));
    assert_eq!(out[1].category, Some(Category::CoverLetter));
    assert_eq!(out[2].category, Some(Category::JobDescription));
    assert_eq!(out[2].is_user_document, Some(false));
    assert_eq!(out[3].category, Some(Category::Other));
    assert!(out[3]
        .classification_reason
        .as_deref()
        .unwrap()
        .contains("extraction_failed"));
    assert_eq!(out[3].ownership_confidence, Some(OwnershipConfidence::Unknown));
    assert_eq!(out[4].category, Some(Category::Combined));

    assert!(records.iter().all(|r| r.category.is_none()));
}

#[tokio::test]
async fn order_is_kept_and_failures_stay_local() {
    let mut texts = HashMap::new();
    let mut records = Vec::new();
    for i in 0..30 {
        let name = format!("doc_{i:02}.txt");
        if i != 7 {
            texts.insert(name.clone(), doc("Experience Education Skills", 300));
        }
        records.push(FileRecord::new(format!("/r/{name}")));
    }
    let accessor = Arc::new(ScriptedAccessor::new(texts));
    let orchestrator = Orchestrator::new(patterns(), accessor, options(4, None));

    let out = orchestrator.classify_records(&records).await;
    let in_paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
    let out_paths: Vec<&str> = out.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(in_paths, out_paths);

    for (i, record) in out.iter().enumerate() {
        if i == 7 {
            assert_eq!(record.category, Some(Category::Other));
            assert!(record
                .classification_reason
                .as_deref()
                .unwrap()
                .starts_with("extraction_failed (io error"));
        } else {
            assert_eq!(record.category, Some(Category::Resume), "{}", record.name);
        }
    }
}

#[tokio::test]
async fn slow_extraction_times_out_without_blocking_siblings() {
    let orchestrator = Orchestrator::new(
        patterns(),
        Arc::new(SlowAccessor),
        options(2, Some(Duration::from_millis(50))),
    );
    let records = vec![
        FileRecord::new("/r/fast_a.pdf"),
        FileRecord::new("/r/slow.pdf"),
        FileRecord::new("/r/fast_b.pdf"),
    ];
    let out = orchestrator.classify_records(&records).await;
    assert_eq!(out[0].category, Some(Category::Resume));
    assert_eq!(out[1].category, Some(Category::Other));
    assert_eq!(
        out[1].classification_reason.as_deref(),
        Some("extraction_failed (timeout after 50ms)")
    );
    assert_eq!(out[2].category, Some(Category::Resume));
}

#[tokio::test]
async fn extractor_panic_is_an_extraction_failure() {
    let orchestrator = Orchestrator::new(patterns(), Arc::new(PanickingAccessor), options(4, None));
    let records = vec![
        FileRecord::new("/r/letter.docx"),
        FileRecord::new("/r/corrupt.pdf"),
    ];
    let out = orchestrator.classify_records(&records).await;
    assert_eq!(out[0].category, Some(Category::CoverLetter));
    assert_eq!(
        out[1].classification_reason.as_deref(),
        Some("extraction_failed (extractor panicked)")
    );
}

#[tokio::test]
async fn malformed_records_are_skipped_and_reported() {
    let accessor = Arc::new(ScriptedAccessor::new(HashMap::from([(
        "JaneDoe_cv.txt".to_string(),
        doc("Experience Education", 200),
    )])));
    let orchestrator = Orchestrator::new(patterns(), accessor, options(4, None));
    let raw = vec![
        json!({"path": "/r/JaneDoe_cv.txt", "extension": ".txt", "size_bytes": 10}),
        json!({"name": "orphan.pdf"}),
        json!(42),
        json!({"path": "/r/missing.pdf", "extension": "pdf"}),
    ];
    let inventory = orchestrator.classify_inventory(raw).await;

    assert_eq!(inventory.records.len(), 2);
    assert_eq!(category_of(&inventory.records, "JaneDoe_cv.txt"), Some(Category::Resume));
    assert_eq!(category_of(&inventory.records, "missing.pdf"), Some(Category::Other));

    let summary = &inventory.summary;
    assert_eq!(summary.total, 2);
    let skipped: Vec<usize> = summary.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped, vec![1, 2]);
    assert_eq!(summary.extraction_failures, 1);
    assert_eq!(summary.user_documents, 1);
    assert_eq!(summary.by_category[&Category::Resume], 1);
}

#[tokio::test]
async fn reclassifying_classified_output_is_stable() {
    let orchestrator = Orchestrator::new(
        patterns(),
        Arc::new(ScriptedAccessor::new(HashMap::new())),
        options(3, None),
    );
    let records = vec![
        FileRecord::new("/r/a.txt").with_content(doc("Experience Education Skills Sincerely", 700)),
        FileRecord::new("/r/JaneDoe_letter.txt").with_content(doc("Dear Hiring Manager", 120)),
        FileRecord::new("/r/deck.pptx").with_content(doc("Agenda Roadmap", 90)),
    ];
    let first = orchestrator.classify_records(&records).await;
    let second = orchestrator.classify_records(&first).await;
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.category, b.category);
        assert_eq!(a.is_user_document, b.is_user_document);
        assert_eq!(a.classification_reason, b.classification_reason);
    }
    assert_eq!(first[2].category, Some(Category::Other));
}
