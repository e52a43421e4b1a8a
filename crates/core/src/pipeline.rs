//! Classification orchestrator and the stage runner built on top of it.

use crate::classifier::{classify_type, EXTRACTION_FAILED};
use crate::config::{AppConfig, PipelineConfig};
use crate::extractor::{ContentAccessor, FsContentAccessor};
use crate::models::{Category, FileRecord, OwnershipConfidence};
use crate::ownership::{detect_ownership, UnknownOwnership};
use crate::patterns::{PatternConfig, PatternSet};
use crate::{report, scanner};
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storage::{SnapshotStore, Stage};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinHandle};
use tokio::time;
use tracing::{debug, info, warn};

const PROGRESS_EVERY: usize = 20;
pub const REPORT_FILE: &str = "2_classification_report.md";

/// What the content accessor produced for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOutcome {
    Loaded(String),
    Failed(String),
    /// Directories carry no content.
    Skipped,
}

/// Classifies one record. Prior classification fields are discarded.
pub fn classify_record(
    record: &FileRecord,
    outcome: &ContentOutcome,
    patterns: &PatternSet,
    unknown_ownership: UnknownOwnership,
) -> FileRecord {
    let mut out = record.clone();
    out.clear_classification();

    let content = match outcome {
        ContentOutcome::Loaded(text) => text.as_str(),
        ContentOutcome::Failed(_) | ContentOutcome::Skipped => "",
    };
    let verdict = detect_ownership(record, content, patterns);
    debug!(
        path = %record.path,
        confidence = ?verdict.confidence,
        basis = verdict.basis,
        "ownership decided"
    );
    out.ownership_confidence = Some(verdict.confidence);
    out.is_user_document = Some(unknown_ownership.resolve(verdict.confidence));

    let (category, reason) = match outcome {
        ContentOutcome::Skipped => (Category::Other, "directory".to_string()),
        ContentOutcome::Failed(cause) => {
            (Category::Other, format!("{EXTRACTION_FAILED} ({cause})"))
        }
        ContentOutcome::Loaded(text) => {
            let classification = classify_type(record, text, patterns);
            debug!(path = %record.path, signals = ?classification.signals, "type signals");
            (classification.category, classification.reason)
        }
    };
    out.category = Some(category);
    out.classification_reason = Some(reason);
    out
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers: usize,
    pub extraction_timeout: Option<Duration>,
    pub unknown_ownership: UnknownOwnership,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            workers: cfg.workers.max(1),
            extraction_timeout: (cfg.extraction_timeout_secs > 0)
                .then(|| Duration::from_secs(cfg.extraction_timeout_secs)),
            unknown_ownership: cfg.unknown_ownership,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassificationSummary {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub user_documents: usize,
    pub unknown_ownership: usize,
    pub extraction_failures: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl ClassificationSummary {
    pub fn from_records(records: &[FileRecord], skipped: Vec<SkippedRecord>) -> Self {
        let mut by_category: BTreeMap<Category, usize> =
            Category::ALL.into_iter().map(|c| (c, 0)).collect();
        let mut summary = Self {
            total: records.len(),
            skipped,
            ..Self::default()
        };
        for record in records {
            if let Some(category) = record.category {
                *by_category.entry(category).or_default() += 1;
            }
            if record.is_user_document == Some(true) {
                summary.user_documents += 1;
            }
            if record.ownership_confidence == Some(OwnershipConfidence::Unknown) {
                summary.unknown_ownership += 1;
            }
            let failed = record
                .classification_reason
                .as_deref()
                .map(|r| r.starts_with(EXTRACTION_FAILED))
                .unwrap_or(false);
            if failed {
                summary.extraction_failures += 1;
            }
        }
        summary.by_category = by_category;
        summary
    }
}

#[derive(Debug, Clone)]
pub struct ClassifiedInventory {
    pub records: Vec<FileRecord>,
    pub summary: ClassificationSummary,
}

/// Runs ownership and type classification over an inventory. Extraction is
/// bounded by a semaphore and a per-file timeout; output keeps input order.
#[derive(Clone)]
pub struct Orchestrator {
    patterns: Arc<PatternSet>,
    accessor: Arc<dyn ContentAccessor>,
    options: PipelineOptions,
}

impl Orchestrator {
    pub fn new(
        patterns: PatternSet,
        accessor: Arc<dyn ContentAccessor>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            patterns: Arc::new(patterns),
            accessor,
            options,
        }
    }

    pub fn with_fs_accessor(patterns: PatternSet, options: PipelineOptions) -> Self {
        Self::new(patterns, Arc::new(FsContentAccessor::new()), options)
    }

    /// Validates raw inventory elements, skipping (and reporting) malformed
    /// ones, then classifies the rest.
    pub async fn classify_inventory(&self, raw: Vec<Value>) -> ClassifiedInventory {
        let mut valid = Vec::with_capacity(raw.len());
        let mut skipped = Vec::new();
        for (index, value) in raw.into_iter().enumerate() {
            match FileRecord::from_value(value) {
                Ok(record) => valid.push(record),
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed inventory record");
                    skipped.push(SkippedRecord {
                        index,
                        reason: err.to_string(),
                    });
                }
            }
        }
        let records = self.classify_records(&valid).await;
        let summary = ClassificationSummary::from_records(&records, skipped);
        ClassifiedInventory { records, summary }
    }

    /// Returns new records; the input is left untouched.
    pub async fn classify_records(&self, records: &[FileRecord]) -> Vec<FileRecord> {
        let total = records.len();
        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let handles: Vec<JoinHandle<FileRecord>> = records
            .iter()
            .cloned()
            .map(|record| {
                let semaphore = semaphore.clone();
                let this = self.clone();
                task::spawn(async move {
                    let outcome = {
                        let _permit = semaphore.acquire_owned().await.ok();
                        this.load_content(&record).await
                    };
                    if let ContentOutcome::Failed(cause) = &outcome {
                        warn!(path = %record.path, cause = %cause, "extraction failed");
                    }
                    classify_record(
                        &record,
                        &outcome,
                        &this.patterns,
                        this.options.unknown_ownership,
                    )
                })
            })
            .collect();

        let mut out = Vec::with_capacity(total);
        for (index, handle) in handles.into_iter().enumerate() {
            let classified = match handle.await {
                Ok(record) => record,
                Err(err) => {
                    warn!(path = %records[index].path, error = %err, "classification task failed");
                    classify_record(
                        &records[index],
                        &ContentOutcome::Failed("classification task failed".to_string()),
                        &self.patterns,
                        self.options.unknown_ownership,
                    )
                }
            };
            debug!(
                path = %classified.path,
                category = ?classified.category,
                "classified"
            );
            out.push(classified);
            if out.len() % PROGRESS_EVERY == 0 {
                info!(done = out.len(), total, "classification progress");
            }
        }
        out
    }

    async fn load_content(&self, record: &FileRecord) -> ContentOutcome {
        if record.is_directory {
            return ContentOutcome::Skipped;
        }
        if let Some(content) = &record.content {
            return ContentOutcome::Loaded(content.clone());
        }

        let accessor = self.accessor.clone();
        let path = PathBuf::from(&record.path);
        let extension = record.extension;
        let handle = task::spawn_blocking(move || accessor.load(&path, extension));
        let joined = match self.options.extraction_timeout {
            Some(limit) => match time::timeout(limit, handle).await {
                Ok(joined) => joined,
                // The blocking task keeps running; its result is dropped.
                Err(_) => return ContentOutcome::Failed(format!("timeout after {limit:?}")),
            },
            None => handle.await,
        };
        match joined {
            Ok(Ok(text)) => ContentOutcome::Loaded(text),
            Ok(Err(err)) => ContentOutcome::Failed(err.to_string()),
            Err(err) if err.is_panic() => ContentOutcome::Failed("extractor panicked".to_string()),
            Err(err) => ContentOutcome::Failed(err.to_string()),
        }
    }
}

pub fn load_patterns(path: &Path, user_name: Option<&str>) -> anyhow::Result<PatternSet> {
    let cfg = PatternConfig::load(path)
        .with_context(|| format!("loading pattern configuration {}", path.display()))?;
    let patterns = cfg
        .compile(user_name)
        .with_context(|| format!("compiling pattern configuration {}", path.display()))?;
    info!(
        path = %path.display(),
        version = patterns.version,
        name_variants = patterns.name_variants.len(),
        "pattern configuration loaded"
    );
    Ok(patterns)
}

/// Reads a stage snapshot as records, dropping elements that fail validation.
pub fn read_stage(store: &SnapshotStore, stage: Stage) -> anyhow::Result<Vec<FileRecord>> {
    let raw = store
        .read(stage)
        .with_context(|| format!("reading stage {} snapshot", stage.number()))?;
    let mut records = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match FileRecord::from_value(value) {
            Ok(record) => records.push(record),
            Err(err) => warn!(index, error = %err, "skipping malformed snapshot record"),
        }
    }
    Ok(records)
}

pub fn write_report(
    store: &SnapshotStore,
    records: &[FileRecord],
    root: Option<&Path>,
    out: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| store.root().join(REPORT_FILE));
    let markdown = report::render_report(records, root);
    storage::write_atomic(&path, markdown.as_bytes())
        .with_context(|| format!("writing report {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    Scan,
    Classify,
    All,
}

impl PipelineMode {
    pub fn label(self) -> &'static str {
        match self {
            PipelineMode::Scan => "scan",
            PipelineMode::Classify => "classify",
            PipelineMode::All => "all",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineSummary {
    pub discovered: Option<usize>,
    pub classification: Option<ClassificationSummary>,
    pub snapshots: Vec<PathBuf>,
    pub report: Option<PathBuf>,
}

pub async fn run_with_mode_summary(
    config: &AppConfig,
    mode: PipelineMode,
    user_name: Option<&str>,
) -> anyhow::Result<PipelineSummary> {
    let store = SnapshotStore::new(&config.data_dir);
    let mut summary = PipelineSummary::default();

    // Bad patterns fail before any scan.
    let patterns = match mode {
        PipelineMode::Classify | PipelineMode::All => {
            Some(load_patterns(&config.patterns_path, user_name)?)
        }
        PipelineMode::Scan => None,
    };

    let roots: Vec<PathBuf> = config.scan.include.iter().map(PathBuf::from).collect();
    if matches!(mode, PipelineMode::Scan | PipelineMode::All) {
        if roots.is_empty() {
            anyhow::bail!("no folders to scan: set RESUME_FOLDER or scan.include");
        }
        info!("Starting scan phase...");
        let records = scanner::scan(&roots, &config.scan.exclude).await?;
        let path = store
            .write(Stage::Scanned, &records)
            .context("writing stage 1 snapshot")?;
        info!(discovered = records.len(), path = %path.display(), "Scan complete.");
        summary.discovered = Some(records.len());
        summary.snapshots.push(path);
    }

    if let Some(patterns) = patterns {
        info!("Starting classification phase...");
        let raw = store
            .read(Stage::Scanned)
            .context("reading stage 1 snapshot")?;
        let orchestrator =
            Orchestrator::with_fs_accessor(patterns, PipelineOptions::from(&config.pipeline));
        let classified = orchestrator.classify_inventory(raw).await;
        let path = store
            .write(Stage::Classified, &classified.records)
            .context("writing stage 2 snapshot")?;
        info!(
            classified = classified.records.len(),
            skipped = classified.summary.skipped.len(),
            failures = classified.summary.extraction_failures,
            path = %path.display(),
            "Classification complete."
        );
        summary.snapshots.push(path);

        if mode == PipelineMode::All {
            let root = (roots.len() == 1).then(|| roots[0].as_path());
            summary.report = Some(write_report(&store, &classified.records, root, None)?);
        }
        summary.classification = Some(classified.summary);
    }

    Ok(summary)
}
