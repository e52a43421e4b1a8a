//! Walks the resume folder and builds the stage-1 inventory.

use crate::models::FileRecord;
use anyhow::Context;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

const LOCK_FILE_PREFIX: &str = "~$";

pub async fn scan(roots: &[PathBuf], excludes: &[String]) -> anyhow::Result<Vec<FileRecord>> {
    for root in roots {
        if !root.is_dir() {
            anyhow::bail!("scan root is not a directory: {}", root.display());
        }
    }

    let (tx, mut rx) = mpsc::channel(100);
    let exclude_set = build_globset(excludes)?;
    let roots = roots.to_vec();

    let walker_handle = task::spawn_blocking(move || {
        for root in roots {
            let walker = WalkDir::new(&root)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || should_descend(e, &exclude_set));
            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(err) => {
                        warn!(error = %err, "skipping unreadable entry");
                        continue;
                    }
                };
                if entry.file_type().is_dir() || is_lock_file(&entry) {
                    continue;
                }

                let record = match to_record(entry.path()) {
                    Ok(r) => r,
                    Err(err) => {
                        warn!(path = %entry.path().display(), error = %err, "skipping entry");
                        continue;
                    }
                };
                if tx.blocking_send(record).is_err() {
                    break;
                }
            }
        }
    });

    let mut records = Vec::new();
    while let Some(record) = rx.recv().await {
        debug!(path = %record.path, "discovered");
        records.push(record);
    }
    walker_handle.await.context("scanner task failed")?;

    records.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(records)
}

fn to_record(path: &Path) -> std::io::Result<FileRecord> {
    let meta = fs::metadata(path)?;
    let mut record = FileRecord::new(path.to_string_lossy().into_owned());
    record.size_bytes = meta.len();
    record.modified_time = meta.modified().ok().map(DateTime::<Utc>::from);
    Ok(record)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid exclude pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn should_descend(entry: &DirEntry, excludes: &GlobSet) -> bool {
    !excludes.is_match(entry.path()) && !is_hidden(entry)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn is_lock_file(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with(LOCK_FILE_PREFIX))
        .unwrap_or(false)
}
