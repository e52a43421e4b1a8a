//! Markdown summary of a classified inventory.

use crate::models::{Category, FileRecord, OwnershipConfidence};
use std::collections::BTreeMap;
use std::path::Path;

fn title(category: Category) -> &'static str {
    match category {
        Category::Resume => "Resumes",
        Category::CoverLetter => "Cover letters",
        Category::Combined => "Combined documents",
        Category::JobDescription => "Job descriptions",
        Category::Other => "Other",
    }
}

/// One section per category; the user's documents first, then everyone
/// else's, each grouped by folder relative to `root`.
pub fn render_report(records: &[FileRecord], root: Option<&Path>) -> String {
    let owned = records
        .iter()
        .filter(|r| r.is_user_document == Some(true))
        .count();
    let unknown = records
        .iter()
        .filter(|r| r.ownership_confidence == Some(OwnershipConfidence::Unknown))
        .count();

    let mut lines = vec![
        "# Document Classification Report".to_string(),
        String::new(),
        format!(
            "Total files: {}. Your documents: {}. Unknown ownership: {}.",
            records.len(),
            owned,
            unknown
        ),
    ];

    for category in Category::ALL {
        let in_category: Vec<&FileRecord> = records
            .iter()
            .filter(|r| r.category.unwrap_or(Category::Other) == category)
            .collect();
        if in_category.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("## {} ({})", title(category), in_category.len()));

        let (mine, others): (Vec<&FileRecord>, Vec<&FileRecord>) = in_category
            .into_iter()
            .partition(|r| r.is_user_document == Some(true));
        push_group(&mut lines, "Your documents", &mine, root);
        push_group(&mut lines, "Other documents", &others, root);
    }

    lines.push(String::new());
    lines.join("\n")
}

fn push_group(
    lines: &mut Vec<String>,
    heading: &str,
    records: &[&FileRecord],
    root: Option<&Path>,
) {
    if records.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(format!("### {} ({})", heading, records.len()));

    let mut folders: BTreeMap<String, Vec<&FileRecord>> = BTreeMap::new();
    for &record in records {
        folders.entry(folder_of(record, root)).or_default().push(record);
    }
    for (folder, mut entries) in folders {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        lines.push(String::new());
        lines.push(format!("**{folder}/**"));
        for record in entries {
            lines.push(entry_line(record));
        }
    }
}

fn entry_line(record: &FileRecord) -> String {
    let mut line = format!("- {}", record.name);
    if record.ownership_confidence == Some(OwnershipConfidence::Unknown) {
        line.push_str(" _(ownership unknown)_");
    }
    if let Some(reason) = &record.classification_reason {
        line.push_str(&format!(" ({reason})"));
    }
    line
}

fn folder_of(record: &FileRecord, root: Option<&Path>) -> String {
    let parent = Path::new(&record.path).parent().unwrap_or(Path::new(""));
    let relative = root
        .and_then(|r| parent.strip_prefix(r).ok())
        .unwrap_or(parent);
    let shown = relative.to_string_lossy();
    if shown.is_empty() {
        ".".to_string()
    } else {
        shown.into_owned()
    }
}
