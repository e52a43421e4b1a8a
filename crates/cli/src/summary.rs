//! Plain-text renderings of stage results for the terminal.

use dossier_core::expectations::ExpectationReport;
use dossier_core::models::Category;
use dossier_core::pipeline::ClassificationSummary;

pub fn classification_line(summary: &ClassificationSummary) -> String {
    let counts: Vec<String> = Category::ALL
        .iter()
        .map(|c| format!("{} {}", c, summary.by_category.get(c).copied().unwrap_or(0)))
        .collect();
    format!(
        "classified {} files ({}); yours {}, unknown ownership {}, extraction failures {}, skipped {}",
        summary.total,
        counts.join(", "),
        summary.user_documents,
        summary.unknown_ownership,
        summary.extraction_failures,
        summary.skipped.len()
    )
}

pub fn expectation_lines(report: &ExpectationReport) -> Vec<String> {
    let mut lines = vec![format!(
        "expectations: {} checked, {} passed, {} failed, {} missing",
        report.checked(),
        report.passed.len(),
        report.failed.len(),
        report.missing.len()
    )];
    for m in &report.failed {
        let actual = m.actual.map(|c| c.as_str()).unwrap_or("unclassified");
        lines.push(format!("  FAIL {}: expected {}, got {}", m.file_name, m.expected, actual));
    }
    for e in &report.missing {
        lines.push(format!("  MISSING {} (expected {})", e.file_name, e.category));
    }
    lines
}
