//! Known filename -> category checks against a classified inventory.

use crate::models::{Category, FileRecord};
use crate::patterns::Expectation;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub file_name: String,
    pub expected: Category,
    /// `None` when the record was never classified.
    pub actual: Option<Category>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpectationReport {
    pub passed: Vec<String>,
    pub failed: Vec<Mismatch>,
    pub missing: Vec<Expectation>,
}

impl ExpectationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.missing.is_empty()
    }

    pub fn checked(&self) -> usize {
        self.passed.len() + self.failed.len() + self.missing.len()
    }
}

/// A file name may appear in several folders; one matching copy is enough.
pub fn check_expectations(
    records: &[FileRecord],
    expectations: &[Expectation],
) -> ExpectationReport {
    let mut report = ExpectationReport::default();
    for expected in expectations {
        let candidates: Vec<&FileRecord> = records
            .iter()
            .filter(|r| r.name == expected.file_name)
            .collect();
        let Some(first) = candidates.first() else {
            report.missing.push(expected.clone());
            continue;
        };
        if candidates
            .iter()
            .any(|r| r.category == Some(expected.category))
        {
            report.passed.push(expected.file_name.clone());
        } else {
            report.failed.push(Mismatch {
                file_name: expected.file_name.clone(),
                expected: expected.category,
                actual: first.category,
            });
        }
    }
    report
}
