//! Session mismatch diagnostics.
//!
//! A [`MismatchReport`] is the diff between the session set a consumer
//! expects and the one actually stored. It renders two ways: a structured
//! field map for machines and a bounded markdown document for humans.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::session_set::SessionSet;

/// Entries listed per section in the markdown document.
pub const DOCUMENT_LIST_CAP: usize = 10;

/// Above this many missing sessions the recommendation calls out a likely
/// holiday or source-data problem.
pub const MANY_MISSING_THRESHOLD: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchReport {
    pub is_valid: bool,
    pub expected_count: usize,
    pub actual_count: usize,
    pub tolerance: usize,
    /// Expected but not stored.
    pub missing: Vec<NaiveDate>,
    /// Stored but not expected.
    pub extra: Vec<NaiveDate>,
    pub message: String,
    pub recommendations: Vec<String>,
}

/// Diff `expected` against `actual`.
///
/// Valid iff at most `tolerance` sessions are missing and none are extra.
pub fn compare(expected: &SessionSet, actual: &SessionSet, tolerance: usize) -> MismatchReport {
    let missing = expected.difference(actual);
    let extra = actual.difference(expected);
    let is_valid = missing.len() <= tolerance && extra.is_empty();

    let message = if missing.is_empty() && extra.is_empty() {
        format!("Sessions match exactly ({} sessions)", expected.len())
    } else {
        format!(
            "{} missing, {} extra (expected {}, actual {}, tolerance {})",
            missing.len(),
            extra.len(),
            expected.len(),
            actual.len(),
            tolerance
        )
    };
    let recommendations = recommend(&missing, &extra);

    MismatchReport {
        is_valid,
        expected_count: expected.len(),
        actual_count: actual.len(),
        tolerance,
        missing,
        extra,
        message,
        recommendations,
    }
}

fn recommend(missing: &[NaiveDate], extra: &[NaiveDate]) -> Vec<String> {
    let mut out = Vec::new();
    if !missing.is_empty() {
        out.push(format!(
            "Re-ingest with gap-filling enabled to synthesize {} missing session(s)",
            missing.len()
        ));
        if missing.len() > MANY_MISSING_THRESHOLD {
            out.push(
                "Large number of missing sessions: likely holiday/source-data issue".to_string(),
            );
        }
    }
    if !extra.is_empty() {
        out.push(format!(
            "Verify the calendar definition includes {} extra date(s) present in stored data",
            extra.len()
        ));
    }
    out
}

impl MismatchReport {
    /// Field map for machine consumption.
    pub fn to_structured(&self) -> serde_json::Value {
        // Serialize on plain fields and chrono dates cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Markdown document with each date list capped at [`DOCUMENT_LIST_CAP`].
    pub fn to_document(&self) -> String {
        self.to_document_capped(DOCUMENT_LIST_CAP)
    }

    /// Markdown document listing at most `cap` dates per section.
    pub fn to_document_capped(&self, cap: usize) -> String {
        let status = if self.is_valid { "PASS" } else { "FAIL" };
        let mut s = String::new();
        s.push_str("# Session Validation Report\n\n");
        s.push_str(&format!("**Status:** {status}\n\n"));
        s.push_str(&format!("{}\n\n", self.message));
        s.push_str("| Metric | Value |\n|---|---|\n");
        s.push_str(&format!("| Expected sessions | {} |\n", self.expected_count));
        s.push_str(&format!("| Actual sessions | {} |\n", self.actual_count));
        s.push_str(&format!("| Missing | {} |\n", self.missing.len()));
        s.push_str(&format!("| Extra | {} |\n", self.extra.len()));
        s.push_str(&format!("| Tolerance | {} |\n", self.tolerance));

        push_date_section(&mut s, "Missing sessions", &self.missing, cap);
        push_date_section(&mut s, "Extra sessions", &self.extra, cap);

        if !self.recommendations.is_empty() {
            s.push_str("\n## Recommendations\n\n");
            for r in &self.recommendations {
                s.push_str(&format!("- {r}\n"));
            }
        }
        s
    }
}

fn push_date_section(s: &mut String, title: &str, dates: &[NaiveDate], cap: usize) {
    if dates.is_empty() {
        return;
    }
    s.push_str(&format!("\n## {title} ({})\n\n", dates.len()));
    for d in dates.iter().take(cap) {
        s.push_str(&format!("- {d}\n"));
    }
    if dates.len() > cap {
        s.push_str(&format!("- ... +{} more\n", dates.len() - cap));
    }
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_document())
    }
}
