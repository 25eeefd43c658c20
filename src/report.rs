//! Verdict reports: the per-file record handed to reporting and alerting
//! collaborators, plus the batch envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::ByteSample;
use crate::verdict::{RiskVerdict, Severity};

/// Action a consumer should take, derived from severity alone.
pub fn recommended_action(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "log",
        Severity::Medium => "review",
        Severity::High => "quarantine_review",
        Severity::Critical => "quarantine_execute_analysis",
    }
}

/// One analyzed file, in the wire schema consumed by report writers and
/// webhook senders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub file_path: String,
    pub file_hash_md5: String,
    pub file_hash_sha256: String,
    /// Declared extension; empty when the file has none.
    pub declared_type: String,
    pub actual_type: String,
    pub risk_level: String,
    pub confidence: f32,
    pub evasion_technique: Option<String>,
    pub recommended_action: String,
    /// Set only for unanalyzable files (per-file I/O failures in a batch).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// Sentinel `actual_type` for files that could not be read.
pub const UNANALYZABLE_TYPE: &str = "UNANALYZABLE";

impl FileReport {
    pub fn from_verdict(file_path: &str, sample: &ByteSample, verdict: &RiskVerdict) -> Self {
        Self {
            file_path: file_path.to_string(),
            file_hash_md5: sample.md5.clone(),
            file_hash_sha256: sample.sha256.clone(),
            declared_type: sample.declared_extension.clone(),
            actual_type: verdict.actual_type.clone(),
            risk_level: verdict.severity.as_str().to_string(),
            confidence: verdict.confidence,
            evasion_technique: verdict.evasion_technique.map(|t| t.as_str().to_string()),
            recommended_action: recommended_action(verdict.severity).to_string(),
            error: None,
        }
    }

    /// Record for a file the extractor could not read. The batch continues;
    /// the failure is never silently dropped. There is no verdict to derive
    /// an action from, so an unreadable file always asks for review.
    pub fn unanalyzable(file_path: &str, error: &crate::error::ScanError) -> Self {
        Self {
            file_path: file_path.to_string(),
            file_hash_md5: String::new(),
            file_hash_sha256: String::new(),
            declared_type: String::new(),
            actual_type: UNANALYZABLE_TYPE.to_string(),
            risk_level: "unknown".to_string(),
            confidence: 0.0,
            evasion_technique: None,
            recommended_action: "review".to_string(),
            error: Some(error.to_string()),
        }
    }

    /// CSV header matching [`FileReport::to_csv_row`].
    pub fn csv_header() -> &'static str {
        "file_path,file_hash_md5,file_hash_sha256,declared_type,actual_type,\
         risk_level,confidence,evasion_technique,recommended_action"
    }

    /// One CSV row; fields with separators or quotes are quoted.
    pub fn to_csv_row(&self) -> String {
        let fields = [
            self.file_path.as_str(),
            self.file_hash_md5.as_str(),
            self.file_hash_sha256.as_str(),
            self.declared_type.as_str(),
            self.actual_type.as_str(),
            self.risk_level.as_str(),
            &format!("{:.4}", self.confidence),
            self.evasion_technique.as_deref().unwrap_or(""),
            self.recommended_action.as_str(),
        ]
        .map(csv_escape);
        fields.join(",")
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Envelope for a batch scan: per-file reports sorted by path plus summary
/// counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub scanned: usize,
    /// Files at high or critical severity.
    pub flagged: usize,
    /// Files that could not be read.
    pub failed: usize,
    pub results: Vec<FileReport>,
}

impl BatchReport {
    /// Build the envelope from collected reports; sorts by path so batch
    /// output is deterministic regardless of worker completion order.
    pub fn new(mut results: Vec<FileReport>) -> Self {
        results.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        let flagged = results
            .iter()
            .filter(|r| r.risk_level == "high" || r.risk_level == "critical")
            .count();
        let failed = results.iter().filter(|r| r.error.is_some()).count();
        Self {
            generated_at: Utc::now(),
            scanned: results.len(),
            flagged,
            failed,
            results,
        }
    }
}
