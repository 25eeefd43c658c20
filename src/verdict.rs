//! Anomaly scoring: turns a match result into a risk verdict.
//!
//! `score` is a pure function of its inputs. It never fails; malformed
//! inputs are rejected earlier by the extractor and the catalog loader.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::engine::MatchResult;
use crate::sample::ByteSample;

/// Sentinel type id for samples no catalog rule matched.
pub const UNKNOWN_TYPE: &str = "UNKNOWN";

/// Extensions that make a "harmless document/image/text" claim. A high or
/// critical format hiding behind one of these draws the disguise penalty.
/// Fixed policy set; kept closed on purpose so the check cannot drift into
/// scattered string tests.
#[rustfmt::skip]
const BENIGN_EXTENSIONS: &[&str] = &[
    // documents and text
    "txt", "log", "md", "csv", "rtf", "pdf", "doc", "docx", "xls", "xlsx",
    "ppt", "pptx", "odt", "ods", "odp",
    // images
    "jpg", "jpeg", "jfif", "png", "gif", "bmp", "svg", "ico", "webp",
    "tif", "tiff", "heic",
];

/// True if the extension claims to be a harmless document, image, or text
/// file.
pub fn is_benign_extension(extension: &str) -> bool {
    BENIGN_EXTENSIONS.contains(&extension)
}

/// Severity band derived from the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    fn from_score(score: u32, thresholds: &crate::config::ScoreThresholds) -> Self {
        if score >= thresholds.critical {
            Severity::Critical
        } else if score >= thresholds.high {
            Severity::High
        } else if score >= thresholds.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Evasion label attached to a verdict when a mismatch is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvasionTechnique {
    ExtensionSpoofing,
}

impl EvasionTechnique {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvasionTechnique::ExtensionSpoofing => "extension_spoofing",
        }
    }
}

/// Contextual flags supplied by the external archive-recursion
/// collaborator. The collaborator owns depth/size limits and cycle safety;
/// the scorer only consumes its boolean conclusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveContext {
    /// An archive was recursively inspected and held an executable entry.
    pub contains_embedded_executable: bool,
}

/// Final classification for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    /// Best-matched type id, or [`UNKNOWN_TYPE`].
    pub actual_type: String,
    pub extension_mismatch: bool,
    /// In [0, 100].
    pub risk_score: u32,
    pub severity: Severity,
    /// Top candidate's confidence, 0 when unknown.
    pub confidence: f32,
    /// Present iff a mismatch was detected.
    pub evasion_technique: Option<EvasionTechnique>,
}

/// Score one sample. Deterministic and side-effect free: the same inputs
/// always produce the same verdict.
pub fn score(
    sample: &ByteSample,
    result: &MatchResult<'_>,
    context: &ArchiveContext,
    config: &ScoringConfig,
) -> RiskVerdict {
    let declared = sample.declared_extension.as_str();
    let mut total: u32 = 0;

    let (actual_type, extension_mismatch, confidence) = match result.best() {
        None => {
            total += config.unknown_format_weight;
            // An unmatched file with no extension makes no claim at all.
            (UNKNOWN_TYPE.to_string(), !declared.is_empty(), 0.0)
        }
        Some(top) => {
            // "No extension" is only a mismatch when the format claims
            // extensions; a rule with none recognizes no names either way.
            let mismatch = if declared.is_empty() {
                !top.rule.known_extensions.is_empty()
            } else {
                !top.rule.claims_extension(declared)
            };
            if mismatch {
                total += config.extension_mismatch_weight;
            }
            if top.rule.risk_level.is_dangerous() && is_benign_extension(declared) {
                total += config.benign_disguise_weight;
            }
            (top.rule.type_id.clone(), mismatch, top.confidence)
        }
    };

    if context.contains_embedded_executable {
        total += config.embedded_executable_weight;
    }

    let risk_score = total.min(100);
    RiskVerdict {
        actual_type,
        extension_mismatch,
        risk_score,
        severity: Severity::from_score(risk_score, &config.thresholds),
        confidence,
        evasion_technique: extension_mismatch.then_some(EvasionTechnique::ExtensionSpoofing),
    }
}
