//! Configuration for the scan pipeline.
//!
//! Provides centralized configuration for all scanner components with
//! sensible defaults. Every knob is serde-loadable so deployments can tune
//! the policy values (weights, thresholds, limits) without a rebuild.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Master configuration for the scan pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// I/O limits for sample extraction.
    pub io: IoConfig,
    /// Anomaly scoring weights and severity thresholds.
    pub scoring: ScoringConfig,
    /// Batch worker pool configuration.
    pub batch: BatchConfig,
}

impl ScanConfig {
    /// Load a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults, so a partial override
    /// file is valid.
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&data)?;
        config.scoring.thresholds.validate()?;
        Ok(config)
    }
}

/// I/O limits applied while extracting a byte sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Number of leading bytes retained for signature matching.
    pub max_prefix_len: usize,
    /// Files larger than this are rejected before hashing.
    pub max_file_size: u64,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            max_prefix_len: 512,
            max_file_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Additive weights applied by the anomaly scorer.
///
/// The defaults encode the shipped policy; the sum is clamped to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// No catalog rule matched the sample.
    pub unknown_format_weight: u32,
    /// Declared extension disagrees with the matched format.
    pub extension_mismatch_weight: u32,
    /// High/critical format hiding under a benign extension.
    pub benign_disguise_weight: u32,
    /// Archive collaborator found an embedded executable.
    pub embedded_executable_weight: u32,
    /// Severity cutoffs over the final score.
    pub thresholds: ScoreThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            unknown_format_weight: 25,
            extension_mismatch_weight: 40,
            benign_disguise_weight: 50,
            embedded_executable_weight: 35,
            thresholds: ScoreThresholds::default(),
        }
    }
}

/// Lower bounds of the medium/high/critical severity bands.
///
/// Scores below `medium` are low severity. The bands must be ordered;
/// `validate` runs on every config load, so a misordered file is rejected
/// before any scoring happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreThresholds {
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            medium: 25,
            high: 50,
            critical: 75,
        }
    }
}

impl ScoreThresholds {
    /// Check band ordering. Misordered thresholds are a config error, not a
    /// scoring error.
    pub fn validate(&self) -> Result<()> {
        if self.medium < self.high && self.high < self.critical && self.critical <= 100 {
            Ok(())
        } else {
            Err(ScanError::InvalidConfig(format!(
                "severity thresholds must be ordered and <= 100: {}/{}/{}",
                self.medium, self.high, self.critical
            )))
        }
    }
}

/// Batch worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of parallel workers; 0 selects the rayon default
    /// (one per logical CPU).
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { workers: 0 }
    }
}
