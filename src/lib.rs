//! filesig: file format identification and extension-spoofing detection.
//!
//! The core pipeline runs in three pure stages over an immutable
//! [`catalog::Catalog`]:
//!
//! 1. [`sample::ByteSample::extract`] reads a bounded header prefix and
//!    hashes the full content in one streaming pass;
//! 2. [`engine::match_sample`] ranks catalog signatures against the prefix;
//! 3. [`verdict::score`] turns the match (or its absence) into a
//!    [`verdict::RiskVerdict`].
//!
//! [`analyze`] wires the stages together per file and across batches;
//! [`report`] renders verdicts in the wire schema consumed by external
//! reporting and alerting collaborators.

pub mod analyze;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod report;
pub mod sample;
pub mod verdict;

pub use analyze::{analyze_batch, analyze_path};
pub use catalog::{Catalog, RiskLevel, SignaturePattern, SignatureRule};
pub use config::ScanConfig;
pub use engine::{match_sample, Candidate, MatchResult};
pub use error::{Result, ScanError};
pub use report::{BatchReport, FileReport};
pub use sample::ByteSample;
pub use verdict::{score, ArchiveContext, EvasionTechnique, RiskVerdict, Severity};
