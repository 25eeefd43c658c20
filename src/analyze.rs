//! Per-file analysis pipeline and the batch worker pool.
//!
//! Each file flows extract → match → score → report with no shared mutable
//! state; the catalog is borrowed read-only by every worker. Batch results
//! are collected in any order and sorted by path afterwards.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::ScanConfig;
use crate::engine::match_sample;
use crate::error::Result;
use crate::report::{BatchReport, FileReport};
use crate::sample::ByteSample;
use crate::verdict::{score, ArchiveContext};

/// Analyze a single file end to end.
///
/// Fails only on I/O (missing, unreadable, not a regular file); matching
/// and scoring cannot fail once a sample exists.
pub fn analyze_path(
    path: &Path,
    catalog: &Catalog,
    config: &ScanConfig,
    context: &ArchiveContext,
) -> Result<FileReport> {
    let span = tracing::info_span!("analyze", path = %path.display());
    let _guard = span.enter();

    let sample = ByteSample::extract(path, &config.io)?;
    debug!(size_bytes = sample.size_bytes, "extracted");
    let result = match_sample(&sample, catalog);
    let verdict = score(&sample, &result, context, &config.scoring);
    info!(
        actual_type = %verdict.actual_type,
        risk_score = verdict.risk_score,
        severity = verdict.severity.as_str(),
        mismatch = verdict.extension_mismatch,
        "verdict"
    );
    Ok(FileReport::from_verdict(
        &path.to_string_lossy(),
        &sample,
        &verdict,
    ))
}

/// Analyze a batch of files on a bounded worker pool.
///
/// Per-file failures become unanalyzable entries in the report and never
/// abort the batch. Archive context is per-file state owned by the
/// recursion collaborator, so batch entries are scored without it.
pub fn analyze_batch(paths: &[PathBuf], catalog: &Catalog, config: &ScanConfig) -> BatchReport {
    let run = || -> Vec<FileReport> {
        paths
            .par_iter()
            .map(|path| {
                analyze_path(path, catalog, config, &ArchiveContext::default()).unwrap_or_else(
                    |err| {
                        warn!(path = %path.display(), error = %err, "file unanalyzable");
                        FileReport::unanalyzable(&path.to_string_lossy(), &err)
                    },
                )
            })
            .collect()
    };

    let results = if config.batch.workers > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.batch.workers)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(err) => {
                warn!(error = %err, "worker pool unavailable, using default pool");
                run()
            }
        }
    } else {
        run()
    };

    BatchReport::new(results)
}
