//! Batch driver: converts every top-level scene of each collection and
//! copies auxiliary assets (meshes, textures) next to the output.
//!
//! Failures are per top-level file; the rest of the batch keeps going.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{error, info, instrument, warn};

use pbrtjson_shared::{AssetRule, BatchConfig, ConvertError, Diagnostics, Result};

use crate::convert::{convert_file, output_path_for};
use crate::fs::SceneFs;

/// A top-level source that failed to convert.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub source: PathBuf,
    pub error: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Artifacts of top-level sources, in processing order.
    pub converted: Vec<PathBuf>,
    /// Every artifact written, includes counted.
    pub artifacts_written: usize,
    /// Sources excluded by an ignore pattern.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<BatchFailure>,
    pub assets_copied: usize,
    /// Collection subdirectories with no asset rule.
    pub skipped_dirs: Vec<PathBuf>,
    pub diagnostics: Diagnostics,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when starting a collection.
    fn phase(&self, name: &str);
    /// Called after a top-level source is converted.
    fn file_converted(&self, source: &Path, current: usize, total: usize);
    /// Called when a top-level source fails.
    fn file_failed(&self, source: &Path, error: &ConvertError);
    /// Called when the batch completes.
    fn done(&self, report: &BatchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_converted(&self, _source: &Path, _current: usize, _total: usize) {}
    fn file_failed(&self, _source: &Path, _error: &ConvertError) {}
    fn done(&self, _report: &BatchReport) {}
}

/// Asset rule with its file-name pattern compiled.
struct CompiledAssetRule<'a> {
    rule: &'a AssetRule,
    pattern: Option<Regex>,
}

/// Run the batch over every configured collection.
///
/// Only configuration problems (invalid regexes) abort the run.
#[instrument(skip_all, fields(
    source_root = %config.source_root.display(),
    output_root = %config.output_root.display(),
    collections = config.collections.len(),
))]
pub fn run_batch(
    fs: &dyn SceneFs,
    config: &BatchConfig,
    progress: &dyn ProgressReporter,
) -> Result<BatchReport> {
    let ignore = compile_patterns(&config.ignore_patterns)?;
    let assets = config
        .assets
        .iter()
        .map(compile_asset_rule)
        .collect::<Result<Vec<_>>>()?;

    let mut report = BatchReport::default();

    for collection in &config.collections {
        progress.phase(collection);
        let source_dir = config.source_root.join(collection);
        let output_dir = config.output_root.join(collection);

        if !fs.is_dir(&source_dir) {
            warn!(dir = %source_dir.display(), "collection not found, skipping");
            continue;
        }

        let sources = match top_level_sources(fs, &source_dir, &config.convert.source_extension) {
            Ok(sources) => sources,
            Err(e) => {
                record_failure(&mut report, progress, &source_dir, e);
                continue;
            }
        };

        let total = sources.len();
        for (idx, source) in sources.iter().enumerate() {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let relative = format!("{collection}/{name}");
            if ignore.iter().any(|re| re.is_match(&relative)) {
                info!(source = %relative, "ignored by pattern");
                report.skipped.push(source.clone());
                continue;
            }

            info!(source = %source.display(), "parsing");
            let output = output_path_for(source, &output_dir, &config.convert);
            match convert_file(fs, &config.convert, source, &output) {
                Ok(outcome) => {
                    report.artifacts_written += outcome.written.len();
                    report.diagnostics.merge(&outcome.diagnostics);
                    report.converted.push(outcome.output);
                    progress.file_converted(source, idx + 1, total);
                }
                Err(e) => record_failure(&mut report, progress, source, e),
            }
        }

        if let Err(e) = copy_assets(fs, &source_dir, &output_dir, &assets, &mut report) {
            record_failure(&mut report, progress, &source_dir, e);
        }
    }

    info!(
        converted = report.converted.len(),
        artifacts = report.artifacts_written,
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        assets = report.assets_copied,
        "batch complete"
    );
    progress.done(&report);

    Ok(report)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| ConvertError::config(format!("invalid pattern {pattern:?}: {e}")))
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

fn compile_asset_rule(rule: &AssetRule) -> Result<CompiledAssetRule<'_>> {
    let pattern = rule.pattern.as_deref().map(compile_pattern).transpose()?;
    Ok(CompiledAssetRule { rule, pattern })
}

fn record_failure(
    report: &mut BatchReport,
    progress: &dyn ProgressReporter,
    source: &Path,
    e: ConvertError,
) {
    error!(source = %source.display(), error = %e, "conversion failed");
    progress.file_failed(source, &e);
    report.failed.push(BatchFailure {
        source: source.to_path_buf(),
        error: e.to_string(),
    });
}

/// Source files directly inside `dir`, sorted.
fn top_level_sources(fs: &dyn SceneFs, dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    Ok(fs
        .list_dir(dir)?
        .into_iter()
        .filter(|p| !fs.is_dir(p))
        .filter(|p| p.extension().is_some_and(|ext| ext == extension))
        .collect())
}

/// Copy each collection subdirectory that has an asset rule; log the rest.
fn copy_assets(
    fs: &dyn SceneFs,
    source_dir: &Path,
    output_dir: &Path,
    rules: &[CompiledAssetRule<'_>],
    report: &mut BatchReport,
) -> Result<()> {
    for subdir in fs.list_dir(source_dir)? {
        if !fs.is_dir(&subdir) {
            continue;
        }
        let Some(name) = subdir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        let Some(rule) = rules.iter().find(|r| r.rule.dir == name) else {
            warn!(dir = %subdir.display(), "skipping directory without asset rule");
            report.skipped_dirs.push(subdir);
            continue;
        };

        let copied = copy_dir(fs, &subdir, &output_dir.join(&name), rule)?;
        info!(dir = %subdir.display(), copied, "copied assets");
        report.assets_copied += copied;
    }
    Ok(())
}

fn copy_dir(
    fs: &dyn SceneFs,
    from: &Path,
    to: &Path,
    rule: &CompiledAssetRule<'_>,
) -> Result<usize> {
    let mut copied = 0;
    for entry in fs.list_dir(from)? {
        let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let target = to.join(&name);

        if fs.is_dir(&entry) {
            if rule.rule.recursive {
                copied += copy_dir(fs, &entry, &target, rule)?;
            }
            continue;
        }

        if rule.pattern.as_ref().is_some_and(|re| !re.is_match(&name)) {
            continue;
        }
        fs.copy(&entry, &target)?;
        copied += 1;
    }
    Ok(copied)
}
