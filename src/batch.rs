//! Batch driver for `atlas.toml`
//!
//! Each job entry expands into one target per matched folder. Every target
//! is its own error boundary: a failure is recorded and the run moves on,
//! unless fail-fast was requested.

use crate::config::{AtlasConfig, DownscaleJob, LoadedConfig, PackJob, SheetJob, StripsJob};
use crate::downscale::{downscale_atlas, DownscaleOptions};
use crate::frames::frame_name;
use crate::natural::natural_cmp;
use crate::pager::{build_multi_atlas, PackMode, PagerOptions};
use crate::spritesheet::{build_sprite_sheet, SheetOptions};
use crate::strips::build_strips;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Status of a single batch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    Success,
    /// Not run (dry run or stopped by fail-fast)
    Skipped,
    Failed(String),
}

impl TargetStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, TargetStatus::Failed(_))
    }
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetStatus::Success => write!(f, "success"),
            TargetStatus::Skipped => write!(f, "skipped"),
            TargetStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running a single target.
#[derive(Debug, Clone)]
pub struct TargetResult {
    /// `<job>:<path>`, e.g. `pack:assets/species-01`
    pub target_id: String,
    pub status: TargetStatus,
    pub outputs: Vec<PathBuf>,
    pub duration: Duration,
}

impl TargetResult {
    pub fn success(target_id: String, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { target_id, status: TargetStatus::Success, outputs, duration }
    }

    pub fn skipped(target_id: String) -> Self {
        Self { target_id, status: TargetStatus::Skipped, outputs: vec![], duration: Duration::ZERO }
    }

    pub fn failed(target_id: String, error: String, duration: Duration) -> Self {
        Self { target_id, status: TargetStatus::Failed(error), outputs: vec![], duration }
    }
}

/// Result of a complete batch run.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub targets: Vec<TargetResult>,
    pub total_duration: Duration,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.targets.iter().filter(|r| r.status == TargetStatus::Success).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.targets.iter().filter(|r| r.status == TargetStatus::Skipped).count()
    }

    pub fn failed_count(&self) -> usize {
        self.targets.iter().filter(|r| r.status.is_failure()).count()
    }

    /// True when no target failed.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetResult> {
        self.targets.iter().filter(|r| r.status.is_failure())
    }

    /// Human-readable summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        let (success, skipped, failed) = (self.success_count(), self.skipped_count(), self.failed_count());
        let total = self.targets.len();

        if failed > 0 {
            lines.push(format!(
                "Batch failed: {} succeeded, {} skipped, {} failed ({} total)",
                success, skipped, failed, total
            ));
            for target in self.failures() {
                lines.push(format!("  - {}: {}", target.target_id, target.status));
            }
        } else {
            lines.push(format!(
                "Batch succeeded: {} built, {} skipped ({} total) in {:?}",
                success, skipped, total, self.total_duration
            ));
        }
        lines.join("\n")
    }
}

/// Flags for a batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Resolve and list targets without running them
    pub dry_run: bool,
    /// Stop at the first failed target
    pub fail_fast: bool,
}

/// Work for one resolved target.
#[derive(Debug, Clone)]
pub enum TargetJob {
    Pack { folder: PathBuf, mode: PackMode, options: PagerOptions },
    Downscale { folder: PathBuf, options: DownscaleOptions },
    Sheet { folder: PathBuf, output: PathBuf, options: SheetOptions },
    Strips { input_root: PathBuf, output_root: PathBuf, metadata: String },
    /// A pattern that could not be turned into folders
    Unresolved { reason: String },
}

/// One unit of batch work.
#[derive(Debug, Clone)]
pub struct Target {
    pub id: String,
    pub job: TargetJob,
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Directories matching `pattern` (relative to `base`), naturally ordered.
pub fn resolve_folders(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, String> {
    let full = resolve_path(base, Path::new(pattern));
    let full = full.to_string_lossy();
    let paths = glob::glob(&full).map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;

    let mut folders: Vec<PathBuf> = paths.filter_map(|p| p.ok()).filter(|p| p.is_dir()).collect();
    folders.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    if folders.is_empty() {
        return Err(format!("pattern '{}' matched no folders", pattern));
    }
    Ok(folders)
}

/// Expand `patterns` into one target per folder, or one failed target per
/// pattern that resolves to nothing.
fn expand<F>(kind: &str, base: &Path, patterns: &[String], targets: &mut Vec<Target>, make: F)
where
    F: Fn(PathBuf) -> TargetJob,
{
    for pattern in patterns {
        match resolve_folders(base, pattern) {
            Ok(folders) => {
                for folder in folders {
                    let id = format!("{}:{}", kind, folder.display());
                    targets.push(Target { id, job: make(folder) });
                }
            }
            Err(reason) => targets.push(Target {
                id: format!("{}:{}", kind, pattern),
                job: TargetJob::Unresolved { reason },
            }),
        }
    }
}

fn pack_targets(config: &AtlasConfig, base: &Path, job: &PackJob, targets: &mut Vec<Target>) {
    let options = PagerOptions {
        prefix: job.prefix.clone().unwrap_or_else(|| config.defaults.prefix.clone()),
        max_dim: job.max_dim.unwrap_or(config.defaults.max_dim),
        format: job.format.unwrap_or(config.defaults.format),
        delete_old_single: job.delete_old_single,
        ..PagerOptions::default()
    };
    expand("pack", base, &job.folders, targets, |folder| TargetJob::Pack {
        folder,
        mode: job.mode,
        options: options.clone(),
    });
}

fn downscale_targets(config: &AtlasConfig, base: &Path, job: &DownscaleJob, targets: &mut Vec<Target>) {
    let options = DownscaleOptions {
        scale: job.scale,
        prefix: job.prefix.clone().unwrap_or_else(|| config.defaults.prefix.clone()),
        label: job.label.clone(),
        format: job.format.unwrap_or(config.defaults.format),
    };
    expand("downscale", base, &job.folders, targets, |folder| TargetJob::Downscale {
        folder,
        options: options.clone(),
    });
}

fn sheet_targets(config: &AtlasConfig, base: &Path, job: &SheetJob, targets: &mut Vec<Target>) {
    let options = SheetOptions { cols: job.cols, max_dim: job.max_dim, frame_size: job.frame_size };
    let ext = job.format.unwrap_or(config.defaults.format).extension();
    let out_dir = job.out_dir.as_deref().map(|dir| resolve_path(base, dir));
    expand("sheet", base, &job.folders, targets, |folder| {
        let output = match &out_dir {
            Some(dir) => dir.join(format!("{}.{}", frame_name(&folder), ext)),
            None => folder.join(format!("{}.{}", config.defaults.prefix, ext)),
        };
        TargetJob::Sheet { folder, output, options: options.clone() }
    });
}

fn strips_target(base: &Path, job: &StripsJob) -> Target {
    let input_root = resolve_path(base, &job.input_root);
    Target {
        id: format!("strips:{}", input_root.display()),
        job: TargetJob::Strips {
            input_root,
            output_root: resolve_path(base, &job.output_root),
            metadata: job.metadata.clone(),
        },
    }
}

/// Resolve every job of a config into targets: pack, then downscale, then
/// sheet, then strips, each in file order.
pub fn plan(loaded: &LoadedConfig) -> Vec<Target> {
    let base = loaded.base_dir();
    let config = &loaded.config;
    let mut targets = Vec::new();
    for job in &config.pack {
        pack_targets(config, base, job, &mut targets);
    }
    for job in &config.downscale {
        downscale_targets(config, base, job, &mut targets);
    }
    for job in &config.sheet {
        sheet_targets(config, base, job, &mut targets);
    }
    for job in &config.strips {
        targets.push(strips_target(base, job));
    }
    targets
}

/// Run one target, returning its outputs or an error message.
fn run_target(job: &TargetJob) -> Result<Vec<PathBuf>, String> {
    match job {
        TargetJob::Pack { folder, mode, options } => {
            build_multi_atlas(folder, None, *mode, options).map(|r| r.outputs()).map_err(|e| e.to_string())
        }
        TargetJob::Downscale { folder, options } => downscale_atlas(folder, options)
            .map(|r| {
                let mut out = r.pages;
                out.push(r.index_path);
                out
            })
            .map_err(|e| e.to_string()),
        TargetJob::Sheet { folder, output, options } => build_sprite_sheet(folder, output, options)
            .map(|_| vec![output.clone(), output.with_extension("json")])
            .map_err(|e| e.to_string()),
        TargetJob::Strips { input_root, output_root, metadata } => {
            let report = build_strips(input_root, output_root, metadata).map_err(|e| e.to_string())?;
            if !report.failed.is_empty() {
                let names: Vec<String> =
                    report.failed.iter().map(|(name, e)| format!("{} ({})", name, e)).collect();
                return Err(format!("strips failed for {}", names.join(", ")));
            }
            let mut out: Vec<PathBuf> = report.built.values().map(|m| output_root.join(&m.file)).collect();
            out.extend(report.metadata_path);
            Ok(out)
        }
        TargetJob::Unresolved { reason } => Err(reason.clone()),
    }
}

/// Run all targets of a loaded config.
pub fn run_batch(loaded: &LoadedConfig, options: BatchOptions) -> BatchResult {
    let start = Instant::now();
    let targets = plan(loaded);
    info!(config = %loaded.path.display(), targets = targets.len(), "starting batch");

    let mut result = BatchResult::default();
    let mut stopped = false;
    for target in targets {
        if options.dry_run || stopped {
            result.targets.push(TargetResult::skipped(target.id));
            continue;
        }

        let target_start = Instant::now();
        match run_target(&target.job) {
            Ok(outputs) => {
                info!(target = %target.id, outputs = outputs.len(), "target done");
                result.targets.push(TargetResult::success(target.id, outputs, target_start.elapsed()));
            }
            Err(message) => {
                error!(target = %target.id, error = %message, "target failed");
                result.targets.push(TargetResult::failed(target.id, message, target_start.elapsed()));
                stopped = options.fail_fast;
            }
        }
    }

    result.total_duration = start.elapsed();
    result
}
