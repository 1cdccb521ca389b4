//! Batch command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::batch::{self, BatchOptions, TargetStatus};
use crate::config::{load_config, ConfigError};

/// Run the batch command
pub fn run_batch(config: Option<&Path>, dry_run: bool, fail_fast: bool) -> ExitCode {
    let loaded = match load_config(config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return match e {
                ConfigError::NotFound(_) | ConfigError::Io { .. } => ExitCode::from(EXIT_INVALID_ARGS),
                _ => ExitCode::from(EXIT_ERROR),
            };
        }
    };

    let result = batch::run_batch(&loaded, BatchOptions { dry_run, fail_fast });

    if dry_run {
        println!("Dry run - would run {} target(s):", result.targets.len());
        for target in &result.targets {
            println!("  {}", target.target_id);
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    for target in &result.targets {
        match &target.status {
            TargetStatus::Success => println!("ok    {} ({} files)", target.target_id, target.outputs.len()),
            TargetStatus::Skipped => println!("skip  {}", target.target_id),
            TargetStatus::Failed(_) => {}
        }
    }
    println!("{}", result.summary());

    if result.is_success() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}
