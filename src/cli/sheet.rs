//! Sheet and strips command implementations

use std::path::Path;
use std::process::ExitCode;

use super::{fail, EXIT_ERROR, EXIT_SUCCESS};
use crate::spritesheet::{build_sprite_sheet, SheetOptions};
use crate::strips::build_strips;

/// Run the sheet command
pub fn run_sheet(
    input: &Path,
    output: &Path,
    cols: Option<u32>,
    max_dim: u32,
    frame_size: Option<u32>,
) -> ExitCode {
    let options = SheetOptions { cols, max_dim, frame_size };

    match build_sprite_sheet(input, output, &options) {
        Ok(meta) => {
            println!(
                "{}: {} frames, {}x{} grid of {}x{} -> {}x{}",
                output.display(),
                meta.frame_count,
                meta.columns,
                meta.rows,
                meta.frame_width,
                meta.frame_height,
                meta.sheet_width,
                meta.sheet_height
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => fail(&e),
    }
}

/// Run the strips command
pub fn run_strips(input_root: &Path, output_root: &Path, metadata: &str) -> ExitCode {
    let report = match build_strips(input_root, output_root, metadata) {
        Ok(report) => report,
        Err(e) => return fail(&e),
    };

    for (name, meta) in &report.built {
        println!("{}: {} frames -> {}", name, meta.frame_count, meta.file);
    }
    for name in &report.skipped {
        println!("{}: skipped (no frames)", name);
    }
    for (name, err) in &report.failed {
        eprintln!("{}: {}", name, err);
    }
    if let Some(path) = &report.metadata_path {
        println!("Metadata: {}", path.display());
    }

    if report.failed.is_empty() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}
