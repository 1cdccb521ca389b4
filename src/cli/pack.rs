//! Pack and downscale command implementations

use std::path::Path;
use std::process::ExitCode;

use super::{fail, SourceModeArgs, EXIT_SUCCESS};
use crate::downscale::{downscale_atlas, DownscaleOptions};
use crate::output::PageFormat;
use crate::pager::{build_multi_atlas, PackMode, PagerOptions};

impl SourceModeArgs {
    /// Selected mode; re-paging the existing sheet when neither flag is given.
    pub fn pack_mode(self) -> PackMode {
        if self.from_frames {
            PackMode::FromFrames
        } else {
            PackMode::FromSheet
        }
    }
}

/// Run the pack command
pub fn run_pack(
    input: &Path,
    out_dir: Option<&Path>,
    prefix: String,
    max_dim: u32,
    mode: SourceModeArgs,
    delete_old_single: bool,
    format: PageFormat,
) -> ExitCode {
    let options = PagerOptions { prefix, max_dim, format, delete_old_single, ..PagerOptions::default() };

    match build_multi_atlas(input, out_dir, mode.pack_mode(), &options) {
        Ok(report) => {
            println!(
                "{}: {} frames -> {} page(s) of {}x{} ({}x{} grid)",
                input.display(),
                report.frame_count,
                report.pages.len(),
                report.layout.page_w,
                report.layout.page_h,
                report.layout.cols,
                report.layout.rows
            );
            for page in &report.pages {
                println!("  {}", page.display());
            }
            println!("  {}", report.index_path.display());
            if let Some(deleted) = &report.deleted {
                println!("Removed {}", deleted.display());
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => fail(&e),
    }
}

/// Run the downscale command
pub fn run_downscale(
    folder: &Path,
    scale: f64,
    prefix: String,
    label: Option<String>,
    format: PageFormat,
) -> ExitCode {
    let options = DownscaleOptions { scale, prefix, label, format };

    match downscale_atlas(folder, &options) {
        Ok(report) => {
            println!(
                "{}: {} frames -> {} ({} page(s) at scale {})",
                folder.display(),
                report.frame_count,
                report.prefix,
                report.pages.len(),
                scale
            );
            println!("  {}", report.index_path.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => fail(&e),
    }
}
