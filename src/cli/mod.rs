//! Command-line interface implementation
//!
//! This module provides the CLI entry point, installs logging and dispatches
//! to submodules for specific command implementations.

mod batch;
mod pack;
mod sheet;

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;

use crate::error::{AtlasError, ErrorKind};
use crate::output::PageFormat;

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// delta-atlas - pack frame sequences into paged spritesheet atlases
#[derive(Parser)]
#[command(name = "delta-atlas")]
#[command(about = "Pack frame sequences into multi-page atlases, downscaled variants and sprite sheets")]
#[command(version)]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where `pack` reads its frames from.
#[derive(Args, Debug, Clone, Copy)]
#[group(multiple = false)]
pub struct SourceModeArgs {
    /// Re-page an existing atlas through its sheet.json (default)
    #[arg(long)]
    pub from_sheet: bool,

    /// Build from the individual frame images in the folder
    #[arg(long)]
    pub from_frames: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a multi-page atlas (pages + <prefix>.json) for one folder
    Pack {
        /// Folder holding frames, or a sheet.json and its image
        input: PathBuf,

        /// Output directory (default: the input folder)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Page/index prefix
        #[arg(long, default_value = crate::frames::DEFAULT_PREFIX)]
        prefix: String,

        /// Maximum page width/height
        #[arg(long, default_value_t = crate::pager::DEFAULT_MAX_DIM, value_parser = clap::value_parser!(u32).range(1..))]
        max_dim: u32,

        #[command(flatten)]
        mode: SourceModeArgs,

        /// Remove the old single sheet after the new atlas is written
        #[arg(long)]
        delete_old_single: bool,

        /// Page image format
        #[arg(long, value_enum, default_value_t = PageFormat::Webp)]
        format: PageFormat,
    },

    /// Write a reduced-resolution variant of a multi-page atlas
    Downscale {
        /// Folder holding <prefix>.json and its pages
        folder: PathBuf,

        /// Scale factor in (0, 1]
        #[arg(long, default_value_t = 0.5)]
        scale: f64,

        /// Prefix of the source atlas
        #[arg(long, default_value = crate::frames::DEFAULT_PREFIX)]
        prefix: String,

        /// Variant label (default: scaled largest page edge, e.g. 1024)
        #[arg(long)]
        label: Option<String>,

        /// Page image format
        #[arg(long, value_enum, default_value_t = PageFormat::Webp)]
        format: PageFormat,
    },

    /// Build one grid sheet from a folder of frames
    Sheet {
        /// Folder of PNG/WebP frames
        input: PathBuf,

        /// Output image (.webp or .png); a .json sidecar is written next to it
        output: PathBuf,

        /// Force the number of columns
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        cols: Option<u32>,

        /// Maximum sheet width/height
        #[arg(long, default_value_t = crate::spritesheet::DEFAULT_SHEET_MAX_DIM, value_parser = clap::value_parser!(u32).range(1..))]
        max_dim: u32,

        /// Target size of each frame's larger edge
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        frame_size: Option<u32>,
    },

    /// Build horizontal strips for every animation folder under a root
    Strips {
        /// Root whose subfolders hold WebP frames
        input_root: PathBuf,

        /// Directory for strips and the metadata file
        output_root: PathBuf,

        /// Metadata file name
        #[arg(long, default_value = crate::strips::DEFAULT_METADATA_NAME)]
        metadata: String,
    },

    /// Run every job in an atlas.toml
    Batch {
        /// Config file (default: atlas.toml found upward from the current directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// List targets without running them
        #[arg(long)]
        dry_run: bool,

        /// Stop at the first failed target
        #[arg(long)]
        fail_fast: bool,
    },
}

fn level_filter(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::INFO,
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    // Ignore a subscriber that is already installed
    let _ = tracing_subscriber::fmt()
        .with_max_level(level_filter(verbose, quiet))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Report an operation error and pick the exit code for it.
pub(crate) fn fail(err: &AtlasError) -> ExitCode {
    eprintln!("Error: {}", err);
    match err.kind() {
        ErrorKind::MissingInput => ExitCode::from(EXIT_INVALID_ARGS),
        _ => ExitCode::from(EXIT_ERROR),
    }
}

/// Parse arguments and run the selected command.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Pack { input, out_dir, prefix, max_dim, mode, delete_old_single, format } => {
            pack::run_pack(&input, out_dir.as_deref(), prefix, max_dim, mode, delete_old_single, format)
        }
        Commands::Downscale { folder, scale, prefix, label, format } => {
            pack::run_downscale(&folder, scale, prefix, label, format)
        }
        Commands::Sheet { input, output, cols, max_dim, frame_size } => {
            sheet::run_sheet(&input, &output, cols, max_dim, frame_size)
        }
        Commands::Strips { input_root, output_root, metadata } => {
            sheet::run_strips(&input_root, &output_root, &metadata)
        }
        Commands::Batch { config, dry_run, fail_fast } => batch::run_batch(config.as_deref(), dry_run, fail_fast),
    }
}
