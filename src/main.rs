//! delta-atlas - command-line tool for packing and paging spritesheet atlases

use std::process::ExitCode;

use delta_atlas::cli;

fn main() -> ExitCode {
    cli::run()
}
