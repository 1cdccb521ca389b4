//! delta-atlas - spritesheet atlas packing and paging
//!
//! This library provides functionality to:
//! - Pack uniform-size frame sequences into multi-page atlases with a JSON frame index
//! - Re-page an existing single-sheet or multi-page atlas at a new page size
//! - Derive downscaled page variants with premultiplied-alpha resampling
//! - Build single grid sheets and horizontal animation strips
//! - Run all of the above over many folders from an `atlas.toml`

pub mod batch;
pub mod cli;
pub mod compose;
pub mod config;
pub mod downscale;
pub mod error;
pub mod frames;
pub mod index;
pub mod layout;
pub mod natural;
pub mod output;
pub mod pager;
pub mod source;
pub mod spritesheet;
pub mod strips;

pub use error::{AtlasError, ErrorKind, Result};
