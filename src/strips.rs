//! Horizontal strip sheets, one per animation folder
//!
//! Each subfolder of an input root holds the WebP frames of one animation.
//! Every animation becomes a single-row `<name>.webp` and a master metadata
//! file maps animation names to their strips.

use crate::error::{AtlasError, Result};
use crate::frames::{check_frame_size, frame_name, image_dimensions, list_with_extension};
use crate::natural::sort_paths_natural;
use crate::output::{load_rgba, save_image, save_json, PageFormat};
use crate::spritesheet::render_grid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default name of the master metadata file.
pub const DEFAULT_METADATA_NAME: &str = "spritesheet_meta.json";

/// Metadata entry for one strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripMeta {
    pub file: String,
    pub frame_count: usize,
    pub frame_width: u32,
    pub frame_height: u32,
    pub layout: String,
}

/// Outcome of a strips run.
#[derive(Debug, Default)]
pub struct StripsReport {
    pub built: BTreeMap<String, StripMeta>,
    /// Folders with no frames
    pub skipped: Vec<String>,
    pub failed: Vec<(String, AtlasError)>,
    /// Master metadata path, if anything was built
    pub metadata_path: Option<PathBuf>,
}

/// Build one horizontal strip from the WebP frames of `folder`.
pub fn build_strip(folder: &Path, output_root: &Path) -> Result<Option<StripMeta>> {
    let frames = list_with_extension(folder, "webp")?;
    let Some(first) = frames.first() else {
        return Ok(None);
    };
    let (fw, fh) = image_dimensions(first)?;
    if fw == 0 || fh == 0 {
        return Err(AtlasError::InvalidFrameSize { width: fw, height: fh });
    }

    let count = frames.len() as u32;
    let tiles = frames.iter().map(|path| -> Result<image::RgbaImage> {
        let image = load_rgba(path)?;
        check_frame_size(path, image.dimensions(), (fw, fh))?;
        Ok(image)
    });
    let strip = render_grid(tiles, count, 1, fw, fh)?;

    let name = frame_name(folder);
    let file = format!("{}.webp", name);
    save_image(&strip, &output_root.join(&file), PageFormat::Webp)?;

    Ok(Some(StripMeta {
        file,
        frame_count: frames.len(),
        frame_width: fw,
        frame_height: fh,
        layout: "horizontal".to_string(),
    }))
}

/// Build strips for every subfolder of `input_root`.
///
/// A folder that fails is recorded and skipped. The metadata file is only
/// written when at least one strip was built.
pub fn build_strips(input_root: &Path, output_root: &Path, metadata_name: &str) -> Result<StripsReport> {
    if !input_root.is_dir() {
        return Err(AtlasError::MissingSource(input_root.to_path_buf()));
    }
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(input_root).map_err(|e| AtlasError::io(input_root, e))? {
        let path = entry.map_err(|e| AtlasError::io(input_root, e))?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    sort_paths_natural(&mut folders);

    let mut report = StripsReport::default();
    for folder in folders {
        let name = frame_name(&folder);
        match build_strip(&folder, output_root) {
            Ok(Some(meta)) => {
                info!(animation = %name, frames = meta.frame_count, "strip written");
                report.built.insert(name, meta);
            }
            Ok(None) => {
                info!(animation = %name, "no webp frames, skipping");
                report.skipped.push(name);
            }
            Err(e) => {
                warn!(animation = %name, error = %e, "strip failed");
                report.failed.push((name, e));
            }
        }
    }

    if !report.built.is_empty() {
        let path = output_root.join(metadata_name);
        save_json(&report.built, &path)?;
        report.metadata_path = Some(path);
    }
    Ok(report)
}
