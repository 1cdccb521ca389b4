//! Multi-page atlas packing
//!
//! Lays a uniform-size frame sequence out into fixed-capacity pages, composes
//! every page in memory, and writes lossless page images plus a frame index.
//!
//! # Example
//!
//! ```ignore
//! use delta_atlas::pager::{build_multi_atlas, PackMode, PagerOptions};
//!
//! let report = build_multi_atlas(
//!     Path::new("assets/completed-species-info"),
//!     None,
//!     PackMode::FromSheet,
//!     &PagerOptions::default(),
//! )?;
//! println!("{} frames on {} pages", report.frame_count, report.pages.len());
//! ```

use crate::compose::{blank_canvas, paste_over};
use crate::error::{AtlasError, Result};
use crate::frames::DEFAULT_PREFIX;
use crate::index::{
    index_file_name, page_file_name, FrameEntry, FrameIndex, PageRef, Rect, SheetMeta, Size,
    DEFAULT_INDEX_NAME, LEGACY_SHEET_IMAGE,
};
use crate::layout::PageLayout;
use crate::output::{save_image, save_json, PageFormat};
use crate::source::InputSource;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default maximum page width/height.
pub const DEFAULT_MAX_DIM: u32 = 2048;

/// Which input a multi-page atlas is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackMode {
    /// Re-page an existing atlas using its frame index
    #[default]
    #[serde(alias = "sheet")]
    FromSheet,
    /// Build from individual frame files
    #[serde(alias = "frames")]
    FromFrames,
}

impl std::fmt::Display for PackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackMode::FromSheet => write!(f, "from-sheet"),
            PackMode::FromFrames => write!(f, "from-frames"),
        }
    }
}

/// Options for packing pages.
#[derive(Debug, Clone)]
pub struct PagerOptions {
    /// Output page prefix; pages are `<prefix>_NN.<ext>`, index `<prefix>.json`
    pub prefix: String,
    /// Maximum page width/height
    pub max_dim: u32,
    pub format: PageFormat,
    /// Index read when re-paging an existing sheet
    pub source_index: String,
    /// Delete the legacy single-sheet image once the new atlas is written
    pub delete_old_single: bool,
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            max_dim: DEFAULT_MAX_DIM,
            format: PageFormat::default(),
            source_index: DEFAULT_INDEX_NAME.to_string(),
            delete_old_single: false,
        }
    }
}

/// A composed atlas that has not been written yet.
#[derive(Debug)]
pub struct PagedAtlas {
    pub layout: PageLayout,
    pub pages: Vec<RgbaImage>,
    pub index: FrameIndex,
}

/// What a pack run produced.
#[derive(Debug, Clone)]
pub struct PackReport {
    pub frame_count: usize,
    pub layout: PageLayout,
    /// Page image paths in page order
    pub pages: Vec<PathBuf>,
    pub index_path: PathBuf,
    /// Legacy sheet removed after writing, if any
    pub deleted: Option<PathBuf>,
}

impl PackReport {
    /// All files written by the run.
    pub fn outputs(&self) -> Vec<PathBuf> {
        let mut out = self.pages.clone();
        out.push(self.index_path.clone());
        out
    }
}

/// Compose every page of `source` in memory.
///
/// Frames fill each page's grid row by row before moving to the next page.
/// Any decode failure, size mismatch or bad rect aborts before anything is
/// returned, so callers never write a partial atlas.
pub fn compose_pages(source: &InputSource, options: &PagerOptions) -> Result<PagedAtlas> {
    let total = source.len();
    if total == 0 {
        return Err(AtlasError::NoFrames(PathBuf::new()));
    }
    let (fw, fh) = source.frame_size();
    let layout = PageLayout::compute(fw, fh, options.max_dim)?;
    let page_count = layout.page_count(total);
    debug!(
        cols = layout.cols,
        rows = layout.rows,
        per_page = layout.per_page,
        pages = page_count,
        "computed page layout"
    );

    if let Some(declared) = source.declared_frame_count() {
        if declared != total {
            warn!(declared, actual = total, "index frame_count disagrees with its frame list");
        }
    }

    let mut pages: Vec<RgbaImage> =
        (0..page_count).map(|_| blank_canvas(layout.page_w, layout.page_h)).collect();
    let mut entries = Vec::with_capacity(total);

    for (i, tile) in source.tiles().enumerate() {
        let tile = tile?;
        let slot = layout.slot(i);
        paste_over(&mut pages[slot.page], &tile.image, slot.x, slot.y);

        entries.push(FrameEntry {
            filename: tile.filename,
            page: slot.page,
            frame: Rect::new(slot.x, slot.y, fw, fh),
            rotated: false,
            trimmed: false,
            sprite_source_size: Some(tile.sprite_source_size),
            source_size: Some(tile.source_size),
            extra: Default::default(),
        });
    }

    let ext = options.format.extension();
    let provenance = source.provenance();
    let meta = SheetMeta {
        pages: (0..page_count)
            .map(|p| PageRef {
                image: page_file_name(&options.prefix, p, ext),
                size: Some(Size::new(layout.page_w, layout.page_h)),
            })
            .collect(),
        image: None,
        frame_count: Some(total),
        cols: Some(layout.cols),
        rows: Some(layout.rows),
        frame_size: Some(Size::new(fw, fh)),
        original_frame_size: Some(provenance.original_frame_size),
        scale: Some(provenance.scale),
        extra: Default::default(),
    };

    Ok(PagedAtlas { layout, pages, index: FrameIndex { meta, frames: entries } })
}

/// Write every page, then the index, into `out_dir`.
///
/// Returns the page paths and the index path.
pub fn write_atlas(
    atlas: &PagedAtlas,
    out_dir: &Path,
    options: &PagerOptions,
) -> Result<(Vec<PathBuf>, PathBuf)> {
    std::fs::create_dir_all(out_dir).map_err(|e| AtlasError::io(out_dir, e))?;

    let mut written = Vec::with_capacity(atlas.pages.len());
    for (page, image) in atlas.index.meta.pages.iter().zip(&atlas.pages) {
        let path = out_dir.join(&page.image);
        save_image(image, &path, options.format)?;
        debug!(page = %path.display(), "wrote page");
        written.push(path);
    }

    let index_path = out_dir.join(index_file_name(&options.prefix));
    save_json(&atlas.index, &index_path)?;
    Ok((written, index_path))
}

/// Build a multi-page atlas from `input_folder` into `out_dir`
/// (default: `input_folder`).
pub fn build_multi_atlas(
    input_folder: &Path,
    out_dir: Option<&Path>,
    mode: PackMode,
    options: &PagerOptions,
) -> Result<PackReport> {
    if !input_folder.exists() {
        return Err(AtlasError::MissingSource(input_folder.to_path_buf()));
    }
    let out_dir = out_dir.unwrap_or(input_folder);

    let source = match mode {
        PackMode::FromSheet => InputSource::sheet(input_folder, &options.source_index)?,
        PackMode::FromFrames => InputSource::frames(input_folder, &options.prefix)?,
    };

    let atlas = compose_pages(&source, options)?;
    let (pages, index_path) = write_atlas(&atlas, out_dir, options)?;
    info!(
        input = %input_folder.display(),
        mode = %mode,
        frames = source.len(),
        pages = pages.len(),
        "multi-atlas written"
    );

    let deleted = if options.delete_old_single {
        let legacy = match &source {
            InputSource::Sheet(sheet) => sheet.legacy_image().map(Path::to_path_buf),
            InputSource::Frames(_) => Some(out_dir.join(LEGACY_SHEET_IMAGE)),
        };
        legacy.and_then(|path| remove_legacy(&path, &pages))
    } else {
        None
    };

    Ok(PackReport { frame_count: source.len(), layout: atlas.layout, pages, index_path, deleted })
}

/// Delete the old single sheet unless it is one of the files just written.
fn remove_legacy(path: &Path, written: &[PathBuf]) -> Option<PathBuf> {
    if !path.is_file() || written.iter().any(|w| w == path) {
        return None;
    }
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!(deleted = %path.display(), "removed legacy single sheet");
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not remove legacy single sheet");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn color(i: usize) -> Rgba<u8> {
        Rgba([(i * 40 % 256) as u8, (i * 30 % 256) as u8, 7, 255])
    }

    fn write_frames(dir: &Path, count: usize, w: u32, h: u32) {
        for i in 0..count {
            RgbaImage::from_pixel(w, h, color(i)).save(dir.join(format!("frame_{}.png", i))).unwrap();
        }
    }

    #[test]
    fn test_compose_fills_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 5, 4, 4);
        let source = InputSource::frames(dir.path(), "sheet").unwrap();
        let options = PagerOptions { max_dim: 8, ..Default::default() };

        let atlas = compose_pages(&source, &options).unwrap();
        assert_eq!(atlas.pages.len(), 2);
        assert_eq!(atlas.layout.per_page, 4);

        let frames = &atlas.index.frames;
        assert_eq!(frames[3].page, 0);
        assert_eq!(frames[3].frame, Rect::new(4, 4, 4, 4));
        assert_eq!(frames[4].page, 1);
        assert_eq!(frames[4].frame, Rect::new(0, 0, 4, 4));

        assert_eq!(*atlas.pages[0].get_pixel(5, 1), color(1));
        assert_eq!(*atlas.pages[1].get_pixel(1, 1), color(4));
        assert_eq!(atlas.pages[1].get_pixel(5, 5)[3], 0);

        let meta = &atlas.index.meta;
        assert_eq!(meta.pages[1].image, "sheet_01.webp");
        assert_eq!(meta.frame_count, Some(5));
        assert_eq!(meta.scale, Some(1.0));
    }

    #[test]
    fn test_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 12, 4, 4);
        // Beyond the up-front sample, only caught while composing
        RgbaImage::new(2, 2).save(dir.path().join("frame_11.png")).unwrap();

        let err = build_multi_atlas(dir.path(), None, PackMode::FromFrames, &PagerOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("frame_11.png"));
        assert!(!dir.path().join("sheet.json").exists());
        assert!(!dir.path().join("sheet_00.webp").exists());
    }

    #[test]
    fn test_remove_legacy_skips_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.webp");
        std::fs::write(&path, b"x").unwrap();
        assert_eq!(remove_legacy(&path, &[path.clone()]), None);
        assert!(path.exists());
        assert_eq!(remove_legacy(&path, &[]), Some(path.clone()));
        assert!(!path.exists());
        assert_eq!(remove_legacy(&path, &[]), None);
    }

    #[test]
    fn test_pack_mode_aliases() {
        #[derive(Deserialize)]
        struct Wrap {
            mode: PackMode,
        }
        let w: Wrap = toml::from_str("mode = \"frames\"").unwrap();
        assert_eq!(w.mode, PackMode::FromFrames);
        let w: Wrap = toml::from_str("mode = \"from_sheet\"").unwrap();
        assert_eq!(w.mode, PackMode::FromSheet);
        assert_eq!(PackMode::FromFrames.to_string(), "from-frames");
    }
}
