//! Single-sheet builder: every frame of a folder on one grid image
//!
//! Unlike the pager, the whole sequence goes on one image, so frames are
//! uniformly scaled down when the sheet would exceed `max_dim`.

use crate::compose::{blank_canvas, paste_over};
use crate::downscale::{resize_premultiplied, scale_edge};
use crate::error::{AtlasError, Result};
use crate::frames::{check_frame_size, frame_name, list_with_extension};
use crate::natural::sort_paths_natural;
use crate::output::{load_rgba, save_image, save_json, PageFormat};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default bound on the sheet's larger edge.
pub const DEFAULT_SHEET_MAX_DIM: u32 = 16000;

/// Options for [`build_sprite_sheet`].
#[derive(Debug, Clone)]
pub struct SheetOptions {
    /// Forced column count; `ceil(sqrt(n))` otherwise
    pub cols: Option<u32>,
    pub max_dim: u32,
    /// Target size for each frame's larger edge
    pub frame_size: Option<u32>,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self { cols: None, max_dim: DEFAULT_SHEET_MAX_DIM, frame_size: None }
    }
}

/// Sidecar written next to a built sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetMetadata {
    pub file: String,
    pub columns: u32,
    pub rows: u32,
    pub frame_count: usize,
    pub frame_width: u32,
    pub frame_height: u32,
    pub sheet_width: u32,
    pub sheet_height: u32,
}

/// Columns and rows for `count` frames.
///
/// # Examples
///
/// ```
/// use delta_atlas::spritesheet::grid_dimensions;
///
/// assert_eq!(grid_dimensions(10, None), (4, 3));
/// assert_eq!(grid_dimensions(3, Some(8)), (3, 1));
/// ```
pub fn grid_dimensions(count: usize, cols: Option<u32>) -> (u32, u32) {
    let n = count.max(1) as u32;
    let cols = match cols {
        Some(c) => c.clamp(1, n),
        None => (f64::from(n).sqrt().ceil() as u32).max(1),
    };
    (cols, n.div_ceil(cols))
}

/// Uniform scale for the frames of a sheet.
///
/// The smaller of the factor that fits the unscaled sheet into `max_dim`
/// and the factor that brings the larger frame edge to `target`. Never
/// above 1.0: a target larger than the frames leaves them at native size.
pub fn sheet_scale(sheet: (u32, u32), frame: (u32, u32), max_dim: u32, target: Option<u32>) -> f64 {
    let largest = sheet.0.max(sheet.1);
    let for_max_dim = if largest > max_dim { f64::from(max_dim) / f64::from(largest) } else { 1.0 };
    let for_target = match target {
        Some(t) => f64::from(t) / f64::from(frame.0.max(frame.1)),
        None => 1.0,
    };
    for_max_dim.min(for_target)
}

/// Scaled cell edge that keeps `count` cells within `max_dim`.
///
/// Rounds to nearest like [`scale_edge`], then steps down while the
/// grid would still overshoot.
pub fn fit_cell_edge(edge: u32, scale: f64, count: u32, max_dim: u32) -> u32 {
    let mut cell = scale_edge(edge, scale);
    while cell > 1 && cell * count > max_dim {
        cell -= 1;
    }
    cell
}

/// Compose `frames` (all `cell_w x cell_h`) row by row onto one canvas.
pub fn render_grid<I>(frames: I, cols: u32, rows: u32, cell_w: u32, cell_h: u32) -> Result<RgbaImage>
where
    I: IntoIterator<Item = Result<RgbaImage>>,
{
    let mut sheet = blank_canvas(cols * cell_w, rows * cell_h);
    for (i, frame) in frames.into_iter().enumerate() {
        let frame = frame?;
        let i = i as u32;
        paste_over(&mut sheet, &frame, (i % cols) * cell_w, (i / cols) * cell_h);
    }
    Ok(sheet)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// PNG and WebP frames of `folder` in natural order, minus `exclude`.
fn sheet_frames(folder: &Path, exclude: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(AtlasError::MissingSource(folder.to_path_buf()));
    }
    let mut frames = list_with_extension(folder, "png")?;
    frames.extend(list_with_extension(folder, "webp")?);
    frames.retain(|p| !same_file(p, exclude));
    sort_paths_natural(&mut frames);
    if frames.is_empty() {
        return Err(AtlasError::NoFrames(folder.to_path_buf()));
    }
    Ok(frames)
}

/// Build one sheet from the frames in `input` and write it to `output`.
///
/// The image format follows the output extension; a `<stem>.json` sidecar
/// is written beside it.
pub fn build_sprite_sheet(input: &Path, output: &Path, options: &SheetOptions) -> Result<SheetMetadata> {
    let frames = sheet_frames(input, output)?;
    let first = load_rgba(&frames[0])?;
    let (fw, fh) = first.dimensions();
    if fw == 0 || fh == 0 {
        return Err(AtlasError::InvalidFrameSize { width: fw, height: fh });
    }

    let (cols, rows) = grid_dimensions(frames.len(), options.cols);
    let scale = sheet_scale((cols * fw, rows * fh), (fw, fh), options.max_dim, options.frame_size);
    if let Some(target) = options.frame_size.filter(|t| *t > fw.max(fh)) {
        warn!(target, frame_w = fw, frame_h = fh, "target frame size is larger than the source; keeping native size");
    }
    let (cell_w, cell_h) = if scale == 1.0 {
        (fw, fh)
    } else {
        (fit_cell_edge(fw, scale, cols, options.max_dim), fit_cell_edge(fh, scale, rows, options.max_dim))
    };
    debug!(cols, rows, cell_w, cell_h, scale, "sheet layout");

    let tiles = frames.iter().enumerate().map(|(i, path)| -> Result<RgbaImage> {
        let image = if i == 0 { first.clone() } else { load_rgba(path)? };
        check_frame_size(path, image.dimensions(), (fw, fh))?;
        Ok(if (cell_w, cell_h) == (fw, fh) { image } else { resize_premultiplied(&image, cell_w, cell_h) })
    });
    let sheet = render_grid(tiles, cols, rows, cell_w, cell_h)?;

    let format = PageFormat::from_path(output);
    let ext = output.extension().and_then(|e| e.to_str()).unwrap_or("");
    if format == PageFormat::Webp && !ext.eq_ignore_ascii_case("webp") {
        warn!(output = %output.display(), "unrecognised output extension; writing WebP");
    }
    save_image(&sheet, output, format)?;

    let metadata = SheetMetadata {
        file: frame_name(output),
        columns: cols,
        rows,
        frame_count: frames.len(),
        frame_width: cell_w,
        frame_height: cell_h,
        sheet_width: sheet.width(),
        sheet_height: sheet.height(),
    };
    save_json(&metadata, &output.with_extension("json"))?;

    info!(
        output = %output.display(),
        frames = frames.len(),
        width = sheet.width(),
        height = sheet.height(),
        "sprite sheet written"
    );
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn write_frames(dir: &Path, count: usize, size: u32) {
        for i in 0..count {
            let color = Rgba([(i * 50) as u8, 10, 20, 255]);
            RgbaImage::from_pixel(size, size, color).save(dir.join(format!("f{}.png", i))).unwrap();
        }
    }

    #[test]
    fn test_grid_dimensions() {
        assert_eq!(grid_dimensions(1, None), (1, 1));
        assert_eq!(grid_dimensions(4, None), (2, 2));
        assert_eq!(grid_dimensions(5, None), (3, 2));
        assert_eq!(grid_dimensions(5, Some(0)), (1, 5));
        assert_eq!(grid_dimensions(5, Some(5)), (5, 1));
    }

    #[test]
    fn test_sheet_scale() {
        assert_eq!(sheet_scale((1000, 500), (100, 100), 16000, None), 1.0);
        assert_eq!(sheet_scale((2000, 1000), (500, 500), 1000, None), 0.5);
        assert_eq!(sheet_scale((2000, 1000), (500, 500), 1000, Some(100)), 0.2);
        assert_eq!(sheet_scale((100, 100), (50, 50), 16000, Some(100)), 1.0);
    }

    #[test]
    fn test_render_grid_row_major() {
        let frames = (0..3u8).map(|i| Ok(RgbaImage::from_pixel(2, 2, Rgba([i, 0, 0, 255]))));
        let sheet = render_grid(frames, 2, 2, 2, 2).unwrap();
        assert_eq!(sheet.dimensions(), (4, 4));
        assert_eq!(sheet.get_pixel(2, 0)[0], 1);
        assert_eq!(sheet.get_pixel(0, 2)[0], 2);
        assert_eq!(sheet.get_pixel(3, 3)[3], 0);
    }

    #[test]
    fn test_build_fits_max_dim() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 4, 4);
        let output = dir.path().join("sheet.webp");
        let options = SheetOptions { max_dim: 4, ..Default::default() };

        let meta = build_sprite_sheet(dir.path(), &output, &options).unwrap();
        assert_eq!((meta.columns, meta.rows), (2, 2));
        assert_eq!((meta.frame_width, meta.frame_height), (2, 2));
        assert_eq!((meta.sheet_width, meta.sheet_height), (4, 4));
        assert_eq!(meta.file, "sheet.webp");

        let sidecar: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("sheet.json")).unwrap()).unwrap();
        assert_eq!(sidecar["frameCount"], 4);
        assert_eq!(sidecar["sheetWidth"], 4);

        // Rebuilding skips the sheet it just wrote
        let again = build_sprite_sheet(dir.path(), &output, &options).unwrap();
        assert_eq!(again.frame_count, 4);
    }

    #[test]
    fn test_build_png_unscaled_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let frames = dir.path().join("frames");
        std::fs::create_dir(&frames).unwrap();
        write_frames(&frames, 3, 2);
        let output = dir.path().join("out/strip.png");

        let meta = build_sprite_sheet(&frames, &output, &SheetOptions { cols: Some(3), ..Default::default() }).unwrap();
        assert_eq!((meta.sheet_width, meta.sheet_height), (6, 2));
        let sheet = load_rgba(&output).unwrap();
        assert_eq!(*sheet.get_pixel(4, 1), Rgba([100, 10, 20, 255]));
        assert!(dir.path().join("out/strip.json").exists());
    }

    #[test]
    fn test_fit_cell_edge() {
        assert_eq!(fit_cell_edge(3, 8.0 / 9.0, 3, 8), 2);
        assert_eq!(fit_cell_edge(512, 0.5, 2, 1024), 256);
        assert_eq!(fit_cell_edge(2, 0.01, 100, 1), 1);
    }

    #[test]
    fn test_build_larger_target_keeps_native_size() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 1, 4);
        let output = dir.path().join("big.png");
        let options = SheetOptions { frame_size: Some(8), ..Default::default() };
        let meta = build_sprite_sheet(dir.path(), &output, &options).unwrap();
        assert_eq!((meta.frame_width, meta.frame_height), (4, 4));
        assert_eq!((meta.sheet_width, meta.sheet_height), (4, 4));
    }

    #[test]
    fn test_build_never_exceeds_max_dim() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 9, 3);
        let output = dir.path().join("tight.png");
        let options = SheetOptions { max_dim: 8, ..Default::default() };
        let meta = build_sprite_sheet(dir.path(), &output, &options).unwrap();
        assert_eq!((meta.columns, meta.rows), (3, 3));
        assert_eq!((meta.sheet_width, meta.sheet_height), (6, 6));
        assert_eq!(load_rgba(&output).unwrap().dimensions(), (6, 6));
    }

    #[test]
    fn test_build_rejects_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 2, 4);
        RgbaImage::new(3, 3).save(dir.path().join("f9.png")).unwrap();
        let err = build_sprite_sheet(dir.path(), &dir.path().join("s.webp"), &SheetOptions::default()).unwrap_err();
        assert!(matches!(err, AtlasError::FrameSizeMismatch { ref file, .. } if file == "f9.png"));
        assert!(!dir.path().join("s.webp").exists());
    }
}
