//! Frame discovery and uniform-size validation

use crate::error::{AtlasError, Result};
use crate::natural::sort_paths_natural;
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};

/// Default output prefix, also excluded from frame scans.
pub const DEFAULT_PREFIX: &str = "sheet";

/// How many frames [`probe_frame_size`] inspects up front.
pub const SIZE_SAMPLE: usize = 10;

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Files directly inside `folder` with the given extension, naturally ordered.
pub fn list_with_extension(folder: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(folder).map_err(|e| AtlasError::io(folder, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| AtlasError::io(folder, e))?.path();
        if path.is_file() && has_extension(&path, ext) {
            files.push(path);
        }
    }
    sort_paths_natural(&mut files);
    Ok(files)
}

/// Pattern matching generated page files for `prefix` and the default prefix:
/// `sheet.webp`, `sheet_00.webp`, `sheet_1024_03.png`, ...
pub fn generated_sheet_pattern(prefix: &str) -> Result<Regex> {
    let alternatives = if prefix == DEFAULT_PREFIX {
        regex::escape(prefix)
    } else {
        format!("{}|{}", regex::escape(prefix), DEFAULT_PREFIX)
    };
    RegexBuilder::new(&format!(r"^(?:{})(?:_\d+)*\.(?:png|webp)$", alternatives))
        .case_insensitive(true)
        .build()
        .map_err(|source| AtlasError::InvalidPrefix { prefix: prefix.to_string(), source })
}

/// Collect the frame files of a folder.
///
/// PNG frames are preferred; WebP frames are used only if the folder has no
/// PNGs. Files that look like generated sheets for `prefix` are skipped.
pub fn collect_frames(folder: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(AtlasError::MissingSource(folder.to_path_buf()));
    }

    let generated = generated_sheet_pattern(prefix)?;
    let is_frame = |p: &PathBuf| {
        p.file_name().and_then(|n| n.to_str()).is_some_and(|n| !generated.is_match(n))
    };

    let pngs: Vec<PathBuf> = list_with_extension(folder, "png")?.into_iter().filter(is_frame).collect();
    if !pngs.is_empty() {
        return Ok(pngs);
    }

    let webps: Vec<PathBuf> = list_with_extension(folder, "webp")?.into_iter().filter(is_frame).collect();
    if webps.is_empty() {
        return Err(AtlasError::NoFrames(folder.to_path_buf()));
    }
    Ok(webps)
}

/// File name used as a frame's identity in the index.
pub fn frame_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Read an image's dimensions from its header without decoding pixels.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    image::ImageReader::open(path)
        .map_err(|e| AtlasError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| AtlasError::io(path, e))?
        .into_dimensions()
        .map_err(|e| AtlasError::image(path, e))
}

/// Check a decoded frame against the sheet's uniform size.
pub fn check_frame_size(path: &Path, actual: (u32, u32), expected: (u32, u32)) -> Result<()> {
    if actual != expected {
        return Err(AtlasError::FrameSizeMismatch { file: frame_name(path), actual, expected });
    }
    Ok(())
}

/// Uniform frame size of a sequence, taken from the first frame.
///
/// The first [`SIZE_SAMPLE`] frames are compared against it so that a
/// mismatch fails fast before any pixels are composed.
pub fn probe_frame_size(frames: &[PathBuf]) -> Result<(u32, u32)> {
    let first = frames.first().ok_or_else(|| AtlasError::NoFrames(PathBuf::new()))?;
    let expected = image_dimensions(first)?;
    if expected.0 == 0 || expected.1 == 0 {
        return Err(AtlasError::InvalidFrameSize { width: expected.0, height: expected.1 });
    }
    for path in frames.iter().take(SIZE_SAMPLE).skip(1) {
        check_frame_size(path, image_dimensions(path)?, expected)?;
    }
    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_frame(dir: &Path, name: &str, w: u32, h: u32) {
        RgbaImage::from_pixel(w, h, Rgba([1, 2, 3, 255])).save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_generated_pattern() {
        let re = generated_sheet_pattern("sheet").unwrap();
        assert!(re.is_match("sheet.webp"));
        assert!(re.is_match("sheet_00.webp"));
        assert!(re.is_match("SHEET_1024_03.WEBP"));
        assert!(re.is_match("sheet_01.png"));
        assert!(!re.is_match("sheet_a.webp"));
        assert!(!re.is_match("frame_00.webp"));

        let custom = generated_sheet_pattern("atlas.v2").unwrap();
        assert!(custom.is_match("atlas.v2_01.webp"));
        assert!(custom.is_match("sheet_01.webp"));
        assert!(!custom.is_match("atlasxv2_01.webp"));

        let odd = generated_sheet_pattern("a(b[c*").unwrap();
        assert!(odd.is_match("a(b[c*_01.png"));
        assert!(!odd.is_match("abc_01.png"));
    }

    #[test]
    fn test_collect_prefers_png_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "f10.png", 2, 2);
        write_frame(dir.path(), "f2.png", 2, 2);
        write_frame(dir.path(), "f1.png", 2, 2);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let frames = collect_frames(dir.path(), "sheet").unwrap();
        let names: Vec<String> = frames.iter().map(|p| frame_name(p)).collect();
        assert_eq!(names, vec!["f1.png", "f2.png", "f10.png"]);
    }

    #[test]
    fn test_collect_webp_skips_generated_sheets() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a_2.webp", "a_1.webp", "sheet.webp", "sheet_00.webp"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let frames = collect_frames(dir.path(), "sheet").unwrap();
        let names: Vec<String> = frames.iter().map(|p| frame_name(p)).collect();
        assert_eq!(names, vec!["a_1.webp", "a_2.webp"]);
    }

    #[test]
    fn test_collect_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sheet_00.webp"), b"").unwrap();
        assert!(matches!(collect_frames(dir.path(), "sheet"), Err(AtlasError::NoFrames(_))));
        assert!(matches!(
            collect_frames(&dir.path().join("missing"), "sheet"),
            Err(AtlasError::MissingSource(_))
        ));
    }

    #[test]
    fn test_probe_detects_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..6 {
            let size = if i == 5 { 4 } else { 8 };
            write_frame(dir.path(), &format!("frame_{}.png", i), size, size);
        }
        let frames = collect_frames(dir.path(), "sheet").unwrap();
        let err = probe_frame_size(&frames).unwrap_err();
        match err {
            AtlasError::FrameSizeMismatch { file, actual, expected } => {
                assert_eq!(file, "frame_5.png");
                assert_eq!(actual, (4, 4));
                assert_eq!(expected, (8, 8));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_probe_uniform() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "a.png", 6, 3);
        write_frame(dir.path(), "b.png", 6, 3);
        let frames = collect_frames(dir.path(), "sheet").unwrap();
        assert_eq!(probe_frame_size(&frames).unwrap(), (6, 3));
    }
}
