//! Lossless image output, JSON output and atomic file writes
//!
//! Every file is first written to a hidden sibling and then renamed over
//! the destination, so a reader never observes a half-written page or index.

use crate::error::{AtlasError, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Image container used for generated pages and sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    /// Lossless WebP (VP8L)
    #[default]
    Webp,
    /// PNG at maximum compression
    Png,
}

impl PageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            PageFormat::Webp => "webp",
            PageFormat::Png => "png",
        }
    }

    /// Pick the format from a path's extension: `.png` is PNG, anything else WebP.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => PageFormat::Png,
            _ => PageFormat::Webp,
        }
    }
}

impl std::fmt::Display for PageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Temporary sibling used while `path` is being written.
fn temp_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write a file through a temporary sibling and rename it into place.
///
/// Parent directories are created as needed.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| AtlasError::io(parent, e))?;
        }
    }

    let tmp = temp_path(path);
    let result = File::create(&tmp)
        .map_err(|e| AtlasError::io(&tmp, e))
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush().map_err(|e| AtlasError::io(&tmp, e))
        })
        .and_then(|()| std::fs::rename(&tmp, path).map_err(|e| AtlasError::io(path, e)));

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

/// Encode an RGBA image losslessly.
///
/// WebP uses the lossless VP8L encoder. PNG uses the best compression level
/// with adaptive filtering.
pub fn encode_image<W: Write>(image: &RgbaImage, format: PageFormat, writer: W) -> image::ImageResult<()> {
    let (w, h) = image.dimensions();
    match format {
        PageFormat::Webp => {
            WebPEncoder::new_lossless(writer).write_image(image.as_raw(), w, h, ExtendedColorType::Rgba8)
        }
        PageFormat::Png => {
            PngEncoder::new_with_quality(writer, CompressionType::Best, FilterType::Adaptive)
                .write_image(image.as_raw(), w, h, ExtendedColorType::Rgba8)
        }
    }
}

/// Save an image losslessly and atomically.
pub fn save_image(image: &RgbaImage, path: &Path, format: PageFormat) -> Result<()> {
    write_atomic(path, |writer| {
        encode_image(image, format, writer).map_err(|e| AtlasError::image(path, e))
    })
}

/// Save a value as pretty-printed JSON (2-space indent, trailing newline).
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut json =
        serde_json::to_string_pretty(value).map_err(|source| AtlasError::Json { path: path.to_path_buf(), source })?;
    json.push('\n');
    write_atomic(path, |writer| writer.write_all(json.as_bytes()).map_err(|e| AtlasError::io(path, e)))
}

/// Decode any supported image file into RGBA8.
pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    if !path.is_file() {
        return Err(AtlasError::MissingSource(path.to_path_buf()));
    }
    let decoded = image::ImageReader::open(path)
        .map_err(|e| AtlasError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| AtlasError::io(path, e))?
        .decode()
        .map_err(|e| AtlasError::image(path, e))?;
    Ok(decoded.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([10, 200, 30, 77]));
        img.put_pixel(2, 1, Rgba([1, 2, 3, 4]));
        img
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(PageFormat::from_path(Path::new("a.PNG")), PageFormat::Png);
        assert_eq!(PageFormat::from_path(Path::new("a.webp")), PageFormat::Webp);
        assert_eq!(PageFormat::from_path(Path::new("a")), PageFormat::Webp);
        assert_eq!(PageFormat::Webp.to_string(), "webp");
    }

    #[test]
    fn test_webp_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.webp");
        save_image(&sample(), &path, PageFormat::Webp).unwrap();
        let back = load_rgba(&path).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_png_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/page.png");
        save_image(&sample(), &path, PageFormat::Png).unwrap();
        assert_eq!(load_rgba(&path).unwrap(), sample());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        save_json(&serde_json::json!({ "a": 1 }), &path).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["index.json".to_string()]);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("  \"a\": 1"));
    }

    #[test]
    fn test_failed_write_removes_temp_and_keeps_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.txt");
        std::fs::write(&path, "old").unwrap();
        let result = write_atomic(&path, |_| Err(AtlasError::InvalidScale(2.0)));
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_load_missing() {
        let err = load_rgba(Path::new("/no/such/frame.png")).unwrap_err();
        assert!(matches!(err, AtlasError::MissingSource(_)));
    }
}
