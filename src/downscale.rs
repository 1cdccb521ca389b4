//! Reduced-resolution variants of a multi-page atlas
//!
//! Every page is resized as a whole and every rect is scaled with the same
//! rounding rule, so a variant's index addresses its own pages exactly.
//! Source pages and the source index are only read.

use crate::error::{AtlasError, Result};
use crate::frames::DEFAULT_PREFIX;
use crate::index::{index_file_name, page_file_name, FrameIndex, PageRef, Rect, Size};
use crate::output::{load_rgba, save_image, save_json, PageFormat};
use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options for a downscale pass.
#[derive(Debug, Clone)]
pub struct DownscaleOptions {
    /// Factor in `(0, 1]`
    pub scale: f64,
    /// Prefix of the source atlas (`<prefix>.json`, `<prefix>_NN.*`)
    pub prefix: String,
    /// Suffix for the variant; defaults to the scaled largest page edge
    pub label: Option<String>,
    pub format: PageFormat,
}

impl Default for DownscaleOptions {
    fn default() -> Self {
        Self { scale: 0.5, prefix: DEFAULT_PREFIX.to_string(), label: None, format: PageFormat::default() }
    }
}

/// What a downscale pass produced.
#[derive(Debug, Clone)]
pub struct DownscaleReport {
    /// Prefix of the written variant, `<prefix>_<label>`
    pub prefix: String,
    pub frame_count: usize,
    pub pages: Vec<PathBuf>,
    pub index_path: PathBuf,
}

/// Reject scales outside `(0, 1]`, NaN and infinities included.
pub fn validate_scale(scale: f64) -> Result<()> {
    if scale.is_finite() && scale > 0.0 && scale <= 1.0 {
        Ok(())
    } else {
        Err(AtlasError::InvalidScale(scale))
    }
}

/// Scale one coordinate, rounding half to even.
pub fn scale_coord(value: u32, scale: f64) -> u32 {
    (f64::from(value) * scale).round_ties_even() as u32
}

/// Scale a length, never below one pixel.
pub fn scale_edge(value: u32, scale: f64) -> u32 {
    scale_coord(value, scale).max(1)
}

/// Scale a rect by its corners so neighbouring rects stay adjacent.
pub fn scale_rect(rect: Rect, scale: f64) -> Rect {
    let x0 = scale_coord(rect.x, scale);
    let y0 = scale_coord(rect.y, scale);
    let x1 = scale_coord(rect.x.saturating_add(rect.w), scale);
    let y1 = scale_coord(rect.y.saturating_add(rect.h), scale);
    Rect::new(x0, y0, x1.saturating_sub(x0).max(1), y1.saturating_sub(y0).max(1))
}

/// Lanczos3 resize in premultiplied-alpha space.
///
/// Colour under fully transparent pixels does not bleed into visible edges.
pub fn resize_premultiplied(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    if (w, h) == (width, height) {
        return image.clone();
    }

    let premultiplied = Rgba32FImage::from_fn(w, h, |x, y| {
        let p = image.get_pixel(x, y);
        let a = f32::from(p[3]) / 255.0;
        Rgba([
            f32::from(p[0]) / 255.0 * a,
            f32::from(p[1]) / 255.0 * a,
            f32::from(p[2]) / 255.0 * a,
            a,
        ])
    });
    let resized = imageops::resize(&premultiplied, width, height, FilterType::Lanczos3);

    let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbaImage::from_fn(width, height, |x, y| {
        let p = resized.get_pixel(x, y);
        let a = p[3].clamp(0.0, 1.0);
        if a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        Rgba([quantize(p[0] / a), quantize(p[1] / a), quantize(p[2] / a), quantize(a)])
    })
}

/// Build the variant index from the source index.
///
/// Unknown meta keys and entry fields are carried over untouched.
pub fn scale_index(index: &FrameIndex, scale: f64, pages: Vec<PageRef>) -> FrameIndex {
    let mut meta = index.meta.clone();
    meta.pages = pages;
    meta.scale = Some(meta.scale.filter(|s| *s != 0.0).unwrap_or(1.0) * scale);
    meta.frame_size = meta.frame_size.map(|fs| Size::new(scale_edge(fs.w, scale), scale_edge(fs.h, scale)));

    let frames = index
        .frames
        .iter()
        .map(|entry| {
            let mut entry = entry.clone();
            entry.frame = scale_rect(entry.frame, scale);
            entry
        })
        .collect();

    FrameIndex { meta, frames }
}

/// Write a downscaled variant of the multi-page atlas in `folder`.
pub fn downscale_atlas(folder: &Path, options: &DownscaleOptions) -> Result<DownscaleReport> {
    validate_scale(options.scale)?;
    if !folder.is_dir() {
        return Err(AtlasError::MissingSource(folder.to_path_buf()));
    }

    let index_path = folder.join(index_file_name(&options.prefix));
    let index = FrameIndex::load_with_frames(&index_path)?;
    if !index.is_paged() {
        return Err(AtlasError::malformed(&index_path, "meta.pages is missing or empty"));
    }

    let mut sources = Vec::with_capacity(index.meta.pages.len());
    for page in &index.meta.pages {
        let path = folder.join(&page.image);
        if !path.is_file() {
            return Err(AtlasError::MissingImage { name: page.image.clone(), dir: folder.to_path_buf() });
        }
        let image = load_rgba(&path)?;
        let size = page
            .size
            .filter(|s| s.w > 0 && s.h > 0)
            .unwrap_or_else(|| Size::new(image.width(), image.height()));
        sources.push((image, size));
    }

    let label = match &options.label {
        Some(label) => label.clone(),
        None => {
            let largest = sources.iter().map(|(_, s)| s.w.max(s.h)).max().unwrap_or(0);
            scale_coord(largest, options.scale).to_string()
        }
    };
    let out_prefix = if label.is_empty() { options.prefix.clone() } else { format!("{}_{}", options.prefix, label) };

    let ext = options.format.extension();
    let page_names: Vec<String> =
        (0..sources.len()).map(|i| page_file_name(&out_prefix, i, ext)).collect();
    let clashes = out_prefix == options.prefix
        || page_names.iter().any(|name| index.meta.pages.iter().any(|p| &p.image == name));
    if clashes {
        return Err(AtlasError::PrefixClash(out_prefix));
    }

    let mut scaled = Vec::with_capacity(sources.len());
    let mut page_refs = Vec::with_capacity(sources.len());
    for ((image, size), name) in sources.iter().zip(&page_names) {
        let (w, h) = (scale_edge(size.w, options.scale), scale_edge(size.h, options.scale));
        debug!(page = %name, from_w = size.w, from_h = size.h, to_w = w, to_h = h, "resizing page");
        scaled.push(resize_premultiplied(image, w, h));
        page_refs.push(PageRef { image: name.clone(), size: Some(Size::new(w, h)) });
    }
    let variant = scale_index(&index, options.scale, page_refs);

    let mut pages = Vec::with_capacity(scaled.len());
    for (image, name) in scaled.iter().zip(&page_names) {
        let path = folder.join(name);
        save_image(image, &path, options.format)?;
        pages.push(path);
    }
    let out_index = folder.join(index_file_name(&out_prefix));
    save_json(&variant, &out_index)?;

    info!(
        folder = %folder.display(),
        prefix = %out_prefix,
        scale = options.scale,
        pages = pages.len(),
        "downscaled variant written"
    );

    Ok(DownscaleReport { prefix: out_prefix, frame_count: variant.frames.len(), pages, index_path: out_index })
}
