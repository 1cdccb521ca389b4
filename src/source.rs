//! Frame sources for page composition
//!
//! [`InputSource`] is either a folder of loose frame images or an existing
//! atlas (legacy single sheet or multi-page) described by a frame index.
//! Both expose the same ordered stream of in-memory tiles, so the pager
//! composes pages without knowing where the pixels came from.

use crate::compose::crop_exact;
use crate::error::{AtlasError, Result};
use crate::frames::{check_frame_size, collect_frames, frame_name, probe_frame_size};
use crate::index::{FrameIndex, Rect, Size, LEGACY_SHEET_IMAGE};
use crate::output::load_rgba;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One frame's pixels plus the metadata carried into the new index.
#[derive(Debug, Clone)]
pub struct FrameTile {
    pub filename: String,
    pub image: RgbaImage,
    pub sprite_source_size: Rect,
    pub source_size: Size,
}

/// Sheet-level values carried over from the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Provenance {
    pub original_frame_size: Size,
    pub scale: f64,
}

/// A folder of individual frame images.
#[derive(Debug)]
pub struct FrameFolder {
    pub folder: PathBuf,
    pub frames: Vec<PathBuf>,
    frame_size: (u32, u32),
}

/// An existing atlas plus its index.
#[derive(Debug)]
pub struct ExistingSheet {
    pub folder: PathBuf,
    pub index_path: PathBuf,
    pub index: FrameIndex,
    /// Decoded source images: one for a legacy sheet, one per page otherwise
    images: Vec<RgbaImage>,
    /// Path of each entry in `images`
    pub image_paths: Vec<PathBuf>,
    frame_size: (u32, u32),
}

/// Where the frames of a sheet come from.
#[derive(Debug)]
pub enum InputSource {
    Frames(FrameFolder),
    Sheet(ExistingSheet),
}

impl FrameFolder {
    /// Scan `folder` for frames, skipping generated sheets named after `prefix`.
    pub fn open(folder: &Path, prefix: &str) -> Result<Self> {
        let frames = collect_frames(folder, prefix)?;
        let frame_size = probe_frame_size(&frames)?;
        debug!(folder = %folder.display(), frames = frames.len(), "collected loose frames");
        Ok(Self { folder: folder.to_path_buf(), frames, frame_size })
    }

    fn tile(&self, index: usize) -> Result<FrameTile> {
        let path = &self.frames[index];
        let image = load_rgba(path)?;
        check_frame_size(path, image.dimensions(), self.frame_size)?;
        let (w, h) = self.frame_size;
        Ok(FrameTile {
            filename: frame_name(path),
            image,
            sprite_source_size: Rect::new(0, 0, w, h),
            source_size: Size::new(w, h),
        })
    }
}

impl ExistingSheet {
    /// Load `<folder>/<index_name>` and the image(s) it describes.
    pub fn open(folder: &Path, index_name: &str) -> Result<Self> {
        if !folder.is_dir() {
            return Err(AtlasError::MissingSource(folder.to_path_buf()));
        }
        let index_path = folder.join(index_name);
        let index = FrameIndex::load_with_frames(&index_path)?;

        let frame_size = declared_frame_size(&index)
            .ok_or_else(|| AtlasError::UndeterminedFrameSize(index_path.clone()))?;

        let image_paths = if index.is_paged() {
            index
                .meta
                .pages
                .iter()
                .map(|page| {
                    let path = folder.join(&page.image);
                    if path.is_file() {
                        Ok(path)
                    } else {
                        Err(AtlasError::MissingImage { name: page.image.clone(), dir: folder.to_path_buf() })
                    }
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            vec![legacy_image_path(folder, &index)?]
        };

        for entry in &index.frames {
            if entry.page >= image_paths.len() {
                return Err(AtlasError::PageOutOfRange {
                    filename: entry.filename.clone(),
                    page: entry.page,
                    page_count: image_paths.len(),
                });
            }
        }

        let images = image_paths.iter().map(|p| load_rgba(p)).collect::<Result<Vec<_>>>()?;
        debug!(
            index = %index_path.display(),
            frames = index.frames.len(),
            images = images.len(),
            "loaded existing sheet"
        );

        Ok(Self { folder: folder.to_path_buf(), index_path, index, images, image_paths, frame_size })
    }

    /// The single-sheet image this index was built from, if it is not paged.
    pub fn legacy_image(&self) -> Option<&Path> {
        if self.index.is_paged() {
            None
        } else {
            self.image_paths.first().map(PathBuf::as_path)
        }
    }

    fn tile(&self, index: usize) -> Result<FrameTile> {
        let entry = &self.index.frames[index];
        let (fw, fh) = self.frame_size;
        let mut rect = entry.frame;
        if rect.w == 0 {
            rect.w = fw;
        }
        if rect.h == 0 {
            rect.h = fh;
        }
        check_frame_size(Path::new(&entry.filename), (rect.w, rect.h), self.frame_size)?;
        let image = crop_exact(&self.images[entry.page], rect, &entry.filename)?;
        Ok(FrameTile {
            filename: entry.filename.clone(),
            image,
            sprite_source_size: entry.sprite_source_size.unwrap_or(Rect::new(0, 0, fw, fh)),
            source_size: entry.source_size.unwrap_or(Size::new(fw, fh)),
        })
    }

    fn provenance(&self) -> Provenance {
        let meta = &self.index.meta;
        let (fw, fh) = self.frame_size;
        Provenance {
            original_frame_size: meta
                .original_frame_size
                .or(meta.frame_size)
                .unwrap_or(Size::new(fw, fh)),
            scale: meta.scale.filter(|s| *s != 0.0).unwrap_or(1.0),
        }
    }
}

/// Frame size from `meta.frame_size`, falling back per axis to the first rect.
fn declared_frame_size(index: &FrameIndex) -> Option<(u32, u32)> {
    let declared = index.meta.frame_size.unwrap_or_default();
    let first = index.frames.first().map(|f| f.frame).unwrap_or_default();
    let w = if declared.w > 0 { declared.w } else { first.w };
    let h = if declared.h > 0 { declared.h } else { first.h };
    (w > 0 && h > 0).then_some((w, h))
}

/// `meta.image` (default `sheet.webp`), falling back to `sheet.webp` when the
/// named file is absent.
fn legacy_image_path(folder: &Path, index: &FrameIndex) -> Result<PathBuf> {
    let name = index.meta.image.as_deref().unwrap_or(LEGACY_SHEET_IMAGE);
    let named = folder.join(name);
    if named.is_file() {
        return Ok(named);
    }
    let fallback = folder.join(LEGACY_SHEET_IMAGE);
    if fallback.is_file() {
        warn!(missing = name, using = LEGACY_SHEET_IMAGE, "sheet image not found, using fallback");
        return Ok(fallback);
    }
    Err(AtlasError::MissingImage { name: name.to_string(), dir: folder.to_path_buf() })
}

impl InputSource {
    /// Loose frames in `folder`.
    pub fn frames(folder: &Path, prefix: &str) -> Result<Self> {
        FrameFolder::open(folder, prefix).map(InputSource::Frames)
    }

    /// Existing atlas indexed by `<folder>/<index_name>`.
    pub fn sheet(folder: &Path, index_name: &str) -> Result<Self> {
        ExistingSheet::open(folder, index_name).map(InputSource::Sheet)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        match self {
            InputSource::Frames(f) => f.frames.len(),
            InputSource::Sheet(s) => s.index.frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uniform frame size of the sheet.
    pub fn frame_size(&self) -> (u32, u32) {
        match self {
            InputSource::Frames(f) => f.frame_size,
            InputSource::Sheet(s) => s.frame_size,
        }
    }

    /// Frame count the source declares about itself, if any.
    pub fn declared_frame_count(&self) -> Option<usize> {
        match self {
            InputSource::Frames(_) => None,
            InputSource::Sheet(s) => s.index.meta.frame_count,
        }
    }

    /// Original frame size and cumulative scale to record in the new index.
    pub fn provenance(&self) -> Provenance {
        match self {
            InputSource::Frames(f) => Provenance {
                original_frame_size: Size::new(f.frame_size.0, f.frame_size.1),
                scale: 1.0,
            },
            InputSource::Sheet(s) => s.provenance(),
        }
    }

    /// Load the tile at position `index` in frame order.
    pub fn tile(&self, index: usize) -> Result<FrameTile> {
        match self {
            InputSource::Frames(f) => f.tile(index),
            InputSource::Sheet(s) => s.tile(index),
        }
    }

    /// All tiles in frame order. Each tile is produced on demand.
    pub fn tiles(&self) -> impl Iterator<Item = Result<FrameTile>> + '_ {
        (0..self.len()).map(move |i| self.tile(i))
    }
}
