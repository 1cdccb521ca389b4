//! Error types for atlas operations
//!
//! Every structural problem with the input aborts the whole operation before
//! any output is written. [`ErrorKind`] groups the variants into the three
//! input categories plus plain I/O and codec failures.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = AtlasError> = std::result::Result<T, E>;

/// Broad category of an [`AtlasError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source path, index, or image is absent
    MissingInput,
    /// Input exists but lacks required structure
    MalformedInput,
    /// Frames disagree with each other
    InconsistentInput,
    /// Filesystem failure
    Io,
    /// Image decode or encode failure
    Codec,
}

/// Error raised by packing, re-paging, downscaling, and sheet building.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AtlasError {
    /// Source directory or file does not exist
    #[error("Input does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    /// Frame index file is absent
    #[error("Missing frame index {}", .0.display())]
    MissingIndex(PathBuf),

    /// Sheet or page image referenced by an index is absent
    #[error("Missing atlas image {name} in {}", dir.display())]
    MissingImage { name: String, dir: PathBuf },

    /// No frame images were found
    #[error("No PNG/WebP frames found in {}", .0.display())]
    NoFrames(PathBuf),

    /// Index file could not be parsed or lacks a required field
    #[error("Malformed frame index {}: {reason}", path.display())]
    MalformedIndex { path: PathBuf, reason: String },

    /// Neither the declared frame size nor the first rect give a usable size
    #[error("Cannot determine frame_size from {}", .0.display())]
    UndeterminedFrameSize(PathBuf),

    /// Frame width or height is zero
    #[error("Invalid frame size: {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    /// Frame dimensions differ from the first frame
    #[error("Frame size mismatch: {file} is {}x{}, expected {}x{}", actual.0, actual.1, expected.0, expected.1)]
    FrameSizeMismatch { file: String, actual: (u32, u32), expected: (u32, u32) },

    /// Source rect reaches outside the image it is cropped from
    #[error("Frame '{filename}' rect {x},{y} {w}x{h} lies outside its {}x{} source image", source_size.0, source_size.1)]
    TileOutOfBounds {
        filename: String,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        source_size: (u32, u32),
    },

    /// Index entry points at a page that the index does not list
    #[error("Frame '{filename}' refers to page {page} but only {page_count} pages are listed")]
    PageOutOfRange { filename: String, page: usize, page_count: usize },

    /// Scale factor outside (0, 1]
    #[error("Invalid scale factor {0}: expected a value in (0, 1]")]
    InvalidScale(f64),

    /// Derived output would overwrite the source files
    #[error("Output prefix '{0}' would overwrite the source pages")]
    PrefixClash(String),

    /// Prefix cannot be turned into a generated-sheet pattern
    #[error("Invalid output prefix '{prefix}': {source}")]
    InvalidPrefix {
        prefix: String,
        #[source]
        source: regex::Error,
    },

    /// Filesystem error
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image decoding or encoding error
    #[error("Image error on {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// JSON serialization error on output
    #[error("Failed to serialize {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AtlasError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AtlasError::MissingSource(_)
            | AtlasError::MissingIndex(_)
            | AtlasError::MissingImage { .. } => ErrorKind::MissingInput,
            AtlasError::NoFrames(_)
            | AtlasError::MalformedIndex { .. }
            | AtlasError::UndeterminedFrameSize(_)
            | AtlasError::InvalidFrameSize { .. }
            | AtlasError::TileOutOfBounds { .. }
            | AtlasError::PageOutOfRange { .. }
            | AtlasError::InvalidScale(_)
            | AtlasError::PrefixClash(_)
            | AtlasError::InvalidPrefix { .. } => ErrorKind::MalformedInput,
            AtlasError::FrameSizeMismatch { .. } => ErrorKind::InconsistentInput,
            AtlasError::Io { .. } | AtlasError::Json { .. } => ErrorKind::Io,
            AtlasError::Image { .. } => ErrorKind::Codec,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AtlasError::Io { path: path.into(), source }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        AtlasError::Image { path: path.into(), source }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AtlasError::MalformedIndex { path: path.into(), reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_names_file() {
        let err = AtlasError::FrameSizeMismatch {
            file: "frame_5.png".to_string(),
            actual: (256, 256),
            expected: (512, 512),
        };
        let msg = err.to_string();
        assert!(msg.contains("frame_5.png"));
        assert!(msg.contains("256x256"));
        assert!(msg.contains("512x512"));
        assert_eq!(err.kind(), ErrorKind::InconsistentInput);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(AtlasError::MissingIndex(PathBuf::from("a")).kind(), ErrorKind::MissingInput);
        assert_eq!(AtlasError::NoFrames(PathBuf::from("a")).kind(), ErrorKind::MalformedInput);
        assert_eq!(
            AtlasError::UndeterminedFrameSize(PathBuf::from("a")).kind(),
            ErrorKind::MalformedInput
        );
        let io = AtlasError::io("x", std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(io.to_string().contains("boom"));

        let prefix = AtlasError::InvalidPrefix {
            prefix: "p".to_string(),
            source: regex::Error::Syntax("bad".to_string()),
        };
        assert_eq!(prefix.kind(), ErrorKind::MalformedInput);
        assert!(prefix.to_string().contains("'p'"));
    }
}
