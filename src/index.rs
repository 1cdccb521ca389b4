//! Persisted frame index (`sheet.json`)
//!
//! The same types read legacy single-sheet indexes, read multi-page indexes,
//! and write new ones. Reading is lenient: optional fields default and any
//! unknown keys are kept so that pass-through rewrites do not drop them.
//!
//! # Output Format
//!
//! ```json
//! {
//!   "meta": {
//!     "pages": [{ "image": "sheet_00.webp", "size": { "w": 2048, "h": 2048 } }],
//!     "frame_count": 5,
//!     "cols": 4, "rows": 4,
//!     "frame_size": { "w": 512, "h": 512 },
//!     "original_frame_size": { "w": 512, "h": 512 },
//!     "scale": 1.0
//!   },
//!   "frames": [
//!     {
//!       "filename": "frame_0.png",
//!       "page": 0,
//!       "frame": { "x": 0, "y": 0, "w": 512, "h": 512 },
//!       "rotated": false, "trimmed": false,
//!       "spriteSourceSize": { "x": 0, "y": 0, "w": 512, "h": 512 },
//!       "sourceSize": { "w": 512, "h": 512 }
//!     }
//!   ]
//! }
//! ```

use crate::error::{AtlasError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Default index file name.
pub const DEFAULT_INDEX_NAME: &str = "sheet.json";

/// Default legacy single-sheet image name.
pub const LEGACY_SHEET_IMAGE: &str = "sheet.webp";

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    #[serde(default)]
    pub w: u32,
    #[serde(default)]
    pub h: u32,
}

impl Size {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// Pixel rectangle in page-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
    #[serde(default)]
    pub w: u32,
    #[serde(default)]
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// One page image of a multi-page atlas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRef {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
}

/// Sheet-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetMeta {
    /// Page images; empty for a legacy single sheet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageRef>,
    /// Legacy single-sheet image name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_frame_size: Option<Size>,
    /// Cumulative scale relative to the original source pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One frame's placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    pub filename: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub frame: Rect,
    #[serde(default)]
    pub rotated: bool,
    #[serde(default)]
    pub trimmed: bool,
    #[serde(
        rename = "spriteSourceSize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sprite_source_size: Option<Rect>,
    #[serde(rename = "sourceSize", default, skip_serializing_if = "Option::is_none")]
    pub source_size: Option<Size>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Complete frame index document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameIndex {
    #[serde(default)]
    pub meta: SheetMeta,
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
}

impl FrameIndex {
    /// Parse an index from JSON text. `path` is only used in error messages.
    pub fn from_json(text: &str, path: &Path) -> Result<Self> {
        let index: FrameIndex = serde_json::from_str(text)
            .map_err(|e| AtlasError::malformed(path, e.to_string()))?;
        Ok(index)
    }

    /// Read and parse an index file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AtlasError::MissingIndex(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| AtlasError::io(path, e))?;
        Self::from_json(&text, path)
    }

    /// Like [`FrameIndex::load`] but also requires a non-empty `frames` list.
    pub fn load_with_frames(path: &Path) -> Result<Self> {
        let index = Self::load(path)?;
        if index.frames.is_empty() {
            return Err(AtlasError::malformed(path, "no frames"));
        }
        Ok(index)
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Whether this index describes a multi-page atlas.
    pub fn is_paged(&self) -> bool {
        !self.meta.pages.is_empty()
    }
}

/// Page image file name for `page` (`<prefix>_<NN>.<ext>`).
pub fn page_file_name(prefix: &str, page: usize, ext: &str) -> String {
    format!("{}_{:02}.{}", prefix, page, ext)
}

/// Index file name for an output prefix (`<prefix>.json`).
pub fn index_file_name(prefix: &str) -> String {
    format!("{}.json", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_page_file_name_is_zero_padded() {
        assert_eq!(page_file_name("sheet", 0, "webp"), "sheet_00.webp");
        assert_eq!(page_file_name("sheet_1024", 7, "webp"), "sheet_1024_07.webp");
        assert_eq!(page_file_name("sheet", 123, "png"), "sheet_123.png");
        assert_eq!(index_file_name("sheet"), "sheet.json");
    }

    #[test]
    fn test_parse_legacy_single_sheet() {
        let json = r#"{
            "meta": { "image": "sheet.webp", "frame_size": { "w": 64, "h": 32 } },
            "frames": [
                { "filename": "a.png", "frame": { "x": 0, "y": 0, "w": 64, "h": 32 } },
                { "filename": "b.png", "frame": { "x": 64, "y": 0 } }
            ]
        }"#;
        let index = FrameIndex::from_json(json, Path::new("sheet.json")).unwrap();
        assert!(!index.is_paged());
        assert_eq!(index.meta.image.as_deref(), Some("sheet.webp"));
        assert_eq!(index.meta.frame_size, Some(Size::new(64, 32)));
        assert_eq!(index.frames.len(), 2);
        assert_eq!(index.frames[1].frame, Rect::new(64, 0, 0, 0));
        assert_eq!(index.frames[1].page, 0);
        assert!(index.frames[1].sprite_source_size.is_none());
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let json = r#"{
            "meta": { "pages": [{ "image": "p_00.webp" }], "app": "tool", "version": 3 },
            "frames": [{ "filename": "a", "frame": { "x": 1, "y": 2, "w": 3, "h": 4 }, "tag": "x" }]
        }"#;
        let index = FrameIndex::from_json(json, Path::new("p.json")).unwrap();
        let out = index.to_json().unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["meta"]["app"], "tool");
        assert_eq!(value["meta"]["version"], 3);
        assert_eq!(value["frames"][0]["tag"], "x");
        assert!(value["meta"]["pages"][0].get("size").is_none());
    }

    #[test]
    fn test_written_entry_uses_camel_case_keys() {
        let entry = FrameEntry {
            filename: "f.png".to_string(),
            page: 1,
            frame: Rect::new(0, 0, 8, 8),
            rotated: false,
            trimmed: false,
            sprite_source_size: Some(Rect::new(0, 0, 8, 8)),
            source_size: Some(Size::new(8, 8)),
            extra: Map::new(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["spriteSourceSize"]["w"], 8);
        assert_eq!(value["sourceSize"]["h"], 8);
        assert_eq!(value["rotated"], false);
        assert_eq!(value["page"], 1);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = FrameIndex::from_json("{ not json", Path::new("x.json")).unwrap_err();
        assert!(matches!(err, AtlasError::MalformedIndex { .. }));

        let err = FrameIndex::from_json(r#"{"frames": [{"page": 0}]}"#, Path::new("x.json"))
            .unwrap_err();
        assert!(err.to_string().contains("filename"));
    }

    #[test]
    fn test_missing_index_file() {
        let err = FrameIndex::load(&PathBuf::from("/definitely/not/here/sheet.json")).unwrap_err();
        assert!(matches!(err, AtlasError::MissingIndex(_)));
    }

    #[test]
    fn test_empty_frames_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.json");
        std::fs::write(&path, r#"{"meta": {}, "frames": []}"#).unwrap();
        let err = FrameIndex::load_with_frames(&path).unwrap_err();
        assert!(matches!(err, AtlasError::MalformedIndex { .. }));
        assert!(err.to_string().contains("no frames"));
    }
}
