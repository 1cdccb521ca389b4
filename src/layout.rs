//! Page grid arithmetic for multi-page atlases
//!
//! Frames are never scaled or split: a page holds as many whole frames as
//! fit in `max_dim` along each axis, and at least one.

use crate::error::{AtlasError, Result};
use std::ops::Range;

/// Grid shape shared by every page of one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub frame_w: u32,
    pub frame_h: u32,
    pub cols: u32,
    pub rows: u32,
    /// Frames per page (`cols * rows`)
    pub per_page: usize,
    pub page_w: u32,
    pub page_h: u32,
}

/// Where one frame lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub page: usize,
    pub x: u32,
    pub y: u32,
}

impl PageLayout {
    /// Compute the grid for uniform `frame_w x frame_h` frames and a maximum
    /// page dimension.
    ///
    /// A frame larger than `max_dim` still gets a 1x1 grid, so that page
    /// exceeds `max_dim`.
    ///
    /// # Examples
    ///
    /// ```
    /// use delta_atlas::layout::PageLayout;
    ///
    /// let layout = PageLayout::compute(512, 512, 1024).unwrap();
    /// assert_eq!((layout.cols, layout.rows, layout.per_page), (2, 2, 4));
    /// assert_eq!(layout.page_count(5), 2);
    /// ```
    pub fn compute(frame_w: u32, frame_h: u32, max_dim: u32) -> Result<Self> {
        if frame_w == 0 || frame_h == 0 {
            return Err(AtlasError::InvalidFrameSize { width: frame_w, height: frame_h });
        }
        let cols = (max_dim / frame_w).max(1);
        let rows = (max_dim / frame_h).max(1);
        Ok(Self {
            frame_w,
            frame_h,
            cols,
            rows,
            per_page: cols as usize * rows as usize,
            page_w: cols * frame_w,
            page_h: rows * frame_h,
        })
    }

    /// Number of pages needed for `total` frames.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.per_page)
    }

    /// Page and top-left pixel of the frame at `index`.
    pub fn slot(&self, index: usize) -> Slot {
        let page = index / self.per_page;
        let within = index % self.per_page;
        let cols = self.cols as usize;
        Slot {
            page,
            x: (within % cols) as u32 * self.frame_w,
            y: (within / cols) as u32 * self.frame_h,
        }
    }

    /// Frame indices stored on `page`.
    pub fn page_range(&self, page: usize, total: usize) -> Range<usize> {
        let start = (page * self.per_page).min(total);
        let end = (start + self.per_page).min(total);
        start..end
    }
}
