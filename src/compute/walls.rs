//! Persistent obstacle mask.
//!
//! The wall mask is a per-cell RGBA overlay with its own lifecycle: it
//! survives field clears, resizes with the grid, and is painted by external
//! tools through the upload primitive. It is not part of the numeric state,
//! but it is read after every step to force masked cells back to the
//! configured wall value.

use crate::schema::WallConfig;

use super::Field;

/// Cells with mask alpha at or above this take part in enforcement.
pub const WALL_ALPHA_THRESHOLD: f32 = 0.01;

/// Per-cell (color, alpha) obstacle overlay, same extents as the field.
pub struct WallMask {
    width: usize,
    height: usize,
    /// Row-major RGBA, `width * height * 4`.
    rgba: Vec<f32>,
}

impl WallMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rgba: vec![0.0; width * height * 4],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Mask alpha at (x, y).
    #[inline]
    pub fn alpha(&self, x: usize, y: usize) -> f32 {
        self.rgba[(y * self.width + x) * 4 + 3]
    }

    /// Paint a single mask cell.
    pub fn paint(&mut self, x: usize, y: usize, color: [f32; 3], alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y * self.width + x) * 4;
        self.rgba[idx..idx + 3].copy_from_slice(&color);
        self.rgba[idx + 3] = alpha;
    }

    /// Write an RGBA region into the mask. Out-of-bounds portions are
    /// clipped silently. `data` is row-major `w * h * 4`.
    pub fn upload_region(&mut self, x: i32, y: i32, w: usize, h: usize, data: &[f32]) {
        debug_assert!(data.len() >= w * h * 4);
        for row in 0..h {
            for col in 0..w {
                let dx = x + col as i32;
                let dy = y + row as i32;
                if dx < 0 || dy < 0 || dx as usize >= self.width || dy as usize >= self.height {
                    continue;
                }
                let src = (row * w + col) * 4;
                let dst = (dy as usize * self.width + dx as usize) * 4;
                self.rgba[dst..dst + 4].copy_from_slice(&data[src..src + 4]);
            }
        }
    }

    /// Remove every wall.
    pub fn clear(&mut self) {
        self.rgba.fill(0.0);
    }

    /// Resize with the grid, preserving the centered overlap.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }

        let old = std::mem::replace(self, Self::new(width, height));

        let copy_w = old.width.min(width);
        let copy_h = old.height.min(height);
        let dst_x = (width - copy_w) / 2;
        let dst_y = (height - copy_h) / 2;
        let src_x = (old.width - copy_w) / 2;
        let src_y = (old.height - copy_h) / 2;

        for y in 0..copy_h {
            let src = ((src_y + y) * old.width + src_x) * 4;
            let dst = ((dst_y + y) * width + dst_x) * 4;
            self.rgba[dst..dst + copy_w * 4].copy_from_slice(&old.rgba[src..src + copy_w * 4]);
        }
    }

    /// Whether any cell is masked.
    pub fn has_walls(&self) -> bool {
        self.rgba
            .chunks_exact(4)
            .any(|px| px[3] >= WALL_ALPHA_THRESHOLD)
    }

    /// Force the configured channel(s) of every masked cell in the field's
    /// freshly-swapped state to the wall value.
    ///
    /// Scans once and returns immediately when no wall exists, or when the
    /// mask extents do not match the field (mid-resize).
    pub fn enforce(&self, field: &mut Field, wall: &WallConfig) {
        if self.width != field.width() || self.height != field.height() {
            return;
        }
        if !self.has_walls() {
            return;
        }

        let channels = field.channels();
        let value = wall.value;
        let planes = field.current_mut();

        for (idx, px) in self.rgba.chunks_exact(4).enumerate() {
            if px[3] < WALL_ALPHA_THRESHOLD {
                continue;
            }
            for c in 0..channels {
                if wall.channels[c.min(2)] {
                    planes[c][idx] = value;
                }
            }
        }
    }
}
