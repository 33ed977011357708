//! Bright-blob detector
//!
//! A frame is reduced to luminance, thresholded into a foreground mask, split into
//! 8-connected components, and each component's bounding box is checked against a minimum
//! size. Only outer extents matter: a component sitting inside another one's hole can never
//! have a larger box than its parent, so holes need no special treatment.

use image::RgbaImage;
use std::convert::Infallible;
use std::ops::ControlFlow;

use crate::constants::detection::{BRIGHTNESS_THRESHOLD, MIN_BOX_HEIGHT, MIN_BOX_WIDTH};

/// Axis-aligned extent of one foreground component, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Stateless detector; identical frames always give identical answers
#[derive(Debug, Clone, Copy)]
pub struct ShapeDetector {
    threshold: u8,
    min_width: u32,
    min_height: u32,
}

impl Default for ShapeDetector {
    fn default() -> Self {
        Self {
            threshold: BRIGHTNESS_THRESHOLD,
            min_width: MIN_BOX_WIDTH,
            min_height: MIN_BOX_HEIGHT,
        }
    }
}

impl ShapeDetector {
    /// True when the frame holds at least one qualifying bright component
    pub fn detect(&self, frame: &RgbaImage) -> bool {
        let mask = self.foreground_mask(frame);
        let found = for_each_component(&mask, frame.width(), frame.height(), |bbox| {
            if self.qualifies(&bbox) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        found.is_break()
    }

    /// Bounding boxes of every foreground component, in scan order of their first pixel
    pub fn analyze(&self, frame: &RgbaImage) -> Vec<BoundingBox> {
        let mask = self.foreground_mask(frame);
        let mut boxes = Vec::new();
        let ControlFlow::Continue(()) =
            for_each_component::<Infallible>(&mask, frame.width(), frame.height(), |bbox| {
                boxes.push(bbox);
                ControlFlow::Continue(())
            });
        boxes
    }

    /// Size filter: both sides strictly above the minimum
    pub fn qualifies(&self, bbox: &BoundingBox) -> bool {
        bbox.width > self.min_width && bbox.height > self.min_height
    }

    fn foreground_mask(&self, frame: &RgbaImage) -> Vec<bool> {
        frame
            .pixels()
            .map(|px| luminance(px[0], px[1], px[2]) >= self.threshold)
            .collect()
    }
}

/// BT.601 luma in 14-bit fixed point, rounded
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    ((u32::from(r) * R + u32::from(g) * G + u32::from(b) * B + (1 << 13)) >> 14) as u8
}

/// Flood-fill every 8-connected run of `true` cells and hand its box to `visit`
///
/// Stops early when `visit` breaks.
fn for_each_component<B>(
    mask: &[bool],
    width: u32,
    height: u32,
    mut visit: impl FnMut(BoundingBox) -> ControlFlow<B>,
) -> ControlFlow<B> {
    let (w, h) = (width as usize, height as usize);
    let mut seen = vec![false; mask.len()];
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || seen[start] {
            continue;
        }

        seen[start] = true;
        stack.push(start);
        let (mut min_x, mut min_y) = (start % w, start / w);
        let (mut max_x, mut max_y) = (min_x, min_y);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if mask[n] && !seen[n] {
                        seen[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        visit(BoundingBox {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })?;
    }

    ControlFlow::Continue(())
}
