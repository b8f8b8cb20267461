//! Text Sampler
//!
//! Rasterizes the greeting onto an offscreen bitmap (black on white) and
//! turns every foreground pixel into a point on the message plane. The pool
//! is computed once and shared by every element group so all of them draw
//! the same letter shapes.

use font8x8::legacy::BASIC_LEGACY;
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Glyph cell size of the bitmap font
const GLYPH: u32 = 8;
/// Blank glyph rows between lines
const LINE_GAP: u32 = 3;

const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
    pub lines: Vec<String>,
    /// Square canvas edge in pixels
    pub canvas: u32,
    /// Sample every n-th pixel in both directions
    pub stride: u32,
    /// Pixels darker than this are text
    pub threshold: u8,
    /// World-space width/height the canvas maps onto
    pub scale: f32,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            lines: vec!["MERRY CHRISTMAS".to_string(), "HAPPY NEW YEAR".to_string()],
            canvas: 1024,
            stride: 2,
            threshold: 128,
            scale: 24.0,
        }
    }
}

/// Foreground coordinates on the message plane, centered on the origin
#[derive(Clone, Debug, PartialEq)]
pub struct TextPool {
    points: Vec<[f32; 2]>,
    scale: f32,
    fallback: bool,
}

impl TextPool {
    /// Single-point pool at the canvas center
    pub fn fallback(scale: f32) -> Self {
        Self {
            points: vec![[0.0, 0.0]],
            scale,
            fallback: true,
        }
    }

    pub fn points(&self) -> &[[f32; 2]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when no text pixel was found and the center point stands in
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Min/max corners of the pool
    pub fn bounds(&self) -> ([f32; 2], [f32; 2]) {
        let mut min = [f32::INFINITY; 2];
        let mut max = [f32::NEG_INFINITY; 2];
        for p in &self.points {
            for i in 0..2 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        (min, max)
    }
}

/// Render `lines` centered on a white canvas in a bold bitmap face
pub fn rasterize(lines: &[String], width: u32, height: u32) -> GrayImage {
    let mut img = GrayImage::from_pixel(width, height, PAPER);

    let max_chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
    if max_chars == 0 || width == 0 || height == 0 {
        return img;
    }

    // Whole-pixel magnification so every glyph bit becomes a square block
    let rows = lines.len() as u32;
    let text_rows = rows * GLYPH + rows.saturating_sub(1) * LINE_GAP;
    let cell = ((width * 9 / 10) / (max_chars * GLYPH))
        .min((height * 3 / 5) / text_rows)
        .max(1);
    // Widen strokes to the right for a heavier face
    let bold = (cell / 3).max(1);

    let block_h = text_rows * cell;
    let top = height.saturating_sub(block_h) / 2;

    for (row, line) in lines.iter().enumerate() {
        let chars = line.chars().count() as u32;
        let left = width.saturating_sub(chars * GLYPH * cell) / 2;
        let line_top = top + row as u32 * (GLYPH + LINE_GAP) * cell;

        for (col, ch) in line.chars().enumerate() {
            let glyph = glyph_for_char(ch);
            let glyph_left = left + col as u32 * GLYPH * cell;

            for (gy, bits) in glyph.iter().enumerate() {
                for gx in 0..GLYPH {
                    if (bits >> gx) & 0x01 == 0 {
                        continue;
                    }
                    let x0 = glyph_left + gx * cell;
                    let y0 = line_top + gy as u32 * cell;
                    fill_block(&mut img, x0, y0, cell + bold, cell);
                }
            }
        }
    }

    img
}

fn fill_block(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
    let (width, height) = img.dimensions();
    for y in y0..(y0 + h).min(height) {
        for x in x0..(x0 + w).min(width) {
            img.put_pixel(x, y, INK);
        }
    }
}

fn glyph_for_char(ch: char) -> [u8; 8] {
    let index = ch as usize;
    if index < BASIC_LEGACY.len() {
        BASIC_LEGACY[index]
    } else {
        BASIC_LEGACY[b'?' as usize]
    }
}

/// Collect foreground pixels into world-plane coordinates.
///
/// Pixel `(px, py)` maps to `((px/W - 0.5)·scale, (py/H - 0.5)·-scale)`;
/// the y flip undoes image rows growing downward.
pub fn sample(img: &GrayImage, stride: u32, threshold: u8, scale: f32) -> TextPool {
    let (width, height) = img.dimensions();
    let stride = stride.max(1) as usize;

    let mut points = Vec::new();
    for py in (0..height).step_by(stride) {
        for px in (0..width).step_by(stride) {
            if img.get_pixel(px, py).0[0] < threshold {
                let nx = (px as f32 / width as f32 - 0.5) * scale;
                let ny = (py as f32 / height as f32 - 0.5) * -scale;
                points.push([nx, ny]);
            }
        }
    }

    if points.is_empty() {
        warn!("No text pixels found on {}x{} canvas, using center point", width, height);
        return TextPool::fallback(scale);
    }

    debug!("Sampled {} text points (stride {})", points.len(), stride);
    TextPool {
        points,
        scale,
        fallback: false,
    }
}

/// Rasterize and sample in one go
pub fn build_pool(settings: &MessageSettings) -> TextPool {
    let img = rasterize(&settings.lines, settings.canvas, settings.canvas);
    sample(&img, settings.stride, settings.threshold, settings.scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_message_pool() {
        let settings = MessageSettings::default();
        let pool = build_pool(&settings);

        assert!(!pool.is_fallback());
        assert!(pool.len() > 0);

        let half = settings.scale / 2.0;
        for p in pool.points() {
            assert!(p[0] >= -half && p[0] <= half, "x out of range: {}", p[0]);
            assert!(p[1] >= -half && p[1] <= half, "y out of range: {}", p[1]);
        }
    }

    #[test]
    fn test_text_is_centered() {
        let pool = build_pool(&MessageSettings::default());
        let (min, max) = pool.bounds();
        let cx = (min[0] + max[0]) / 2.0;
        let cy = (min[1] + max[1]) / 2.0;
        assert!(cx.abs() < 1.0, "cx = {}", cx);
        assert!(cy.abs() < 1.0, "cy = {}", cy);
    }

    #[test]
    fn test_two_lines_stack_vertically() {
        let lines = vec!["I".to_string(), "I".to_string()];
        let img = rasterize(&lines, 256, 256);
        // Ink above and below the canvas middle
        let top_ink = (0..128).any(|y| (0..256).any(|x| img.get_pixel(x, y).0[0] == 0));
        let bottom_ink = (128..256).any(|y| (0..256).any(|x| img.get_pixel(x, y).0[0] == 0));
        assert!(top_ink && bottom_ink);
    }

    #[test]
    fn test_blank_text_falls_back_to_center() {
        let img = rasterize(&["   ".to_string()], 64, 64);
        let pool = sample(&img, 1, 128, 10.0);
        assert!(pool.is_fallback());
        assert_eq!(pool.points(), &[[0.0, 0.0]]);
    }

    #[test]
    fn test_no_lines_falls_back() {
        let img = rasterize(&[], 64, 64);
        assert!(sample(&img, 2, 128, 10.0).is_fallback());
    }

    #[test]
    fn test_y_axis_flipped() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255]));
        img.put_pixel(0, 0, Luma([0]));
        let pool = sample(&img, 1, 128, 10.0);
        assert_eq!(pool.points(), &[[-5.0, 5.0]]);
    }

    #[test]
    fn test_stride_thins_pool() {
        let settings = MessageSettings::default();
        let img = rasterize(&settings.lines, 256, 256);
        let dense = sample(&img, 1, 128, 10.0);
        let sparse = sample(&img, 2, 128, 10.0);
        assert!(sparse.len() < dense.len());
        assert!(sparse.len() > 0);
    }
}
