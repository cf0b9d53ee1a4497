use anyhow::Result;
use fontdue::{Font, FontSettings};
use image::RgbaImage;

use super::canvas::blend;

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Rasterizes text onto RGBA frames with the embedded font.
pub struct TextOverlay {
    font: Font,
}

impl TextOverlay {
    pub fn new() -> Result<Self> {
        let font = Font::from_bytes(FONT_DATA, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to load embedded font: {}", e))?;
        Ok(Self { font })
    }

    /// Measure the width of rendered text in pixels.
    pub fn measure_width(&self, text: &str, size: f32) -> f32 {
        text.chars()
            .map(|ch| self.font.metrics(ch, size).advance_width)
            .sum()
    }

    /// (ascent, descent) above and below the baseline; descent is negative.
    fn vertical_extent(&self, size: f32) -> (f32, f32) {
        match self.font.horizontal_line_metrics(size) {
            Some(m) => (m.ascent, m.descent),
            None => (size * 0.8, -size * 0.2),
        }
    }

    /// Composite text with its baseline starting at (x, baseline).
    pub fn composite(
        &self,
        img: &mut RgbaImage,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        color: [u8; 3],
    ) {
        let rgba = [color[0], color[1], color[2], 255];
        let mut cursor_x = x;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, size);
            let glyph_left = (cursor_x + metrics.xmin as f32).round() as i32;
            let glyph_top = (baseline - (metrics.height as i32 + metrics.ymin) as f32).round() as i32;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }
                    blend(
                        img,
                        glyph_left + gx as i32,
                        glyph_top + gy as i32,
                        rgba,
                        alpha as f32 / 255.0,
                    );
                }
            }

            cursor_x += metrics.advance_width;
        }
    }

    /// Composite text centred on (cx, cy).
    pub fn composite_centered(
        &self,
        img: &mut RgbaImage,
        text: &str,
        cx: f32,
        cy: f32,
        size: f32,
        color: [u8; 3],
    ) {
        let (ascent, descent) = self.vertical_extent(size);
        let x = cx - self.measure_width(text, size) / 2.0;
        let baseline = cy + (ascent + descent) / 2.0;
        self.composite(img, text, x, baseline, size, color);
    }

    /// Composite text centred on (cx, cy), rotated 90° counter-clockwise so it reads upwards.
    pub fn composite_vertical(
        &self,
        img: &mut RgbaImage,
        text: &str,
        cx: f32,
        cy: f32,
        size: f32,
        color: [u8; 3],
    ) {
        let rgba = [color[0], color[1], color[2], 255];
        let (ascent, descent) = self.vertical_extent(size);
        let origin_x = cx + (ascent + descent) / 2.0;
        let origin_y = cy + self.measure_width(text, size) / 2.0;

        let mut advance = 0.0f32;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, size);
            let along = advance + metrics.xmin as f32;
            let across = -((metrics.height as i32 + metrics.ymin) as f32);

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }
                    let px = (origin_x + across + gy as f32).round() as i32;
                    let py = (origin_y - along - gx as f32).round() as i32;
                    blend(img, px, py, rgba, alpha as f32 / 255.0);
                }
            }

            advance += metrics.advance_width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn dark_pixels(img: &RgbaImage) -> Vec<(u32, u32)> {
        img.enumerate_pixels()
            .filter(|(_, _, p)| p[0] < 128)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn width_grows_with_text() {
        let overlay = TextOverlay::new().unwrap();
        let short = overlay.measure_width("A4", 24.0);
        let long = overlay.measure_width("A4 C#5", 24.0);
        assert!(short > 0.0);
        assert!(long > short);
    }

    #[test]
    fn centered_text_lands_around_its_anchor() {
        let overlay = TextOverlay::new().unwrap();
        let mut img = RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255]));
        overlay.composite_centered(&mut img, "A4", 100.0, 50.0, 32.0, [0, 0, 0]);

        let dark = dark_pixels(&img);
        assert!(!dark.is_empty());
        let (min_x, max_x) = (dark.iter().map(|p| p.0).min().unwrap(), dark.iter().map(|p| p.0).max().unwrap());
        let (min_y, max_y) = (dark.iter().map(|p| p.1).min().unwrap(), dark.iter().map(|p| p.1).max().unwrap());
        assert!(min_x < 100 && max_x > 100);
        assert!(min_y < 55 && max_y > 45);
    }

    #[test]
    fn vertical_text_is_taller_than_wide() {
        let overlay = TextOverlay::new().unwrap();
        let mut img = RgbaImage::from_pixel(100, 300, Rgba([255, 255, 255, 255]));
        overlay.composite_vertical(&mut img, "Magnitude", 50.0, 150.0, 24.0, [0, 0, 0]);

        let dark = dark_pixels(&img);
        let width = dark.iter().map(|p| p.0).max().unwrap() - dark.iter().map(|p| p.0).min().unwrap();
        let height = dark.iter().map(|p| p.1).max().unwrap() - dark.iter().map(|p| p.1).min().unwrap();
        assert!(height > width * 2);
    }
}
