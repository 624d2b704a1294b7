//! Drawing one watermark placement onto a pixel buffer.

use std::sync::Arc;

use image::RgbaImage;

use crate::blending::{self, WATERMARK_FILL};
use crate::geometry::Placement;
use crate::glyphs::GlyphSource;
use crate::spec::TextAlign;

/// Draws text placements with a white fill at a given opacity.
///
/// The coverage mask from the [`GlyphSource`] is positioned so that its
/// vertical middle sits on the anchor and its left edge, center, or right edge
/// sits on the anchor per the placement's [`TextAlign`]. The mask is then
/// rotated clockwise about the anchor. Parts that land outside the buffer are
/// clipped.
#[derive(Clone)]
pub struct TextRasterizer {
    glyphs: Arc<dyn GlyphSource>,
}

impl TextRasterizer {
    /// Rasterizer drawing glyphs from `glyphs`.
    #[must_use]
    pub fn new(glyphs: Arc<dyn GlyphSource>) -> Self {
        Self { glyphs }
    }

    /// Composite one placement of `text` onto `buffer`.
    pub fn draw(
        &self,
        buffer: &mut RgbaImage,
        placement: &Placement,
        text: &str,
        font_size_px: u32,
        opacity: f32,
    ) {
        let (width, height) = buffer.dimensions();
        self.paint(width, height, placement, text, font_size_px, opacity, |x, y, alpha| {
            blending::blend_over(buffer.get_pixel_mut(x, y), WATERMARK_FILL, alpha);
        });
    }

    /// Visit every in-bounds pixel touched by the placement with its source alpha.
    #[allow(
        clippy::too_many_arguments,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub(crate) fn paint(
        &self,
        width: u32,
        height: u32,
        placement: &Placement,
        text: &str,
        font_size_px: u32,
        opacity: f32,
        mut visit: impl FnMut(u32, u32, f32),
    ) {
        if text.is_empty() {
            return;
        }
        let mask = self.glyphs.coverage(text, font_size_px as f32);
        if mask.is_empty() {
            return;
        }

        let (mask_w, mask_h) = (mask.width() as f32, mask.height() as f32);
        let origin_x = match placement.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => mask_w / 2.0,
            TextAlign::Right => mask_w,
        };
        let origin_y = mask_h / 2.0;
        let (ax, ay) = (placement.x, placement.y);
        let (sin, cos) = placement.rotation_deg.to_radians().sin_cos();

        // Destination bounding box of the rotated mask.
        let corners = [
            (-origin_x, -origin_y),
            (mask_w - origin_x, -origin_y),
            (-origin_x, mask_h - origin_y),
            (mask_w - origin_x, mask_h - origin_y),
        ];
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for (lx, ly) in corners {
            let x = ax + lx * cos - ly * sin;
            let y = ay + lx * sin + ly * cos;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let x0 = (min_x.floor() as i64).max(0);
        let y0 = (min_y.floor() as i64).max(0);
        let x1 = (max_x.ceil() as i64).min(i64::from(width));
        let y1 = (max_y.ceil() as i64).min(i64::from(height));

        for py in y0..y1 {
            let dy = py as f32 + 0.5 - ay;
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - ax;
                let lx = dx * cos + dy * sin + origin_x;
                let ly = -dx * sin + dy * cos + origin_y;
                let coverage = mask.sample(lx, ly);
                if coverage <= 0.0 {
                    continue;
                }
                visit(px as u32, py as u32, opacity * coverage);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyphs::BlockGlyphs;
    use image::Rgba;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn rasterizer() -> TextRasterizer {
        TextRasterizer::new(Arc::new(BlockGlyphs))
    }

    fn lit(buffer: &RgbaImage) -> Vec<(u32, u32)> {
        buffer
            .enumerate_pixels()
            .filter(|(_, _, px)| px[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    fn at(x: f32, y: f32, rotation_deg: f32, align: TextAlign) -> Placement {
        Placement {
            x,
            y,
            rotation_deg,
            align,
        }
    }

    #[test]
    fn centered_text_is_centered_on_the_anchor() {
        let mut buffer = RgbaImage::from_pixel(100, 60, BLACK);
        rasterizer().draw(&mut buffer, &at(50.0, 30.0, 0.0, TextAlign::Center), "WW", 20, 1.0);

        let pixels = lit(&buffer);
        assert!(!pixels.is_empty());
        let min_x = pixels.iter().map(|p| p.0).min().unwrap();
        let max_x = pixels.iter().map(|p| p.0).max().unwrap();
        // Two 12px cells span 38..62; blocks are inset by 1.2px on each side.
        assert!((38..=40).contains(&min_x), "min_x {min_x}");
        assert!((59..=61).contains(&max_x), "max_x {max_x}");
        assert_eq!(*buffer.get_pixel(45, 30), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn left_and_right_alignment_put_the_anchor_on_the_text_edge() {
        let mut left = RgbaImage::from_pixel(100, 60, BLACK);
        rasterizer().draw(&mut left, &at(20.0, 30.0, 0.0, TextAlign::Left), "W", 20, 1.0);
        assert!(lit(&left).iter().all(|&(x, _)| (20..33).contains(&x)));

        let mut right = RgbaImage::from_pixel(100, 60, BLACK);
        rasterizer().draw(&mut right, &at(80.0, 30.0, 0.0, TextAlign::Right), "W", 20, 1.0);
        assert!(lit(&right).iter().all(|&(x, _)| (67..80).contains(&x)));
    }

    #[test]
    fn opacity_scales_the_white_fill() {
        let mut buffer = RgbaImage::from_pixel(60, 60, BLACK);
        rasterizer().draw(&mut buffer, &at(30.0, 30.0, 0.0, TextAlign::Center), "W", 20, 0.5);
        assert_eq!(*buffer.get_pixel(30, 30), Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn quarter_turn_swaps_the_text_extent() {
        let mut buffer = RgbaImage::from_pixel(120, 120, BLACK);
        rasterizer().draw(&mut buffer, &at(60.0, 60.0, 90.0, TextAlign::Center), "WWWW", 20, 1.0);
        let pixels = lit(&buffer);
        let span_x = pixels.iter().map(|p| p.0).max().unwrap() - pixels.iter().map(|p| p.0).min().unwrap();
        let span_y = pixels.iter().map(|p| p.1).max().unwrap() - pixels.iter().map(|p| p.1).min().unwrap();
        assert!(span_y > span_x * 2, "x span {span_x}, y span {span_y}");
    }

    #[test]
    fn text_past_the_border_is_clipped_silently() {
        let mut buffer = RgbaImage::from_pixel(30, 30, BLACK);
        rasterizer().draw(&mut buffer, &at(0.0, 0.0, 45.0, TextAlign::Center), "WATERMARK", 24, 1.0);
        rasterizer().draw(&mut buffer, &at(30.0, 30.0, 0.0, TextAlign::Left), "WATERMARK", 24, 1.0);
        assert_eq!(buffer.dimensions(), (30, 30));
        assert!(!lit(&buffer).is_empty());
    }

    #[test]
    fn empty_text_draws_nothing() {
        let mut buffer = RgbaImage::from_pixel(30, 30, BLACK);
        rasterizer().draw(&mut buffer, &at(15.0, 15.0, 0.0, TextAlign::Center), "", 24, 1.0);
        assert!(lit(&buffer).is_empty());
    }
}
