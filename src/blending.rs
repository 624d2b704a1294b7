//! Alpha blending math for watermark compositing.
//!
//! Every watermark pixel is composited with the Porter-Duff "over" operator in
//! straight (non-premultiplied) alpha:
//!
//! `out_a = a + dst_a * (1 - a)`
//! `out_c = (c * a + dst_c * dst_a * (1 - a)) / out_a`
//!
//! Over is not commutative for different source colors, so callers must apply
//! draws in a fixed order.

use image::{Rgb, Rgba};

/// Alpha threshold: ignore pixels with negligible watermark effect.
pub const ALPHA_THRESHOLD: f32 = 1.0 / 512.0;

/// Fill color of every watermark glyph.
pub const WATERMARK_FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// Composite `color` at `alpha` over `pixel` in place.
///
/// `alpha` is clamped to `[0, 1]`; values below [`ALPHA_THRESHOLD`] leave the
/// pixel untouched.
pub fn blend_over(pixel: &mut Rgba<u8>, color: Rgb<u8>, alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha < ALPHA_THRESHOLD {
        return;
    }

    let dst_alpha = f32::from(pixel[3]) / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    let dst_weight = dst_alpha * (1.0 - alpha);

    for ch in 0..3 {
        let src = f32::from(color[ch]);
        let dst = f32::from(pixel[ch]);
        let out = (src * alpha + dst * dst_weight) / out_alpha;
        pixel[ch] = to_channel(out);
    }
    pixel[3] = to_channel(out_alpha * 255.0);
}

/// Accumulate `alpha` into a running watermark coverage value with "over".
///
/// Used for the removal mask: the result is the alpha of the watermark layer
/// alone, independent of the base image.
#[must_use]
pub fn accumulate(coverage: f32, alpha: f32) -> f32 {
    let alpha = alpha.clamp(0.0, 1.0);
    coverage + alpha * (1.0 - coverage)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn opaque_source_replaces_destination() {
        let mut px = Rgba([10, 20, 30, 255]);
        blend_over(&mut px, WATERMARK_FILL, 1.0);
        assert_eq!(px, Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn negligible_alpha_is_a_no_op() {
        let mut px = Rgba([10, 20, 30, 200]);
        blend_over(&mut px, WATERMARK_FILL, 0.001);
        assert_eq!(px, Rgba([10, 20, 30, 200]));
    }

    #[test]
    fn half_alpha_over_opaque_black_is_mid_gray() {
        let mut px = BLACK;
        blend_over(&mut px, WATERMARK_FILL, 0.5);
        assert_eq!(px, Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn repeated_draws_accumulate() {
        let mut px = BLACK;
        blend_over(&mut px, WATERMARK_FILL, 0.5);
        blend_over(&mut px, WATERMARK_FILL, 0.5);
        for ch in 0..3 {
            assert!((i32::from(px[ch]) - 191).abs() <= 2, "got {}", px[ch]);
        }
    }

    #[test]
    fn over_on_transparent_destination_takes_source_color() {
        let mut px = Rgba([0, 0, 0, 0]);
        blend_over(&mut px, Rgb([200, 100, 50]), 0.4);
        assert_eq!(px, Rgba([200, 100, 50, 102]));
    }

    #[test]
    fn draw_order_changes_the_result() {
        let red = Rgb([255, 0, 0]);
        let blue = Rgb([0, 0, 255]);

        let mut red_then_blue = BLACK;
        blend_over(&mut red_then_blue, red, 0.5);
        blend_over(&mut red_then_blue, blue, 0.5);

        let mut blue_then_red = BLACK;
        blend_over(&mut blue_then_red, blue, 0.5);
        blend_over(&mut blue_then_red, red, 0.5);

        assert_ne!(red_then_blue, blue_then_red);
        assert!(red_then_blue[2] > red_then_blue[0]);
        assert!(blue_then_red[0] > blue_then_red[2]);
    }

    #[test]
    fn accumulate_matches_over_alpha() {
        let c = accumulate(accumulate(0.0, 0.5), 0.5);
        assert!((c - 0.75).abs() < 1e-6);
        assert!((accumulate(0.3, 1.0) - 1.0).abs() < 1e-6);
        assert!((accumulate(0.3, 0.0) - 0.3).abs() < 1e-6);
    }
}
