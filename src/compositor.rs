//! Watermark compositor: the `render(base, spec)` entry point.
//!
//! The compositor validates its inputs, copies the base image into a private
//! buffer, asks the geometry engine for the ordered placements, and draws them
//! one after another. Later placements land on top of earlier ones, so the
//! draws are never reordered or parallelized within a render.

use std::sync::Arc;

use image::{GrayImage, Luma, RgbaImage};

use crate::blending::{self, WATERMARK_FILL};
use crate::error::Result;
use crate::geometry;
use crate::glyphs::GlyphSource;
use crate::raster::TextRasterizer;
use crate::spec::{CanvasDims, PlacementSpec};

/// Renders watermark specs onto base images.
///
/// Holds no per-render state: one compositor can serve any number of renders,
/// from any thread.
#[derive(Clone)]
pub struct Compositor {
    rasterizer: TextRasterizer,
}

impl Compositor {
    /// Compositor drawing glyphs from `glyphs`.
    #[must_use]
    pub fn new(glyphs: Arc<dyn GlyphSource>) -> Self {
        Self {
            rasterizer: TextRasterizer::new(glyphs),
        }
    }

    /// Render `spec` onto a copy of `base`.
    ///
    /// The result always has the dimensions of `base`. Empty text returns an
    /// unmodified copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSpec`](crate::Error::InvalidSpec) or
    /// [`Error::EmptyCanvas`](crate::Error::EmptyCanvas) before any buffer is
    /// allocated.
    pub fn render(&self, base: &RgbaImage, spec: &PlacementSpec) -> Result<RgbaImage> {
        Ok(self.render_counted(base, spec, false)?.image)
    }

    /// Render like [`Compositor::render`] and also return the watermark mask.
    ///
    /// The mask has the dimensions of `base` and holds the accumulated alpha of
    /// the watermark layer alone (0 = untouched, 255 = fully covered), which is
    /// what a removal service needs to locate the text later.
    ///
    /// # Errors
    ///
    /// Same as [`Compositor::render`].
    pub fn render_with_mask(
        &self,
        base: &RgbaImage,
        spec: &PlacementSpec,
    ) -> Result<(RgbaImage, GrayImage)> {
        let rendered = self.render_counted(base, spec, true)?;
        let mask = rendered
            .mask
            .unwrap_or_else(|| GrayImage::new(base.width(), base.height()));
        Ok((rendered.image, mask))
    }

    pub(crate) fn rasterizer(&self) -> &TextRasterizer {
        &self.rasterizer
    }

    /// Shared render path; reports how many placements were drawn.
    pub(crate) fn render_counted(
        &self,
        base: &RgbaImage,
        spec: &PlacementSpec,
        with_mask: bool,
    ) -> Result<Rendered> {
        let dims = check(base, spec)?;
        let mut buffer = base.clone();
        if spec.text.is_empty() {
            return Ok(Rendered {
                image: buffer,
                mask: with_mask.then(|| GrayImage::new(dims.width, dims.height)),
                placements: 0,
            });
        }

        let placements = geometry::compute(spec, dims);
        tracing::debug!(
            pattern = %spec.pattern,
            width = dims.width,
            height = dims.height,
            placements = placements.len(),
            with_mask,
            "rendering watermark"
        );

        if !with_mask {
            for placement in &placements {
                self.rasterizer
                    .draw(&mut buffer, placement, &spec.text, spec.font_size_px, spec.opacity);
            }
            return Ok(Rendered {
                image: buffer,
                mask: None,
                placements: placements.len(),
            });
        }

        let mut coverage = vec![0.0_f32; dims.width as usize * dims.height as usize];
        for placement in &placements {
            self.rasterizer.paint(
                dims.width,
                dims.height,
                placement,
                &spec.text,
                spec.font_size_px,
                spec.opacity,
                |x, y, alpha| {
                    blending::blend_over(buffer.get_pixel_mut(x, y), WATERMARK_FILL, alpha);
                    let idx = y as usize * dims.width as usize + x as usize;
                    coverage[idx] = blending::accumulate(coverage[idx], alpha);
                },
            );
        }

        let mask = GrayImage::from_fn(dims.width, dims.height, |x, y| {
            let value = coverage[y as usize * dims.width as usize + x as usize];
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let level = (value * 255.0).round().clamp(0.0, 255.0) as u8;
            Luma([level])
        });

        Ok(Rendered {
            image: buffer,
            mask: Some(mask),
            placements: placements.len(),
        })
    }
}

/// Output of a single render.
pub(crate) struct Rendered {
    pub(crate) image: RgbaImage,
    pub(crate) mask: Option<GrayImage>,
    pub(crate) placements: usize,
}

fn check(base: &RgbaImage, spec: &PlacementSpec) -> Result<CanvasDims> {
    spec.validate()?;
    CanvasDims::of(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::glyphs::BlockGlyphs;
    use crate::spec::Pattern;
    use image::Rgba;

    fn compositor() -> Compositor {
        Compositor::new(Arc::new(BlockGlyphs))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 40, 255])
        })
    }

    #[test]
    fn empty_text_is_identity() {
        let base = gradient(64, 48);
        let out = compositor().render(&base, &PlacementSpec::default()).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn output_dimensions_match_base() {
        let base = gradient(123, 45);
        for pattern in Pattern::ALL {
            let spec = PlacementSpec {
                pattern,
                spacing_px: 50,
                angle_deg: 20.0,
                ..PlacementSpec::with_text("dimension check")
            };
            let out = compositor().render(&base, &spec).unwrap();
            assert_eq!(out.dimensions(), base.dimensions(), "{pattern}");
            assert_ne!(out, base, "{pattern} should draw something");
        }
    }

    #[test]
    fn invalid_spec_is_rejected() {
        let base = gradient(10, 10);
        let spec = PlacementSpec {
            font_size_px: 5,
            ..PlacementSpec::with_text("x")
        };
        assert!(matches!(
            compositor().render(&base, &spec),
            Err(Error::InvalidSpec { .. })
        ));
        let spec = PlacementSpec {
            opacity: 1.5,
            ..PlacementSpec::with_text("x")
        };
        assert!(matches!(
            compositor().render_with_mask(&base, &spec),
            Err(Error::InvalidSpec { .. })
        ));
    }

    #[test]
    fn empty_canvas_is_rejected() {
        let base = RgbaImage::new(0, 10);
        assert!(matches!(
            compositor().render(&base, &PlacementSpec::with_text("x")),
            Err(Error::EmptyCanvas { width: 0, height: 10 })
        ));
    }

    #[test]
    fn mask_tracks_where_text_was_drawn() {
        let base = RgbaImage::from_pixel(80, 40, Rgba([0, 0, 0, 255]));
        let spec = PlacementSpec {
            opacity: 1.0,
            ..PlacementSpec::with_text("W")
        };
        let (image, mask) = compositor().render_with_mask(&base, &spec).unwrap();
        assert_eq!(mask.dimensions(), (80, 40));
        assert_eq!(*image.get_pixel(40, 20), Rgba([255, 255, 255, 255]));
        assert_eq!(mask.get_pixel(40, 20)[0], 255);
        assert_eq!(mask.get_pixel(2, 2)[0], 0);

        let plain = compositor().render(&base, &spec).unwrap();
        assert_eq!(plain, image);
    }

    #[test]
    fn mask_for_empty_text_is_blank() {
        let base = gradient(16, 16);
        let (image, mask) = compositor()
            .render_with_mask(&base, &PlacementSpec::default())
            .unwrap();
        assert_eq!(image, base);
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn render_counted_reports_the_placements_drawn() {
        let base = gradient(300, 300);
        let spec = PlacementSpec {
            pattern: Pattern::Grid,
            spacing_px: 100,
            ..PlacementSpec::with_text("count")
        };
        let dims = CanvasDims::of(&base).unwrap();
        let expected = geometry::compute(&spec, dims).len();

        let plain = compositor().render_counted(&base, &spec, false).unwrap();
        let masked = compositor().render_counted(&base, &spec, true).unwrap();
        assert_eq!(plain.placements, expected);
        assert_eq!(masked.placements, expected);
        assert!(plain.mask.is_none());
        assert_eq!(plain.image, masked.image);

        let blank = compositor()
            .render_counted(&base, &PlacementSpec::default(), true)
            .unwrap();
        assert_eq!(blank.placements, 0);
        assert!(blank.mask.is_some());
    }
}
