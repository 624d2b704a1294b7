//! Glyph coverage: the rasterization primitive the text rasterizer builds on.
//!
//! A [`GlyphSource`] turns a string and a font size into a [`Coverage`] mask,
//! laid out left to right on a single line with the line box (ascent to
//! descent) as the mask height. Two sources are provided:
//!
//! - [`FontGlyphs`]: TrueType/OpenType outlines rendered with `ab_glyph`.
//! - [`BlockGlyphs`]: font-free solid blocks, one per visible character. Used
//!   when no font can be found, and wherever output must not depend on the
//!   fonts installed on the host.

use std::path::Path;

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};

use crate::error::{Error, Result};

/// System font locations probed by [`FontGlyphs::system`], in order.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Per-pixel glyph coverage in `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Coverage {
    /// A transparent mask of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the mask has no pixels at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Coverage at integer pixel `(x, y)`; zero outside the mask.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return 0.0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx]
    }

    /// Add coverage at `(x, y)`, saturating at `1.0`. Out-of-range writes are dropped.
    pub fn add(&mut self, x: i64, y: i64, value: f32) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = (self.data[idx] + value).min(1.0);
    }

    /// Bilinear sample at continuous mask coordinates (pixel centers sit at `i + 0.5`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sample(&self, fx: f32, fy: f32) -> f32 {
        let u = fx - 0.5;
        let v = fy - 0.5;
        let x0 = u.floor();
        let y0 = v.floor();
        let tx = u - x0;
        let ty = v - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.get(x0, y0) * (1.0 - tx) + self.get(x0 + 1, y0) * tx;
        let bottom = self.get(x0, y0 + 1) * (1.0 - tx) + self.get(x0 + 1, y0 + 1) * tx;
        top * (1.0 - ty) + bottom * ty
    }
}

/// Produces coverage masks for single lines of text.
pub trait GlyphSource: Send + Sync {
    /// Rasterize `text` at `font_size_px` into a coverage mask.
    ///
    /// The mask spans the full line box vertically, so its vertical middle is
    /// the middle of the text line.
    fn coverage(&self, text: &str, font_size_px: f32) -> Coverage;
}

/// Outline glyphs from a TrueType/OpenType font.
#[derive(Clone)]
pub struct FontGlyphs {
    font: FontArc,
}

impl FontGlyphs {
    /// Load a font from raw font-file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Font`] if the data is not a usable font.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let font = FontArc::try_from_vec(data).map_err(|e| Error::Font(e.to_string()))?;
        Ok(Self { font })
    }

    /// Load a font file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, [`Error::Font`] if it
    /// is not a usable font.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// First usable font among common system locations.
    #[must_use]
    pub fn system() -> Option<Self> {
        SYSTEM_FONT_PATHS.iter().find_map(|path| {
            let glyphs = Self::from_path(Path::new(path)).ok()?;
            tracing::debug!(font = *path, "using system font");
            Some(glyphs)
        })
    }
}

impl GlyphSource for FontGlyphs {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn coverage(&self, text: &str, font_size_px: f32) -> Coverage {
        let scale = PxScale::from(font_size_px);
        let scaled = self.font.as_scaled(scale);
        let ascent = scaled.ascent();

        let advance: f32 = text
            .chars()
            .map(|c| scaled.h_advance(scaled.glyph_id(c)))
            .sum();
        let width = advance.ceil().max(0.0) as u32;
        let height = (ascent - scaled.descent()).ceil().max(0.0) as u32;
        let mut mask = Coverage::new(width, height);

        let mut caret = 0.0_f32;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            let glyph = id.with_scale_and_position(scale, point(caret, ascent));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let (left, top) = (bounds.min.x as i64, bounds.min.y as i64);
                outlined.draw(|gx, gy, value| {
                    mask.add(left + i64::from(gx), top + i64::from(gy), value);
                });
            }
            caret += scaled.h_advance(id);
        }

        mask
    }
}

/// Font-free glyphs: every visible character is a solid block.
///
/// Each character occupies a `0.6 * size` wide, `size` tall cell; the block
/// covers the inner 80% of the cell width and the band from 20% to 85% of its
/// height. Whitespace advances without drawing.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockGlyphs;

impl BlockGlyphs {
    const CELL_WIDTH: f32 = 0.6;
    const SIDE_BEARING: f32 = 0.1;
    const BLOCK_TOP: f32 = 0.2;
    const BLOCK_BOTTOM: f32 = 0.85;
}

impl GlyphSource for BlockGlyphs {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn coverage(&self, text: &str, font_size_px: f32) -> Coverage {
        let cell = font_size_px * Self::CELL_WIDTH;
        let count = text.chars().count();
        let width = (cell * count as f32).ceil() as u32;
        let height = font_size_px.ceil() as u32;
        let mut mask = Coverage::new(width, height);

        let top = font_size_px * Self::BLOCK_TOP;
        let bottom = font_size_px * Self::BLOCK_BOTTOM;
        for (i, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let left = cell * i as f32 + cell * Self::SIDE_BEARING;
            let right = cell * (i + 1) as f32 - cell * Self::SIDE_BEARING;
            for y in 0..height {
                let cy = y as f32 + 0.5;
                if cy < top || cy > bottom {
                    continue;
                }
                for x in left.floor() as u32..(right.ceil() as u32).min(width) {
                    let cx = x as f32 + 0.5;
                    if cx >= left && cx <= right {
                        mask.add(i64::from(x), i64::from(y), 1.0);
                    }
                }
            }
        }

        mask
    }
}
