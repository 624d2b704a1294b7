//! Declarative watermark request and the canvas it is rendered onto.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Accepted font sizes in pixels.
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 12..=72;
/// Accepted fill opacities.
pub const OPACITY_RANGE: RangeInclusive<f32> = 0.1..=1.0;
/// Accepted lattice spacings in pixels.
pub const SPACING_RANGE: RangeInclusive<u32> = 50..=300;

/// Layout strategy controlling how many copies of the text are drawn and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// One copy, anchored by [`Position`].
    #[default]
    Single,
    /// Brick lattice: grid rows with every other row shifted by half a cell.
    Repeat,
    /// Lattice rotated by the spec angle about the canvas center.
    Diagonal,
    /// Axis-aligned lattice.
    Grid,
    /// Concentric rings around the canvas center.
    Radial,
}

impl Pattern {
    /// Every pattern, in declaration order.
    pub const ALL: [Pattern; 5] = [
        Pattern::Single,
        Pattern::Repeat,
        Pattern::Diagonal,
        Pattern::Grid,
        Pattern::Radial,
    ];

    /// Lowercase name used in spec files and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Pattern::Single => "single",
            Pattern::Repeat => "repeat",
            Pattern::Diagonal => "diagonal",
            Pattern::Grid => "grid",
            Pattern::Radial => "radial",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Pattern::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid("pattern", format!("unknown pattern {s:?}")))
    }
}

/// Anchor of a [`Pattern::Single`] watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Canvas center.
    #[default]
    Center,
    /// Horizontally centered, near the top edge.
    Top,
    /// Horizontally centered, near the bottom edge.
    Bottom,
    /// Vertically centered, left-aligned near the left edge.
    Left,
    /// Vertically centered, right-aligned near the right edge.
    Right,
}

impl Position {
    /// Every position, in declaration order.
    pub const ALL: [Position; 5] = [
        Position::Center,
        Position::Top,
        Position::Bottom,
        Position::Left,
        Position::Right,
    ];

    /// Lowercase name used in spec files and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Center => "center",
            Position::Top => "top",
            Position::Bottom => "bottom",
            Position::Left => "left",
            Position::Right => "right",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Position::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid("position", format!("unknown position {s:?}")))
    }
}

/// Horizontal alignment of the text relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Anchor is the left edge of the text.
    Left,
    /// Anchor is the horizontal middle of the text.
    Center,
    /// Anchor is the right edge of the text.
    Right,
}

/// A watermark request.
///
/// Fields mirror the watermark form; [`PlacementSpec::default()`] carries the
/// form's initial values. Call [`PlacementSpec::validate`] (the compositor does)
/// before handing a spec to the geometry stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacementSpec {
    /// Watermark text. Empty text renders the base image unchanged.
    pub text: String,
    /// Font size in pixels, within [`FONT_SIZE_RANGE`].
    pub font_size_px: u32,
    /// Alpha of the white fill, within [`OPACITY_RANGE`].
    pub opacity: f32,
    /// Layout strategy.
    pub pattern: Pattern,
    /// Anchor for [`Pattern::Single`]; ignored by the other patterns.
    pub position: Position,
    /// Lattice spacing in pixels, within [`SPACING_RANGE`]; ignored by [`Pattern::Single`].
    pub spacing_px: u32,
    /// Rotation in degrees, within `[0, 360)`; ignored by [`Pattern::Single`].
    pub angle_deg: f32,
}

impl Default for PlacementSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size_px: 24,
            opacity: 0.5,
            pattern: Pattern::Single,
            position: Position::Center,
            spacing_px: 100,
            angle_deg: 0.0,
        }
    }
}

impl PlacementSpec {
    /// Spec for `text` with every other field at its default.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Check every field against its declared range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSpec`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !FONT_SIZE_RANGE.contains(&self.font_size_px) {
            return Err(Error::invalid(
                "fontSizePx",
                format!(
                    "must be within [{}, {}], got {}",
                    FONT_SIZE_RANGE.start(),
                    FONT_SIZE_RANGE.end(),
                    self.font_size_px
                ),
            ));
        }
        if !OPACITY_RANGE.contains(&self.opacity) {
            return Err(Error::invalid(
                "opacity",
                format!(
                    "must be within [{}, {}], got {}",
                    OPACITY_RANGE.start(),
                    OPACITY_RANGE.end(),
                    self.opacity
                ),
            ));
        }
        if !SPACING_RANGE.contains(&self.spacing_px) {
            return Err(Error::invalid(
                "spacingPx",
                format!(
                    "must be within [{}, {}], got {}",
                    SPACING_RANGE.start(),
                    SPACING_RANGE.end(),
                    self.spacing_px
                ),
            ));
        }
        if !(0.0..360.0).contains(&self.angle_deg) {
            return Err(Error::invalid(
                "angleDeg",
                format!("must be within [0, 360), got {}", self.angle_deg),
            ));
        }
        Ok(())
    }

    /// Rotation applied to every instance: always `0` for [`Pattern::Single`].
    #[must_use]
    pub fn effective_angle(&self) -> f32 {
        match self.pattern {
            Pattern::Single => 0.0,
            _ => self.angle_deg,
        }
    }

    /// Font size scaled to the canvas: 3.5% of the longer side, clamped to
    /// [`FONT_SIZE_RANGE`].
    #[must_use]
    pub fn auto_font_size(dims: CanvasDims) -> u32 {
        let longer = dims.width.max(dims.height);
        (longer * 7 / 200).clamp(*FONT_SIZE_RANGE.start(), *FONT_SIZE_RANGE.end())
    }
}

/// Dimensions of the base image; both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasDims {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CanvasDims {
    /// Validated canvas dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCanvas`] if either side is zero.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyCanvas { width, height });
        }
        Ok(Self { width, height })
    }

    /// Dimensions of `image`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCanvas`] if the image has a zero-sized side.
    pub fn of(image: &RgbaImage) -> Result<Self> {
        Self::new(image.width(), image.height())
    }

    /// Canvas center.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn center(self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }
}
