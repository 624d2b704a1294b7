//! Placement geometry: where each copy of the watermark text goes.
//!
//! [`compute`] maps a validated [`PlacementSpec`] and the canvas size to an
//! ordered list of [`Placement`]s. The function is pure: identical inputs give
//! an identical sequence in an identical order, which matters because later
//! placements are drawn on top of earlier ones.
//!
//! Lattice patterns never return an empty list. When the spacing leaves no
//! anchor inside the canvas, a single centered placement is returned instead.

use std::f32::consts::TAU;

use crate::spec::{CanvasDims, Pattern, PlacementSpec, Position, TextAlign};

/// One concrete draw of the watermark text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Anchor x in canvas pixels.
    pub x: f32,
    /// Anchor y in canvas pixels.
    pub y: f32,
    /// Clockwise rotation about the anchor, in degrees.
    pub rotation_deg: f32,
    /// Horizontal alignment of the text relative to the anchor.
    pub align: TextAlign,
}

impl Placement {
    fn centered(x: f32, y: f32, rotation_deg: f32) -> Self {
        Self {
            x,
            y,
            rotation_deg,
            align: TextAlign::Center,
        }
    }
}

/// Compute the ordered placements for `spec` on a canvas of `dims`.
///
/// Assumes `spec` passed [`PlacementSpec::validate`].
#[must_use]
pub fn compute(spec: &PlacementSpec, dims: CanvasDims) -> Vec<Placement> {
    #[allow(clippy::cast_precision_loss)]
    let (width, height, spacing) = (
        dims.width as f32,
        dims.height as f32,
        spec.spacing_px as f32,
    );
    let angle = spec.effective_angle();

    let placements = match spec.pattern {
        Pattern::Single => {
            #[allow(clippy::cast_precision_loss)]
            let font_size = spec.font_size_px as f32;
            vec![single(spec.position, width, height, font_size)]
        }
        Pattern::Grid => lattice(width, height, spacing, angle, false),
        Pattern::Repeat => lattice(width, height, spacing, angle, true),
        Pattern::Diagonal => diagonal(width, height, spacing, angle),
        Pattern::Radial => radial(width, height, spacing, angle),
    };

    if placements.is_empty() {
        let (cx, cy) = dims.center();
        return vec![Placement::centered(cx, cy, angle)];
    }
    placements
}

fn single(position: Position, width: f32, height: f32, font_size: f32) -> Placement {
    let inset = font_size * 2.0;
    let (x, y, align) = match position {
        Position::Center => (width / 2.0, height / 2.0, TextAlign::Center),
        Position::Top => (width / 2.0, inset, TextAlign::Center),
        Position::Bottom => (width / 2.0, height - inset, TextAlign::Center),
        Position::Left => (inset, height / 2.0, TextAlign::Left),
        Position::Right => (width - inset, height / 2.0, TextAlign::Right),
    };
    Placement {
        x,
        y,
        rotation_deg: 0.0,
        align,
    }
}

/// Axis-aligned lattice starting half a cell in from the top-left corner.
///
/// With `brick` set, odd rows start at `x = 0` instead of `spacing / 2`.
fn lattice(width: f32, height: f32, spacing: f32, angle: f32, brick: bool) -> Vec<Placement> {
    let half = spacing / 2.0;
    let mut placements = Vec::new();

    let mut row = 0u32;
    let mut y = half;
    while y < height {
        let mut x = if brick && row % 2 == 1 { 0.0 } else { half };
        while x < width {
            placements.push(Placement::centered(x, y, angle));
            x += spacing;
        }
        row += 1;
        y += spacing;
    }

    placements
}

/// Lattice rotated by `angle` about the canvas center, clipped to the canvas.
///
/// Lines run along the rotated x axis and are `spacing` apart; anchors sit
/// every `spacing` along each line. Ordered by line, then by position on it.
fn diagonal(width: f32, height: f32, spacing: f32, angle: f32) -> Vec<Placement> {
    let (cx, cy) = (width / 2.0, height / 2.0);
    let (sin, cos) = angle.to_radians().sin_cos();
    let reach = half_diagonal(width, height);
    #[allow(clippy::cast_possible_truncation)]
    let steps = (reach / spacing).ceil() as i32;

    let mut placements = Vec::new();
    for line in -steps..=steps {
        #[allow(clippy::cast_precision_loss)]
        let offset = line as f32 * spacing;
        for step in -steps..=steps {
            #[allow(clippy::cast_precision_loss)]
            let along = step as f32 * spacing;
            let x = cx + along * cos - offset * sin;
            let y = cy + along * sin + offset * cos;
            if inside(x, y, width, height) {
                placements.push(Placement::centered(x, y, angle));
            }
        }
    }

    placements
}

/// Concentric rings around the canvas center, clipped to the canvas.
///
/// Ring `k` has radius `k * spacing` and enough anchors that neighbours are
/// roughly `spacing` apart along the arc. Each anchor is rotated by its angle
/// on the ring plus `angle`.
fn radial(width: f32, height: f32, spacing: f32, angle: f32) -> Vec<Placement> {
    let (cx, cy) = (width / 2.0, height / 2.0);
    let reach = half_diagonal(width, height);

    let mut placements = vec![Placement::centered(cx, cy, angle)];
    let mut ring = 1u32;
    loop {
        #[allow(clippy::cast_precision_loss)]
        let radius = ring as f32 * spacing;
        if radius > reach {
            break;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = ((TAU * radius / spacing).round() as u32).max(1);
        for i in 0..count {
            #[allow(clippy::cast_precision_loss)]
            let theta_deg = 360.0 * i as f32 / count as f32;
            let (sin, cos) = theta_deg.to_radians().sin_cos();
            let x = cx + radius * cos;
            let y = cy + radius * sin;
            if inside(x, y, width, height) {
                placements.push(Placement::centered(x, y, (theta_deg + angle) % 360.0));
            }
        }
        ring += 1;
    }

    placements
}

fn half_diagonal(width: f32, height: f32) -> f32 {
    width.hypot(height) / 2.0
}

fn inside(x: f32, y: f32, width: f32, height: f32) -> bool {
    (0.0..=width).contains(&x) && (0.0..=height).contains(&y)
}
