//! Place and composite text watermarks onto images.
//!
//! A [`PlacementSpec`] describes the watermark declaratively: the text, its
//! size and opacity, and a [`Pattern`] (`single`, `repeat`, `diagonal`, `grid`,
//! `radial`) that decides how many copies are drawn and where. Rendering is a
//! pure function of the base image and the spec, so an interactive preview and
//! the final render produce the same pixels.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use text_watermark::{BlockGlyphs, Compositor, Pattern, PlacementSpec};
//!
//! let compositor = Compositor::new(Arc::new(BlockGlyphs));
//! let base = image::open("photo.jpg").unwrap().to_rgba8();
//! let spec = PlacementSpec {
//!     pattern: Pattern::Diagonal,
//!     angle_deg: 30.0,
//!     ..PlacementSpec::with_text("CONFIDENTIAL")
//! };
//! let out = compositor.render(&base, &spec).expect("valid spec");
//! out.save("photo_watermarked.png").unwrap();
//! ```
//!
//! # Geometry
//!
//! [`geometry::compute`] exposes the placement stage on its own: the ordered
//! anchors, rotations, and alignments the compositor will draw.
//!
//! ```
//! use text_watermark::{geometry, CanvasDims, PlacementSpec};
//!
//! let dims = CanvasDims::new(200, 100).unwrap();
//! let placements = geometry::compute(&PlacementSpec::with_text("hi"), dims);
//! assert_eq!((placements[0].x, placements[0].y), (100.0, 50.0));
//! ```

#![deny(missing_docs)]

pub mod blending;
mod compositor;
mod engine;
pub mod error;
pub mod geometry;
mod glyphs;
mod raster;
#[cfg(feature = "session")]
pub mod session;
mod spec;

pub use compositor::Compositor;
pub use engine::{
    comparison_path, default_output_path, is_supported_image, mask_path, record_path, save_image,
    ProcessOptions, ProcessResult, RenderRecord, WatermarkEngine, COMPARISON_HEIGHT,
};
pub use error::{Error, Result};
pub use glyphs::{BlockGlyphs, Coverage, FontGlyphs, GlyphSource};
pub use raster::TextRasterizer;
#[cfg(feature = "session")]
pub use session::{Preview, RenderSession};
pub use spec::{
    CanvasDims, Pattern, PlacementSpec, Position, TextAlign, FONT_SIZE_RANGE, OPACITY_RANGE,
    SPACING_RANGE,
};
