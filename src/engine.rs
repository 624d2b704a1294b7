//! File-level watermark driver: load, render, save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::compositor::Compositor;
use crate::error::{Error, Result};
use crate::geometry::Placement;
use crate::glyphs::{BlockGlyphs, FontGlyphs, GlyphSource};
use crate::spec::{CanvasDims, PlacementSpec, TextAlign};

/// Height both halves of a comparison image are scaled to.
pub const COMPARISON_HEIGHT: u32 = 500;

/// Gap between the two halves of a comparison image.
const COMPARISON_GUTTER: u32 = 10;
const COMPARISON_LABEL_PX: u32 = 24;

/// Options controlling how files are watermarked.
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProcessOptions {
    /// The watermark to apply.
    pub spec: PlacementSpec,
    /// Derive the font size from each image instead of using `spec.font_size_px`.
    pub auto_font_size: bool,
    /// Also write the watermark mask as `{name}_mask.png` next to the output.
    pub write_mask: bool,
    /// Also write a side-by-side `{name}_comparison.png` next to the output.
    pub write_comparison: bool,
    /// Also write a JSON [`RenderRecord`] as `{name}.json` next to the output.
    pub write_record: bool,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Number of watermark placements drawn.
    pub placements: usize,
    /// Human-readable status message.
    pub message: String,
}

/// Sidecar describing a finished render.
///
/// Carries what a later removal request needs: the output identifier, the
/// original watermark text (inside `spec`), and the mask file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRecord {
    /// File name of the source image.
    pub source: String,
    /// File name of the watermarked image.
    pub output: String,
    /// File name of the watermark mask, if one was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    /// File name of the original/watermarked comparison, if one was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<String>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Number of placements drawn.
    pub placements: usize,
    /// The spec that was rendered.
    pub spec: PlacementSpec,
}

/// The authoritative renderer for files on disk.
///
/// Create once and reuse for many images; rendering holds no shared mutable
/// state, so directories are processed in parallel.
pub struct WatermarkEngine {
    compositor: Compositor,
}

impl WatermarkEngine {
    /// Engine drawing glyphs from `glyphs`.
    #[must_use]
    pub fn new(glyphs: Arc<dyn GlyphSource>) -> Self {
        Self {
            compositor: Compositor::new(glyphs),
        }
    }

    /// Engine using the font file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Font`] if the font cannot be loaded.
    pub fn with_font(path: &Path) -> Result<Self> {
        Ok(Self::new(Arc::new(FontGlyphs::from_path(path)?)))
    }

    /// Engine using the first system font found, or block glyphs if there is none.
    #[must_use]
    pub fn with_system_font() -> Self {
        match FontGlyphs::system() {
            Some(font) => Self::new(Arc::new(font)),
            None => {
                tracing::warn!("no system font found, falling back to block glyphs");
                Self::new(Arc::new(BlockGlyphs))
            }
        }
    }

    /// The compositor used for every render.
    #[must_use]
    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Process a single image file: load, render, save.
    ///
    /// Returns a [`ProcessResult`] indicating success or failure.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path, opts: &ProcessOptions) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            placements: 0,
            message: String::new(),
        };

        match self.render_file(input, output, opts) {
            Ok(placements) => {
                result.success = true;
                result.placements = placements;
                result.message = if placements == 0 {
                    "No watermark text, copied unchanged".to_string()
                } else {
                    format!("Watermarked with {placements} placement(s)")
                };
            }
            Err(e) => {
                tracing::debug!(path = %input.display(), error = %e, "render failed");
                result.message = format!("Failed: {e}");
            }
        }

        result
    }

    fn render_file(&self, input: &Path, output: &Path, opts: &ProcessOptions) -> Result<usize> {
        let base = image::open(input)?.to_rgba8();
        let dims = CanvasDims::of(&base)?;

        let mut spec = opts.spec.clone();
        if opts.auto_font_size {
            spec.font_size_px = PlacementSpec::auto_font_size(dims);
        }

        let rendered = self
            .compositor
            .render_counted(&base, &spec, opts.write_mask)?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        save_image(&rendered.image, output)?;

        let mask_name = match &rendered.mask {
            Some(mask) => {
                let path = mask_path(output);
                mask.save_with_format(&path, ImageFormat::Png)?;
                Some(file_name(&path))
            }
            None => None,
        };

        let comparison_name = if opts.write_comparison {
            let path = comparison_path(output);
            self.comparison(&base, &rendered.image)
                .save_with_format(&path, ImageFormat::Png)?;
            Some(file_name(&path))
        } else {
            None
        };

        if opts.write_record {
            let record = RenderRecord {
                source: file_name(input),
                output: file_name(output),
                mask: mask_name,
                comparison: comparison_name,
                width: dims.width,
                height: dims.height,
                placements: rendered.placements,
                spec,
            };
            let file = std::fs::File::create(record_path(output))?;
            serde_json::to_writer_pretty(file, &record)?;
        }

        Ok(rendered.placements)
    }

    /// Side-by-side "Original | Watermarked" image.
    ///
    /// Both halves are scaled to [`COMPARISON_HEIGHT`] keeping the original's
    /// aspect ratio, separated by a black gutter and labelled in the top-left
    /// corner of each half.
    #[must_use]
    pub fn comparison(&self, original: &RgbaImage, watermarked: &RgbaImage) -> RgbaImage {
        let (width, height) = comparison_half(original.width(), original.height());
        let left = imageops::resize(original, width, height, FilterType::Triangle);
        let right = imageops::resize(watermarked, width, height, FilterType::Triangle);

        let mut canvas = RgbaImage::from_pixel(
            width * 2 + COMPARISON_GUTTER,
            height,
            Rgba([0, 0, 0, 255]),
        );
        imageops::replace(&mut canvas, &left, 0, 0);
        imageops::replace(
            &mut canvas,
            &right,
            i64::from(width + COMPARISON_GUTTER),
            0,
        );

        #[allow(clippy::cast_precision_loss)]
        let labels = [
            (10.0, "Original"),
            ((width + COMPARISON_GUTTER + 10) as f32, "Watermarked"),
        ];
        for (x, label) in labels {
            let placement = Placement {
                x,
                y: 30.0,
                rotation_deg: 0.0,
                align: TextAlign::Left,
            };
            self.compositor
                .rasterizer()
                .draw(&mut canvas, &placement, label, COMPARISON_LABEL_PX, 1.0);
        }

        canvas
    }

    /// Process all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// Returns a [`ProcessResult`] for each image found.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<(PathBuf, PathBuf)> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .filter_map(|p| {
                    let output = output_dir.join(p.file_name()?);
                    Some((p, output))
                })
                .collect(),
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    placements: 0,
                    message: format!("Failed to read directory: {e}"),
                }];
            }
        };

        let (entries, mut collided) = split_collisions(entries, opts);

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult {
                    path: output_dir.to_path_buf(),
                    success: false,
                    placements: 0,
                    message: format!("Failed to create output directory: {e}"),
                }];
            }
        }

        #[cfg(feature = "cli")]
        let mut results: Vec<ProcessResult> = {
            use rayon::prelude::*;
            entries
                .par_iter()
                .map(|(input, output)| self.process_file(input, output, opts))
                .collect()
        };

        #[cfg(not(feature = "cli"))]
        let mut results: Vec<ProcessResult> = entries
            .iter()
            .map(|(input, output)| self.process_file(input, output, opts))
            .collect();

        results.append(&mut collided);
        results
    }
}

/// Every file `process_file` writes for `output` under `opts`.
fn planned_paths(output: &Path, opts: &ProcessOptions) -> Vec<PathBuf> {
    let mut paths = vec![output.to_path_buf()];
    if opts.write_mask {
        paths.push(mask_path(output));
    }
    if opts.write_comparison {
        paths.push(comparison_path(output));
    }
    if opts.write_record {
        paths.push(record_path(output));
    }
    paths
}

/// Separate batch entries whose written files would overwrite each other.
///
/// Colliding entries are not rendered at all; each gets a failed result.
fn split_collisions(
    entries: Vec<(PathBuf, PathBuf)>,
    opts: &ProcessOptions,
) -> (Vec<(PathBuf, PathBuf)>, Vec<ProcessResult>) {
    let mut writers: HashMap<PathBuf, usize> = HashMap::new();
    for (_, output) in &entries {
        for path in planned_paths(output, opts) {
            *writers.entry(path).or_default() += 1;
        }
    }

    let mut clear = Vec::with_capacity(entries.len());
    let mut collided = Vec::new();
    for (input, output) in entries {
        match planned_paths(&output, opts)
            .into_iter()
            .find(|path| writers.get(path).copied().unwrap_or(0) > 1)
        {
            Some(path) => {
                tracing::warn!(
                    input = %input.display(),
                    path = %path.display(),
                    "skipping file whose output collides with another in the batch"
                );
                collided.push(ProcessResult {
                    path: input,
                    success: false,
                    placements: 0,
                    message: format!(
                        "Failed: {} would also be written by another file in this batch",
                        file_name(&path)
                    ),
                });
            }
            None => clear.push((input, output)),
        }
    }
    (clear, collided)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn comparison_half(width: u32, height: u32) -> (u32, u32) {
    let scaled = (f64::from(COMPARISON_HEIGHT) * f64::from(width) / f64::from(height)).round();
    ((scaled as u32).max(1), COMPARISON_HEIGHT)
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save a rendered image with format-specific settings.
///
/// JPEG output drops the alpha channel; the other formats keep it.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).into_rgb8();
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&rgb)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            img.save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_watermarked.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_watermarked.{ext}"))
}

/// Path of the mask written next to `output`: `"out.jpg"` becomes `"out.jpg_mask.png"`.
#[must_use]
pub fn mask_path(output: &Path) -> PathBuf {
    sidecar_path(output, "_mask.png")
}

/// Path of the comparison written next to `output`: `"out.jpg"` becomes
/// `"out.jpg_comparison.png"`.
#[must_use]
pub fn comparison_path(output: &Path) -> PathBuf {
    sidecar_path(output, "_comparison.png")
}

/// Path of the render record written next to `output`: `"out.jpg"` becomes `"out.jpg.json"`.
#[must_use]
pub fn record_path(output: &Path) -> PathBuf {
    sidecar_path(output, ".json")
}

// Keyed on the full file name so `a.png` and `a.bmp` never share sidecars.
fn sidecar_path(output: &Path, suffix: &str) -> PathBuf {
    output.with_file_name(format!("{}{suffix}", file_name(output)))
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
