use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use text_watermark::{
    default_output_path, Pattern, PlacementSpec, Position, ProcessOptions, ProcessResult,
    WatermarkEngine,
};

#[derive(Parser)]
#[command(
    name = "text-watermark",
    about = "Overlay repeating text watermarks onto images",
    version,
    after_help = "Simple usage: text-watermark <image> --text \"(c) me\"  (writes {name}_watermarked.{ext})\n\n\
                  Patterns: single (uses --position), repeat, diagonal, grid, radial (use --spacing and --angle).\n\
                  A --spec-file provides defaults; flags given on the command line override it."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_watermarked.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Watermark text
    #[arg(short, long)]
    text: Option<String>,

    /// Font size in pixels (12-72), or "auto" to scale with the image
    #[arg(short = 's', long)]
    font_size: Option<String>,

    /// Fill opacity (0.1-1.0)
    #[arg(long)]
    opacity: Option<f32>,

    /// Layout pattern: single, repeat, diagonal, grid, radial
    #[arg(short, long)]
    pattern: Option<Pattern>,

    /// Anchor for the single pattern: center, top, bottom, left, right
    #[arg(long)]
    position: Option<Position>,

    /// Distance between copies in pixels (50-300)
    #[arg(long)]
    spacing: Option<u32>,

    /// Rotation in degrees [0, 360)
    #[arg(short, long)]
    angle: Option<f32>,

    /// JSON file with a watermark spec
    #[arg(long)]
    spec_file: Option<PathBuf>,

    /// TrueType/OpenType font file (default: first system font found)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Also write the watermark mask as {file}_mask.png
    #[arg(long)]
    mask: bool,

    /// Also write an "Original | Watermarked" image as {file}_comparison.png
    #[arg(long)]
    comparison: bool,

    /// Also write a JSON render record as {file}.json
    #[arg(long)]
    record: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let (spec, auto_font_size) = match build_spec(&cli) {
        Ok(built) => built,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let opts = ProcessOptions {
        spec,
        auto_font_size,
        write_mask: cli.mask,
        write_comparison: cli.comparison,
        write_record: cli.record,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let engine = match &cli.font {
        Some(path) => match WatermarkEngine::with_font(path) {
            Ok(e) => e,
            Err(e) => {
                eprintln!("Fatal: Failed to load font {}: {e}", path.display());
                process::exit(1);
            }
        },
        None => WatermarkEngine::with_system_font(),
    };

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !opts.quiet {
        let spec = &opts.spec;
        eprintln!(
            "Watermark \"{}\": pattern={}, opacity={:.2}, font={}",
            spec.text,
            spec.pattern,
            spec.opacity,
            if opts.auto_font_size {
                "auto".to_string()
            } else {
                format!("{}px", spec.font_size_px)
            }
        );
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: text-watermark <input_dir> -o <output_dir> --text <text>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Merge the spec file (if any) with command-line overrides and validate.
fn build_spec(cli: &Cli) -> Result<(PlacementSpec, bool), String> {
    let mut spec = match &cli.spec_file {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read spec file {}: {e}", path.display()))?;
            serde_json::from_str::<PlacementSpec>(&data)
                .map_err(|e| format!("invalid spec file {}: {e}", path.display()))?
        }
        None => PlacementSpec::default(),
    };

    if let Some(text) = &cli.text {
        spec.text.clone_from(text);
    }
    let mut auto_font_size = false;
    match cli.font_size.as_deref() {
        Some("auto") => auto_font_size = true,
        Some(size) => {
            spec.font_size_px = size
                .parse()
                .map_err(|_| format!("font size must be a number or \"auto\", got {size:?}"))?;
        }
        None => {}
    }
    if let Some(opacity) = cli.opacity {
        spec.opacity = opacity;
    }
    if let Some(pattern) = cli.pattern {
        spec.pattern = pattern;
    }
    if let Some(position) = cli.position {
        spec.position = position;
    }
    if let Some(spacing) = cli.spacing {
        spec.spacing_px = spacing;
    }
    if let Some(angle) = cli.angle {
        spec.angle_deg = angle;
    }

    if spec.text.trim().is_empty() {
        return Err("Watermark text is required (--text or \"text\" in the spec file)".to_string());
    }
    spec.validate().map_err(|e| e.to_string())?;

    Ok((spec, auto_font_size))
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        if !opts.quiet {
            eprintln!("[OK] {filename} ({} placements)", result.placements);
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
