//! Add a diagonal text watermark to a single image.
//!
//! Usage:
//! ```sh
//! cargo run --example add_watermark -- input.jpg output.png "(c) 2025 Studio"
//! ```

use std::env;
use std::process;

use text_watermark::{Pattern, PlacementSpec, ProcessOptions, WatermarkEngine};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <input> <output> <text>", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];

    let engine = WatermarkEngine::with_system_font();
    let opts = ProcessOptions {
        spec: PlacementSpec {
            pattern: Pattern::Diagonal,
            spacing_px: 180,
            angle_deg: 30.0,
            opacity: 0.35,
            ..PlacementSpec::with_text(args[3].as_str())
        },
        auto_font_size: true,
        ..ProcessOptions::default()
    };
    let result = engine.process_file(input.as_ref(), output.as_ref(), &opts);

    if result.success {
        println!("Done: {}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
