use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use rayon::prelude::*;

use floorplan_boundary_lib::image_io::{get_image_files_in_dir, load_image, output_names, save_image};
use floorplan_boundary_lib::output::{
    draw_boundary_overlay, overlay_color, write_result_json, write_summary_csv, SummaryRow,
};
use floorplan_boundary_lib::{BoundaryExtractor, BoundaryResult, Config};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Floor plan boundary extraction")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file (defaults are used when it does not exist)
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Enable debug mode (verbose logging and boundary overlay images)
    #[clap(short, long)]
    debug: bool,

    /// Process directory contents sequentially
    #[clap(long)]
    no_parallel: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = Config::from_file_or_default(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;

    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    if args.no_parallel {
        config.use_parallel = false;
    }

    if args.debug {
        config.write_debug_images = true;
    }

    let extractor = BoundaryExtractor::new(config.clone())?;

    let start_time = Instant::now();

    let output_base = PathBuf::from(&config.output_base_dir);
    fs::create_dir_all(output_base.join("json"))?;
    if config.write_debug_images {
        fs::create_dir_all(output_base.join("debug"))?;
    }

    let input_path = PathBuf::from(&config.input_path);

    let (files, input_root) = if input_path.is_file() {
        println!("Processing single file: {}", input_path.display());
        let root = input_path.parent().map(Path::to_path_buf).unwrap_or_default();
        (vec![input_path], root)
    } else if input_path.is_dir() {
        println!("Processing directory: {}", input_path.display());
        let files = get_image_files_in_dir(&input_path)?;
        println!("Found {} image files", files.len());
        (files, input_path)
    } else {
        bail!("Invalid input path: {}", input_path.display());
    };

    // Same-stem files in different folders or formats must not share outputs
    let names = output_names(&files, &input_root);
    let jobs: Vec<(&PathBuf, &String)> = files.iter().zip(&names).collect();

    let rows: Vec<SummaryRow> = if config.use_parallel {
        jobs.par_iter()
            .map(|(path, name)| process_file(path, name, &extractor, &output_base))
            .collect()
    } else {
        jobs.iter()
            .map(|(path, name)| process_file(path, name, &extractor, &output_base))
            .collect()
    };

    let summary_path = write_summary_csv(&rows, &output_base)?;

    let detected = rows.iter().filter(|r| r.result.success && !r.result.is_fallback()).count();
    let fallback = rows.iter().filter(|r| r.result.is_fallback()).count();
    let failed = rows.len() - detected - fallback;

    let elapsed = start_time.elapsed();
    println!(
        "Processed {} images ({} detected, {} fallback, {} failed) in {:.2} seconds",
        rows.len(), detected, fallback, failed, elapsed.as_secs_f64()
    );
    println!("Summary written to {}", summary_path.display());

    Ok(())
}

/// Extract one file and write its outputs; errors end up in the summary row
fn process_file(
    path: &Path,
    filename: &str,
    extractor: &BoundaryExtractor,
    output_base: &Path,
) -> SummaryRow {
    println!("Processing: {}", path.display());
    let started = Instant::now();

    let result = match load_image(path) {
        Ok(input) => {
            let result = extractor.extract(&input.image);
            if extractor.config().write_debug_images && result.success {
                let overlay = draw_boundary_overlay(&input.image, &result.points, overlay_color(&result));
                let overlay_path = output_base.join("debug").join(format!("{}_boundary.png", filename));
                if let Err(e) = save_image(&overlay, &overlay_path) {
                    log::warn!("Failed to write overlay {}: {}", overlay_path.display(), e);
                }
            }
            result
        }
        Err(e) => {
            eprintln!("Error loading {}: {}", path.display(), e);
            BoundaryResult::failure(&e)
        }
    };

    if let Err(e) = write_result_json(&result, output_base, filename) {
        eprintln!("Error writing result for {}: {}", path.display(), e);
    }

    SummaryRow {
        filename: filename.to_string(),
        result,
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
    }
}
