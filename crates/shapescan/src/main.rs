//! shapescan: detect simple shapes in an image and report their measurements.
//!
//! Runs the shape detection pipeline on one image file, prints a table of
//! the detected objects (or JSON), and optionally writes the annotated
//! image and every intermediate stage to disk.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin shapescan -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Set `RUST_LOG=shapescan_pipeline=debug` for per-stage log events.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use image::DynamicImage;
use serde::Serialize;
use shapescan_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use shapescan_pipeline::{
    AnalyzerConfig, ChainApproximation, PixelGrid, ShapeRecord, StagedAnalysis,
};

/// Detect triangles, rectangles and circles in an image.
///
/// Prints one row per detected object with its area, perimeter and
/// bounding box, followed by the object count.
#[derive(Parser)]
#[command(name = "shapescan", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Write the annotated image to this path (format from the extension).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Print records as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Print per-stage timing and counts.
    #[arg(long)]
    diagnostics: bool,

    /// Write every intermediate stage as a PNG into this directory.
    #[arg(long)]
    dump_stages: Option<PathBuf>,

    /// Canny low threshold.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Contours enclosing this many square pixels or fewer are ignored.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_MIN_AREA)]
    min_area: f64,

    /// Polygon approximation tolerance as a fraction of the perimeter.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_APPROX_FACTOR)]
    approx_factor: f64,

    /// Contour point representation.
    #[arg(long, value_enum, default_value_t = Chain::Simple)]
    chain: Chain,

    /// Full analyzer config as a JSON string.
    ///
    /// When provided, all other analyzer parameter flags are ignored.
    /// Missing fields take their default values.
    #[arg(long)]
    config_json: Option<String>,
}

/// Contour point representation selection.
#[derive(Clone, Copy, ValueEnum)]
enum Chain {
    /// Keep every boundary pixel.
    None,
    /// Keep only the points where the boundary changes direction.
    Simple,
}

/// Build an [`AnalyzerConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<AnalyzerConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(AnalyzerConfig {
        canny_low: cli.canny_low,
        canny_high: cli.canny_high,
        min_area: cli.min_area,
        approx_factor: cli.approx_factor,
        chain_approximation: match cli.chain {
            Chain::None => ChainApproximation::None,
            Chain::Simple => ChainApproximation::Simple,
        },
        ..AnalyzerConfig::default()
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        "read input image"
    );

    let (staged, diagnostics) = match shapescan_pipeline::diagnostics::analyze_with_diagnostics(
        &image_bytes,
        &config,
        &StdClock,
    ) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Analysis error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(msg) = print_results(&staged.analysis.records, &diagnostics, &cli) {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    if let Some(ref dir) = cli.dump_stages
        && let Err(msg) = dump_stages(&staged, dir)
    {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    if let Some(ref path) = cli.output {
        if let Err(msg) = save_grid(staged.annotated, path) {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
        eprintln!("Annotated image written to {}", path.display());
    }

    ExitCode::SUCCESS
}

/// Document printed by `--json`.
#[derive(Serialize)]
struct JsonReport<'a> {
    records: &'a [ShapeRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<&'a PipelineDiagnostics>,
}

/// Print the records (and diagnostics, if requested) to stdout.
fn print_results(
    records: &[ShapeRecord],
    diagnostics: &PipelineDiagnostics,
    cli: &Cli,
) -> Result<(), String> {
    if cli.json {
        let report = JsonReport {
            records,
            diagnostics: cli.diagnostics.then_some(diagnostics),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Error serializing results: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", format_table(records));
        if cli.diagnostics {
            println!();
            println!("{}", diagnostics.report());
        }
    }
    Ok(())
}

/// Render records as a fixed-width table followed by the object count.
fn format_table(records: &[ShapeRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 4);
    lines.push(format!(
        "{:>9} | {:<9} | {:>10} | {:>9} | {}",
        "Object No", "Shape", "Area", "Perimeter", "BBox"
    ));
    lines.push("-".repeat(64));
    for r in records {
        let b = r.bounding_box;
        lines.push(format!(
            "{:>9} | {:<9} | {:>10.2} | {:>9.2} | ({}, {}) {}x{}",
            r.index,
            r.shape.label(),
            r.area,
            r.perimeter,
            b.x,
            b.y,
            b.width,
            b.height,
        ));
    }
    lines.push(String::new());
    lines.push(format!("Total Objects Detected: {}", records.len()));
    lines.join("\n")
}

/// Write every intermediate raster as a numbered PNG into `dir`.
fn dump_stages(staged: &StagedAnalysis, dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;

    let stages = [
        ("0-original.png", staged.original.clone()),
        ("1-intensity.png", PixelGrid::Grayscale(staged.intensity.clone())),
        ("2-smoothed.png", PixelGrid::Grayscale(staged.smoothed.clone())),
        ("3-edges.png", PixelGrid::Grayscale(staged.edges.clone())),
        ("4-annotated.png", staged.annotated.clone()),
    ];
    for (name, grid) in stages {
        save_grid(grid, &dir.join(name))?;
    }
    eprintln!("Stages written to {}", dir.display());
    Ok(())
}

/// Encode a grid to `path`, choosing the format from the extension.
fn save_grid(grid: PixelGrid, path: &Path) -> Result<(), String> {
    DynamicImage::from(grid)
        .save(path)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
