//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning. [`analyze_with_diagnostics`] drives the typestate
//! [`Pipeline`](crate::Pipeline) one stage at a time and records how
//! long each transition took together with the stage's
//! [`StageMetrics`].
//!
//! Time is read through the [`Clock`] trait so the crate stays free of
//! platform timers; callers supply a clock (the CLI uses
//! `std::time::Instant`, tests use a fake that advances in fixed steps).
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    Analyzed, ContoursTraced, Decoded, EdgesDetected, Measured, Normalized, Pipeline, Smoothed,
};
use crate::types::{AnalysisError, AnalyzerConfig, Contour, StagedAnalysis};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
///
/// Each field captures metrics for one logical stage of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 2: intensity conversion.
    pub grayscale: StageDiagnostics,
    /// Stage 3: binomial smoothing.
    pub blur: StageDiagnostics,
    /// Stage 4: Canny edge detection.
    pub edge_detection: StageDiagnostics,
    /// Stage 5: contour tracing.
    pub contour_tracing: StageDiagnostics,
    /// Stage 6: shape analysis.
    pub analysis: StageDiagnostics,
    /// Stage 7: annotation rendering.
    pub render: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
///
/// Each variant captures the counts and sizes meaningful for that
/// particular processing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Channels per pixel of the decoded grid (1, 3 or 4).
        channels: u8,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Intensity conversion metrics.
    Grayscale {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Channels per pixel before conversion.
        source_channels: u8,
    },
    /// Smoothing metrics.
    Blur {
        /// Side length of the square kernel.
        kernel_size: u32,
    },
    /// Canny edge detection metrics.
    EdgeDetection {
        /// Low threshold (after clamping).
        low_threshold: f32,
        /// High threshold (after clamping).
        high_threshold: f32,
        /// Number of edge pixels (value == 255) in the output.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Contour tracing metrics.
    ContourTracing {
        /// Number of contours found.
        contour_count: usize,
        /// Total number of points across all contours.
        total_point_count: usize,
        /// Minimum points in any single contour.
        min_contour_points: usize,
        /// Maximum points in any single contour.
        max_contour_points: usize,
        /// Mean points per contour.
        mean_contour_points: f64,
    },
    /// Shape analysis metrics.
    Analysis {
        /// Area threshold a contour had to exceed.
        min_area: f64,
        /// Number of contours considered.
        contour_count: usize,
        /// Number of contours that produced a record.
        accepted: usize,
        /// Records classified as triangles.
        triangles: usize,
        /// Records classified as rectangles.
        rectangles: usize,
        /// Records classified as circles.
        circles: usize,
        /// Records with a degenerate approximation.
        unknown: usize,
    },
    /// Annotation rendering metrics.
    Render {
        /// Number of draw instructions executed.
        instruction_count: usize,
        /// Pixels whose value differs from the original.
        changed_pixel_count: u64,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of contours found.
    pub contour_count: usize,
    /// Number of shapes reported.
    pub object_count: usize,
}

impl PipelineDiagnostics {
    /// Stages in execution order with their display names.
    fn stages(&self) -> [(&'static str, &StageDiagnostics); 7] {
        [
            ("Decode", &self.decode),
            ("Grayscale", &self.grayscale),
            ("Blur", &self.blur),
            ("Edge Detection", &self.edge_detection),
            ("Contour Tracing", &self.contour_tracing),
            ("Analysis", &self.analysis),
            ("Render", &self.render),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Objects: {}",
            self.summary.contour_count, self.summary.object_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            channels,
            ..
        } => {
            format!("{input_bytes} bytes -> {width}x{height} ({channels} ch)")
        }
        StageMetrics::Grayscale {
            width,
            height,
            source_channels,
        } => format!("{width}x{height} from {source_channels} ch"),
        StageMetrics::Blur { kernel_size } => format!("kernel={kernel_size}x{kernel_size}"),
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::ContourTracing {
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
            mean_contour_points,
        } => {
            format!(
                "{contour_count} contours, {total_point_count} pts (min={min_contour_points} max={max_contour_points} mean={mean_contour_points:.1})",
            )
        }
        StageMetrics::Analysis {
            min_area,
            contour_count,
            accepted,
            triangles,
            rectangles,
            circles,
            unknown,
        } => {
            format!(
                "{accepted}/{contour_count} above area {min_area} (tri={triangles} rect={rectangles} circle={circles} unknown={unknown})",
            )
        }
        StageMetrics::Render {
            instruction_count,
            changed_pixel_count,
        } => format!("{instruction_count} shapes, {changed_pixel_count} px changed"),
    }
}

/// Statistics for a set of contours.
pub(crate) struct ContourStats {
    /// Total number of points across all contours.
    pub total: usize,
    /// Minimum number of points in any single contour.
    pub min: usize,
    /// Maximum number of points in any single contour.
    pub max: usize,
    /// Mean number of points per contour.
    pub mean: f64,
}

/// Compute contour statistics from a set of contours.
pub(crate) fn contour_stats(contours: &[Contour]) -> ContourStats {
    let total: usize = contours.iter().map(Contour::len).sum();
    let min = contours.iter().map(Contour::len).min().unwrap_or(0);
    let max = contours.iter().map(Contour::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if contours.is_empty() {
        0.0
    } else {
        total as f64 / contours.len() as f64
    };
    ContourStats {
        total,
        min,
        max,
        mean,
    }
}

/// Run one typestate transition under the clock and capture the
/// resulting stage's metrics.
fn timed<C, S, T>(clock: &C, stage: S, step: impl FnOnce(S) -> T) -> (T, StageDiagnostics)
where
    C: Clock,
    T: Measured,
{
    let start = clock.now();
    let next = step(stage);
    let duration = clock.elapsed(&start);
    let metrics = next.measure();
    (next, StageDiagnostics { duration, metrics })
}

/// Run the full pipeline while recording per-stage timing and metrics.
///
/// Produces the same [`StagedAnalysis`] as
/// [`analyze_staged`](crate::analyze_staged).
///
/// # Errors
///
/// Returns [`AnalysisError`] if the config is invalid or the image cannot
/// be decoded.
pub fn analyze_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &AnalyzerConfig,
    clock: &C,
) -> Result<(StagedAnalysis, PipelineDiagnostics), AnalysisError> {
    let pipeline_start = clock.now();

    let pending = Pipeline::new(image_bytes.to_vec(), config.clone());
    let start = clock.now();
    let decoded = pending.decode()?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: decoded.measure(),
    };

    let (normalized, grayscale) = timed(clock, decoded, Decoded::normalize);
    let (smoothed, blur) = timed(clock, normalized, Normalized::smooth);
    let (edges, edge_detection) = timed(clock, smoothed, Smoothed::detect_edges);
    let (traced, contour_tracing) = timed(clock, edges, EdgesDetected::trace_contours);
    let (analyzed, analysis) = timed(clock, traced, ContoursTraced::analyze);
    let (rendered, render) = timed(clock, analyzed, Analyzed::render);

    let total_duration = clock.elapsed(&pipeline_start);
    let staged = rendered.into_result();

    let summary = PipelineSummary {
        image_width: staged.dimensions.width,
        image_height: staged.dimensions.height,
        pixel_count: u64::from(staged.dimensions.width) * u64::from(staged.dimensions.height),
        contour_count: staged.contours.len(),
        object_count: staged.analysis.records.len(),
    };

    tracing::debug!(
        total_ms = duration_ms(total_duration),
        objects = summary.object_count,
        "pipeline diagnostics collected"
    );

    Ok((
        staged,
        PipelineDiagnostics {
            decode,
            grayscale,
            blur,
            edge_detection,
            contour_tracing,
            analysis,
            render,
            total_duration,
            summary,
        },
    ))
}
