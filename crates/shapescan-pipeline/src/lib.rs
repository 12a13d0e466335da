//! shapescan-pipeline: Pure shape detection pipeline (sans-IO).
//!
//! Finds simple geometric shapes in a raster image and measures them
//! through:
//! decode -> intensity -> smoothing -> edge detection -> contour tracing ->
//! shape analysis -> annotation rendering.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory byte
//! slices or pixel grids and returns structured data. Reading and writing
//! files lives in the `shapescan` CLI.

pub mod analyze;
pub mod blur;
mod canny;
pub mod contour;
pub mod diagnostics;
pub mod edge;
pub mod font;
pub mod grayscale;
pub mod pipeline;
pub mod render;
pub mod simplify;
pub mod types;

pub use contour::{ChainApproximation, ContourTracer, ContourTracerKind};
pub use pipeline::Pipeline;
pub use types::{
    Analysis, AnalysisError, AnalysisOutput, AnalyzerConfig, BoundingBox, Contour, Dimensions,
    DrawInstruction, PixelGrid, Point, Polygon, ShapeClass, ShapeRecord, StagedAnalysis,
};

/// Run the full analysis on encoded image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration, then
/// returns the annotated image together with one [`ShapeRecord`] per
/// detected object. An image with no shapes is not an error: the result
/// has no records and the annotated image equals the input.
///
/// # Pipeline steps
///
/// 1. Decode into a [`PixelGrid`]
/// 2. Reduce to single-channel intensity
/// 3. Binomial smoothing
/// 4. Canny edge detection
/// 5. Outer contour tracing (pluggable strategy)
/// 6. Area filter, polygon approximation and classification
/// 7. Outline and label rendering
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidConfig`] if `config` fails validation,
/// [`AnalysisError::EmptyInput`] if `image_bytes` is empty,
/// [`AnalysisError::ImageDecode`] if the format is unrecognized, and
/// [`AnalysisError::UnsupportedFormat`] or [`AnalysisError::EmptyImage`]
/// for unusable decoded images.
pub fn analyze_image(
    image_bytes: &[u8],
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalysisError> {
    analyze_staged(image_bytes, config).map(StagedAnalysis::into_output)
}

/// Run the full analysis on an already-decoded grid.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidConfig`] if `config` fails validation
/// and [`AnalysisError::EmptyImage`] for a zero-area grid.
pub fn analyze_grid(
    grid: PixelGrid,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalysisError> {
    let staged = Pipeline::from_grid(grid, config.clone())?
        .normalize()
        .smooth()
        .detect_edges()
        .trace_contours()
        .analyze()
        .render()
        .into_result();
    Ok(staged.into_output())
}

/// Run the full analysis and keep every intermediate stage output.
///
/// Useful for inspecting how each stage transforms the image, e.g. when
/// tuning thresholds.
///
/// # Errors
///
/// Same as [`analyze_image`].
pub fn analyze_staged(
    image_bytes: &[u8],
    config: &AnalyzerConfig,
) -> Result<StagedAnalysis, AnalysisError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .normalize()
        .smooth()
        .detect_edges()
        .trace_contours()
        .analyze()
        .render()
        .into_result())
}
