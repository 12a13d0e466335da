//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::analyze_staged`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use shapescan_pipeline::{Pipeline, AnalyzerConfig, AnalysisError};
//! # fn run(png: Vec<u8>) -> Result<(), AnalysisError> {
//! let config = AnalyzerConfig::default();
//! let pipeline = Pipeline::new(png, config)
//!     .decode()?
//!     .normalize()
//!     .smooth()
//!     .detect_edges()
//!     .trace_contours()
//!     .analyze()
//!     .render();
//!
//! let staged = pipeline.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state,
//! carrying all previously computed intermediates. Only decoding can
//! fail; an image without shapes runs to completion with zero records.
//!
//! # Memory
//!
//! Every stage retains the full raster stack (original grid, intensity,
//! smoothed and edge images). Callers that only need the records and the
//! annotated image should prefer [`crate::analyze_image`], which discards
//! the intermediates.

use crate::diagnostics::{StageMetrics, contour_stats};
use crate::types::{
    Analysis, AnalysisError, AnalyzerConfig, Contour, Dimensions, GrayImage, PixelGrid,
    ShapeClass, StagedAnalysis,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source image bytes and config are stored but not yet touched.
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: AnalyzerConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode the source image and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if the config fails
    /// [`AnalyzerConfig::validate`], [`AnalysisError::EmptyInput`] if the
    /// source bytes are empty, [`AnalysisError::ImageDecode`] if the data
    /// cannot be decoded, and [`AnalysisError::UnsupportedFormat`] or
    /// [`AnalysisError::EmptyImage`] for unusable decoded images.
    pub fn decode(self) -> Result<Decoded, AnalysisError> {
        self.config.validate()?;
        let source_len = self.source.len();
        let original = crate::grayscale::decode(&self.source)?;
        tracing::debug!(
            bytes = source_len,
            channels = original.channels(),
            width = original.dimensions().width,
            height = original.dimensions().height,
            "decoded image"
        );
        Ok(Decoded {
            config: self.config,
            original,
            source_len,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
///
/// The channel layout has been resolved into a [`PixelGrid`] variant.
/// Call [`normalize`](Self::normalize) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .normalize() to continue"]
pub struct Decoded {
    config: AnalyzerConfig,
    original: PixelGrid,
    source_len: usize,
}

impl Decoded {
    /// The decoded input grid.
    #[must_use]
    pub const fn original(&self) -> &PixelGrid {
        &self.original
    }

    /// Reduce the grid to single-channel intensity.
    pub fn normalize(self) -> Normalized {
        let intensity = self.original.to_intensity();
        tracing::debug!(channels = self.original.channels(), "converted to intensity");
        Normalized {
            dimensions: self.original.dimensions(),
            config: self.config,
            original: self.original,
            intensity,
        }
    }
}

// ───────────────────────── Stage 2: Normalized ───────────────────────

/// Pipeline state after intensity conversion.
///
/// Call [`smooth`](Self::smooth) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .smooth() to continue"]
pub struct Normalized {
    config: AnalyzerConfig,
    original: PixelGrid,
    intensity: GrayImage,
    dimensions: Dimensions,
}

impl Normalized {
    /// The single-channel intensity image.
    #[must_use]
    pub const fn intensity(&self) -> &GrayImage {
        &self.intensity
    }

    /// Apply the smoothing kernel.
    pub fn smooth(self) -> Smoothed {
        let smoothed = crate::blur::gaussian_blur(&self.intensity, self.config.blur_kernel_size);
        tracing::debug!(kernel = self.config.blur_kernel_size, "smoothed intensity");
        Smoothed {
            config: self.config,
            original: self.original,
            intensity: self.intensity,
            smoothed,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 3: Smoothed ─────────────────────────

/// Pipeline state after smoothing.
///
/// Call [`detect_edges`](Self::detect_edges) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .detect_edges() to continue"]
pub struct Smoothed {
    config: AnalyzerConfig,
    original: PixelGrid,
    intensity: GrayImage,
    smoothed: GrayImage,
    dimensions: Dimensions,
}

impl Smoothed {
    /// The smoothed intensity image.
    #[must_use]
    pub const fn smoothed(&self) -> &GrayImage {
        &self.smoothed
    }

    /// Run Canny edge detection on the smoothed image.
    pub fn detect_edges(self) -> EdgesDetected {
        let edges = crate::edge::canny(&self.smoothed, self.config.canny_low, self.config.canny_high);
        let edge_pixels = crate::edge::count_edge_pixels(&edges);
        tracing::debug!(edge_pixels, "detected edges");
        EdgesDetected {
            config: self.config,
            original: self.original,
            intensity: self.intensity,
            smoothed: self.smoothed,
            edges,
            edge_pixels,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 4: EdgesDetected ────────────────────

/// Pipeline state after edge detection.
///
/// Call [`trace_contours`](Self::trace_contours) to advance to the next
/// stage.
#[must_use = "pipeline stages are consumed by advancing; call .trace_contours() to continue"]
pub struct EdgesDetected {
    config: AnalyzerConfig,
    original: PixelGrid,
    intensity: GrayImage,
    smoothed: GrayImage,
    edges: GrayImage,
    edge_pixels: u64,
    dimensions: Dimensions,
}

impl EdgesDetected {
    /// The binary edge map.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Trace the outermost contours of the edge map.
    ///
    /// An empty contour list is not an error; later stages simply
    /// produce no records.
    pub fn trace_contours(self) -> ContoursTraced {
        let contours = crate::contour::trace_contours(
            &self.edges,
            &self.config.contour_tracer,
            self.config.chain_approximation,
        );
        tracing::debug!(contours = contours.len(), "traced contours");
        ContoursTraced {
            config: self.config,
            original: self.original,
            intensity: self.intensity,
            smoothed: self.smoothed,
            edges: self.edges,
            contours,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 5: ContoursTraced ───────────────────

/// Pipeline state after contour tracing.
///
/// Call [`analyze`](Self::analyze) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .analyze() to continue"]
pub struct ContoursTraced {
    config: AnalyzerConfig,
    original: PixelGrid,
    intensity: GrayImage,
    smoothed: GrayImage,
    edges: GrayImage,
    contours: Vec<Contour>,
    dimensions: Dimensions,
}

impl ContoursTraced {
    /// The traced contours in discovery order.
    #[must_use]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Measure, filter and classify the contours.
    pub fn analyze(self) -> Analyzed {
        let analysis = crate::analyze::analyze_contours(&self.contours, &self.config);
        Analyzed {
            config: self.config,
            original: self.original,
            intensity: self.intensity,
            smoothed: self.smoothed,
            edges: self.edges,
            contours: self.contours,
            analysis,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 6: Analyzed ─────────────────────────

/// Pipeline state after shape analysis.
///
/// Call [`render`](Self::render) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing; call .render() to continue"]
pub struct Analyzed {
    config: AnalyzerConfig,
    original: PixelGrid,
    intensity: GrayImage,
    smoothed: GrayImage,
    edges: GrayImage,
    contours: Vec<Contour>,
    analysis: Analysis,
    dimensions: Dimensions,
}

impl Analyzed {
    /// Records and draw instructions.
    #[must_use]
    pub const fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Draw outlines and labels onto a copy of the original.
    pub fn render(self) -> Rendered {
        let annotated = crate::render::render(
            &self.original,
            &self.contours,
            &self.analysis.instructions,
            &self.config,
        );
        tracing::debug!(
            instructions = self.analysis.instructions.len(),
            "rendered annotations"
        );
        Rendered {
            original: self.original,
            intensity: self.intensity,
            smoothed: self.smoothed,
            edges: self.edges,
            contours: self.contours,
            analysis: self.analysis,
            annotated,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 7: Rendered ─────────────────────────

/// Final pipeline state: every stage has run.
///
/// Call [`into_result`](Self::into_result) to take the intermediates.
#[must_use = "call .into_result() to take the pipeline output"]
pub struct Rendered {
    original: PixelGrid,
    intensity: GrayImage,
    smoothed: GrayImage,
    edges: GrayImage,
    contours: Vec<Contour>,
    analysis: Analysis,
    annotated: PixelGrid,
    dimensions: Dimensions,
}

impl Rendered {
    /// The annotated copy of the original.
    #[must_use]
    pub const fn annotated(&self) -> &PixelGrid {
        &self.annotated
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Consume the pipeline and return the full [`StagedAnalysis`].
    #[must_use]
    pub fn into_result(self) -> StagedAnalysis {
        StagedAnalysis {
            original: self.original,
            intensity: self.intensity,
            smoothed: self.smoothed,
            edges: self.edges,
            contours: self.contours,
            analysis: self.analysis,
            annotated: self.annotated,
            dimensions: self.dimensions,
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 8;

/// The output produced by a single pipeline stage.
///
/// Each variant borrows the data that the corresponding stage computed.
#[must_use]
pub enum StageOutput<'a> {
    /// Source image bytes (not yet decoded).
    Source {
        /// The raw image bytes.
        bytes: &'a [u8],
    },
    /// Decoded input grid.
    Decoded {
        /// The original image.
        original: &'a PixelGrid,
    },
    /// Single-channel intensity.
    Normalized {
        /// The intensity image.
        intensity: &'a GrayImage,
    },
    /// Smoothing result.
    Smoothed {
        /// The smoothed intensity image.
        smoothed: &'a GrayImage,
    },
    /// Edge detection result.
    EdgesDetected {
        /// The binary edge map.
        edges: &'a GrayImage,
    },
    /// Contour tracing result.
    ContoursTraced {
        /// The traced contours.
        contours: &'a [Contour],
    },
    /// Shape analysis result.
    Analyzed {
        /// Records and draw instructions.
        analysis: &'a Analysis,
    },
    /// Rendering result.
    Rendered {
        /// The annotated image.
        annotated: &'a PixelGrid,
        /// Image dimensions.
        dimensions: Dimensions,
    },
}

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// Both the typed API (individual stage structs) and the dynamic API
/// ([`Stage`] enum) are available. This trait bridges the two.
///
/// # Loop pattern
///
/// ```rust
/// # use shapescan_pipeline::{Pipeline, AnalyzerConfig, AnalysisError};
/// # use shapescan_pipeline::pipeline::{Stage, PipelineStage, Advance};
/// # fn run(png: Vec<u8>) -> Result<(), AnalysisError> {
/// let mut stage: Stage = Pipeline::new(png, AnalyzerConfig::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage (e.g. `"source"`, `"smooth"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `7` for
    /// Rendered).
    const INDEX: usize;

    /// The output this stage produced.
    fn output(&self) -> StageOutput<'_>;

    /// Metrics describing the work done to reach this stage.
    ///
    /// Returns `None` for the initial [`Pending`] stage.
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(stage))` on success or `Ok(None)` if already at
    /// the final stage.
    ///
    /// # Errors
    ///
    /// Returns the [`Pending::decode`] errors when decoding fails.
    fn next(self) -> Result<Option<Stage>, AnalysisError>;

    /// Run all remaining stages and return the final [`StagedAnalysis`].
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if decoding still has to run and fails.
    fn complete(self) -> Result<StagedAnalysis, AnalysisError>;
}

/// Metrics for every stage that did work, i.e. all but [`Pending`].
pub(crate) trait Measured {
    fn measure(&self) -> StageMetrics;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Source {
            bytes: &self.source,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage>, AnalysisError> {
        Ok(Some(Stage::Decoded(self.decode()?)))
    }

    fn complete(self) -> Result<StagedAnalysis, AnalysisError> {
        self.decode()?.complete()
    }
}

impl Measured for Decoded {
    fn measure(&self) -> StageMetrics {
        let Dimensions { width, height } = self.original.dimensions();
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width,
            height,
            channels: self.original.channels(),
            pixel_count: u64::from(width) * u64::from(height),
        }
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Decoded {
            original: &self.original,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }

    fn next(self) -> Result<Option<Stage>, AnalysisError> {
        Ok(Some(Stage::Normalized(self.normalize())))
    }

    fn complete(self) -> Result<StagedAnalysis, AnalysisError> {
        self.normalize().complete()
    }
}

impl Measured for Normalized {
    fn measure(&self) -> StageMetrics {
        StageMetrics::Grayscale {
            width: self.dimensions.width,
            height: self.dimensions.height,
            source_channels: self.original.channels(),
        }
    }
}

impl PipelineStage for Normalized {
    const NAME: &str = "grayscale";
    const INDEX: usize = 2;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Normalized {
            intensity: &self.intensity,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }

    fn next(self) -> Result<Option<Stage>, AnalysisError> {
        Ok(Some(Stage::Smoothed(self.smooth())))
    }

    fn complete(self) -> Result<StagedAnalysis, AnalysisError> {
        self.smooth().complete()
    }
}

impl Measured for Smoothed {
    fn measure(&self) -> StageMetrics {
        StageMetrics::Blur {
            kernel_size: self.config.blur_kernel_size,
        }
    }
}

impl PipelineStage for Smoothed {
    const NAME: &str = "smooth";
    const INDEX: usize = 3;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Smoothed {
            smoothed: &self.smoothed,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }

    fn next(self) -> Result<Option<Stage>, AnalysisError> {
        Ok(Some(Stage::EdgesDetected(self.detect_edges())))
    }

    fn complete(self) -> Result<StagedAnalysis, AnalysisError> {
        self.detect_edges().complete()
    }
}

impl Measured for EdgesDetected {
    fn measure(&self) -> StageMetrics {
        let (low_threshold, high_threshold) =
            crate::edge::clamp_thresholds(self.config.canny_low, self.config.canny_high);
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count: self.edge_pixels,
            total_pixel_count: u64::from(self.dimensions.width)
                * u64::from(self.dimensions.height),
        }
    }
}

impl PipelineStage for EdgesDetected {
    const NAME: &str = "edges";
    const INDEX: usize = 4;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::EdgesDetected {
            edges: &self.edges,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }

    fn next(self) -> Result<Option<Stage>, AnalysisError> {
        Ok(Some(Stage::ContoursTraced(self.trace_contours())))
    }

    fn complete(self) -> Result<StagedAnalysis, AnalysisError> {
        self.trace_contours().complete()
    }
}

impl Measured for ContoursTraced {
    fn measure(&self) -> StageMetrics {
        let stats = contour_stats(&self.contours);
        StageMetrics::ContourTracing {
            contour_count: self.contours.len(),
            total_point_count: stats.total,
            min_contour_points: stats.min,
            max_contour_points: stats.max,
            mean_contour_points: stats.mean,
        }
    }
}

impl PipelineStage for ContoursTraced {
    const NAME: &str = "contours";
    const INDEX: usize = 5;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::ContoursTraced {
            contours: &self.contours,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }

    fn next(self) -> Result<Option<Stage>, AnalysisError> {
        Ok(Some(Stage::Analyzed(self.analyze())))
    }

    fn complete(self) -> Result<StagedAnalysis, AnalysisError> {
        self.analyze().complete()
    }
}

impl Measured for Analyzed {
    fn measure(&self) -> StageMetrics {
        let count = |class: ShapeClass| {
            self.analysis
                .records
                .iter()
                .filter(|r| r.shape == class)
                .count()
        };
        StageMetrics::Analysis {
            min_area: self.config.min_area,
            contour_count: self.contours.len(),
            accepted: self.analysis.records.len(),
            triangles: count(ShapeClass::Triangle),
            rectangles: count(ShapeClass::Rectangle),
            circles: count(ShapeClass::Circle),
            unknown: count(ShapeClass::Unknown),
        }
    }
}

impl PipelineStage for Analyzed {
    const NAME: &str = "analyze";
    const INDEX: usize = 6;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Analyzed {
            analysis: &self.analysis,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }

    fn next(self) -> Result<Option<Stage>, AnalysisError> {
        Ok(Some(Stage::Rendered(self.render())))
    }

    fn complete(self) -> Result<StagedAnalysis, AnalysisError> {
        self.render().complete()
    }
}

impl Measured for Rendered {
    fn measure(&self) -> StageMetrics {
        let changed_pixel_count = changed_pixels(&self.original, &self.annotated);
        StageMetrics::Render {
            instruction_count: self.analysis.instructions.len(),
            changed_pixel_count,
        }
    }
}

impl PipelineStage for Rendered {
    const NAME: &str = "render";
    const INDEX: usize = 7;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Rendered {
            annotated: &self.annotated,
            dimensions: self.dimensions,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.measure())
    }

    fn next(self) -> Result<Option<Stage>, AnalysisError> {
        Ok(None)
    }

    fn complete(self) -> Result<StagedAnalysis, AnalysisError> {
        Ok(self.into_result())
    }
}

/// Number of pixels whose samples differ between two grids of the same
/// variant and size.
fn changed_pixels(before: &PixelGrid, after: &PixelGrid) -> u64 {
    let channels = usize::from(before.channels());
    before
        .as_raw()
        .chunks_exact(channels)
        .zip(after.as_raw().chunks_exact(channels))
        .map(|(a, b)| u64::from(a != b))
        .sum()
}

/// Enum wrapping all pipeline stages for uniform, loopable access.
///
/// Use [`From`] conversions to enter the dynamic API from any typed
/// stage, then call [`advance`](Self::advance) in a loop.
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Decoded`].
    Decoded(Decoded),
    /// See [`Normalized`].
    Normalized(Normalized),
    /// See [`Smoothed`].
    Smoothed(Smoothed),
    /// See [`EdgesDetected`].
    EdgesDetected(EdgesDetected),
    /// See [`ContoursTraced`].
    ContoursTraced(ContoursTraced),
    /// See [`Analyzed`].
    Analyzed(Analyzed),
    /// See [`Rendered`].
    Rendered(Rendered),
}

/// Compile-time guard: if a [`Stage`] variant is added, this match becomes
/// non-exhaustive and the build fails, reminding you to bump [`STAGE_COUNT`].
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_)
        | Stage::Decoded(_)
        | Stage::Normalized(_)
        | Stage::Smoothed(_)
        | Stage::EdgesDetected(_)
        | Stage::ContoursTraced(_)
        | Stage::Analyzed(_)
        | Stage::Rendered(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next stage or the
/// completed final stage returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next stage.
    Next(Stage),
    /// The pipeline was already at the final stage; returned unchanged.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Decoded(s) => s.$method($($arg),*),
            Self::Normalized(s) => s.$method($($arg),*),
            Self::Smoothed(s) => s.$method($($arg),*),
            Self::EdgesDetected(s) => s.$method($($arg),*),
            Self::ContoursTraced(s) => s.$method($($arg),*),
            Self::Analyzed(s) => s.$method($($arg),*),
            Self::Rendered(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Human-readable name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// The output this stage produced.
    pub fn output(&self) -> StageOutput<'_> {
        delegate!(self, output)
    }

    /// Stage-specific metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(next_stage))` on success and `Ok(None)` if
    /// already complete (the `Rendered` value is consumed).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if decoding fails.
    pub fn next(self) -> Result<Option<Self>, AnalysisError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if
    /// already complete.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if decoding fails.
    pub fn advance(self) -> Result<Advance, AnalysisError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // The is_complete() guard above ensures next() returns Some here.
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if decoding still has to run and fails.
    pub fn complete(self) -> Result<StagedAnalysis, AnalysisError> {
        delegate!(self, complete)
    }
}

// The `PipelineStage` associated constants aren't callable via
// `self.NAME`, so the macro goes through this helper.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

macro_rules! stage_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Stage {
                fn from(s: $variant) -> Self {
                    Self::$variant(s)
                }
            }
        )*
    };
}

stage_from!(
    Pending,
    Decoded,
    Normalized,
    Smoothed,
    EdgesDetected,
    ContoursTraced,
    Analyzed,
    Rendered,
);

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental shape analysis pipeline.
///
/// Created via [`Pipeline::new`] (encoded bytes) or
/// [`Pipeline::from_grid`] (an already-decoded grid). Each stage method
/// consumes the current state and returns the next, making it a
/// compile-time error to skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from encoded image bytes and config.
    ///
    /// No processing is performed; the bytes and config are stored.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: AnalyzerConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }

    /// Start a pipeline from an already-decoded grid, skipping decoding.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if the config fails
    /// validation and [`AnalysisError::EmptyImage`] for a zero-area grid.
    pub fn from_grid(grid: PixelGrid, config: AnalyzerConfig) -> Result<Decoded, AnalysisError> {
        config.validate()?;
        let Dimensions { width, height } = grid.dimensions();
        if width == 0 || height == 0 {
            return Err(AnalysisError::EmptyImage { width, height });
        }
        Ok(Decoded {
            config,
            source_len: grid.as_raw().len(),
            original: grid,
        })
    }
}
