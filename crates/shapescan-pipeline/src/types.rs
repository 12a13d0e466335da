//! Shared types for the shapescan detection pipeline.

use serde::{Deserialize, Serialize};

use crate::contour::{ChainApproximation, ContourTracerKind};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export the color buffer types wrapped by [`PixelGrid`].
pub use image::{RgbImage, RgbaImage};

/// A 2D point on the pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from left edge).
    pub x: i32,
    /// Row (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Exact in integer arithmetic; use for comparisons.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distance(self, other: Self) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }
}

/// One traced closed boundary: an ordered loop of pixel coordinates.
///
/// The loop is implicitly closed; the last point connects back to the
/// first and is not repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a new contour from an ordered loop of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the contour.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Smallest axis-aligned rectangle enclosing every point, or `None`
    /// for an empty contour.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.0.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.0[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x.abs_diff(min_x) + 1,
            height: max_y.abs_diff(min_y) + 1,
        })
    }
}

/// A simplified closed polygon approximating a [`Contour`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a polygon from its ordered vertices.
    #[must_use]
    pub const fn new(vertices: Vec<Point>) -> Self {
        Self(vertices)
    }

    /// Number of vertices.
    #[must_use]
    pub const fn vertex_count(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        &self.0
    }
}

/// Axis-aligned bounding box in pixel units.
///
/// `width` and `height` count pixels, so a single-pixel contour has a
/// 1×1 box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left column.
    pub x: i32,
    /// Top row.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Coarse shape class derived from a polygon's vertex count.
///
/// `Circle` is a catch-all for every polygon with more than four
/// vertices (pentagons and hexagons included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeClass {
    /// Three vertices.
    Triangle,
    /// Four vertices.
    Rectangle,
    /// Five or more vertices.
    Circle,
    /// Fewer than three vertices (degenerate approximation).
    Unknown,
}

impl ShapeClass {
    /// Classify a polygon by its vertex count.
    #[must_use]
    pub const fn from_vertex_count(vertices: usize) -> Self {
        match vertices {
            3 => Self::Triangle,
            4 => Self::Rectangle,
            0..=2 => Self::Unknown,
            _ => Self::Circle,
        }
    }

    /// Display label for this class.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Triangle => "Triangle",
            Self::Rectangle => "Rectangle",
            Self::Circle => "Circle",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ShapeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    /// 1-based position in acceptance order.
    pub index: usize,
    /// Shape class from the polygon vertex count.
    pub shape: ShapeClass,
    /// Enclosed area in square pixels, rounded to 2 decimals.
    pub area: f64,
    /// Closed boundary length in pixels, rounded to 2 decimals.
    pub perimeter: f64,
    /// Bounding box of the original contour.
    pub bounding_box: BoundingBox,
}

/// What the renderer should draw for one accepted contour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawInstruction {
    /// Index into the traced contour list.
    pub contour: usize,
    /// Label text.
    pub label: String,
    /// Bottom-left corner of the label.
    pub anchor: Point,
}

/// Output of the shape analyzer: one record and one draw instruction per
/// accepted contour, in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Structured results.
    pub records: Vec<ShapeRecord>,
    /// Drawing work for the renderer.
    pub instructions: Vec<DrawInstruction>,
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A decoded image with its channel layout resolved once at load time.
///
/// Downstream stages match on the variant instead of re-inspecting
/// channel counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelGrid {
    /// Single intensity channel.
    Grayscale(GrayImage),
    /// Three color channels.
    Rgb(RgbImage),
    /// Three color channels plus alpha.
    Rgba(RgbaImage),
}

impl PixelGrid {
    /// Number of samples per pixel.
    #[must_use]
    pub const fn channels(&self) -> u8 {
        match self {
            Self::Grayscale(_) => 1,
            Self::Rgb(_) => 3,
            Self::Rgba(_) => 4,
        }
    }

    /// Width and height in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = match self {
            Self::Grayscale(img) => img.dimensions(),
            Self::Rgb(img) => img.dimensions(),
            Self::Rgba(img) => img.dimensions(),
        };
        Dimensions { width, height }
    }

    /// Raw interleaved samples.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        match self {
            Self::Grayscale(img) => img.as_raw(),
            Self::Rgb(img) => img.as_raw(),
            Self::Rgba(img) => img.as_raw(),
        }
    }
}

/// Configuration for the detection pipeline.
///
/// Defaults reproduce the reference behavior: 5×5 blur, Canny 50/150,
/// minimum area 500 px², approximation tolerance 4% of the perimeter.
/// Use [`validate`](Self::validate) before running with user-supplied
/// values; the pipeline entry points call it for you.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Side length of the square smoothing kernel. Must be odd; 1
    /// disables smoothing.
    pub blur_kernel_size: u32,

    /// Canny low threshold. Gradient magnitudes between `canny_low` and
    /// `canny_high` are edges only if connected to a strong edge.
    pub canny_low: f32,

    /// Canny high threshold. Gradient magnitudes strictly above this are
    /// definite edges.
    pub canny_high: f32,

    /// Which contour tracing algorithm to use.
    pub contour_tracer: ContourTracerKind,

    /// Point representation of traced contours.
    pub chain_approximation: ChainApproximation,

    /// Contours enclosing this area or less (px²) are dropped.
    pub min_area: f64,

    /// Polygon approximation tolerance as a fraction of the perimeter.
    pub approx_factor: f64,

    /// Outline stroke width in pixels.
    pub outline_width: f32,

    /// Outline color (RGB).
    pub outline_color: [u8; 3],

    /// Label color (RGB).
    pub label_color: [u8; 3],

    /// Vertical gap between the bounding box top and the label baseline.
    pub label_offset: i32,

    /// Integer magnification of the built-in label font.
    pub label_scale: u32,
}

impl AnalyzerConfig {
    /// Default smoothing kernel size.
    pub const DEFAULT_BLUR_KERNEL_SIZE: u32 = 5;
    /// Largest supported smoothing kernel size.
    pub const MAX_BLUR_KERNEL_SIZE: u32 = 15;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default minimum contour area in px².
    pub const DEFAULT_MIN_AREA: f64 = 500.0;
    /// Default approximation tolerance factor.
    pub const DEFAULT_APPROX_FACTOR: f64 = 0.04;
    /// Default outline stroke width.
    pub const DEFAULT_OUTLINE_WIDTH: f32 = 2.0;
    /// Default outline color (green).
    pub const DEFAULT_OUTLINE_COLOR: [u8; 3] = [0, 255, 0];
    /// Default label color (gold).
    pub const DEFAULT_LABEL_COLOR: [u8; 3] = [255, 215, 0];
    /// Default label offset above the bounding box.
    pub const DEFAULT_LABEL_OFFSET: i32 = 5;
    /// Default label font magnification.
    pub const DEFAULT_LABEL_SCALE: u32 = 2;

    /// Check every field for a usable value.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.blur_kernel_size % 2 == 0 || self.blur_kernel_size > Self::MAX_BLUR_KERNEL_SIZE {
            return Err(AnalysisError::InvalidConfig(format!(
                "blur_kernel_size must be odd and at most {}, got {}",
                Self::MAX_BLUR_KERNEL_SIZE,
                self.blur_kernel_size
            )));
        }
        if !self.canny_low.is_finite() || !self.canny_high.is_finite() {
            return Err(AnalysisError::InvalidConfig(
                "canny thresholds must be finite".to_string(),
            ));
        }
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_area must be finite and non-negative, got {}",
                self.min_area
            )));
        }
        if !(self.approx_factor > 0.0 && self.approx_factor < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "approx_factor must be in (0, 1), got {}",
                self.approx_factor
            )));
        }
        if !self.outline_width.is_finite() || self.outline_width <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "outline_width must be positive, got {}",
                self.outline_width
            )));
        }
        if self.label_scale == 0 {
            return Err(AnalysisError::InvalidConfig(
                "label_scale must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: Self::DEFAULT_BLUR_KERNEL_SIZE,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            contour_tracer: ContourTracerKind::default(),
            chain_approximation: ChainApproximation::default(),
            min_area: Self::DEFAULT_MIN_AREA,
            approx_factor: Self::DEFAULT_APPROX_FACTOR,
            outline_width: Self::DEFAULT_OUTLINE_WIDTH,
            outline_color: Self::DEFAULT_OUTLINE_COLOR,
            label_color: Self::DEFAULT_LABEL_COLOR,
            label_offset: Self::DEFAULT_LABEL_OFFSET,
            label_scale: Self::DEFAULT_LABEL_SCALE,
        }
    }
}

/// Final output of [`crate::analyze_image`] and [`crate::analyze_grid`].
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// Copy of the input with outlines and labels drawn on it.
    pub annotated: PixelGrid,
    /// One record per detected object, in detection order.
    pub records: Vec<ShapeRecord>,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Result of running the pipeline with all intermediate stage outputs
/// preserved.
#[derive(Debug, Clone)]
pub struct StagedAnalysis {
    /// Stage 0: the decoded input.
    pub original: PixelGrid,
    /// Stage 1: single-channel intensity.
    pub intensity: GrayImage,
    /// Stage 2: smoothed intensity.
    pub smoothed: GrayImage,
    /// Stage 3: binary edge map.
    pub edges: GrayImage,
    /// Stage 4: outermost traced contours.
    pub contours: Vec<Contour>,
    /// Stage 5: records and draw instructions.
    pub analysis: Analysis,
    /// Stage 6: annotated copy of the original.
    pub annotated: PixelGrid,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

impl StagedAnalysis {
    /// Drop the intermediates and keep what callers of
    /// [`crate::analyze_image`] receive.
    #[must_use]
    pub fn into_output(self) -> AnalysisOutput {
        AnalysisOutput {
            annotated: self.annotated,
            records: self.analysis.records,
            dimensions: self.dimensions,
        }
    }
}

/// Errors that can occur during analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image has a channel layout other than 1, 3 or 4 channels.
    #[error("unsupported pixel format: {channels} channels (expected 1, 3 or 4)")]
    UnsupportedFormat {
        /// Channel count found in the input.
        channels: u8,
    },

    /// The image has zero width or zero height.
    #[error("image has zero area ({width}x{height})")]
    EmptyImage {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// A raw sample buffer does not match its declared dimensions.
    #[error("sample buffer holds {actual} bytes, expected {expected}")]
    BufferSize {
        /// `width * height * channels`.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// Analyzer configuration is invalid.
    #[error("invalid analyzer configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_distance_squared() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert_eq!(a.distance_squared(b), 25);
    }

    #[test]
    fn point_distance() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_distance_to_self_is_zero() {
        let p = Point::new(7, 11);
        assert!(p.distance(p).abs() < f64::EPSILON);
    }

    // --- Contour tests ---

    #[test]
    fn contour_empty() {
        let c = Contour::new(vec![]);
        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
        assert!(c.bounding_box().is_none());
    }

    #[test]
    fn contour_bounding_box_counts_pixels() {
        let c = Contour::new(vec![
            Point::new(2, 3),
            Point::new(11, 3),
            Point::new(11, 7),
            Point::new(2, 7),
        ]);
        let bbox = c.bounding_box().unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                x: 2,
                y: 3,
                width: 10,
                height: 5,
            }
        );
    }

    #[test]
    fn single_point_bounding_box_is_one_pixel() {
        let c = Contour::new(vec![Point::new(4, 4)]);
        let bbox = c.bounding_box().unwrap();
        assert_eq!((bbox.width, bbox.height), (1, 1));
    }

    // --- ShapeClass tests ---

    #[test]
    fn classification_by_vertex_count() {
        assert_eq!(ShapeClass::from_vertex_count(0), ShapeClass::Unknown);
        assert_eq!(ShapeClass::from_vertex_count(2), ShapeClass::Unknown);
        assert_eq!(ShapeClass::from_vertex_count(3), ShapeClass::Triangle);
        assert_eq!(ShapeClass::from_vertex_count(4), ShapeClass::Rectangle);
        assert_eq!(ShapeClass::from_vertex_count(5), ShapeClass::Circle);
        assert_eq!(ShapeClass::from_vertex_count(12), ShapeClass::Circle);
    }

    #[test]
    fn shape_class_serializes_as_label() {
        let json = serde_json::to_string(&ShapeClass::Rectangle).unwrap();
        assert_eq!(json, "\"Rectangle\"");
        assert_eq!(ShapeClass::Circle.to_string(), "Circle");
    }

    // --- PixelGrid tests ---

    #[test]
    fn pixel_grid_reports_channels_and_dimensions() {
        let gray = PixelGrid::Grayscale(GrayImage::new(3, 2));
        let rgb = PixelGrid::Rgb(RgbImage::new(3, 2));
        let rgba = PixelGrid::Rgba(RgbaImage::new(3, 2));
        assert_eq!(gray.channels(), 1);
        assert_eq!(rgb.channels(), 3);
        assert_eq!(rgba.channels(), 4);
        assert_eq!(
            rgba.dimensions(),
            Dimensions {
                width: 3,
                height: 2
            }
        );
        assert_eq!(rgb.as_raw().len(), 18);
    }

    // --- AnalyzerConfig tests ---

    #[test]
    fn default_config_matches_constants() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.blur_kernel_size, 5);
        assert!((config.canny_low - 50.0).abs() < f32::EPSILON);
        assert!((config.canny_high - 150.0).abs() < f32::EPSILON);
        assert!((config.min_area - 500.0).abs() < f64::EPSILON);
        assert!((config.approx_factor - 0.04).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn even_kernel_size_is_rejected() {
        let config = AnalyzerConfig {
            blur_kernel_size: 4,
            ..AnalyzerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn out_of_range_approx_factor_is_rejected() {
        for factor in [0.0, -0.1, 1.0, f64::NAN] {
            let config = AnalyzerConfig {
                approx_factor: factor,
                ..AnalyzerConfig::default()
            };
            assert!(config.validate().is_err(), "factor {factor} accepted");
        }
    }

    #[test]
    fn negative_min_area_is_rejected() {
        let config = AnalyzerConfig {
            min_area: -1.0,
            ..AnalyzerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_serde_round_trip() {
        let config = AnalyzerConfig {
            canny_low: 30.0,
            min_area: 250.0,
            ..AnalyzerConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: AnalyzerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: AnalyzerConfig = serde_json::from_str(r#"{"min_area": 100.0}"#).unwrap();
        assert!((config.min_area - 100.0).abs() < f64::EPSILON);
        assert_eq!(config.blur_kernel_size, AnalyzerConfig::DEFAULT_BLUR_KERNEL_SIZE);
    }

    // --- AnalysisError tests ---

    #[test]
    fn error_display_messages() {
        assert_eq!(
            AnalysisError::EmptyInput.to_string(),
            "input image data is empty"
        );
        assert_eq!(
            AnalysisError::UnsupportedFormat { channels: 2 }.to_string(),
            "unsupported pixel format: 2 channels (expected 1, 3 or 4)"
        );
        assert_eq!(
            AnalysisError::EmptyImage {
                width: 0,
                height: 5
            }
            .to_string(),
            "image has zero area (0x5)"
        );
    }
}
