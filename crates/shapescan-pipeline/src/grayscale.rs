//! Image decoding, channel-layout resolution and intensity conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) or an already-decoded
//! sample buffer and resolves it once into a [`PixelGrid`] variant.
//! [`to_intensity`] then reduces any variant to a single-channel
//! grayscale image suitable for the rest of the pipeline.
//!
//! This is the first step in the pipeline: raw bytes in, `GrayImage` out.

use image::{DynamicImage, GrayImage, Luma};

use crate::types::{AnalysisError, PixelGrid, RgbImage, RgbaImage};

/// Fixed-point precision of the luminance weights.
const LUMA_SHIFT: u32 = 14;

/// BT.601 weights scaled by `2^LUMA_SHIFT`. They sum to exactly
/// `2^LUMA_SHIFT`, so gray input (`r == g == b`) maps to itself.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const _: () = assert!(LUMA_R + LUMA_G + LUMA_B == 1 << LUMA_SHIFT);

/// Decode raw image bytes into a [`PixelGrid`].
///
/// Supports whatever the `image` crate was built to decode. 16-bit and
/// floating-point images are narrowed to 8 bits per sample with their
/// channel count preserved.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyInput`] if `bytes` is empty.
/// Returns [`AnalysisError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
/// Returns [`AnalysisError::UnsupportedFormat`] for two-channel
/// (luma + alpha) images and [`AnalysisError::EmptyImage`] for images
/// with no pixels.
pub fn decode(bytes: &[u8]) -> Result<PixelGrid, AnalysisError> {
    if bytes.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    from_dynamic(img)
}

/// Resolve a decoded [`DynamicImage`] into a [`PixelGrid`] variant.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyImage`] for a zero-area image and
/// [`AnalysisError::UnsupportedFormat`] when the channel count is not
/// 1, 3 or 4.
pub fn from_dynamic(img: DynamicImage) -> Result<PixelGrid, AnalysisError> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(AnalysisError::EmptyImage { width, height });
    }

    match img.color().channel_count() {
        1 => Ok(PixelGrid::Grayscale(img.into_luma8())),
        3 => Ok(PixelGrid::Rgb(img.into_rgb8())),
        4 => Ok(PixelGrid::Rgba(img.into_rgba8())),
        channels => Err(AnalysisError::UnsupportedFormat { channels }),
    }
}

impl PixelGrid {
    /// Wrap an already-decoded, interleaved 8-bit sample buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnsupportedFormat`] if `channels` is not
    /// 1, 3 or 4, [`AnalysisError::EmptyImage`] if either dimension is
    /// zero, and [`AnalysisError::BufferSize`] if `samples` does not hold
    /// exactly `width * height * channels` bytes.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        samples: Vec<u8>,
    ) -> Result<Self, AnalysisError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(AnalysisError::UnsupportedFormat { channels });
        }
        if width == 0 || height == 0 {
            return Err(AnalysisError::EmptyImage { width, height });
        }

        let expected = (width as usize) * (height as usize) * usize::from(channels);
        let actual = samples.len();
        if actual != expected {
            return Err(AnalysisError::BufferSize { expected, actual });
        }

        let grid = match channels {
            1 => GrayImage::from_raw(width, height, samples).map(Self::Grayscale),
            3 => RgbImage::from_raw(width, height, samples).map(Self::Rgb),
            _ => RgbaImage::from_raw(width, height, samples).map(Self::Rgba),
        };
        grid.ok_or(AnalysisError::BufferSize { expected, actual })
    }

    /// Single-channel intensity version of this grid.
    ///
    /// See [`to_intensity`].
    #[must_use = "returns the intensity image"]
    pub fn to_intensity(&self) -> GrayImage {
        to_intensity(self)
    }
}

impl From<GrayImage> for PixelGrid {
    fn from(img: GrayImage) -> Self {
        Self::Grayscale(img)
    }
}

impl From<RgbImage> for PixelGrid {
    fn from(img: RgbImage) -> Self {
        Self::Rgb(img)
    }
}

impl From<RgbaImage> for PixelGrid {
    fn from(img: RgbaImage) -> Self {
        Self::Rgba(img)
    }
}

impl From<PixelGrid> for DynamicImage {
    fn from(grid: PixelGrid) -> Self {
        match grid {
            PixelGrid::Grayscale(img) => Self::ImageLuma8(img),
            PixelGrid::Rgb(img) => Self::ImageRgb8(img),
            PixelGrid::Rgba(img) => Self::ImageRgba8(img),
        }
    }
}

/// Reduce a [`PixelGrid`] to single-channel intensity.
///
/// Grayscale grids pass through unchanged. Color grids use the BT.601
/// luminance formula `0.299*R + 0.587*G + 0.114*B`, rounded to nearest.
/// The alpha channel of RGBA grids is ignored.
#[must_use = "returns the intensity image"]
pub fn to_intensity(grid: &PixelGrid) -> GrayImage {
    match grid {
        PixelGrid::Grayscale(img) => img.clone(),
        PixelGrid::Rgb(img) => GrayImage::from_fn(img.width(), img.height(), |x, y| {
            let [r, g, b] = img.get_pixel(x, y).0;
            Luma([luminance(r, g, b)])
        }),
        PixelGrid::Rgba(img) => GrayImage::from_fn(img.width(), img.height(), |x, y| {
            let [r, g, b, _] = img.get_pixel(x, y).0;
            Luma([luminance(r, g, b)])
        }),
    }
}

/// Weighted luminance of one RGB sample.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let weighted = LUMA_R * r as u32 + LUMA_G * g as u32 + LUMA_B * b as u32;
    // At most 255 << LUMA_SHIFT before rounding, so the shift fits in u8.
    ((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}
