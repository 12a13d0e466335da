//! Gaussian smoothing for noise reduction before edge detection.
//!
//! Wraps [`imageproc::filter::separable_filter_equal`] with a binomial
//! kernel (`[1, 4, 6, 4, 1] / 16` for the default 5×5 window), the discrete
//! Gaussian whose sigma is implied by the kernel size. The taps are
//! powers-of-two fractions, so every weighted sum is exact in `f32` and a
//! uniform image is reproduced exactly. Each pass truncates back to 8 bits.
//!
//! Border policy: **replicate**. Samples outside the image take the value
//! of the nearest edge sample.

use image::GrayImage;

use crate::types::AnalyzerConfig;

/// Binomial coefficients for a kernel of `size` taps (row `size - 1` of
/// Pascal's triangle). They sum to `2^(size - 1)`.
#[must_use]
pub fn binomial_kernel(size: u32) -> Vec<u64> {
    let mut row = vec![1u64];
    for _ in 1..size {
        let mut next = Vec::with_capacity(row.len() + 1);
        next.push(1);
        next.extend(row.windows(2).map(|w| w[0] + w[1]));
        next.push(1);
        row = next;
    }
    row
}

/// Normalized binomial taps: [`binomial_kernel`] divided by `2^(size - 1)`.
///
/// Exact in `f32` for every size up to
/// [`AnalyzerConfig::MAX_BLUR_KERNEL_SIZE`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn kernel_taps(size: u32) -> Vec<f32> {
    let scale = (1u64 << size.saturating_sub(1)) as f32;
    binomial_kernel(size)
        .into_iter()
        .map(|weight| weight as f32 / scale)
        .collect()
}

/// Smooth a grayscale image with a `kernel_size`×`kernel_size` binomial
/// Gaussian.
///
/// Sizes of 0 or 1 return the image unchanged. Even sizes are rounded up
/// to the next odd size so the kernel stays centered, and sizes above
/// [`AnalyzerConfig::MAX_BLUR_KERNEL_SIZE`] are capped there.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return image.clone();
    }

    let size = (kernel_size | 1).min(AnalyzerConfig::MAX_BLUR_KERNEL_SIZE);
    imageproc::filter::separable_filter_equal(image, &kernel_taps(size))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn binomial_kernel_rows() {
        assert_eq!(binomial_kernel(1), vec![1]);
        assert_eq!(binomial_kernel(3), vec![1, 2, 1]);
        assert_eq!(binomial_kernel(5), vec![1, 4, 6, 4, 1]);
        assert_eq!(binomial_kernel(15).iter().sum::<u64>(), 1 << 14);
    }

    #[test]
    fn kernel_taps_are_normalized() {
        assert_eq!(kernel_taps(5), vec![0.0625, 0.25, 0.375, 0.25, 0.0625]);
        for size in (1..=AnalyzerConfig::MAX_BLUR_KERNEL_SIZE).step_by(2) {
            let sum: f32 = kernel_taps(size).iter().sum();
            assert!((sum - 1.0).abs() < f32::EPSILON, "size {size}");
        }
    }

    #[test]
    fn kernel_size_one_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur(&img, 1), img);
        assert_eq!(gaussian_blur(&img, 0), img);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = GrayImage::new(17, 31);
        let blurred = gaussian_blur(&img, 5);
        assert_eq!(blurred.width(), 17);
        assert_eq!(blurred.height(), 31);
    }

    #[test]
    fn single_pixel_image_is_stable() {
        let img = GrayImage::from_pixel(1, 1, image::Luma([77]));
        assert_eq!(gaussian_blur(&img, 5), img);
    }

    #[test]
    fn blur_profile_across_step_edge() {
        // Kernel [1,4,6,4,1]/16 over a 0->255 step at x=5.
        let blurred = gaussian_blur(&sharp_edge_image(), 5);
        let row: Vec<u8> = (0..10).map(|x| blurred.get_pixel(x, 5).0[0]).collect();
        // 255 * {0, 1, 5, 11, 15, 16} / 16, truncated.
        assert_eq!(&row[2..8], &[0, 15, 79, 175, 239, 255]);
    }

    #[test]
    fn uniform_image_unchanged_by_blur() {
        for v in [0u8, 1, 128, 137, 254, 255] {
            let img = GrayImage::from_pixel(40, 30, image::Luma([v]));
            for size in [3, 5, 9, 15] {
                assert_eq!(gaussian_blur(&img, size), img, "value {v}, size {size}");
            }
        }
    }

    #[test]
    fn oversized_kernel_is_capped() {
        let mut img = GrayImage::new(40, 40);
        img.put_pixel(20, 20, image::Luma([255]));
        assert_eq!(
            gaussian_blur(&img, 99),
            gaussian_blur(&img, AnalyzerConfig::MAX_BLUR_KERNEL_SIZE)
        );
    }

    #[test]
    fn replicate_border_keeps_edge_rows_bright() {
        // Bright top row: with replicate padding the top row keeps more
        // energy than the row below it.
        let img = GrayImage::from_fn(8, 8, |_, y| image::Luma([if y == 0 { 255 } else { 0 }]));
        let blurred = gaussian_blur(&img, 5);
        let top = blurred.get_pixel(4, 0).0[0];
        let next = blurred.get_pixel(4, 1).0[0];
        // Top row: 255 * (1 + 4 + 6) / 16 = 175.3; next row: 255 * 5 / 16 = 79.7.
        assert_eq!((top, next), (175, 79));
    }

    #[test]
    fn blur_is_symmetric_around_center_impulse() {
        let mut img = GrayImage::new(9, 9);
        img.put_pixel(4, 4, image::Luma([255]));
        let blurred = gaussian_blur(&img, 5);
        assert_eq!(blurred.get_pixel(3, 4), blurred.get_pixel(5, 4));
        assert_eq!(blurred.get_pixel(4, 3), blurred.get_pixel(4, 5));
        assert_eq!(blurred.get_pixel(2, 2), blurred.get_pixel(6, 6));
    }
}
