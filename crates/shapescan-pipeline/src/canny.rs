//! Canny edge detection core: Sobel gradients, non-maximum suppression
//! and hysteresis thresholding.
//!
//! Follows the structure of `imageproc::edges::canny` with three
//! differences:
//!
//! 1. **No internal blur.** Smoothing is its own pipeline stage
//!    ([`crate::blur`]) so the detector sees exactly the smoothed image.
//!
//! 2. **One-pixel plateaus.** A step edge produces two pixels of equal
//!    gradient magnitude. Non-maximum suppression keeps a pixel only if it
//!    is strictly greater than its preceding neighbor along the gradient
//!    and not less than its following neighbor, so exactly one of the pair
//!    survives and traced boundaries land on the same side of every edge.
//!
//! 3. **Bounded 8-neighbor hysteresis.** The flood fill visits all eight
//!    neighbors and skips coordinates outside the image instead of
//!    wrapping (see <https://github.com/image-rs/imageproc/issues/705>).

use std::f32::consts::PI;

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Pixel value written for edge pixels.
const EDGE: Luma<u8> = Luma([255]);

/// 8-connected neighbor offsets.
const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Run Canny edge detection on an already-smoothed image.
///
/// Returns a binary image: 255 for edge pixels, 0 elsewhere. Callers are
/// expected to pass `low_threshold <= high_threshold`; see
/// [`crate::edge::canny`] for the clamping wrapper.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    debug_assert!(high_threshold >= low_threshold);
    let (w, h) = image.dimensions();

    // 1. Gradients (replicate border).
    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let magnitude: Image<Luma<f32>> = Image::from_fn(w, h, |x, y| {
        let dx = f32::from(gx.get_pixel(x, y).0[0]);
        let dy = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([dx.hypot(dy)])
    });

    // 2. Thin ridges to one pixel.
    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);

    // 3. Keep strong edges and the weak edges connected to them.
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// Gradient direction quantized to the four neighbor axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Direction {
    /// Quantize a gradient vector.
    fn from_gradient(dx: f32, dy: f32) -> Self {
        let mut angle = dy.atan2(dx) * (180.0 / PI);
        if angle < 0.0 {
            angle += 180.0;
        }
        if (22.5..67.5).contains(&angle) {
            Self::Diagonal
        } else if (67.5..112.5).contains(&angle) {
            Self::Vertical
        } else if (112.5..157.5).contains(&angle) {
            Self::AntiDiagonal
        } else {
            Self::Horizontal
        }
    }

    /// Offsets of the (preceding, following) neighbors along the gradient,
    /// preceding meaning earlier in raster order.
    const fn neighbors(self) -> ((i32, i32), (i32, i32)) {
        match self {
            Self::Horizontal => ((-1, 0), (1, 0)),
            Self::Diagonal => ((-1, -1), (1, 1)),
            Self::Vertical => ((0, -1), (0, 1)),
            Self::AntiDiagonal => ((1, -1), (-1, 1)),
        }
    }
}

/// Suppress every pixel that is not a local maximum along its gradient.
///
/// Border pixels are always suppressed.
fn non_maximum_suppression(
    g: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    let (w, h) = g.dimensions();
    let mut out = Image::from_pixel(w, h, Luma([0.0f32]));
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let direction = Direction::from_gradient(
                f32::from(gx.get_pixel(x, y).0[0]),
                f32::from(gy.get_pixel(x, y).0[0]),
            );
            let ((px, py), (nx, ny)) = direction.neighbors();
            // Interior pixel: every offset stays in bounds.
            let prev = g.get_pixel(x.wrapping_add_signed(px), y.wrapping_add_signed(py)).0[0];
            let next = g.get_pixel(x.wrapping_add_signed(nx), y.wrapping_add_signed(ny)).0[0];
            let m = g.get_pixel(x, y).0[0];
            if m > prev && m >= next {
                out.put_pixel(x, y, Luma([m]));
            }
        }
    }
    out
}

/// Double-threshold hysteresis with an explicit stack (no recursion).
///
/// Pixels strictly above `high_thresh` seed a flood fill that claims every
/// 8-connected pixel at or above `low_thresh`.
fn hysteresis(input: &Image<Luma<f32>>, low_thresh: f32, high_thresh: f32) -> GrayImage {
    let (w, h) = input.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if input.get_pixel(x, y).0[0] <= high_thresh || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, EDGE);
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBORS {
                    let (Some(nx), Some(ny)) = (cx.checked_add_signed(dx), cy.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if nx >= w || ny >= h {
                        continue;
                    }
                    if input.get_pixel(nx, ny).0[0] >= low_thresh && out.get_pixel(nx, ny).0[0] == 0 {
                        out.put_pixel(nx, ny, EDGE);
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_count(edges: &GrayImage) -> u32 {
        edges.pixels().map(|p| u32::from(p.0[0] > 0)).sum()
    }

    /// Regression test for imageproc#705: hysteresis must not wrap when
    /// the flood fill reaches the image border.
    #[test]
    fn border_edge_does_not_panic() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x == 1 { Luma([255]) } else { Luma([0]) });
        let edges = canny(&img, 1.0, 2.0);
        assert_eq!(edges.dimensions(), (10, 10));
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = GrayImage::new(17, 31);
        let edges = canny(&img, 50.0, 150.0);
        assert_eq!(edges.width(), 17);
        assert_eq!(edges.height(), 31);
    }

    #[test]
    fn tiny_images_produce_no_edges() {
        for (w, h) in [(1, 1), (2, 5), (5, 2)] {
            let img = GrayImage::from_fn(w, h, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
            assert_eq!(edge_count(&canny(&img, 50.0, 150.0)), 0);
        }
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        assert_eq!(edge_count(&canny(&img, 50.0, 150.0)), 0);
    }

    #[test]
    fn step_edge_thins_to_single_column() {
        // Smoothed step: the gradient plateau spans x=9 and x=10; only
        // the left pixel (outside the bright region) survives.
        let step = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([0]) } else { Luma([255]) });
        let img = crate::blur::gaussian_blur(&step, 5);
        let edges = canny(&img, 50.0, 150.0);
        for y in 1..19 {
            let cols: Vec<u32> = (0..20).filter(|&x| edges.get_pixel(x, y).0[0] == 255).collect();
            assert_eq!(cols, vec![9], "row {y}");
        }
    }

    #[test]
    fn falling_step_keeps_last_bright_column() {
        let step = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([255]) } else { Luma([0]) });
        let img = crate::blur::gaussian_blur(&step, 5);
        let edges = canny(&img, 50.0, 150.0);
        let cols: Vec<u32> = (0..20).filter(|&x| edges.get_pixel(x, 10).0[0] == 255).collect();
        assert_eq!(cols, vec![9]);
    }

    #[test]
    fn direction_quantization() {
        assert_eq!(Direction::from_gradient(1.0, 0.0), Direction::Horizontal);
        assert_eq!(Direction::from_gradient(-1.0, 0.0), Direction::Horizontal);
        assert_eq!(Direction::from_gradient(1.0, 1.0), Direction::Diagonal);
        assert_eq!(Direction::from_gradient(0.0, 1.0), Direction::Vertical);
        assert_eq!(Direction::from_gradient(0.0, -1.0), Direction::Vertical);
        assert_eq!(Direction::from_gradient(-1.0, 1.0), Direction::AntiDiagonal);
    }

    #[test]
    fn weak_pixels_need_a_strong_neighbor() {
        // A 1-pixel ridge: strong at one end, weak elsewhere.
        let mut g = Image::from_pixel(7, 5, Luma([0.0f32]));
        for x in 1..6 {
            g.put_pixel(x, 2, Luma([80.0]));
        }
        g.put_pixel(1, 2, Luma([200.0]));
        // An isolated weak pixel elsewhere.
        g.put_pixel(3, 0, Luma([80.0]));
        let out = hysteresis(&g, 50.0, 150.0);
        for x in 1..6 {
            assert_eq!(out.get_pixel(x, 2).0[0], 255, "x={x}");
        }
        assert_eq!(out.get_pixel(3, 0).0[0], 0);
    }

    /// Vertical step whose Sobel response is exactly 150 on both sides.
    ///
    /// The step height alternates 37/38 by row, so `gx = 37 + 2 * 38 + 37`
    /// or `38 + 2 * 37 + 38` and `gy = 0` in every interior row.
    fn step_of_magnitude_150() -> GrayImage {
        GrayImage::from_fn(12, 12, |x, y| {
            let rise = if y % 2 == 0 { 37 } else { 38 };
            Luma([if x < 6 { 100 } else { 100 + rise }])
        })
    }

    #[test]
    fn magnitude_equal_to_high_is_not_strong() {
        let img = step_of_magnitude_150();
        assert_eq!(edge_count(&canny(&img, 50.0, 150.0)), 0);
        // Just below the ridge, every interior row keeps its left pixel.
        let edges = canny(&img, 50.0, 149.0);
        assert_eq!(edge_count(&edges), 10);
        for y in 1..11 {
            assert_eq!(edges.get_pixel(5, y).0[0], 255, "row {y}");
        }
    }

    #[test]
    fn weak_ridge_without_strong_pixel_is_dropped() {
        // The whole ridge sits between the thresholds and nothing seeds it.
        let img = step_of_magnitude_150();
        assert_eq!(edge_count(&canny(&img, 100.0, 200.0)), 0);
    }

    #[test]
    fn hysteresis_threshold_boundaries() {
        let mut g = Image::from_pixel(7, 3, Luma([0.0f32]));
        g.put_pixel(1, 1, Luma([150.0]));
        g.put_pixel(4, 1, Luma([150.5]));
        g.put_pixel(5, 1, Luma([50.0]));
        g.put_pixel(3, 1, Luma([49.9]));
        let out = hysteresis(&g, 50.0, 150.0);
        // Exactly high: not a seed, and no strong neighbor.
        assert_eq!(out.get_pixel(1, 1).0[0], 0);
        // Above high: strong.
        assert_eq!(out.get_pixel(4, 1).0[0], 255);
        // Exactly low and connected: kept.
        assert_eq!(out.get_pixel(5, 1).0[0], 255);
        // Below low, even next to a strong pixel: suppressed.
        assert_eq!(out.get_pixel(3, 1).0[0], 0);
    }

    #[test]
    fn below_low_threshold_is_suppressed() {
        let mut g = Image::from_pixel(5, 5, Luma([0.0f32]));
        g.put_pixel(2, 2, Luma([200.0]));
        g.put_pixel(3, 2, Luma([49.0]));
        let out = hysteresis(&g, 50.0, 150.0);
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
        assert_eq!(out.get_pixel(3, 2).0[0], 0);
    }
}
