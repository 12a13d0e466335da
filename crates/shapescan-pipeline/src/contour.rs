//! Contour tracing: extract closed outer boundaries from a binary edge map.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms, the [`ContourTracerKind`] enum for selecting which
//! algorithm to use at runtime, and [`ChainApproximation`] for choosing how
//! densely each boundary is stored.
//!
//! Only topologically outermost boundaries are returned. Hole borders and
//! any boundary nested inside a hole are discarded, so a ring is reported
//! the same way as a solid disk.

use image::GrayImage;
use imageproc::contours::BorderType;
use serde::{Deserialize, Serialize};

use crate::types::{Contour, Point};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    ///
    /// Scans in raster order, so contours come out ordered by their
    /// topmost-then-leftmost pixel.
    #[default]
    BorderFollowing,
}

/// How many points of each traced boundary are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChainApproximation {
    /// Every boundary pixel.
    None,
    /// Only the points where the chain changes direction. Straight
    /// horizontal, vertical and diagonal runs collapse to their endpoints,
    /// which leaves area and perimeter unchanged.
    #[default]
    Simple,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary edge map (white pixels = edges, black = background).
/// Output: the outermost closed boundaries in discovery order.
pub trait ContourTracer {
    /// Trace contours in the given binary edge map.
    fn trace(&self, edges: &GrayImage) -> Vec<Contour>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, edges: &GrayImage) -> Vec<Contour> {
        match *self {
            Self::BorderFollowing => trace_border_following(edges),
        }
    }
}

/// Trace the outermost contours and apply the chain approximation.
///
/// This is step 4 in the pipeline, between edge detection and shape
/// analysis.
#[must_use = "returns the traced contours"]
pub fn trace_contours(
    edges: &GrayImage,
    tracer: &impl ContourTracer,
    chain: ChainApproximation,
) -> Vec<Contour> {
    let contours = tracer.trace(edges);
    match chain {
        ChainApproximation::None => contours,
        ChainApproximation::Simple => contours.iter().map(compress_runs).collect(),
    }
}

/// Suzuki-Abe border following, keeping outer borders without a parent.
fn trace_border_following(edges: &GrayImage) -> Vec<Contour> {
    let contours: Vec<imageproc::contours::Contour<i32>> =
        imageproc::contours::find_contours(edges);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| !c.points.is_empty())
        .map(|c| {
            let points = c.points.into_iter().map(|p| Point::new(p.x, p.y)).collect();
            Contour::new(points)
        })
        .collect()
}

/// Drop every point that continues a straight run.
///
/// A point is kept when the step arriving at it differs from the step
/// leaving it (the loop wraps around). Repeated consecutive points are
/// removed first. Contours with fewer than three distinct points are
/// returned as they are.
#[must_use = "returns the compressed contour"]
pub fn compress_runs(contour: &Contour) -> Contour {
    let mut points: Vec<Point> = contour.points().to_vec();
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    let n = points.len();
    if n < 3 {
        return Contour::new(points);
    }

    let step = |a: Point, b: Point| (b.x - a.x, b.y - a.y);
    let kept: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if kept.is_empty() {
        Contour::new(points)
    } else {
        Contour::new(kept)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fill(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, image::Luma([value]));
            }
        }
    }

    #[test]
    fn default_is_border_following() {
        assert_eq!(
            ContourTracerKind::default(),
            ContourTracerKind::BorderFollowing
        );
        assert_eq!(ChainApproximation::default(), ChainApproximation::Simple);
    }

    #[test]
    fn empty_image_produces_no_contours() {
        let img = GrayImage::new(10, 10);
        let result = ContourTracerKind::BorderFollowing.trace(&img);
        assert!(result.is_empty());
    }

    #[test]
    fn single_pixel_gives_single_point_contour() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(5, 5, image::Luma([255]));
        let result = ContourTracerKind::BorderFollowing.trace(&img);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].points()[0], Point::new(5, 5));
    }

    #[test]
    fn filled_rectangle_produces_one_outer_contour() {
        let mut img = GrayImage::new(20, 20);
        fill(&mut img, 5, 5, 15, 15, 255);
        let result = ContourTracerKind::BorderFollowing.trace(&img);
        assert_eq!(result.len(), 1);
        let bbox = result[0].bounding_box().unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (5, 5, 10, 10));
        // Every boundary pixel of a 10x10 square: 4 * 9.
        assert_eq!(result[0].len(), 36);
    }

    #[test]
    fn hole_and_nested_contours_are_discarded() {
        let mut img = GrayImage::new(30, 30);
        fill(&mut img, 5, 5, 25, 25, 255);
        fill(&mut img, 10, 10, 20, 20, 0);
        // Island inside the hole.
        fill(&mut img, 13, 13, 17, 17, 255);
        let result = ContourTracerKind::BorderFollowing.trace(&img);
        assert_eq!(result.len(), 1);
        let bbox = result[0].bounding_box().unwrap();
        assert_eq!((bbox.x, bbox.y), (5, 5));
    }

    #[test]
    fn contours_come_out_in_raster_order() {
        let mut img = GrayImage::new(40, 40);
        // Lower-left square is found after the upper-right one.
        fill(&mut img, 2, 20, 10, 30, 255);
        fill(&mut img, 25, 3, 35, 12, 255);
        // Same top row as the upper-right square but further left.
        fill(&mut img, 14, 3, 20, 8, 255);
        let result = ContourTracerKind::BorderFollowing.trace(&img);
        let tops: Vec<(i32, i32)> = result
            .iter()
            .filter_map(Contour::bounding_box)
            .map(|b| (b.x, b.y))
            .collect();
        assert_eq!(tops, vec![(14, 3), (25, 3), (2, 20)]);
    }

    #[test]
    fn compress_runs_keeps_rectangle_corners() {
        let mut img = GrayImage::new(20, 20);
        fill(&mut img, 5, 5, 15, 15, 255);
        let contours = trace_contours(
            &img,
            &ContourTracerKind::BorderFollowing,
            ChainApproximation::Simple,
        );
        assert_eq!(contours.len(), 1);
        let mut corners = contours[0].points().to_vec();
        corners.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            corners,
            vec![
                Point::new(5, 5),
                Point::new(14, 5),
                Point::new(5, 14),
                Point::new(14, 14),
            ]
        );
    }

    #[test]
    fn compress_runs_keeps_diagonal_turns() {
        // Diamond: four diagonal runs.
        let contour = Contour::new(vec![
            Point::new(2, 0),
            Point::new(3, 1),
            Point::new(4, 2),
            Point::new(3, 3),
            Point::new(2, 4),
            Point::new(1, 3),
            Point::new(0, 2),
            Point::new(1, 1),
        ]);
        let compressed = compress_runs(&contour);
        assert_eq!(
            compressed.points(),
            &[
                Point::new(2, 0),
                Point::new(4, 2),
                Point::new(2, 4),
                Point::new(0, 2),
            ]
        );
    }

    #[test]
    fn compress_runs_removes_duplicates_and_closing_point() {
        let contour = Contour::new(vec![
            Point::new(0, 0),
            Point::new(0, 0),
            Point::new(4, 0),
            Point::new(4, 4),
            Point::new(0, 4),
            Point::new(0, 0),
        ]);
        assert_eq!(compress_runs(&contour).len(), 4);
    }

    #[test]
    fn compress_runs_leaves_short_contours() {
        let contour = Contour::new(vec![Point::new(1, 1), Point::new(2, 2)]);
        assert_eq!(compress_runs(&contour), contour);
    }

    #[test]
    fn full_chain_keeps_every_point() {
        let mut img = GrayImage::new(20, 20);
        fill(&mut img, 5, 5, 15, 15, 255);
        let contours = trace_contours(
            &img,
            &ContourTracerKind::BorderFollowing,
            ChainApproximation::None,
        );
        assert_eq!(contours[0].len(), 36);
    }
}
