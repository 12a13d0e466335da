//! Polygon approximation using the Ramer-Douglas-Peucker algorithm.
//!
//! [`simplify_chain`] reduces an open chain of points by removing points
//! that lie within a tolerance of the segment between their retained
//! neighbors. [`simplify_closed`] applies the same reduction to a closed
//! contour by first splitting it at two far-apart points, so the result
//! does not depend on where the tracer happened to start the loop.
//!
//! This is step 5b in the pipeline, inside shape analysis.

use crate::types::{Contour, Point, Polygon};

/// Rounds of farthest-point search used to pick the split pair.
const DIAMETER_ITERATIONS: usize = 3;

/// Simplify an open chain of points.
///
/// The first and last points are always kept. Points within `tolerance`
/// pixels of the line between their retained neighbors are removed. A
/// tolerance of 0.0 keeps every point that is not exactly collinear.
///
/// Chains with fewer than 3 points are returned unchanged.
#[must_use = "returns the simplified chain"]
pub fn simplify_chain(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Approximate a closed contour by a polygon.
///
/// The loop is split at an approximate diameter pair (found by repeated
/// farthest-point search from the first point). Both halves are simplified
/// as open chains with the pair as fixed endpoints, then joined back into
/// one loop. Contours with fewer than 3 points become polygons with the
/// same points.
#[must_use = "returns the approximating polygon"]
pub fn simplify_closed(contour: &Contour, tolerance: f64) -> Polygon {
    let points = contour.points();
    let n = points.len();
    if n < 3 {
        return Polygon::new(points.to_vec());
    }

    let (a, b) = diameter_pair(points);

    // Rotate so the loop starts at `a`, and close it by repeating `a`.
    let mut ring: Vec<Point> = points[a..].iter().chain(&points[..a]).copied().collect();
    ring.push(points[a]);
    let split = (b + n - a) % n;

    if split == 0 {
        // Every point coincides with `a`; treat the whole ring as one chain.
        let mut chain = simplify_chain(&ring, tolerance);
        chain.pop();
        return Polygon::new(chain);
    }

    let mut vertices = simplify_chain(&ring[..=split], tolerance);
    let second = simplify_chain(&ring[split..], tolerance);
    // Skip the shared split point and the repeated start.
    vertices.extend_from_slice(&second[1..second.len() - 1]);
    Polygon::new(vertices)
}

/// Indices of two points that are approximately farthest apart.
fn diameter_pair(points: &[Point]) -> (usize, usize) {
    let mut a = 0;
    let mut b = farthest_from(points, a);
    for _ in 1..DIAMETER_ITERATIONS {
        let c = farthest_from(points, b);
        if points[c].distance_squared(points[b]) <= points[a].distance_squared(points[b]) {
            break;
        }
        a = b;
        b = c;
    }
    (a.min(b), a.max(b))
}

/// Index of the point farthest from `points[from]`; the earliest wins ties.
fn farthest_from(points: &[Point], from: usize) -> usize {
    let origin = points[from];
    let mut best = from;
    let mut best_dist = 0;
    for (i, &p) in points.iter().enumerate() {
        let d = p.distance_squared(origin);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
#[allow(clippy::cast_precision_loss)]
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let length_sq = a.distance_squared(b);
    if length_sq == 0 {
        return p.distance(a);
    }

    let (dx, dy) = (i64::from(b.x - a.x), i64::from(b.y - a.y));
    let cross = dx * i64::from(p.y - a.y) - dy * i64::from(p.x - a.x);
    cross.abs() as f64 / (length_sq as f64).sqrt()
}
