//! Shape analysis: measure, filter, approximate and classify contours.
//!
//! For each traced contour, in discovery order, the analyzer computes the
//! enclosed area and drops the contour if it does not exceed
//! [`AnalyzerConfig::min_area`]. Accepted contours get a perimeter, a
//! polygon approximation with tolerance `approx_factor * perimeter`, a
//! class from the polygon's vertex count, and a bounding box. Each
//! accepted contour yields one [`ShapeRecord`] and one
//! [`DrawInstruction`]; rejected contours yield nothing.
//!
//! This is step 5 in the pipeline, between contour tracing and rendering.

use crate::simplify::simplify_closed;
use crate::types::{
    Analysis, AnalyzerConfig, BoundingBox, Contour, DrawInstruction, Point, ShapeClass,
    ShapeRecord,
};

/// Area enclosed by a closed contour (absolute shoelace formula).
///
/// Exact: the doubled signed area is accumulated in integers.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn contour_area(contour: &Contour) -> f64 {
    let points = contour.points();
    if points.len() < 3 {
        return 0.0;
    }
    let doubled: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    doubled.abs() as f64 / 2.0
}

/// Length of a contour treated as a closed loop (last point connects back
/// to the first).
#[must_use]
pub fn contour_perimeter(contour: &Contour) -> f64 {
    let points = contour.points();
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(&a, &b)| a.distance(b))
        .sum()
}

/// Round to two decimal places for reporting.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Measure and classify every contour that encloses more than
/// `config.min_area`.
///
/// Records are numbered from 1 in acceptance order; the draw instruction
/// at position `i` belongs to the record at position `i`. Never fails:
/// contours whose approximation degenerates are reported as
/// [`ShapeClass::Unknown`].
#[must_use = "returns the shape records and draw instructions"]
pub fn analyze_contours(contours: &[Contour], config: &AnalyzerConfig) -> Analysis {
    let mut analysis = Analysis::default();

    for (contour_index, contour) in contours.iter().enumerate() {
        let area = contour_area(contour);
        if area <= config.min_area {
            continue;
        }
        let Some(bounding_box) = contour.bounding_box() else {
            continue;
        };

        let perimeter = contour_perimeter(contour);
        let polygon = simplify_closed(contour, config.approx_factor * perimeter);
        let shape = ShapeClass::from_vertex_count(polygon.vertex_count());
        let index = analysis.records.len() + 1;

        tracing::debug!(
            index,
            contour = contour_index,
            %shape,
            area,
            perimeter,
            vertices = polygon.vertex_count(),
            "accepted contour"
        );

        analysis.records.push(ShapeRecord {
            index,
            shape,
            area: round2(area),
            perimeter: round2(perimeter),
            bounding_box,
        });
        analysis.instructions.push(DrawInstruction {
            contour: contour_index,
            label: shape.label().to_string(),
            anchor: label_anchor(bounding_box, config.label_offset),
        });
    }

    tracing::debug!(
        contours = contours.len(),
        accepted = analysis.records.len(),
        "shape analysis complete"
    );
    analysis
}

/// Bottom-left corner of a label placed `offset` pixels above a box.
const fn label_anchor(bbox: BoundingBox, offset: i32) -> Point {
    Point::new(bbox.x, bbox.y.saturating_sub(offset))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn contour(coords: &[(i32, i32)]) -> Contour {
        Contour::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    /// Axis-aligned rectangle with corners at (x, y) and (x + w, y + h).
    fn rect(x: i32, y: i32, w: i32, h: i32) -> Contour {
        contour(&[(x, y), (x + w, y), (x + w, y + h), (x, y + h)])
    }

    #[test]
    fn shoelace_area_of_rectangle() {
        assert!((contour_area(&rect(0, 0, 10, 5)) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn area_ignores_winding_direction() {
        let cw = contour(&[(0, 0), (0, 4), (3, 0)]);
        let ccw = contour(&[(0, 0), (3, 0), (0, 4)]);
        assert!((contour_area(&cw) - 6.0).abs() < f64::EPSILON);
        assert!((contour_area(&ccw) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_contours_have_zero_area() {
        assert!(contour_area(&contour(&[])).abs() < f64::EPSILON);
        assert!(contour_area(&contour(&[(1, 1), (5, 5)])).abs() < f64::EPSILON);
    }

    #[test]
    fn perimeter_closes_the_loop() {
        assert!((contour_perimeter(&rect(0, 0, 10, 5)) - 30.0).abs() < 1e-9);
        let triangle = contour(&[(0, 0), (3, 0), (0, 4)]);
        assert!((contour_perimeter(&triangle) - 12.0).abs() < 1e-9);
        assert!(contour_perimeter(&contour(&[(2, 2)])).abs() < f64::EPSILON);
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert!((round2(1.234) - 1.23).abs() < 1e-12);
        assert!((round2(1.235_000_1) - 1.24).abs() < 1e-12);
        assert!((round2(6000.0) - 6000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn area_at_threshold_is_excluded() {
        let config = AnalyzerConfig::default();
        let at = rect(0, 0, 500, 1);
        let above = rect(0, 10, 501, 1);
        let analysis = analyze_contours(&[at, above], &config);
        assert_eq!(analysis.records.len(), 1);
        assert!((analysis.records[0].area - 501.0).abs() < f64::EPSILON);
        assert_eq!(analysis.instructions[0].contour, 1);
    }

    #[test]
    fn indices_are_contiguous_after_rejections() {
        let config = AnalyzerConfig::default();
        let contours = vec![
            rect(0, 0, 5, 5),
            rect(0, 0, 100, 60),
            rect(200, 0, 10, 10),
            rect(0, 100, 50, 50),
        ];
        let analysis = analyze_contours(&contours, &config);
        let indices: Vec<usize> = analysis.records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
        let sources: Vec<usize> = analysis.instructions.iter().map(|d| d.contour).collect();
        assert_eq!(sources, vec![1, 3]);
    }

    #[test]
    fn rectangle_record_fields() {
        let analysis = analyze_contours(&[rect(10, 20, 100, 60)], &AnalyzerConfig::default());
        let record = &analysis.records[0];
        assert_eq!(record.index, 1);
        assert_eq!(record.shape, ShapeClass::Rectangle);
        assert!((record.area - 6000.0).abs() < f64::EPSILON);
        assert!((record.perimeter - 320.0).abs() < f64::EPSILON);
        assert_eq!(
            record.bounding_box,
            BoundingBox {
                x: 10,
                y: 20,
                width: 101,
                height: 61,
            }
        );
    }

    #[test]
    fn draw_instruction_anchors_label_above_box() {
        let analysis = analyze_contours(&[rect(10, 20, 100, 60)], &AnalyzerConfig::default());
        let instruction = &analysis.instructions[0];
        assert_eq!(instruction.label, "Rectangle");
        assert_eq!(instruction.anchor, Point::new(10, 15));
        assert_eq!(instruction.contour, 0);
    }

    #[test]
    fn triangle_is_classified() {
        let triangle = contour(&[(50, 0), (100, 87), (0, 87)]);
        let analysis = analyze_contours(&[triangle], &AnalyzerConfig::default());
        assert_eq!(analysis.records[0].shape, ShapeClass::Triangle);
    }

    #[test]
    fn many_sided_polygon_is_circle() {
        // Regular octagon approximating a circle of radius ~100.
        let octagon = contour(&[
            (141, 41),
            (200, 100),
            (200, 183),
            (141, 241),
            (59, 241),
            (0, 183),
            (0, 100),
            (59, 41),
        ]);
        let analysis = analyze_contours(&[octagon], &AnalyzerConfig::default());
        assert_eq!(analysis.records[0].shape, ShapeClass::Circle);
    }

    #[test]
    fn thin_sliver_is_unknown() {
        // Area 501 but collapses to a line segment under 4% tolerance.
        let analysis = analyze_contours(&[rect(0, 0, 501, 1)], &AnalyzerConfig::default());
        assert_eq!(analysis.records[0].shape, ShapeClass::Unknown);
        assert_eq!(analysis.instructions[0].label, "Unknown");
    }

    #[test]
    fn min_area_is_configurable() {
        let config = AnalyzerConfig {
            min_area: 10.0,
            ..AnalyzerConfig::default()
        };
        let analysis = analyze_contours(&[rect(0, 0, 5, 5)], &config);
        assert_eq!(analysis.records.len(), 1);
    }

    #[test]
    fn no_contours_gives_empty_analysis() {
        let analysis = analyze_contours(&[], &AnalyzerConfig::default());
        assert!(analysis.records.is_empty());
        assert!(analysis.instructions.is_empty());
    }

    #[test]
    fn label_anchor_saturates() {
        let bbox = BoundingBox {
            x: 0,
            y: i32::MIN + 2,
            width: 1,
            height: 1,
        };
        assert_eq!(label_anchor(bbox, 5).y, i32::MIN);
    }
}
