//! Annotation rendering: draw contour outlines and shape labels onto a
//! copy of the original image.
//!
//! Outlines and labels are rasterized with `tiny-skia` onto a transparent
//! overlay the size of the image, which is then composited source-over
//! onto a clone of the original grid. Pixels the overlay does not touch
//! keep their original bytes. Grayscale grids receive the luminance of
//! the configured colors.
//!
//! Rasterization is aliased: every covered pixel gets the exact
//! configured color.
//!
//! This is step 6 in the pipeline, after shape analysis.

use image::{Luma, Rgb, Rgba};
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use crate::font;
use crate::grayscale::luminance;
use crate::types::{AnalyzerConfig, Contour, DrawInstruction, PixelGrid};

/// Render every draw instruction onto a copy of `original`.
///
/// Instructions are drawn in order, each outline before its label, so a
/// later shape paints over an earlier one where they overlap. An
/// instruction whose contour index is out of range is skipped.
///
/// The result has the same variant and dimensions as `original`.
#[must_use = "returns the annotated image"]
pub fn render(
    original: &PixelGrid,
    contours: &[Contour],
    instructions: &[DrawInstruction],
    config: &AnalyzerConfig,
) -> PixelGrid {
    let mut annotated = original.clone();
    if instructions.is_empty() {
        return annotated;
    }

    let dims = original.dimensions();
    let Some(mut overlay) = Pixmap::new(dims.width, dims.height) else {
        return annotated;
    };

    let outline_paint = solid_paint(config.outline_color);
    let label_paint = solid_paint(config.label_color);
    let stroke = Stroke {
        width: config.outline_width,
        line_cap: LineCap::Butt,
        line_join: LineJoin::Miter,
        ..Stroke::default()
    };

    for instruction in instructions {
        let Some(contour) = contours.get(instruction.contour) else {
            tracing::warn!(
                contour = instruction.contour,
                available = contours.len(),
                "draw instruction refers to a missing contour; skipping"
            );
            continue;
        };
        draw_outline(&mut overlay, contour, &outline_paint, &stroke);
        draw_label(&mut overlay, instruction, config.label_scale, &label_paint);
    }

    composite(&mut annotated, &overlay);
    annotated
}

fn solid_paint(color: [u8; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], 255);
    paint.anti_alias = false;
    paint
}

/// Stroke a contour as a closed polyline through the pixel centers.
#[allow(clippy::cast_precision_loss)]
fn draw_outline(overlay: &mut Pixmap, contour: &Contour, paint: &Paint<'_>, stroke: &Stroke) {
    let points = contour.points();
    let center = |v: i32| v as f32 + 0.5;

    let mut pb = PathBuilder::new();
    let Some(first) = points.first() else {
        return;
    };
    pb.move_to(center(first.x), center(first.y));
    for p in &points[1..] {
        pb.line_to(center(p.x), center(p.y));
    }
    pb.close();

    // A single point has no length to stroke.
    let Some(path) = pb.finish() else {
        return;
    };
    overlay.stroke_path(&path, paint, stroke, Transform::identity(), None);
}

/// Draw a label with its bottom-left corner at the instruction's anchor.
#[allow(clippy::cast_precision_loss)]
fn draw_label(overlay: &mut Pixmap, instruction: &DrawInstruction, scale: u32, paint: &Paint<'_>) {
    let cell = scale as f32;
    let left = instruction.anchor.x as f32;
    let top = instruction.anchor.y as f32 - (font::GLYPH_HEIGHT * scale) as f32;

    for (col, row) in font::lit_cells(&instruction.label) {
        let Some(rect) = Rect::from_xywh(
            left + col as f32 * cell,
            top + row as f32 * cell,
            cell,
            cell,
        ) else {
            continue;
        };
        overlay.fill_rect(rect, paint, Transform::identity(), None);
    }
}

/// Source-over blend of one channel: `src` is premultiplied by `alpha`.
#[allow(clippy::cast_possible_truncation)]
fn blend(dst: u8, src: u8, alpha: u8) -> u8 {
    let keep = u32::from(u8::MAX - alpha);
    let value = u32::from(src) + (u32::from(dst) * keep + 127) / 255;
    value.min(255) as u8
}

/// Composite the overlay onto `target`, touching only covered pixels.
fn composite(target: &mut PixelGrid, overlay: &Pixmap) {
    match target {
        PixelGrid::Grayscale(img) => {
            for (dst, src) in img.pixels_mut().zip(overlay.pixels()) {
                if src.alpha() == 0 {
                    continue;
                }
                let Luma([v]) = *dst;
                let lum = luminance(src.red(), src.green(), src.blue());
                *dst = Luma([blend(v, lum, src.alpha())]);
            }
        }
        PixelGrid::Rgb(img) => {
            for (dst, src) in img.pixels_mut().zip(overlay.pixels()) {
                if src.alpha() == 0 {
                    continue;
                }
                let Rgb([r, g, b]) = *dst;
                let a = src.alpha();
                *dst = Rgb([
                    blend(r, src.red(), a),
                    blend(g, src.green(), a),
                    blend(b, src.blue(), a),
                ]);
            }
        }
        PixelGrid::Rgba(img) => {
            for (dst, src) in img.pixels_mut().zip(overlay.pixels()) {
                if src.alpha() == 0 {
                    continue;
                }
                let Rgba([r, g, b, da]) = *dst;
                let a = src.alpha();
                *dst = Rgba([
                    blend(r, src.red(), a),
                    blend(g, src.green(), a),
                    blend(b, src.blue(), a),
                    blend(da, a, a),
                ]);
            }
        }
    }
}
