//! Paints annotations onto a `tiny_skia` surface.
//!
//! The same code serves the interactive overlay and the full-resolution
//! export; callers pick the `scale` from canvas units to device pixels.

use image::RgbaImage;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, Path, PathBuilder, Pattern,
    Pixmap, PixmapPaint, SpreadMode, Stroke, StrokeDash, Transform,
};

use crate::annotation::{
    Annotation, AnnotationId, Arrow, Freehand, Mosaic, Rectangle, Rgba, Shape, TextLabel,
};
use crate::fonts::FontBook;
use crate::geometry::{Rect, Size};
use crate::pixelate::MosaicSource;

const RECT_CORNER_RADIUS: f32 = 2.0;
const SELECTION_COLOR: Rgba = [77, 141, 255, 255];
const SELECTION_INSET: f32 = 4.0;
const SELECTION_RADIUS: f32 = 4.0;
const SELECTION_STROKE: f32 = 1.5;
const SELECTION_DASH: [f32; 2] = [6.0, 3.0];
/// Mosaic regions this thin or thinner are not drawn.
const MIN_MOSAIC_EXTENT: f32 = 1.0;

pub struct DrawRequest<'a> {
    pub annotations: &'a [Annotation],
    pub live: Option<&'a Annotation>,
    /// Size of the canvas in canvas units; the mosaic source is stretched
    /// over it.
    pub surface_size: Size,
    pub mosaic: Option<&'a MosaicSource>,
    pub selected: Option<AnnotationId>,
}

#[derive(Clone, Default)]
pub struct Renderer {
    fonts: FontBook,
}

impl Renderer {
    pub fn new(fonts: FontBook) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Paints `request` onto `pixmap`. Canvas coordinates are multiplied by
    /// `scale` to reach device pixels, stroke widths and font sizes included.
    pub fn draw(&self, pixmap: &mut Pixmap, request: &DrawRequest<'_>, scale: f32) {
        let transform = Transform::from_scale(scale, scale);

        for annotation in request.annotations.iter().chain(request.live) {
            self.draw_annotation(pixmap, annotation, request, transform, scale);
        }

        let selected = request
            .selected
            .and_then(|id| request.annotations.iter().find(|item| item.id == id));
        if let Some(annotation) = selected {
            let bounds = annotation
                .bounding_rect(&self.fonts)
                .expand(SELECTION_INSET);
            draw_selection(pixmap, bounds, transform);
        }
    }

    fn draw_annotation(
        &self,
        pixmap: &mut Pixmap,
        annotation: &Annotation,
        request: &DrawRequest<'_>,
        transform: Transform,
        scale: f32,
    ) {
        match &annotation.shape {
            Shape::Arrow(arrow) => draw_arrow(pixmap, arrow, transform),
            Shape::Rectangle(rect) => draw_rectangle(pixmap, rect, transform),
            Shape::Text(label) => self.draw_text(pixmap, label, scale),
            Shape::Freehand(stroke) => draw_freehand(pixmap, stroke, transform),
            Shape::Mosaic(mosaic) => {
                if let Some(source) = request.mosaic {
                    draw_mosaic(pixmap, mosaic, source, request.surface_size, transform);
                }
            }
        }
    }

    fn draw_text(&self, pixmap: &mut Pixmap, label: &TextLabel, scale: f32) {
        let Some(layer) = self
            .fonts
            .rasterize(&label.text, label.font_size * scale, label.color)
        else {
            return;
        };
        let Some(layer) = pixmap_from_rgba(&layer) else {
            return;
        };
        pixmap.draw_pixmap(
            (label.position.x * scale).round() as i32,
            (label.position.y * scale).round() as i32,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

fn solid_paint(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

fn draw_arrow(pixmap: &mut Pixmap, arrow: &Arrow, transform: Transform) {
    let outline = arrow.outline();
    let Some((first, rest)) = outline.split_first() else {
        return;
    };
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for point in rest {
        pb.line_to(point.x, point.y);
    }
    pb.close();
    let Some(path) = pb.finish() else {
        return;
    };
    pixmap.fill_path(
        &path,
        &solid_paint(arrow.color),
        FillRule::Winding,
        transform,
        None,
    );
}

fn draw_rectangle(pixmap: &mut Pixmap, rect: &Rectangle, transform: Transform) {
    let bounds = Rect::from_origin_size(rect.origin, rect.size);
    let Some(path) = rounded_rect_path(bounds, RECT_CORNER_RADIUS) else {
        return;
    };
    let stroke = Stroke {
        width: rect.line_width,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &solid_paint(rect.color), &stroke, transform, None);
}

fn draw_freehand(pixmap: &mut Pixmap, freehand: &Freehand, transform: Transform) {
    if !freehand.is_drawable() {
        return;
    }
    let mut pb = PathBuilder::new();
    let (first, rest) = (freehand.points[0], &freehand.points[1..]);
    pb.move_to(first.x, first.y);
    for point in rest {
        pb.line_to(point.x, point.y);
    }
    let Some(path) = pb.finish() else {
        return;
    };
    let stroke = Stroke {
        width: freehand.line_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(
        &path,
        &solid_paint(freehand.color),
        &stroke,
        transform,
        None,
    );
}

/// Reveals the pixelated copy inside the mosaic rect. The copy is stretched
/// over the whole canvas so its pixels line up with the base image.
fn draw_mosaic(
    pixmap: &mut Pixmap,
    mosaic: &Mosaic,
    source: &MosaicSource,
    surface_size: Size,
    transform: Transform,
) {
    let bounds = Rect::from_origin_size(mosaic.origin, mosaic.size);
    if bounds.width() <= MIN_MOSAIC_EXTENT || bounds.height() <= MIN_MOSAIC_EXTENT {
        return;
    }
    let Some(rect) =
        tiny_skia::Rect::from_ltrb(bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y)
    else {
        return;
    };

    let src = source.pixmap();
    let stretch = Transform::from_scale(
        surface_size.width / src.width() as f32,
        surface_size.height / src.height() as f32,
    );
    let paint = Paint {
        shader: Pattern::new(
            src.as_ref(),
            SpreadMode::Pad,
            FilterQuality::Nearest,
            1.0,
            stretch,
        ),
        anti_alias: false,
        ..Default::default()
    };
    pixmap.fill_rect(rect, &paint, transform, None);
}

fn draw_selection(pixmap: &mut Pixmap, bounds: Rect, transform: Transform) {
    let Some(path) = rounded_rect_path(bounds, SELECTION_RADIUS) else {
        return;
    };
    let stroke = Stroke {
        width: SELECTION_STROKE,
        dash: StrokeDash::new(SELECTION_DASH.to_vec(), 0.0),
        ..Default::default()
    };
    pixmap.stroke_path(
        &path,
        &solid_paint(SELECTION_COLOR),
        &stroke,
        transform,
        None,
    );
}

/// Rect outline with circular corners approximated by cubics. The radius
/// is capped at half the shorter side.
fn rounded_rect_path(rect: Rect, radius: f32) -> Option<Path> {
    let r = radius
        .min(rect.width() / 2.0)
        .min(rect.height() / 2.0)
        .max(0.0);
    // distance from a corner to its cubic control points
    let k = r * (1.0 - 0.552_284_8);
    let (left, top, right, bottom) = (rect.min.x, rect.min.y, rect.max.x, rect.max.y);

    let mut pb = PathBuilder::new();
    pb.move_to(left + r, top);
    pb.line_to(right - r, top);
    pb.cubic_to(right - k, top, right, top + k, right, top + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - k, right - k, bottom, right - r, bottom);
    pb.line_to(left + r, bottom);
    pb.cubic_to(left + k, bottom, left, bottom - k, left, bottom - r);
    pb.line_to(left, top + r);
    pb.cubic_to(left, top + k, left + k, top, left + r, top);
    pb.close();
    pb.finish()
}

pub fn pixmap_from_rgba(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Source-over blend of a premultiplied `overlay` onto a straight-alpha
/// image of the same size. Pixels the overlay leaves transparent are not
/// touched.
pub fn composite_over(base: &mut RgbaImage, overlay: &Pixmap) {
    for (dst, src) in base.pixels_mut().zip(overlay.pixels()) {
        let alpha = src.alpha();
        if alpha == 0 {
            continue;
        }
        if alpha == u8::MAX {
            let color = src.demultiply();
            dst.0 = [color.red(), color.green(), color.blue(), color.alpha()];
            continue;
        }

        let src_alpha = alpha as f32 / 255.0;
        let [r, g, b, a] = dst.0;
        let dst_weight = a as f32 / 255.0 * (1.0 - src_alpha);
        let out_alpha = src_alpha + dst_weight;
        let blend = |premultiplied: u8, straight: u8| {
            let value =
                (premultiplied as f32 / 255.0 + straight as f32 / 255.0 * dst_weight) / out_alpha;
            (value * 255.0).round().clamp(0.0, 255.0) as u8
        };
        dst.0 = [
            blend(src.red(), r),
            blend(src.green(), g),
            blend(src.blue(), b),
            (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::tests::{arrow, freehand, rectangle};
    use crate::geometry::Point;

    fn blank(width: u32, height: u32) -> Pixmap {
        Pixmap::new(width, height).expect("pixmap")
    }

    fn alpha_at(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap
            .pixel(x, y)
            .map(|pixel| pixel.alpha())
            .unwrap_or_default()
    }

    fn paint_one(shape: Shape, scale: f32) -> Pixmap {
        let size = 100.0;
        let mut pixmap = blank((size * scale) as u32, (size * scale) as u32);
        let annotations = vec![Annotation::new(1, shape)];
        let request = DrawRequest {
            annotations: &annotations,
            live: None,
            surface_size: Size::new(size, size),
            mosaic: None,
            selected: None,
        };
        Renderer::new(FontBook::estimated()).draw(&mut pixmap, &request, scale);
        pixmap
    }

    fn painted_pixels(pixmap: &Pixmap) -> usize {
        pixmap.pixels().iter().filter(|px| px.alpha() > 0).count()
    }

    #[test]
    fn arrow_is_filled_and_tapered() {
        let pixmap = paint_one(arrow(Point::new(5.0, 50.0), Point::new(95.0, 50.0), 3.0), 1.0);
        // head body
        assert_eq!(alpha_at(&pixmap, 85, 50), 255);
        assert!(alpha_at(&pixmap, 85, 44) > 0);
        // thin tail
        assert_eq!(alpha_at(&pixmap, 10, 45), 0);
        // past the tip
        assert_eq!(alpha_at(&pixmap, 98, 50), 0);
    }

    #[test]
    fn degenerate_shapes_paint_nothing() {
        let dot = paint_one(arrow(Point::new(10.0, 10.0), Point::new(10.5, 10.0), 3.0), 1.0);
        assert_eq!(painted_pixels(&dot), 0);

        let single = paint_one(freehand(&[Point::new(20.0, 20.0)], 6.0), 1.0);
        assert_eq!(painted_pixels(&single), 0);
    }

    #[test]
    fn rectangle_strokes_only_the_border() {
        let pixmap = paint_one(
            rectangle(Point::new(80.0, 80.0), Size::new(-60.0, -60.0), 4.0),
            1.0,
        );
        assert!(alpha_at(&pixmap, 50, 20) > 0);
        assert!(alpha_at(&pixmap, 20, 50) > 0);
        assert_eq!(alpha_at(&pixmap, 50, 50), 0);
    }

    #[test]
    fn scale_multiplies_geometry_and_stroke() {
        let shape = || rectangle(Point::new(20.0, 20.0), Size::new(60.0, 60.0), 2.0);
        let base = painted_pixels(&paint_one(shape(), 1.0));
        let doubled = painted_pixels(&paint_one(shape(), 2.0));
        // twice the perimeter and twice the stroke width
        let ratio = doubled as f32 / base as f32;
        assert!((3.5..4.5).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn freehand_strokes_its_polyline() {
        let pixmap = paint_one(
            freehand(
                &[Point::new(10.0, 10.0), Point::new(50.0, 10.0), Point::new(50.0, 60.0)],
                4.0,
            ),
            1.0,
        );
        assert_eq!(alpha_at(&pixmap, 30, 10), 255);
        assert_eq!(alpha_at(&pixmap, 50, 40), 255);
        assert_eq!(alpha_at(&pixmap, 30, 40), 0);
    }

    #[test]
    fn live_annotation_is_drawn_on_top() {
        let mut pixmap = blank(50, 50);
        let committed = vec![Annotation::new(
            1,
            Shape::Rectangle(Rectangle {
                origin: Point::new(10.0, 10.0),
                size: Size::new(30.0, 30.0),
                color: [0, 0, 255, 255],
                line_width: 6.0,
            }),
        )];
        let live = Annotation::new(
            2,
            Shape::Freehand(Freehand {
                points: vec![Point::new(0.0, 10.0), Point::new(50.0, 10.0)],
                color: [255, 0, 0, 255],
                line_width: 6.0,
            }),
        );
        let request = DrawRequest {
            annotations: &committed,
            live: Some(&live),
            surface_size: Size::new(50.0, 50.0),
            mosaic: None,
            selected: None,
        };
        Renderer::default().draw(&mut pixmap, &request, 1.0);
        let pixel = pixmap.pixel(25, 10).expect("pixel").demultiply();
        assert_eq!((pixel.red(), pixel.blue()), (255, 0));
    }

    #[test]
    fn selection_outline_surrounds_bounds() {
        let mut pixmap = blank(100, 100);
        let annotations = vec![Annotation::new(
            9,
            Shape::Mosaic(Mosaic {
                origin: Point::new(30.0, 30.0),
                size: Size::new(40.0, 40.0),
            }),
        )];
        let request = DrawRequest {
            annotations: &annotations,
            live: None,
            surface_size: Size::new(100.0, 100.0),
            mosaic: None,
            selected: Some(9),
        };
        Renderer::default().draw(&mut pixmap, &request, 1.0);
        // outline runs along y = 26; dashes leave gaps, so scan the edge
        let top_edge = (30..70).filter(|x| alpha_at(&pixmap, *x, 26) > 0).count();
        assert!(top_edge > 10 && top_edge < 40, "top edge {top_edge}");
        assert_eq!(alpha_at(&pixmap, 50, 50), 0);
    }

    #[test]
    fn mosaic_without_source_is_skipped() {
        let pixmap = paint_one(
            Shape::Mosaic(Mosaic {
                origin: Point::new(0.0, 0.0),
                size: Size::new(50.0, 50.0),
            }),
            1.0,
        );
        assert_eq!(painted_pixels(&pixmap), 0);
    }

    #[test]
    fn sub_pixel_mosaic_is_skipped_with_source() {
        let image = RgbaImage::from_fn(100, 100, |x, y| image::Rgba([x as u8, y as u8, 77, 255]));
        let source = MosaicSource::from_image(&image).expect("mosaic source");
        let annotations = vec![
            Annotation::new(
                1,
                Shape::Mosaic(Mosaic {
                    origin: Point::new(10.0, 10.0),
                    size: Size::new(0.9, 40.0),
                }),
            ),
            Annotation::new(
                2,
                Shape::Mosaic(Mosaic {
                    origin: Point::new(60.0, 60.0),
                    size: Size::new(30.0, -1.0),
                }),
            ),
        ];
        let mut pixmap = blank(100, 100);
        let request = DrawRequest {
            annotations: &annotations,
            live: None,
            surface_size: Size::new(100.0, 100.0),
            mosaic: Some(&source),
            selected: None,
        };
        Renderer::default().draw(&mut pixmap, &request, 1.0);
        assert_eq!(painted_pixels(&pixmap), 0);
    }

    #[test]
    fn mosaic_with_source_fills_its_rect() {
        let image = RgbaImage::from_pixel(100, 100, image::Rgba([0, 128, 0, 255]));
        let source = MosaicSource::from_image(&image).expect("mosaic source");
        let annotations = vec![Annotation::new(
            1,
            Shape::Mosaic(Mosaic {
                origin: Point::new(20.0, 20.0),
                size: Size::new(20.0, 10.0),
            }),
        )];
        let mut pixmap = blank(100, 100);
        let request = DrawRequest {
            annotations: &annotations,
            live: None,
            surface_size: Size::new(100.0, 100.0),
            mosaic: Some(&source),
            selected: None,
        };
        Renderer::default().draw(&mut pixmap, &request, 1.0);
        assert_eq!(painted_pixels(&pixmap), 200);
        assert_eq!(alpha_at(&pixmap, 25, 25), 255);
    }

    #[test]
    fn composite_leaves_uncovered_pixels_alone() {
        let mut image = RgbaImage::from_pixel(4, 2, image::Rgba([201, 100, 50, 3]));
        let original = image.clone();
        let mut overlay = blank(4, 2);
        overlay.fill_rect(
            tiny_skia::Rect::from_xywh(0.0, 0.0, 1.0, 1.0).expect("rect"),
            &solid_paint([0, 0, 255, 255]),
            Transform::identity(),
            None,
        );

        composite_over(&mut image, &overlay);

        assert_eq!(*image.get_pixel(0, 0), image::Rgba([0, 0, 255, 255]));
        for x in 1..4 {
            assert_eq!(image.get_pixel(x, 0), original.get_pixel(x, 0));
            assert_eq!(image.get_pixel(x, 1), original.get_pixel(x, 1));
        }
    }

    #[test]
    fn composite_blends_translucent_paint() {
        let mut image = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        let mut overlay = blank(1, 1);
        overlay.fill(tiny_skia::Color::from_rgba8(0, 0, 0, 128));

        composite_over(&mut image, &overlay);

        let [r, g, b, a] = image.get_pixel(0, 0).0;
        assert_eq!(a, 255);
        assert!((126..=128).contains(&r), "red {r}");
        assert_eq!((r, g), (g, b));
    }

    #[test]
    fn pixmap_conversion_premultiplies() {
        let image = RgbaImage::from_fn(4, 3, |x, y| image::Rgba([x as u8 * 40, y as u8 * 70, 9, 255]));
        let pixmap = pixmap_from_rgba(&image).expect("pixmap");
        let pixel = pixmap.pixel(3, 2).expect("pixel");
        assert_eq!((pixel.red(), pixel.green(), pixel.alpha()), (120, 140, 255));
    }
}
