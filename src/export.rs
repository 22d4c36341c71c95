use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use image::{ImageFormat, RgbaImage};
use tiny_skia::Pixmap;

use crate::annotation::{Annotation, Shape};
use crate::geometry::Size;
use crate::pixelate::MosaicSource;
use crate::render::{composite_over, DrawRequest, Renderer};

/// Flattens `annotations` over `base` at the base image's native resolution.
///
/// Annotations are in canvas units of a canvas `canvas_size` large; they are
/// scaled by `base.width() / canvas_size.width` so strokes and text keep the
/// proportions seen on screen. Mosaics use `mosaic` when it was built from an
/// image of the same size, otherwise a source is pixelated here. Pixels no
/// annotation covers come back unchanged. `None` for a zero-sized canvas or
/// image.
pub fn export_flattened(
    base: &RgbaImage,
    annotations: &[Annotation],
    canvas_size: Size,
    renderer: &Renderer,
    mosaic: Option<&MosaicSource>,
) -> Option<RgbaImage> {
    if canvas_size.is_empty() || base.width() == 0 || base.height() == 0 {
        log::warn!(
            "export skipped: canvas {}x{}, image {}x{}",
            canvas_size.width,
            canvas_size.height,
            base.width(),
            base.height()
        );
        return None;
    }
    if annotations.is_empty() {
        return Some(base.clone());
    }

    let mosaic = mosaic.filter(|source| {
        source.pixmap().width() == base.width() && source.pixmap().height() == base.height()
    });
    let has_mosaic = annotations
        .iter()
        .any(|annotation| matches!(annotation.shape, Shape::Mosaic(_)));
    let rebuilt = if has_mosaic && mosaic.is_none() {
        MosaicSource::from_image(base)
    } else {
        None
    };

    let scale = base.width() as f32 / canvas_size.width;
    let mut overlay = Pixmap::new(base.width(), base.height())?;
    let request = DrawRequest {
        annotations,
        live: None,
        surface_size: canvas_size,
        mosaic: mosaic.or(rebuilt.as_ref()),
        selected: None,
    };
    renderer.draw(&mut overlay, &request, scale);

    let mut output = base.clone();
    composite_over(&mut output, &overlay);
    log::info!(
        "exported {} annotations at {}x{} (scale {scale:.3})",
        annotations.len(),
        output.width(),
        output.height()
    );
    Some(output)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .context("cannot encode PNG")?;
    Ok(buffer.into_inner())
}

pub fn suggested_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("screenshot_{}.png", now.format("%Y%m%d_%H%M%S"))
}
