use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::RgbaImage;
use imageproc::drawing::{draw_text_mut, text_size};

use crate::annotation::Rgba;
use crate::geometry::{Size, TextMetrics};

const BOLD_FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Verdana Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "C:\\Windows\\Fonts\\segoeuib.ttf",
];

/// The bold face used for text annotations. Without a face, text is
/// measured with a glyph-count estimate and not drawn.
#[derive(Clone, Default)]
pub struct FontBook {
    font: Option<FontArc>,
}

impl FontBook {
    pub fn load(preferred: &[PathBuf]) -> Self {
        let candidates = preferred
            .iter()
            .map(PathBuf::as_path)
            .chain(BOLD_FONT_CANDIDATES.iter().map(Path::new));

        for path in candidates {
            let Ok(bytes) = std::fs::read(path) else {
                continue;
            };
            match FontArc::try_from_vec(bytes) {
                Ok(font) => {
                    log::info!("using text font {}", path.display());
                    return Self { font: Some(font) };
                }
                Err(err) => log::warn!("cannot parse font {}: {err}", path.display()),
            }
        }

        log::warn!("no bold system font found; text annotations will not be drawn");
        Self::estimated()
    }

    pub fn estimated() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Renders `text` at `font_px` onto a transparent layer sized to the
    /// measured extent. `None` without a face or for empty text.
    pub fn rasterize(&self, text: &str, font_px: f32, color: Rgba) -> Option<RgbaImage> {
        let font = self.font.as_ref()?;
        if text.is_empty() || font_px <= 0.0 {
            return None;
        }
        let (width, height) = ink_extent(font, font_px, text);
        // Straight-alpha background in the text colour, so the coverage blend
        // only touches alpha.
        let mut layer = RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([color[0], color[1], color[2], 0]),
        );
        draw_text_mut(&mut layer, image::Rgba(color), 0, 0, font_px, font, text);
        Some(layer)
    }
}

impl TextMetrics for FontBook {
    fn measure(&self, text: &str, font_size: f32) -> Size {
        match &self.font {
            Some(font) => {
                let (width, height) = ink_extent(font, font_size, text);
                Size::new(width as f32, height as f32)
            }
            None => estimate_extent(text, font_size),
        }
    }
}

/// Box holding everything `draw_text_mut` paints for `text` at the origin,
/// descenders and edge coverage included.
fn ink_extent(font: &FontArc, font_px: f32, text: &str) -> (u32, u32) {
    let (width, height) = text_size(font_px, font, text);
    let line_height = font.as_scaled(PxScale::from(font_px)).height().ceil().max(0.0) as u32;
    (width + 2, height.max(line_height) + 2)
}

fn estimate_extent(text: &str, font_size: f32) -> Size {
    let width = (text.chars().count().max(1) as f32 * font_size * 0.6).max(20.0);
    Size::new(width, font_size * 1.4)
}
