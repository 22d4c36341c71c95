//! Whole-image pixelation backing the mosaic tool.
//!
//! The pixelated copy is computed once per image and every mosaic region
//! reveals it through a clip, instead of pixelating per region.

use image::RgbaImage;
use tiny_skia::Pixmap;

use crate::render::pixmap_from_rgba;

pub fn block_size(width: u32, height: u32) -> u32 {
    (width.max(height) / 60).max(8)
}

/// Box-downsampled copy of `image`: each block on a grid anchored at the
/// origin is filled with its average colour. Blocks on the right and bottom
/// edges are cropped to the image, so the output keeps the input extent.
pub fn pixelate(image: &RgbaImage) -> Option<RgbaImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let block = block_size(width, height);
    let mut output = RgbaImage::new(width, height);

    for block_y in (0..height).step_by(block as usize) {
        let end_y = (block_y + block).min(height);
        for block_x in (0..width).step_by(block as usize) {
            let end_x = (block_x + block).min(width);

            let mut totals = [0u64; 4];
            for y in block_y..end_y {
                for x in block_x..end_x {
                    let pixel = image.get_pixel(x, y);
                    for (total, channel) in totals.iter_mut().zip(pixel.0) {
                        *total += channel as u64;
                    }
                }
            }
            let count = ((end_x - block_x) * (end_y - block_y)) as u64;
            let average = image::Rgba(totals.map(|total| (total / count) as u8));

            for y in block_y..end_y {
                for x in block_x..end_x {
                    output.put_pixel(x, y, average);
                }
            }
        }
    }

    Some(output)
}

#[derive(Clone)]
pub struct MosaicSource {
    pixmap: Pixmap,
}

impl MosaicSource {
    /// `None` (mosaic regions are then skipped) when the image is empty or
    /// the surface cannot be allocated.
    pub fn from_image(image: &RgbaImage) -> Option<Self> {
        let Some(pixelated) = pixelate(image) else {
            log::warn!("cannot pixelate an empty image; mosaic regions will be skipped");
            return None;
        };
        let pixmap = pixmap_from_rgba(&pixelated)?;
        log::debug!(
            "mosaic source ready ({}x{}, block {})",
            pixmap.width(),
            pixmap.height(),
            block_size(pixmap.width(), pixmap.height())
        );
        Some(Self { pixmap })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}
