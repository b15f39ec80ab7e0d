//! A 2D RGBA debug image and the raster visualization that backs it.

use std::path::Path;

use crate::{HeightRaster, RasterError};

/// Row-major RGBA debug image.
#[derive(Clone, Debug)]
pub struct DebugImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel data in row-major RGBA format. Length = `width * height * 4`.
    pub pixels: Vec<u8>,
}

impl DebugImage {
    /// Create a new black (all-zero) image with the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    /// Set a single pixel's RGBA value.
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let idx = ((y * self.width + x) * 4) as usize;
        self.pixels[idx..idx + 4].copy_from_slice(&rgba);
    }

    /// Get a pixel's RGBA value.
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Fill the half-open pixel rectangle `[x0, x1) × [y0, y1)`, clipped to the image.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, rgba: [u8; 4]) {
        for y in y0.min(self.height)..y1.min(self.height) {
            for x in x0.min(self.width)..x1.min(self.width) {
                self.set_pixel(x, y, rgba);
            }
        }
    }

    /// Draw the one-pixel outline of `[x0, x1) × [y0, y1)`, clipped to the image.
    pub fn stroke_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, rgba: [u8; 4]) {
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        self.fill_rect(x0, y0, x1, y0 + 1, rgba);
        self.fill_rect(x0, y1 - 1, x1, y1, rgba);
        self.fill_rect(x0, y0, x0 + 1, y1, rgba);
        self.fill_rect(x1 - 1, y0, x1, y1, rgba);
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), RasterError> {
        let file = std::fs::File::create(path)?;
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        Ok(())
    }
}

/// Map a normalized height `[0, 1]` to an RGB color.
///
/// Color bands: lowland green → rock brown → snow white.
pub fn height_to_color(normalized: f64) -> [u8; 3] {
    let t = normalized.clamp(0.0, 1.0);
    let lerp = |a: [f64; 3], b: [f64; 3], t: f64| {
        [
            (a[0] + (b[0] - a[0]) * t) as u8,
            (a[1] + (b[1] - a[1]) * t) as u8,
            (a[2] + (b[2] - a[2]) * t) as u8,
        ]
    };
    const LOW: [f64; 3] = [40.0, 110.0, 40.0];
    const ROCK: [f64; 3] = [120.0, 95.0, 70.0];
    const SNOW: [f64; 3] = [245.0, 245.0, 250.0];
    if t < 0.6 {
        lerp(LOW, ROCK, t / 0.6)
    } else {
        lerp(ROCK, SNOW, (t - 0.6) / 0.4)
    }
}

/// One pixel per raster sample, color-coded by elevation.
pub fn render_raster_debug(raster: &HeightRaster) -> DebugImage {
    let mut image = DebugImage::new(raster.width(), raster.height());
    for y in 0..raster.height() {
        for x in 0..raster.width() {
            let [r, g, b] = height_to_color(raster.sample(x, y) as f64 / 255.0);
            image.set_pixel(x, y, [r, g, b, 255]);
        }
    }
    image
}
