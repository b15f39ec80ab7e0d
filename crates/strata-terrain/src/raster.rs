//! Immutable 8-bit elevation raster and its world-space placement.

use std::io::Read;
use std::path::Path;

use glam::Vec3;

use crate::RasterError;

/// Elevation value that a raw sample of 255 maps to.
pub const MAX_HEIGHT: u16 = u16::MAX;

/// `MAX_HEIGHT / 255`, exact: every byte maps onto the full 16-bit range.
const SAMPLE_SCALE: u16 = MAX_HEIGHT / u8::MAX as u16;

/// World-space origin and extents of the terrain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainDimension {
    /// World position of raster sample `(0, 0)` at elevation 0.
    pub min: Vec3,
    /// Extent along x (raster columns), y (elevation), z (raster rows).
    pub size: Vec3,
}

impl TerrainDimension {
    pub fn new(min: Vec3, size: Vec3) -> Self {
        Self { min, size }
    }

    /// World-space corner opposite [`TerrainDimension::min`].
    pub fn max(&self) -> Vec3 {
        self.min + self.size
    }
}

/// A `width × height` grid of unsigned 8-bit elevation samples, row-major.
///
/// Elevation queries rescale raw bytes from `[0, 255]` into `[0, MAX_HEIGHT]`.
/// Coordinates past the last row/column are clamped, so edge samples repeat
/// instead of reading out of bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeightRaster {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl HeightRaster {
    /// Wrap an existing row-major sample buffer.
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(RasterError::SampleCountMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Build a raster by evaluating `f(x, y)` for every sample.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> u8,
    ) -> Result<Self, RasterError> {
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Self::new(width, height, samples)
    }

    /// A raster where every sample is `value`.
    pub fn flat(width: u32, height: u32, value: u8) -> Result<Self, RasterError> {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    /// Load a single-channel 8-bit PNG heightmap from disk.
    pub fn from_png(path: &Path) -> Result<Self, RasterError> {
        let file = std::fs::File::open(path)?;
        let raster = Self::from_png_reader(std::io::BufReader::new(file))?;
        tracing::info!(
            path = %path.display(),
            width = raster.width,
            height = raster.height,
            "Loaded heightmap"
        );
        Ok(raster)
    }

    /// Decode a single-channel 8-bit PNG heightmap from any reader.
    pub fn from_png_reader<R: Read>(reader: R) -> Result<Self, RasterError> {
        let mut decoder = png::Decoder::new(reader);
        decoder.set_transformations(png::Transformations::IDENTITY);
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;

        if info.color_type != png::ColorType::Grayscale || info.bit_depth != png::BitDepth::Eight {
            return Err(RasterError::UnsupportedFormat {
                color: info.color_type,
                depth: info.bit_depth,
            });
        }

        buf.truncate(info.buffer_size());
        Self::new(info.width, info.height, buf)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw row-major samples.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Raw byte at `(x, y)`, clamped to the last valid row/column.
    pub fn sample(&self, x: u32, y: u32) -> u8 {
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        self.samples[y * self.width as usize + x]
    }

    /// Elevation at `(x, y)` in `[0, MAX_HEIGHT]`.
    pub fn elevation(&self, x: u32, y: u32) -> u16 {
        scale_sample(self.sample(x, y))
    }

    /// Min/max elevation of the `size × size` block whose top-left sample is
    /// `(x, y)`. Indices past the raster edge clamp to the last row/column.
    pub fn elevation_range(&self, x: u32, y: u32, size: u32) -> (u16, u16) {
        let last_x = self.width - 1;
        let last_y = self.height - 1;
        let size = size.max(1);

        let mut lo = u8::MAX;
        let mut hi = u8::MIN;
        for dy in 0..size {
            let row = y.saturating_add(dy).min(last_y) as usize * self.width as usize;
            for dx in 0..size {
                let col = x.saturating_add(dx).min(last_x) as usize;
                let s = self.samples[row + col];
                lo = lo.min(s);
                hi = hi.max(s);
            }
        }
        (scale_sample(lo), scale_sample(hi))
    }

    /// Bilinearly interpolated elevation at fractional raster coordinates,
    /// clamped to the raster extent.
    pub fn elevation_bilinear(&self, fx: f32, fy: f32) -> f32 {
        let fx = fx.clamp(0.0, (self.width - 1) as f32);
        let fy = fy.clamp(0.0, (self.height - 1) as f32);
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let h = |x: u32, y: u32| self.elevation(x, y) as f32;
        let top = h(x0, y0) * (1.0 - tx) + h(x0 + 1, y0) * tx;
        let bottom = h(x0, y0 + 1) * (1.0 - tx) + h(x0 + 1, y0 + 1) * tx;
        top * (1.0 - ty) + bottom * ty
    }
}

fn scale_sample(s: u8) -> u16 {
    u16::from(s) * SAMPLE_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_raster() -> HeightRaster {
        // Sample value = x + 10 * y.
        HeightRaster::from_fn(5, 4, |x, y| (x + 10 * y) as u8).unwrap()
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(matches!(
            HeightRaster::new(0, 4, vec![]),
            Err(RasterError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_sample_count() {
        let err = HeightRaster::new(4, 4, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            RasterError::SampleCountMismatch {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn test_elevation_scaling_endpoints() {
        let raster = HeightRaster::from_fn(2, 1, |x, _| if x == 0 { 0 } else { 255 }).unwrap();
        assert_eq!(raster.elevation(0, 0), 0);
        assert_eq!(raster.elevation(1, 0), MAX_HEIGHT);
    }

    #[test]
    fn test_elevation_scaling_is_linear() {
        let raster = HeightRaster::flat(1, 1, 51).unwrap();
        assert_eq!(raster.elevation(0, 0), 51 * 257);
    }

    #[test]
    fn test_elevation_range_interior_block() {
        let raster = gradient_raster();
        // Block (1,1)..(2,2): samples 11, 12, 21, 22.
        assert_eq!(raster.elevation_range(1, 1, 2), (11 * 257, 22 * 257));
    }

    #[test]
    fn test_elevation_range_clamps_past_edge() {
        let raster = gradient_raster();
        // Block starting at (3,2) with size 4 reaches x=6, y=5; clamped to x=4, y=3.
        assert_eq!(raster.elevation_range(3, 2, 4), (23 * 257, 34 * 257));
    }

    #[test]
    fn test_elevation_range_entirely_outside_repeats_last_sample() {
        let raster = gradient_raster();
        let last = raster.elevation(4, 3);
        assert_eq!(raster.elevation_range(100, 100, 8), (last, last));
    }

    #[test]
    fn test_point_query_clamps() {
        let raster = gradient_raster();
        assert_eq!(raster.sample(99, 0), 4);
        assert_eq!(raster.sample(0, 99), 30);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let raster = HeightRaster::from_fn(2, 2, |x, _| if x == 0 { 0 } else { 100 }).unwrap();
        let mid = raster.elevation_bilinear(0.5, 0.5);
        assert!((mid - 50.0 * 257.0).abs() < 1e-2, "got {mid}");
    }

    #[test]
    fn test_png_roundtrip_grayscale() {
        let raster = gradient_raster();
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(std::io::Cursor::new(&mut bytes), 5, 4);
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(raster.samples()).unwrap();
        }
        let decoded = HeightRaster::from_png_reader(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(decoded, raster);
    }

    #[test]
    fn test_png_rejects_rgba() {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(std::io::Cursor::new(&mut bytes), 2, 2);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0u8; 16]).unwrap();
        }
        let err = HeightRaster::from_png_reader(std::io::Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, RasterError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_from_png_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = HeightRaster::from_png(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, RasterError::Io(_)));
    }

    #[test]
    fn test_terrain_dimension_max() {
        let dim = TerrainDimension::new(Vec3::new(-10.0, 0.0, -10.0), Vec3::new(20.0, 5.0, 20.0));
        assert_eq!(dim.max(), Vec3::new(10.0, 5.0, 10.0));
    }
}
