//! Height raster error types.

/// Errors produced while constructing or loading a [`crate::HeightRaster`].
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// Width or height is zero.
    #[error("invalid raster dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The sample buffer does not hold exactly `width * height` bytes.
    #[error("expected {expected} samples, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },

    /// The image is not single-channel 8-bit.
    #[error("unsupported heightmap format: {color:?} at {depth:?} (need 8-bit grayscale)")]
    UnsupportedFormat {
        color: png::ColorType,
        depth: png::BitDepth,
    },

    /// PNG decoding failed.
    #[error("failed to decode heightmap: {0}")]
    Decode(#[from] png::DecodingError),

    /// PNG encoding failed.
    #[error("failed to encode image: {0}")]
    Encode(#[from] png::EncodingError),

    /// Failed to open or read the file.
    #[error("heightmap i/o: {0}")]
    Io(#[from] std::io::Error),
}
