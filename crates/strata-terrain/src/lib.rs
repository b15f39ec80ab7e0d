//! Height rasters: the immutable 8-bit elevation grid indexed by the CDLOD quadtree,
//! plus PNG loading, procedural fBm synthesis, and debug images.

mod debug_image;
mod error;
mod heightmap;
mod raster;

pub use debug_image::{DebugImage, height_to_color, render_raster_debug};
pub use error::RasterError;
pub use heightmap::{HeightmapParams, HeightmapSampler, synthesize_raster};
pub use raster::{HeightRaster, MAX_HEIGHT, TerrainDimension};
