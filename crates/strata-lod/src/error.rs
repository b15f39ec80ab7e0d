//! Quadtree construction error types.

/// Errors that can occur when configuring or building a [`crate::CdlodTree`].
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Leaf size must be a power of two no smaller than 2.
    #[error("leaf size {0} is not a power of two >= 2")]
    InvalidLeafSize(u32),

    /// LOD count must be in `1..=MAX_LOD_COUNT` and keep the root size within `u32`.
    #[error("lod count {lod_count} is out of range for leaf size {leaf_size}")]
    InvalidLodCount { lod_count: u32, leaf_size: u32 },

    /// A ratio parameter is non-finite or outside its valid range.
    #[error("{name} = {value} is out of range")]
    InvalidRatio { name: &'static str, value: f32 },
}
