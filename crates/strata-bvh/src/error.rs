/// Errors from LBVH construction and validation.
#[derive(Debug, thiserror::Error)]
pub enum BvhError {
    #[error("mesh has no primitives")]
    EmptyMesh,

    #[error(
        "primitive {primitive} references vertex {index}, but the mesh has {vertex_count} vertices"
    )]
    IndexOutOfRange {
        primitive: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("mesh has {0} primitives, more than the node layout can address")]
    TooManyPrimitives(usize),

    #[error("invalid builder configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("failed to create {resource} ({len} elements): {reason}")]
    Resource {
        resource: &'static str,
        len: usize,
        reason: String,
    },

    #[error("sorted Morton codes out of order at position {position}")]
    UnsortedCodes { position: usize },

    #[error("malformed BVH at node {node}: {reason}")]
    MalformedTree { node: u32, reason: &'static str },
}
