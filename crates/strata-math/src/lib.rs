//! f32 bounding volumes and view-frustum classification shared by the terrain and BVH crates.

mod aabb;
mod frustum;

pub use aabb::Aabb;
pub use frustum::{Frustum, Visibility};
