//! Linear BVH construction over triangle meshes.
//!
//! A build is a fixed sequence of data-parallel passes: per-primitive bounds, a
//! grouped bounds reduction, Morton codes, a segmented radix sort finished by
//! bitonic merging, leaf setup, Karras internal-node construction, and atomic
//! bottom-up bounds propagation. [`LbvhBuilder`] sequences the passes;
//! a [`ComputeDevice`] runs them.

mod builder;
mod device;
mod error;
pub mod kernels;
mod mesh;
pub mod morton;
mod node;
mod plan;

pub use builder::{Bvh, LbvhBuilder};
pub use device::{ComputeDevice, CpuDevice};
pub use error::BvhError;
pub use mesh::{Primitive, TriangleMesh};
pub use node::{BvhNode, INVALID};
pub use plan::{BvhConfig, Pass, PassPlan};
