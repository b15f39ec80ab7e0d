//! Compute devices that execute LBVH passes.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;
use rayon::prelude::*;
use strata_math::Aabb;

use crate::kernels::{self, AtomicAabb};
use crate::node::{BvhNode, INVALID};
use crate::{BvhError, TriangleMesh, morton};

/// Executes the data-parallel passes of an LBVH build.
///
/// Each method is one dispatch: it reads its inputs in full and writes every
/// element of its outputs. The builder calls [`ComputeDevice::barrier`] between
/// dispatches; a device must not let a later dispatch observe partial results.
pub trait ComputeDevice {
    /// Human-readable device name for logs.
    fn name(&self) -> &str;

    /// Allocate a buffer of `len` copies of `fill`.
    fn allocate<T: Copy + Send + Sync>(
        &self,
        resource: &'static str,
        len: usize,
        fill: T,
    ) -> Result<Vec<T>, BvhError> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|e| BvhError::Resource {
                resource,
                len,
                reason: e.to_string(),
            })?;
        buffer.resize(len, fill);
        Ok(buffer)
    }

    fn primitive_bounds(&self, mesh: &TriangleMesh, bounds: &mut [Aabb], centroids: &mut [Vec3]);

    /// Fold each `group_size` run of `input` into one element of `output`.
    fn reduce_bounds(&self, input: &[Aabb], group_size: usize, output: &mut [Aabb]);

    /// Codes and identity indices for `centroids`; trailing slots become padding.
    fn morton_codes(
        &self,
        centroids: &[Vec3],
        scene: &Aabb,
        bits_per_axis: u32,
        codes: &mut [u32],
        indices: &mut [u32],
    );

    /// Stable split on `bit` within each `segment`-long run, `src` into `dst`.
    fn segment_sort(
        &self,
        bit: u32,
        segment: usize,
        src: (&[u32], &[u32]),
        dst: (&mut [u32], &mut [u32]),
    );

    fn bitonic_merge(&self, window: usize, stride: usize, codes: &mut [u32], indices: &mut [u32]);

    /// Leaf nodes and bounds from the sorted primitive order.
    fn init_leaves(
        &self,
        sorted_indices: &[u32],
        primitive_bounds: &[Aabb],
        leaves: &mut [BvhNode],
        leaf_bounds: &mut [Aabb],
    );

    /// Link all `codes.len() - 1` internal nodes; also writes leaf parents.
    fn build_internal(&self, codes: &[u32], nodes: &mut [BvhNode]);

    /// Fill internal node bounds from the leaves upward.
    fn propagate_bounds(&self, nodes: &[BvhNode], bounds: &mut [Aabb]);

    fn barrier(&self);
}

/// Host device running every pass on a dedicated rayon pool.
pub struct CpuDevice {
    pool: rayon::ThreadPool,
    name: String,
}

impl CpuDevice {
    pub fn new(threads: usize) -> Result<Self, BvhError> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("lbvh-worker-{i}"))
            .build()
            .map_err(|e| BvhError::Resource {
                resource: "thread pool",
                len: threads,
                reason: e.to_string(),
            })?;
        Ok(Self {
            pool,
            name: format!("cpu ({threads} threads)"),
        })
    }

    /// Leaves two cores for the caller's own threads.
    pub fn with_defaults() -> Result<Self, BvhError> {
        let cpus = num_cpus::get().max(2);
        Self::new((cpus - 2).max(1))
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ComputeDevice for CpuDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn primitive_bounds(&self, mesh: &TriangleMesh, bounds: &mut [Aabb], centroids: &mut [Vec3]) {
        self.pool.install(|| {
            bounds
                .par_iter_mut()
                .zip(centroids.par_iter_mut())
                .enumerate()
                .for_each(|(i, (bound, centroid))| {
                    let triangle = mesh.triangle(i);
                    *bound = Aabb::from_points(triangle);
                    *centroid = kernels::centroid(&triangle);
                });
        });
    }

    fn reduce_bounds(&self, input: &[Aabb], group_size: usize, output: &mut [Aabb]) {
        self.pool.install(|| {
            output
                .par_iter_mut()
                .zip(input.par_chunks(group_size))
                .for_each(|(out, group)| {
                    *out = group.iter().fold(Aabb::EMPTY, |acc, b| acc.union(b));
                });
        });
    }

    fn morton_codes(
        &self,
        centroids: &[Vec3],
        scene: &Aabb,
        bits_per_axis: u32,
        codes: &mut [u32],
        indices: &mut [u32],
    ) {
        self.pool.install(|| {
            codes
                .par_iter_mut()
                .zip(indices.par_iter_mut())
                .enumerate()
                .for_each(|(i, (code, index))| match centroids.get(i) {
                    Some(&c) => {
                        *code = morton::encode(c, scene, bits_per_axis);
                        *index = i as u32;
                    }
                    None => {
                        *code = u32::MAX;
                        *index = u32::MAX;
                    }
                });
        });
    }

    fn segment_sort(
        &self,
        bit: u32,
        segment: usize,
        src: (&[u32], &[u32]),
        dst: (&mut [u32], &mut [u32]),
    ) {
        let (src_codes, src_indices) = src;
        let (dst_codes, dst_indices) = dst;
        self.pool.install(|| {
            src_codes
                .par_chunks(segment)
                .zip(src_indices.par_chunks(segment))
                .zip(dst_codes.par_chunks_mut(segment))
                .zip(dst_indices.par_chunks_mut(segment))
                .for_each(|(((sc, si), dc), di)| kernels::split_on_bit(bit, sc, si, dc, di));
        });
    }

    fn bitonic_merge(&self, window: usize, stride: usize, codes: &mut [u32], indices: &mut [u32]) {
        // Blocks touched by one step never overlap, so they run independently.
        let block = if stride == window / 2 { window } else { 2 * stride };
        self.pool.install(|| {
            codes
                .par_chunks_mut(block)
                .zip(indices.par_chunks_mut(block))
                .for_each(|(c, i)| kernels::bitonic_step(c, i, window, stride));
        });
    }

    fn init_leaves(
        &self,
        sorted_indices: &[u32],
        primitive_bounds: &[Aabb],
        leaves: &mut [BvhNode],
        leaf_bounds: &mut [Aabb],
    ) {
        self.pool.install(|| {
            leaves
                .par_iter_mut()
                .zip(leaf_bounds.par_iter_mut())
                .zip(sorted_indices.par_iter())
                .for_each(|((leaf, bound), &object)| {
                    *leaf = BvhNode::leaf(object);
                    *bound = primitive_bounds[object as usize];
                });
        });
    }

    fn build_internal(&self, codes: &[u32], nodes: &mut [BvhNode]) {
        let internal = codes.len().saturating_sub(1);
        let parents: Vec<AtomicU32> = (0..nodes.len()).map(|_| AtomicU32::new(INVALID)).collect();
        self.pool.install(|| {
            nodes[..internal]
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, node)| {
                    let (left, right) = kernels::internal_children(codes, i);
                    node.left = left;
                    node.right = right;
                    node.object = INVALID;
                    parents[left as usize].store(i as u32, Ordering::Relaxed);
                    parents[right as usize].store(i as u32, Ordering::Relaxed);
                });
            nodes
                .par_iter_mut()
                .zip(parents.par_iter())
                .for_each(|(node, parent)| node.parent = parent.load(Ordering::Relaxed));
        });
    }

    fn propagate_bounds(&self, nodes: &[BvhNode], bounds: &mut [Aabb]) {
        let leaf_count = nodes.len().div_ceil(2);
        let first_leaf = leaf_count - 1;
        let cells: Vec<AtomicAabb> = bounds.iter().map(AtomicAabb::new).collect();
        let arrivals: Vec<AtomicU32> = (0..first_leaf).map(|_| AtomicU32::new(0)).collect();

        self.pool.install(|| {
            (first_leaf..nodes.len()).into_par_iter().for_each(|leaf| {
                let mut parent = nodes[leaf].parent;
                while parent != INVALID {
                    // The first child to arrive stops; the second sees both subtrees done.
                    if arrivals[parent as usize].fetch_add(1, Ordering::AcqRel) == 0 {
                        return;
                    }
                    let node = &nodes[parent as usize];
                    let merged = cells[node.left as usize]
                        .load(Ordering::Relaxed)
                        .union(&cells[node.right as usize].load(Ordering::Relaxed));
                    cells[parent as usize].store(&merged, Ordering::Relaxed);
                    parent = node.parent;
                }
            });
        });

        for (bound, cell) in bounds.iter_mut().zip(&cells) {
            *bound = cell.load(Ordering::Relaxed);
        }
    }

    fn barrier(&self) {
        // `install` returns only after every task of the pass has finished.
    }
}
