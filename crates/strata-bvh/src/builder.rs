//! LBVH construction: runs a [`PassPlan`] on a [`ComputeDevice`].

use glam::Vec3;
use strata_math::Aabb;

use crate::node::{BvhNode, INVALID};
use crate::plan::{BvhConfig, Pass, PassPlan};
use crate::{BvhError, ComputeDevice, TriangleMesh};

/// Largest primitive count whose `2P - 1` node indices fit below [`INVALID`].
const MAX_PRIMITIVES: usize = (u32::MAX / 2) as usize;

/// Builds linear BVHs over triangle meshes.
pub struct LbvhBuilder<D: ComputeDevice> {
    device: D,
    config: BvhConfig,
}

/// Buffers live across passes of one build.
struct Buffers {
    primitive_bounds: Vec<Aabb>,
    centroids: Vec<Vec3>,
    /// Ping-pong reduction buffers and the live element count of `reduce[0]`.
    /// `None` until the first reduction reads straight from `primitive_bounds`.
    reduce: [Vec<Aabb>; 2],
    reduce_len: Option<usize>,
    scene: Aabb,
    codes: Vec<u32>,
    indices: Vec<u32>,
    scratch_codes: Vec<u32>,
    scratch_indices: Vec<u32>,
    nodes: Vec<BvhNode>,
    node_bounds: Vec<Aabb>,
}

impl<D: ComputeDevice> LbvhBuilder<D> {
    pub fn new(device: D, config: BvhConfig) -> Result<Self, BvhError> {
        config.validate_config()?;
        Ok(Self { device, config })
    }

    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// The passes [`LbvhBuilder::build`] dispatches for `primitive_count` primitives.
    pub fn plan(&self, primitive_count: u32) -> PassPlan {
        PassPlan::new(primitive_count, &self.config)
    }

    /// Build the hierarchy for `mesh`.
    ///
    /// With [`BvhConfig::validate`] set, codes that come out of the sort unordered
    /// fail with [`BvhError::UnsortedCodes`].
    pub fn build(&self, mesh: &TriangleMesh) -> Result<Bvh, BvhError> {
        let count = mesh.primitive_count();
        if count == 0 {
            return Err(BvhError::EmptyMesh);
        }
        if count > MAX_PRIMITIVES {
            return Err(BvhError::TooManyPrimitives(count));
        }

        let plan = self.plan(count as u32);
        let mut buffers = self.allocate(&plan)?;
        let start = std::time::Instant::now();

        for (i, pass) in plan.passes().iter().enumerate() {
            // Leaf initialization is the first pass that consumes the sorted order.
            if self.config.validate && matches!(pass, Pass::InitLeaves { .. }) {
                check_sorted(&buffers.codes[..count])?;
            }
            tracing::trace!(?pass, device = self.device.name(), "Dispatching LBVH pass");
            self.dispatch(pass, mesh, &mut buffers);
            if i + 1 < plan.passes().len() {
                self.device.barrier();
            }
        }

        let Buffers {
            primitive_bounds,
            scene,
            mut codes,
            mut indices,
            nodes,
            node_bounds,
            ..
        } = buffers;
        codes.truncate(count);
        indices.truncate(count);

        tracing::info!(
            primitives = count,
            passes = plan.passes().len(),
            device = self.device.name(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Built LBVH"
        );

        Ok(Bvh {
            nodes,
            node_bounds,
            sorted_codes: codes,
            sorted_indices: indices,
            primitive_bounds,
            scene_bounds: scene,
            plan,
        })
    }

    fn allocate(&self, plan: &PassPlan) -> Result<Buffers, BvhError> {
        let p = plan.primitive_count() as usize;
        let padded = plan.padded_count() as usize;
        let first_groups = p.div_ceil(self.config.reduction_group_size as usize);
        let d = &self.device;
        Ok(Buffers {
            primitive_bounds: d.allocate("primitive bounds", p, Aabb::EMPTY)?,
            centroids: d.allocate("centroids", p, Vec3::ZERO)?,
            reduce: [
                d.allocate("reduction buffer", first_groups, Aabb::EMPTY)?,
                d.allocate("reduction buffer", first_groups, Aabb::EMPTY)?,
            ],
            reduce_len: None,
            scene: Aabb::EMPTY,
            codes: d.allocate("morton codes", padded, 0u32)?,
            indices: d.allocate("sort indices", padded, 0u32)?,
            scratch_codes: d.allocate("morton codes", padded, 0u32)?,
            scratch_indices: d.allocate("sort indices", padded, 0u32)?,
            nodes: d.allocate("nodes", 2 * p - 1, BvhNode::UNSET)?,
            node_bounds: d.allocate("node bounds", 2 * p - 1, Aabb::EMPTY)?,
        })
    }

    fn dispatch(&self, pass: &Pass, mesh: &TriangleMesh, b: &mut Buffers) {
        let d = &self.device;
        let p = b.primitive_bounds.len();
        match *pass {
            Pass::PrimitiveBounds { .. } => {
                d.primitive_bounds(mesh, &mut b.primitive_bounds, &mut b.centroids);
            }
            Pass::ReduceBounds { input, groups } => {
                let (input, groups) = (input as usize, groups as usize);
                let group_size = self.config.reduction_group_size as usize;
                let [front, back] = &mut b.reduce;
                match b.reduce_len {
                    None => d.reduce_bounds(&b.primitive_bounds, group_size, &mut front[..groups]),
                    Some(_) => {
                        d.reduce_bounds(&front[..input], group_size, &mut back[..groups]);
                        std::mem::swap(front, back);
                    }
                }
                b.reduce_len = Some(groups);
                if groups == 1 {
                    b.scene = b.reduce[0][0];
                }
            }
            Pass::MortonCodes { .. } => {
                d.morton_codes(
                    &b.centroids,
                    &b.scene,
                    self.config.morton_bits_per_axis,
                    &mut b.codes,
                    &mut b.indices,
                );
            }
            Pass::SegmentSort { bit, .. } => {
                let segment = (self.config.sort_group_size as usize).min(b.codes.len());
                d.segment_sort(
                    bit,
                    segment,
                    (&b.codes, &b.indices),
                    (&mut b.scratch_codes, &mut b.scratch_indices),
                );
                std::mem::swap(&mut b.codes, &mut b.scratch_codes);
                std::mem::swap(&mut b.indices, &mut b.scratch_indices);
            }
            Pass::BitonicMerge { window, stride, .. } => {
                d.bitonic_merge(
                    window as usize,
                    stride as usize,
                    &mut b.codes,
                    &mut b.indices,
                );
            }
            Pass::InitLeaves { .. } => {
                d.init_leaves(
                    &b.indices[..p],
                    &b.primitive_bounds,
                    &mut b.nodes[p - 1..],
                    &mut b.node_bounds[p - 1..],
                );
            }
            Pass::BuildInternal { .. } => d.build_internal(&b.codes[..p], &mut b.nodes),
            Pass::PropagateBounds { .. } => d.propagate_bounds(&b.nodes, &mut b.node_bounds),
        }
    }
}

fn check_sorted(codes: &[u32]) -> Result<(), BvhError> {
    match codes.windows(2).position(|w| w[0] > w[1]) {
        Some(position) => Err(BvhError::UnsortedCodes {
            position: position + 1,
        }),
        None => Ok(()),
    }
}

/// A finished linear BVH.
///
/// Node `0` is the root. Internal nodes occupy `[0, P - 1)`, leaves `[P - 1, 2P - 1)`
/// in Morton order; `sorted_indices()[k]` is the primitive behind leaf `P - 1 + k`.
#[derive(Clone, Debug)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    node_bounds: Vec<Aabb>,
    sorted_codes: Vec<u32>,
    sorted_indices: Vec<u32>,
    primitive_bounds: Vec<Aabb>,
    scene_bounds: Aabb,
    plan: PassPlan,
}

impl Bvh {
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn node_bounds(&self) -> &[Aabb] {
        &self.node_bounds
    }

    pub fn sorted_codes(&self) -> &[u32] {
        &self.sorted_codes
    }

    pub fn sorted_indices(&self) -> &[u32] {
        &self.sorted_indices
    }

    /// Per-primitive bounds in mesh order.
    pub fn primitive_bounds(&self) -> &[Aabb] {
        &self.primitive_bounds
    }

    /// Per-primitive bounds in leaf (sorted) order.
    pub fn sorted_primitive_bounds(&self) -> impl Iterator<Item = Aabb> + '_ {
        self.sorted_indices
            .iter()
            .map(|&i| self.primitive_bounds[i as usize])
    }

    /// Whole-mesh bounds from the reduction passes.
    pub fn scene_bounds(&self) -> Aabb {
        self.scene_bounds
    }

    /// The passes that produced this hierarchy.
    pub fn plan(&self) -> &PassPlan {
        &self.plan
    }

    pub fn leaf_count(&self) -> usize {
        self.sorted_indices.len()
    }

    pub fn internal_count(&self) -> usize {
        self.nodes.len() - self.leaf_count()
    }

    pub fn root_bounds(&self) -> Aabb {
        self.node_bounds[0]
    }

    /// Primitives whose bounds overlap `query`, in leaf order.
    pub fn query(&self, query: &Aabb, out: &mut Vec<u32>) {
        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            if !self.node_bounds[index as usize].intersects(query) {
                continue;
            }
            let node = &self.nodes[index as usize];
            if node.is_leaf() {
                out.push(node.object);
            } else {
                stack.push(node.right);
                stack.push(node.left);
            }
        }
    }

    /// Structural and bounds check of the whole hierarchy.
    ///
    /// Verifies node counts, parent/child symmetry, that every primitive sits in
    /// exactly one reachable leaf, and that every internal box equals the union of
    /// its children.
    pub fn validate(&self) -> Result<(), BvhError> {
        let p = self.leaf_count();
        let malformed = |node: usize, reason| BvhError::MalformedTree {
            node: node as u32,
            reason,
        };
        if p == 0 || self.nodes.len() != 2 * p - 1 || self.node_bounds.len() != self.nodes.len() {
            return Err(malformed(0, "node count is not 2P - 1"));
        }
        if self.nodes[0].parent != INVALID {
            return Err(malformed(0, "root has a parent"));
        }

        let mut seen = vec![false; p];
        let mut visited = 0usize;
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            visited += 1;
            if visited > self.nodes.len() {
                return Err(malformed(index, "cycle"));
            }
            let node = &self.nodes[index];
            let bounds = self.node_bounds[index];

            if index >= p - 1 {
                if !node.is_leaf() || node.left != INVALID || node.right != INVALID {
                    return Err(malformed(index, "leaf slot holds an internal node"));
                }
                let object = node.object as usize;
                if object >= p || std::mem::replace(&mut seen[object], true) {
                    return Err(malformed(index, "primitive missing or referenced twice"));
                }
                if bounds != self.primitive_bounds[object] {
                    return Err(malformed(index, "leaf bounds differ from its primitive"));
                }
                continue;
            }

            if node.is_leaf() {
                return Err(malformed(index, "internal slot holds a leaf"));
            }
            for child in [node.left, node.right] {
                let c = child as usize;
                if c >= self.nodes.len() || c == 0 {
                    return Err(malformed(index, "child index out of range"));
                }
                if self.nodes[c].parent != index as u32 {
                    return Err(malformed(c, "parent link does not match"));
                }
                stack.push(c);
            }
            let union = self.node_bounds[node.left as usize]
                .union(&self.node_bounds[node.right as usize]);
            if bounds != union {
                return Err(malformed(index, "bounds differ from union of children"));
            }
        }

        if visited != self.nodes.len() {
            return Err(malformed(0, "unreachable nodes"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CpuDevice, Primitive};

    fn builder() -> LbvhBuilder<CpuDevice> {
        LbvhBuilder::new(
            CpuDevice::new(2).unwrap(),
            BvhConfig {
                validate: true,
                ..Default::default()
            },
        )
        .unwrap()
    }

    /// One small triangle at each `x` position along the X axis.
    fn strip(xs: &[f32]) -> TriangleMesh {
        let mut vertices = Vec::new();
        let mut primitives = Vec::new();
        for (i, &x) in xs.iter().enumerate() {
            vertices.push(Vec3::new(x, 0.0, 0.0));
            vertices.push(Vec3::new(x + 0.5, 0.0, 0.0));
            vertices.push(Vec3::new(x, 0.5, 0.0));
            let base = 3 * i as u32;
            primitives.push(Primitive::new(base, base + 1, base + 2));
        }
        TriangleMesh::new(vertices, primitives).unwrap()
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let mesh = TriangleMesh::new(vec![], vec![]).unwrap();
        assert!(matches!(builder().build(&mesh), Err(BvhError::EmptyMesh)));
    }

    #[test]
    fn test_single_primitive_is_root_leaf() {
        let bvh = builder().build(&strip(&[3.0])).unwrap();
        assert_eq!(bvh.nodes().len(), 1);
        assert_eq!(bvh.nodes()[0], BvhNode::leaf(0));
        assert_eq!(bvh.root_bounds(), bvh.primitive_bounds()[0]);
        bvh.validate().unwrap();
    }

    #[test]
    fn test_sorts_along_axis() {
        let bvh = builder().build(&strip(&[9.0, 1.0, 5.0, 3.0])).unwrap();
        assert_eq!(bvh.sorted_indices(), &[1, 3, 2, 0]);
        assert!(bvh.sorted_codes().windows(2).all(|w| w[0] <= w[1]));
        bvh.validate().unwrap();
    }

    #[test]
    fn test_root_bounds_match_scene() {
        let bvh = builder().build(&strip(&[0.0, 2.0, 4.0, 6.0, 8.0])).unwrap();
        assert_eq!(bvh.root_bounds(), bvh.scene_bounds());
        assert_eq!(
            bvh.scene_bounds(),
            Aabb::new(Vec3::ZERO, Vec3::new(8.5, 0.5, 0.0))
        );
    }

    #[test]
    fn test_duplicate_centroids_still_build() {
        let bvh = builder().build(&strip(&[1.0; 9])).unwrap();
        assert_eq!(bvh.leaf_count(), 9);
        assert_eq!(bvh.sorted_indices(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        bvh.validate().unwrap();
    }

    #[test]
    fn test_query_finds_overlapping_primitives() {
        let bvh = builder().build(&strip(&[0.0, 10.0, 20.0, 30.0])).unwrap();
        let mut hits = Vec::new();
        bvh.query(&Aabb::new(Vec3::new(9.0, 0.0, -1.0), Vec3::new(21.0, 1.0, 1.0)), &mut hits);
        hits.sort_unstable();
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn test_validate_detects_corrupted_bounds() {
        let mut bvh = builder().build(&strip(&[0.0, 1.0, 2.0])).unwrap();
        bvh.node_bounds[0] = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(matches!(
            bvh.validate(),
            Err(BvhError::MalformedTree { node: 0, .. })
        ));
    }

    #[test]
    fn test_check_sorted_reports_position() {
        assert!(check_sorted(&[1, 2, 2, 5]).is_ok());
        assert!(matches!(
            check_sorted(&[1, 4, 3]),
            Err(BvhError::UnsortedCodes { position: 2 })
        ));
    }

    #[test]
    fn test_plan_matches_dispatch() {
        let b = builder();
        let bvh = b.build(&strip(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(bvh.plan(), &b.plan(6));
    }
}
