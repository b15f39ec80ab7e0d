//! CDLOD quadtree over a height raster.
//!
//! All nodes live in one flat arena allocated to the exact closed-form node count.
//! Children are arena indices. Construction runs in two passes without recursion:
//! an explicit worklist allocates nodes in depth-first pre-order (TL, TR, BL, BR),
//! then a reverse sweep over the arena folds elevation ranges bottom-up, which works
//! because every child is allocated after its parent.

use glam::Vec3;
use strata_math::Aabb;
use strata_terrain::{HeightRaster, MAX_HEIGHT, TerrainDimension};

use crate::{CdlodSettings, TreeError};

/// Index of a node inside the tree arena.
pub type NodeIndex = u32;

/// One of the four sub-quadrants of a node, in raster orientation (rows grow "down").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl Quadrant {
    /// Traversal order used for construction and selection.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// Offset of this quadrant's origin in units of half the parent size.
    pub fn offset(self) -> (u32, u32) {
        match self {
            Quadrant::TopLeft => (0, 0),
            Quadrant::TopRight => (1, 0),
            Quadrant::BottomLeft => (0, 1),
            Quadrant::BottomRight => (1, 1),
        }
    }
}

/// A square region of the raster at one LOD level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuadtreeNode {
    /// Raster-space origin column.
    pub rx: u32,
    /// Raster-space origin row.
    pub ry: u32,
    /// Side length in raster samples.
    pub size: u32,
    /// 0 = coarsest.
    pub lod_level: u8,
    /// Minimum elevation over this node and all descendants.
    pub min_z: u16,
    /// Maximum elevation over this node and all descendants.
    pub max_z: u16,
    children: [Option<NodeIndex>; 4],
}

impl QuadtreeNode {
    /// Child in the given quadrant, absent past the raster edge or for leaves.
    pub fn child(&self, quadrant: Quadrant) -> Option<NodeIndex> {
        self.children[quadrant as usize]
    }

    /// Present children, in TL, TR, BL, BR order.
    pub fn children(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.children.iter().flatten().copied()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Raster-space `(x, y, size)` of a quadrant of this node.
    pub fn quadrant_rect(&self, quadrant: Quadrant) -> (u32, u32, u32) {
        let half = self.size / 2;
        let (ox, oy) = quadrant.offset();
        (self.rx + ox * half, self.ry + oy * half, half)
    }
}

/// Pending allocation on the construction worklist.
struct PendingNode {
    rx: u32,
    ry: u32,
    size: u32,
    lod_level: u8,
    parent: Option<(NodeIndex, Quadrant)>,
}

/// The CDLOD quadtree: owns its raster and a flat node arena.
#[derive(Clone, Debug)]
pub struct CdlodTree {
    settings: CdlodSettings,
    raster: HeightRaster,
    dimension: TerrainDimension,
    nodes: Vec<QuadtreeNode>,
    roots: Vec<NodeIndex>,
}

impl CdlodTree {
    /// Build the quadtree over `raster`.
    ///
    /// # Panics
    ///
    /// Panics if the number of allocated nodes differs from
    /// [`CdlodSettings::node_count`]; that indicates a bug in the builder, not bad input.
    pub fn build(
        raster: HeightRaster,
        dimension: TerrainDimension,
        settings: CdlodSettings,
    ) -> Result<Self, TreeError> {
        settings.validate()?;

        let (width, height) = (raster.width(), raster.height());
        if width < settings.leaf_size || height < settings.leaf_size {
            tracing::warn!(
                width,
                height,
                leaf_size = settings.leaf_size,
                "Raster is smaller than one leaf node"
            );
        }

        let expected = settings.node_count(width, height);
        let root_size = settings.root_size();
        let mut nodes: Vec<QuadtreeNode> = Vec::with_capacity(expected);
        let mut roots = Vec::new();
        let mut worklist = Vec::new();

        for ry in (0..height).step_by(root_size as usize) {
            for rx in (0..width).step_by(root_size as usize) {
                worklist.push(PendingNode {
                    rx,
                    ry,
                    size: root_size,
                    lod_level: 0,
                    parent: None,
                });

                while let Some(pending) = worklist.pop() {
                    assert!(
                        nodes.len() < expected,
                        "quadtree arena overflow: more than {expected} nodes for {width}x{height}"
                    );
                    let index = nodes.len() as NodeIndex;
                    match pending.parent {
                        Some((parent, quadrant)) => {
                            nodes[parent as usize].children[quadrant as usize] = Some(index)
                        }
                        None => roots.push(index),
                    }
                    nodes.push(QuadtreeNode {
                        rx: pending.rx,
                        ry: pending.ry,
                        size: pending.size,
                        lod_level: pending.lod_level,
                        min_z: 0,
                        max_z: 0,
                        children: [None; 4],
                    });

                    if pending.size == settings.leaf_size {
                        continue;
                    }

                    // Reverse order so TL is popped (and allocated) first.
                    let half = pending.size / 2;
                    for quadrant in Quadrant::ALL.into_iter().rev() {
                        let (ox, oy) = quadrant.offset();
                        let (cx, cy) = (pending.rx + ox * half, pending.ry + oy * half);
                        if cx >= width || cy >= height {
                            continue;
                        }
                        worklist.push(PendingNode {
                            rx: cx,
                            ry: cy,
                            size: half,
                            lod_level: pending.lod_level + 1,
                            parent: Some((index, quadrant)),
                        });
                    }
                }
            }
        }

        assert_eq!(
            nodes.len(),
            expected,
            "quadtree arena underfilled for {width}x{height}"
        );

        for i in (0..nodes.len()).rev() {
            let (min_z, max_z) = if nodes[i].is_leaf() {
                let node = &nodes[i];
                // A node spans sample columns rx..=rx+size.
                raster.elevation_range(node.rx, node.ry, node.size + 1)
            } else {
                nodes[i]
                    .children()
                    .map(|c| (nodes[c as usize].min_z, nodes[c as usize].max_z))
                    .fold((u16::MAX, u16::MIN), |(lo, hi), (a, b)| {
                        (lo.min(a), hi.max(b))
                    })
            };
            nodes[i].min_z = min_z;
            nodes[i].max_z = max_z;
        }

        tracing::info!(
            width,
            height,
            nodes = nodes.len(),
            roots = roots.len(),
            lod_count = settings.lod_count,
            "Built CDLOD quadtree"
        );

        Ok(Self {
            settings,
            raster,
            dimension,
            nodes,
            roots,
        })
    }

    pub fn settings(&self) -> &CdlodSettings {
        &self.settings
    }

    pub fn raster(&self) -> &HeightRaster {
        &self.raster
    }

    pub fn dimension(&self) -> &TerrainDimension {
        &self.dimension
    }

    /// The whole arena, in construction (pre-order) order.
    pub fn nodes(&self) -> &[QuadtreeNode] {
        &self.nodes
    }

    pub fn node(&self, index: NodeIndex) -> &QuadtreeNode {
        &self.nodes[index as usize]
    }

    /// Top-level nodes, row-major over the raster.
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// World-space bounding box of a node.
    ///
    /// Raster x/y map onto world x/z normalized by `width - 1` / `height - 1`;
    /// elevation maps onto world y normalized by [`MAX_HEIGHT`].
    pub fn world_aabb(&self, node: &QuadtreeNode) -> Aabb {
        let dim = &self.dimension;
        let sx = dim.size.x / (self.raster.width() - 1).max(1) as f32;
        let sz = dim.size.z / (self.raster.height() - 1).max(1) as f32;
        let elevation = |z: u16| z as f32 / MAX_HEIGHT as f32 * dim.size.y;

        let min = Vec3::new(
            node.rx as f32 * sx,
            elevation(node.min_z),
            node.ry as f32 * sz,
        );
        let max = Vec3::new(
            (node.rx + node.size) as f32 * sx,
            elevation(node.max_z),
            (node.ry + node.size) as f32 * sz,
        );
        Aabb {
            min: dim.min + min,
            max: dim.min + max,
        }
    }

    /// Terrain surface height at world-space `(x, z)`, bilinear over the raster.
    /// Positions outside the terrain clamp to the nearest edge.
    pub fn world_height(&self, x: f32, z: f32) -> f32 {
        let dim = &self.dimension;
        let fx = (x - dim.min.x) / dim.size.x * (self.raster.width() - 1) as f32;
        let fy = (z - dim.min.z) / dim.size.z * (self.raster.height() - 1) as f32;
        let elevation = self.raster.elevation_bilinear(fx, fy);
        dim.min.y + elevation / MAX_HEIGHT as f32 * dim.size.y
    }
}
