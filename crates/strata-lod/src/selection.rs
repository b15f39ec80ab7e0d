//! Per-frame CDLOD node selection.
//!
//! Walks every root depth-first, culling against the view frustum and the
//! camera-centered LOD spheres. A node whose children are only partly refined
//! is emitted with a quadrant mask naming the parts it still has to draw itself.

use glam::{Mat4, Vec3};
use strata_math::{Aabb, Frustum, Visibility};

use crate::tree::{CdlodTree, NodeIndex, Quadrant};
use crate::{CdlodSettings, DebugCanvas, LodRanges};

/// Outcome of visiting one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeSelection {
    /// Not visited: the parent did not recurse, or the child is absent.
    Undefined,
    /// Culled by the frustum, or nothing in the subtree needed drawing.
    OutOfFrustum,
    /// Outside this level's LOD sphere; a coarser ancestor draws the area.
    OutOfLodRange,
    /// The node or its subtree added entries to the selection list.
    Selected,
}

/// Which quadrants of a selected node it must draw itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct AreaFlags(u8);

impl AreaFlags {
    pub const NONE: AreaFlags = AreaFlags(0);
    pub const TOP_LEFT: AreaFlags = AreaFlags(1 << Quadrant::TopLeft as u8);
    pub const TOP_RIGHT: AreaFlags = AreaFlags(1 << Quadrant::TopRight as u8);
    pub const BOTTOM_LEFT: AreaFlags = AreaFlags(1 << Quadrant::BottomLeft as u8);
    pub const BOTTOM_RIGHT: AreaFlags = AreaFlags(1 << Quadrant::BottomRight as u8);
    /// The whole node.
    pub const FULL: AreaFlags = AreaFlags(0b1111);

    pub fn from_quadrant(quadrant: Quadrant) -> Self {
        AreaFlags(1 << quadrant as u8)
    }

    pub fn contains(self, quadrant: Quadrant) -> bool {
        self.0 & (1 << quadrant as u8) != 0
    }

    pub fn insert(&mut self, quadrant: Quadrant) {
        self.0 |= 1 << quadrant as u8;
    }

    pub fn is_full(self) -> bool {
        self == Self::FULL
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for AreaFlags {
    type Output = AreaFlags;

    fn bitor(self, rhs: AreaFlags) -> AreaFlags {
        AreaFlags(self.0 | rhs.0)
    }
}

/// One entry of the selection list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectedNode {
    /// Arena index of the originating node.
    pub node: NodeIndex,
    /// World-space bounds of the whole node.
    pub aabb: Aabb,
    /// Quadrants this entry covers.
    pub flags: AreaFlags,
    pub lod_level: u8,
}

impl SelectedNode {
    /// World-space rectangles to draw: the whole box when [`AreaFlags::FULL`],
    /// otherwise one box per flagged quadrant (XZ split at the center, full height).
    pub fn quadrant_aabbs(&self) -> impl Iterator<Item = Aabb> + '_ {
        let full = self.flags.is_full();
        let whole = std::iter::once(self.aabb).filter(move |_| full);
        let parts = Quadrant::ALL
            .into_iter()
            .filter(move |&q| !full && self.flags.contains(q))
            .map(move |q| quadrant_aabb(&self.aabb, q));
        whole.chain(parts)
    }
}

fn quadrant_aabb(aabb: &Aabb, quadrant: Quadrant) -> Aabb {
    let mid = aabb.center();
    let (ox, oz) = quadrant.offset();
    let (x0, x1) = if ox == 0 {
        (aabb.min.x, mid.x)
    } else {
        (mid.x, aabb.max.x)
    };
    let (z0, z1) = if oz == 0 {
        (aabb.min.z, mid.z)
    } else {
        (mid.z, aabb.max.z)
    };
    Aabb {
        min: Vec3::new(x0, aabb.min.y, z0),
        max: Vec3::new(x1, aabb.max.y, z1),
    }
}

/// Camera inputs for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub view_projection: Mat4,
    pub near: f32,
    pub far: f32,
}

/// Counters gathered during one selection pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionStats {
    /// Nodes whose bounding box was computed.
    pub visited: u32,
    /// Nodes rejected by the frustum test.
    pub frustum_culled: u32,
    /// Nodes rejected by the LOD-sphere test.
    pub out_of_range: u32,
    pub min_lod_level: Option<u8>,
    pub max_lod_level: Option<u8>,
    /// Entries dropped because the list hit `max_selection_count`.
    pub overflowed: u32,
}

/// Persistent selection state: LOD tables (rebuilt when the projection changes) and
/// the list produced by the most recent [`LodSelection::select`].
#[derive(Clone, Debug)]
pub struct LodSelection {
    ranges: LodRanges,
    selected: Vec<SelectedNode>,
    stats: SelectionStats,
    camera_position: Vec3,
    max_selection_count: usize,
    sort_by_distance: bool,
}

impl LodSelection {
    pub fn new(settings: &CdlodSettings) -> Self {
        Self {
            ranges: LodRanges::new(settings),
            selected: Vec::new(),
            stats: SelectionStats::default(),
            camera_position: Vec3::ZERO,
            max_selection_count: usize::MAX,
            sort_by_distance: false,
        }
    }

    /// Cap the list length. Nodes past the cap are counted in
    /// [`SelectionStats::overflowed`] but still treated as drawn by their parents.
    pub fn with_max_selection_count(mut self, max: usize) -> Self {
        self.max_selection_count = max;
        self
    }

    /// Order the final list front-to-back by AABB distance to the camera.
    pub fn with_sort_by_distance(mut self, enabled: bool) -> Self {
        self.sort_by_distance = enabled;
        self
    }

    /// Run one frame of selection, replacing the previous list.
    ///
    /// When `debug` is given, every visited node is recorded into it.
    pub fn select(
        &mut self,
        tree: &CdlodTree,
        camera: &CameraState,
        mut debug: Option<&mut DebugCanvas>,
    ) {
        assert_eq!(
            self.ranges.lod_count(),
            tree.settings().lod_count as usize,
            "selection built for a different LOD count"
        );
        self.ranges.update(camera.near, camera.far);
        self.selected.clear();
        self.camera_position = camera.position;
        if let Some(canvas) = debug.as_deref_mut() {
            canvas.clear();
        }

        let frustum = Frustum::from_view_projection(&camera.view_projection);
        let mut walk = Walk {
            tree,
            frustum: &frustum,
            ranges: &self.ranges,
            camera: camera.position,
            leaf_level: tree.settings().leaf_level() as usize,
            max_selection_count: self.max_selection_count,
            out: &mut self.selected,
            stats: SelectionStats::default(),
            debug,
        };
        for &root in tree.roots() {
            walk.select_node(root, false);
        }
        self.stats = walk.stats;

        if self.sort_by_distance {
            let eye = camera.position;
            self.selected.sort_by(|a, b| {
                a.aabb
                    .distance_to_point(eye)
                    .total_cmp(&b.aabb.distance_to_point(eye))
            });
        }

        tracing::trace!(
            selected = self.selected.len(),
            visited = self.stats.visited,
            culled = self.stats.frustum_culled,
            "Selected terrain nodes"
        );
    }

    /// The list produced by the last [`LodSelection::select`].
    pub fn selected(&self) -> &[SelectedNode] {
        &self.selected
    }

    pub fn stats(&self) -> &SelectionStats {
        &self.stats
    }

    pub fn ranges(&self) -> &LodRanges {
        &self.ranges
    }

    /// Camera position used by the last selection.
    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    /// Morph constants for `level`; see [`LodRanges::morph_factors`].
    pub fn morph_factors(&self, level: usize) -> (f32, f32) {
        self.ranges.morph_factors(level)
    }
}

/// Borrowed state for one traversal.
struct Walk<'a> {
    tree: &'a CdlodTree,
    frustum: &'a Frustum,
    ranges: &'a LodRanges,
    camera: Vec3,
    leaf_level: usize,
    max_selection_count: usize,
    out: &'a mut Vec<SelectedNode>,
    stats: SelectionStats,
    debug: Option<&'a mut DebugCanvas>,
}

impl Walk<'_> {
    fn select_node(&mut self, index: NodeIndex, parent_fully_visible: bool) -> NodeSelection {
        let node = self.tree.node(index);
        let aabb = self.tree.world_aabb(node);
        let level = node.lod_level as usize;
        self.stats.visited += 1;

        let mut fully_visible = parent_fully_visible;
        if !parent_fully_visible {
            match self.frustum.classify(&aabb) {
                Visibility::Invisible => {
                    self.stats.frustum_culled += 1;
                    self.record(index, aabb, NodeSelection::OutOfFrustum, AreaFlags::NONE);
                    return NodeSelection::OutOfFrustum;
                }
                Visibility::FullyVisible => fully_visible = true,
                Visibility::Intersecting => {}
            }
        }

        if !aabb.bounding_sphere_intersects(self.camera, self.ranges.lod_range(level)) {
            self.stats.out_of_range += 1;
            self.record(index, aabb, NodeSelection::OutOfLodRange, AreaFlags::NONE);
            return NodeSelection::OutOfLodRange;
        }

        if level == self.leaf_level {
            self.push(index, aabb, AreaFlags::FULL);
            return NodeSelection::Selected;
        }

        let mut children = [NodeSelection::Undefined; 4];
        if aabb.bounding_sphere_intersects(self.camera, self.ranges.lod_range(level + 1)) {
            for quadrant in Quadrant::ALL {
                if let Some(child) = node.child(quadrant) {
                    children[quadrant as usize] = self.select_node(child, fully_visible);
                }
            }
        }

        let mut flags = AreaFlags::NONE;
        for quadrant in Quadrant::ALL {
            match children[quadrant as usize] {
                NodeSelection::Selected | NodeSelection::OutOfFrustum => {}
                NodeSelection::OutOfLodRange | NodeSelection::Undefined => flags.insert(quadrant),
            }
        }

        if flags.is_empty() {
            return NodeSelection::OutOfFrustum;
        }
        self.push(index, aabb, flags);
        NodeSelection::Selected
    }

    fn push(&mut self, index: NodeIndex, aabb: Aabb, flags: AreaFlags) {
        self.record(index, aabb, NodeSelection::Selected, flags);
        if self.out.len() >= self.max_selection_count {
            self.stats.overflowed += 1;
            return;
        }
        let lod_level = self.tree.node(index).lod_level;
        let stats = &mut self.stats;
        stats.min_lod_level = Some(stats.min_lod_level.map_or(lod_level, |l| l.min(lod_level)));
        stats.max_lod_level = Some(stats.max_lod_level.map_or(lod_level, |l| l.max(lod_level)));
        self.out.push(SelectedNode {
            node: index,
            aabb,
            flags,
            lod_level,
        });
    }

    fn record(&mut self, index: NodeIndex, aabb: Aabb, outcome: NodeSelection, flags: AreaFlags) {
        if let Some(canvas) = self.debug.as_deref_mut() {
            canvas.record(index, aabb, self.tree.node(index).lod_level, outcome, flags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_flags_bits() {
        let mut flags = AreaFlags::NONE;
        assert!(flags.is_empty());
        flags.insert(Quadrant::TopRight);
        flags.insert(Quadrant::BottomRight);
        assert_eq!(flags, AreaFlags::TOP_RIGHT | AreaFlags::BOTTOM_RIGHT);
        assert_eq!(flags.bits(), 0b1010);
        assert!(flags.contains(Quadrant::TopRight));
        assert!(!flags.contains(Quadrant::TopLeft));
        assert!(!flags.is_full());
    }

    #[test]
    fn test_all_quadrants_is_full() {
        let flags = Quadrant::ALL
            .into_iter()
            .fold(AreaFlags::NONE, |acc, q| acc | AreaFlags::from_quadrant(q));
        assert!(flags.is_full());
    }

    #[test]
    fn test_quadrant_aabbs_full_yields_whole_box() {
        let sel = SelectedNode {
            node: 0,
            aabb: Aabb::new(Vec3::ZERO, Vec3::new(16.0, 2.0, 16.0)),
            flags: AreaFlags::FULL,
            lod_level: 0,
        };
        let boxes: Vec<_> = sel.quadrant_aabbs().collect();
        assert_eq!(boxes, vec![sel.aabb]);
    }

    #[test]
    fn test_quadrant_aabbs_partial() {
        let sel = SelectedNode {
            node: 0,
            aabb: Aabb::new(Vec3::ZERO, Vec3::new(16.0, 2.0, 16.0)),
            flags: AreaFlags::TOP_RIGHT | AreaFlags::BOTTOM_LEFT,
            lod_level: 0,
        };
        let boxes: Vec<_> = sel.quadrant_aabbs().collect();
        assert_eq!(
            boxes,
            vec![
                Aabb::new(Vec3::new(8.0, 0.0, 0.0), Vec3::new(16.0, 2.0, 8.0)),
                Aabb::new(Vec3::new(0.0, 0.0, 8.0), Vec3::new(8.0, 2.0, 16.0)),
            ]
        );
    }
}
