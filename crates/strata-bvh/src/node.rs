/// Sentinel for an unset node link.
pub const INVALID: u32 = u32::MAX;

/// One node of the flat LBVH node array.
///
/// With `P` primitives, internal nodes occupy `[0, P - 1)` (node 0 is the root)
/// and leaves occupy `[P - 1, 2P - 1)` in Morton order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct BvhNode {
    pub parent: u32,
    pub left: u32,
    pub right: u32,
    /// Original primitive index for leaves, [`INVALID`] for internal nodes.
    pub object: u32,
}

static_assertions::assert_eq_size!(BvhNode, [u32; 4]);

impl BvhNode {
    /// All links unset.
    pub const UNSET: BvhNode = BvhNode {
        parent: INVALID,
        left: INVALID,
        right: INVALID,
        object: INVALID,
    };

    pub fn leaf(object: u32) -> Self {
        Self {
            object,
            ..Self::UNSET
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.object != INVALID
    }
}

impl Default for BvhNode {
    fn default() -> Self {
        Self::UNSET
    }
}
