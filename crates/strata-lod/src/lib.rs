//! CDLOD terrain: quadtree over a height raster, distance-banded LOD ranges with
//! morph tables, and per-frame frustum/LOD node selection.

mod debug;
mod error;
mod ranges;
mod selection;
mod settings;
mod tree;

pub use debug::{DebugBox, DebugCanvas};
pub use error::TreeError;
pub use ranges::LodRanges;
pub use selection::{
    AreaFlags, CameraState, LodSelection, NodeSelection, SelectedNode, SelectionStats,
};
pub use settings::CdlodSettings;
pub use tree::{CdlodTree, NodeIndex, Quadrant, QuadtreeNode};
