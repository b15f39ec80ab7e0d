//! Quadtree shape and LOD banding parameters.

use crate::TreeError;

/// Upper bound on the number of LOD levels.
pub const MAX_LOD_COUNT: u32 = 15;

/// Parameters shared by the quadtree builder and the per-frame selector.
#[derive(Clone, Debug, PartialEq)]
pub struct CdlodSettings {
    /// Side length, in raster samples, of the finest (leaf) nodes. Power of two.
    pub leaf_size: u32,
    /// Number of LOD levels. Level 0 is the coarsest, `lod_count - 1` the leaves.
    pub lod_count: u32,
    /// Ratio between the widths of consecutive distance bands.
    pub lod_distance_ratio: f32,
    /// Fraction of a band after which vertices start morphing toward the coarser level.
    pub morph_start_ratio: f32,
}

impl Default for CdlodSettings {
    fn default() -> Self {
        Self {
            leaf_size: 8,
            lod_count: 6,
            lod_distance_ratio: 2.0,
            morph_start_ratio: 0.66,
        }
    }
}

impl CdlodSettings {
    /// Check every parameter, returning the first violation.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.leaf_size < 2 || !self.leaf_size.is_power_of_two() {
            return Err(TreeError::InvalidLeafSize(self.leaf_size));
        }
        let root = (self.leaf_size as u64) << self.lod_count.saturating_sub(1).min(63);
        if self.lod_count == 0 || self.lod_count > MAX_LOD_COUNT || root > u32::MAX as u64 {
            return Err(TreeError::InvalidLodCount {
                lod_count: self.lod_count,
                leaf_size: self.leaf_size,
            });
        }
        if !self.lod_distance_ratio.is_finite() || self.lod_distance_ratio <= 0.0 {
            return Err(TreeError::InvalidRatio {
                name: "lod_distance_ratio",
                value: self.lod_distance_ratio,
            });
        }
        if !(0.0..=1.0).contains(&self.morph_start_ratio) {
            return Err(TreeError::InvalidRatio {
                name: "morph_start_ratio",
                value: self.morph_start_ratio,
            });
        }
        Ok(())
    }

    /// Side length of the top-level (level 0) nodes.
    pub fn root_size(&self) -> u32 {
        self.leaf_size << (self.lod_count - 1)
    }

    /// Side length of nodes at `level`.
    pub fn level_size(&self, level: u32) -> u32 {
        self.root_size() >> level
    }

    /// Index of the leaf level.
    pub fn leaf_level(&self) -> u32 {
        self.lod_count - 1
    }

    /// Exact number of nodes a `width × height` raster produces:
    /// `Σ ceil(width / level_size) * ceil(height / level_size)` over all levels.
    pub fn node_count(&self, width: u32, height: u32) -> usize {
        (0..self.lod_count)
            .map(|level| {
                let size = self.level_size(level);
                width.div_ceil(size) as usize * height.div_ceil(size) as usize
            })
            .sum()
    }
}
