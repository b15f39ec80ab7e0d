//! Visit log of a selection pass and its top-down rendering.

use strata_math::Aabb;
use strata_terrain::{DebugImage, TerrainDimension};

use crate::{AreaFlags, NodeIndex, NodeSelection};

/// One node visited during selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugBox {
    pub node: NodeIndex,
    pub aabb: Aabb,
    pub lod_level: u8,
    pub outcome: NodeSelection,
    /// Quadrants drawn by this node, [`AreaFlags::NONE`] unless `outcome` is `Selected`.
    pub flags: AreaFlags,
}

/// Collects every node the selector visits.
#[derive(Clone, Debug, Default)]
pub struct DebugCanvas {
    boxes: Vec<DebugBox>,
}

const LEVEL_COLORS: [[u8; 4]; 8] = [
    [230, 60, 60, 255],
    [240, 150, 40, 255],
    [230, 220, 60, 255],
    [90, 200, 80, 255],
    [60, 190, 200, 255],
    [70, 110, 230, 255],
    [150, 80, 220, 255],
    [220, 90, 180, 255],
];

const CULLED: [u8; 4] = [50, 50, 50, 255];
const OUTLINE: [u8; 4] = [15, 15, 15, 255];

fn level_color(level: u8) -> [u8; 4] {
    LEVEL_COLORS[level as usize % LEVEL_COLORS.len()]
}

impl DebugCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
    }

    pub fn record(
        &mut self,
        node: NodeIndex,
        aabb: Aabb,
        lod_level: u8,
        outcome: NodeSelection,
        flags: AreaFlags,
    ) {
        self.boxes.push(DebugBox {
            node,
            aabb,
            lod_level,
            outcome,
            flags,
        });
    }

    /// Boxes in visit order.
    pub fn boxes(&self) -> &[DebugBox] {
        &self.boxes
    }

    /// Project the log onto the terrain's XZ footprint.
    ///
    /// Frustum-culled nodes are shaded dark grey, then selected areas are painted in
    /// their level color and outlined. Finer levels are visited after their parents, so
    /// they land on top.
    pub fn render_top_down(
        &self,
        dimension: &TerrainDimension,
        width: u32,
        height: u32,
    ) -> DebugImage {
        let mut image = DebugImage::new(width, height);
        if width == 0 || height == 0 {
            return image;
        }
        let to_pixels = |aabb: &Aabb| {
            let px = |v: f32, origin: f32, extent: f32, pixels: u32| {
                let t = ((v - origin) / extent.max(f32::EPSILON)).clamp(0.0, 1.0);
                (t * pixels as f32).round() as u32
            };
            (
                px(aabb.min.x, dimension.min.x, dimension.size.x, width),
                px(aabb.min.z, dimension.min.z, dimension.size.z, height),
                px(aabb.max.x, dimension.min.x, dimension.size.x, width),
                px(aabb.max.z, dimension.min.z, dimension.size.z, height),
            )
        };

        for b in self.boxes.iter().filter(|b| b.outcome == NodeSelection::OutOfFrustum) {
            let (x0, y0, x1, y1) = to_pixels(&b.aabb);
            image.fill_rect(x0, y0, x1, y1, CULLED);
        }

        for b in self.boxes.iter().filter(|b| b.outcome == NodeSelection::Selected) {
            let entry = crate::SelectedNode {
                node: b.node,
                aabb: b.aabb,
                flags: b.flags,
                lod_level: b.lod_level,
            };
            for area in entry.quadrant_aabbs() {
                let (x0, y0, x1, y1) = to_pixels(&area);
                image.fill_rect(x0, y0, x1, y1, level_color(b.lod_level));
                image.stroke_rect(x0, y0, x1, y1, OUTLINE);
            }
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn dimension() -> TerrainDimension {
        TerrainDimension::new(Vec3::ZERO, Vec3::new(16.0, 1.0, 16.0))
    }

    #[test]
    fn test_record_and_clear() {
        let mut canvas = DebugCanvas::new();
        canvas.record(
            3,
            Aabb::new(Vec3::ZERO, Vec3::ONE),
            1,
            NodeSelection::OutOfLodRange,
            AreaFlags::NONE,
        );
        assert_eq!(canvas.boxes().len(), 1);
        assert_eq!(canvas.boxes()[0].node, 3);
        canvas.clear();
        assert!(canvas.boxes().is_empty());
    }

    #[test]
    fn test_render_paints_selected_quadrants_only() {
        let mut canvas = DebugCanvas::new();
        canvas.record(
            0,
            Aabb::new(Vec3::ZERO, Vec3::new(16.0, 1.0, 16.0)),
            0,
            NodeSelection::Selected,
            AreaFlags::BOTTOM_RIGHT,
        );
        let image = canvas.render_top_down(&dimension(), 16, 16);
        assert_eq!(image.get_pixel(12, 12), level_color(0));
        assert_eq!(image.get_pixel(3, 3), [0, 0, 0, 0]);
        assert_eq!(image.get_pixel(8, 8), OUTLINE);
    }

    #[test]
    fn test_render_shades_culled_nodes() {
        let mut canvas = DebugCanvas::new();
        canvas.record(
            0,
            Aabb::new(Vec3::ZERO, Vec3::new(8.0, 1.0, 8.0)),
            1,
            NodeSelection::OutOfFrustum,
            AreaFlags::NONE,
        );
        let image = canvas.render_top_down(&dimension(), 16, 16);
        assert_eq!(image.get_pixel(2, 2), CULLED);
        assert_eq!(image.get_pixel(12, 12), [0, 0, 0, 0]);
    }
}
