//! Indexed triangle meshes fed to the LBVH builder.

use glam::Vec3;
use strata_math::Aabb;
use strata_terrain::{HeightRaster, MAX_HEIGHT, TerrainDimension};

use crate::BvhError;

/// One triangle, as three indices into [`TriangleMesh::vertices`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Primitive {
    pub indices: [u32; 3],
}

static_assertions::assert_eq_size!(Primitive, [u32; 3]);

impl Primitive {
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }
}

/// Immutable triangle soup with validated indices.
#[derive(Clone, Debug)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    primitives: Vec<Primitive>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Vec3>, primitives: Vec<Primitive>) -> Result<Self, BvhError> {
        for (primitive, p) in primitives.iter().enumerate() {
            if let Some(&index) = p.indices.iter().find(|&&i| i as usize >= vertices.len()) {
                return Err(BvhError::IndexOutOfRange {
                    primitive,
                    index,
                    vertex_count: vertices.len(),
                });
            }
        }
        Ok(Self {
            vertices,
            primitives,
        })
    }

    /// Triangulate every `step`-th raster sample into a regular grid placed by
    /// `dimension`. Each grid cell yields two triangles.
    pub fn from_raster(
        raster: &HeightRaster,
        dimension: &TerrainDimension,
        step: u32,
    ) -> Result<Self, BvhError> {
        let step = step.max(1);
        let xs: Vec<u32> = grid_coords(raster.width(), step);
        let ys: Vec<u32> = grid_coords(raster.height(), step);
        let sx = dimension.size.x / (raster.width() - 1).max(1) as f32;
        let sz = dimension.size.z / (raster.height() - 1).max(1) as f32;

        let mut vertices = Vec::with_capacity(xs.len() * ys.len());
        for &y in &ys {
            for &x in &xs {
                let h = raster.elevation(x, y) as f32 / MAX_HEIGHT as f32 * dimension.size.y;
                vertices.push(dimension.min + Vec3::new(x as f32 * sx, h, y as f32 * sz));
            }
        }

        let cols = xs.len() as u32;
        let mut primitives = Vec::new();
        for row in 0..ys.len().saturating_sub(1) as u32 {
            for col in 0..cols.saturating_sub(1) {
                let i = row * cols + col;
                primitives.push(Primitive::new(i, i + cols, i + 1));
                primitives.push(Primitive::new(i + 1, i + cols, i + cols + 1));
            }
        }
        Self::new(vertices, primitives)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Corner positions of primitive `index`.
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        self.primitives[index]
            .indices
            .map(|i| self.vertices[i as usize])
    }

    pub fn primitive_aabb(&self, index: usize) -> Aabb {
        Aabb::from_points(self.triangle(index))
    }
}

/// `0, step, 2*step, ...` plus the last sample, so the grid always reaches the edge.
fn grid_coords(len: u32, step: u32) -> Vec<u32> {
    let last = len.saturating_sub(1);
    let mut coords: Vec<u32> = (0..=last).step_by(step as usize).collect();
    if coords.last() != Some(&last) {
        coords.push(last);
    }
    coords
}
