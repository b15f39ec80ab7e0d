//! Scripted camera path over the terrain.

use glam::{Mat4, Vec3};
use strata_config::CameraConfig;
use strata_lod::{CameraState, CdlodTree};

/// Minimum clearance kept between the eye and the ground.
const EYE_CLEARANCE: f32 = 2.0;

/// Orbits the terrain center at half its radius, looking ahead along the path.
pub struct Flythrough {
    center: Vec3,
    radius: f32,
    frames: u32,
    projection: Mat4,
    near: f32,
    far: f32,
}

impl Flythrough {
    pub fn new(tree: &CdlodTree, camera: &CameraConfig, frames: u32) -> Self {
        let dim = tree.dimension();
        let center = dim.min + dim.size * 0.5;
        let radius = 0.25 * dim.size.x.min(dim.size.z);
        let projection = Mat4::perspective_rh(
            camera.fov_y_degrees.to_radians(),
            camera.aspect,
            camera.near,
            camera.far,
        );
        Self {
            center,
            radius,
            frames: frames.max(1),
            projection,
            near: camera.near,
            far: camera.far,
        }
    }

    fn point(&self, t: f32) -> (f32, f32) {
        let angle = t * std::f32::consts::TAU;
        (
            self.center.x + self.radius * angle.cos(),
            self.center.z + self.radius * angle.sin(),
        )
    }

    /// Camera for `frame`, kept above ground.
    pub fn camera(&self, tree: &CdlodTree, frame: u32) -> CameraState {
        let t = (frame % self.frames) as f32 / self.frames as f32;
        let (x, z) = self.point(t);
        let (ax, az) = self.point(t + 0.05);

        let ground = tree.world_height(x, z);
        let eye = Vec3::new(x, ground + EYE_CLEARANCE + 0.02 * self.radius, z);
        let target = Vec3::new(ax, tree.world_height(ax, az), az);
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);

        CameraState {
            position: eye,
            view_projection: self.projection * view,
            near: self.near,
            far: self.far,
        }
    }
}
