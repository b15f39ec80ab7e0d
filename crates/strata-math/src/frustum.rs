//! View-frustum extraction and three-way AABB classification.
//!
//! Planes are extracted from a combined view-projection matrix. The near/far pair is
//! taken from `row2` and `row3 - row2`, which bound clip-space depth to `[0, w]`; this
//! holds for both conventional and reverse-Z projections (the two planes just swap
//! roles).

use glam::{Mat4, Vec3, Vec4};

use crate::Aabb;

/// Plane indices into the frustum planes array.
const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Result of testing an AABB against the frustum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// The box is entirely outside at least one plane.
    Invisible,
    /// The box straddles one or more planes.
    Intersecting,
    /// The box is entirely inside all six planes.
    FullyVisible,
}

/// A view frustum defined by six inward-pointing planes.
#[derive(Clone, Debug, PartialEq)]
pub struct Frustum {
    /// Six planes: left, right, bottom, top, near, far.
    /// Each `Vec4(a, b, c, d)` where `(a,b,c)` is the normalized inward
    /// normal and `d` is the signed distance term.
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a combined view-projection matrix
    /// using the Gribb-Hartmann method.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        Self::from_planes(planes)
    }

    /// Build a frustum from six inward-facing planes. Planes are normalized so that
    /// `(a,b,c)` is a unit vector; degenerate planes are kept as-is.
    pub fn from_planes(mut planes: [Vec4; 6]) -> Self {
        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }
        Self { planes }
    }

    /// The six normalized planes in left, right, bottom, top, near, far order.
    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Classify an AABB using the p-vertex / n-vertex method.
    ///
    /// For each plane, the p-vertex is the corner furthest along the plane normal
    /// and the n-vertex the corner furthest against it. A p-vertex behind any plane
    /// makes the box invisible; an n-vertex behind a plane makes it intersecting.
    pub fn classify(&self, aabb: &Aabb) -> Visibility {
        let mut result = Visibility::FullyVisible;

        for plane in &self.planes {
            let normal = plane.truncate();
            let d = plane.w;

            let p = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            if normal.dot(p) + d < 0.0 {
                return Visibility::Invisible;
            }

            let n = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.min, aabb.max);
            if normal.dot(n) + d < 0.0 {
                result = Visibility::Intersecting;
            }
        }

        result
    }

    /// Returns `true` if the AABB is at least partially inside the frustum.
    ///
    /// Conservative near frustum corners: may report boxes just outside a corner as
    /// visible, never reports a visible box as invisible.
    pub fn is_visible(&self, aabb: &Aabb) -> bool {
        self.classify(aabb) != Visibility::Invisible
    }
}
