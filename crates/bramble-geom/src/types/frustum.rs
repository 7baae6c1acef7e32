// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::math::Vec3;
use crate::types::aabb::Aabb;

/// Plane `normal · p + offset = 0`; points with a non-negative signed
/// distance are on the inner side.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plane {
    /// Inward-facing unit normal.
    pub normal: Vec3,
    /// Signed offset from the origin.
    pub offset: f32,
}

impl Plane {
    /// Plane through `point` with the given inward `normal` (normalised here).
    #[must_use]
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let n = normal.normalize();
        Self {
            normal: n,
            offset: -n.dot(&point),
        }
    }

    /// Signed distance of `p` from the plane.
    #[must_use]
    pub fn signed_distance(&self, p: &Vec3) -> f32 {
        self.normal.dot(p) + self.offset
    }

    /// Returns `true` if `aabb` lies entirely on the outer side.
    #[must_use]
    pub fn excludes(&self, aabb: &Aabb) -> bool {
        let n = self.normal.to_array();
        let min = aabb.min().to_array();
        let max = aabb.max().to_array();
        // Corner furthest along the normal.
        let p = Vec3::new(
            if n[0] >= 0.0 { max[0] } else { min[0] },
            if n[1] >= 0.0 { max[1] } else { min[1] },
            if n[2] >= 0.0 { max[2] } else { min[2] },
        );
        self.signed_distance(&p) < 0.0
    }
}

/// Convex view volume bounded by six inward-facing planes.
///
/// Ordering: near, far, left, right, bottom, top. The AABB test is
/// conservative: boxes straddling a frustum corner may be reported even when
/// they miss it.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Builds a frustum from explicit planes.
    #[must_use]
    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Right-handed perspective frustum looking from `eye` along `forward`.
    ///
    /// `fov_y` is the full vertical field of view in radians; `aspect` is
    /// width over height.
    #[must_use]
    pub fn perspective(
        eye: Vec3,
        forward: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let f = forward.normalize();
        let r = f.cross(&up).normalize();
        let u = r.cross(&f);
        let h = (fov_y * 0.5).tan();
        let w = h * aspect;

        let near_plane = Plane::from_point_normal(eye.add(&f.scale(near)), f);
        let far_plane = Plane::from_point_normal(eye.add(&f.scale(far)), f.scale(-1.0));
        let left = f.sub(&r.scale(w)).cross(&u);
        let right = u.cross(&f.add(&r.scale(w)));
        let bottom = r.cross(&f.sub(&u.scale(h)));
        let top = f.add(&u.scale(h)).cross(&r);
        Self {
            planes: [
                near_plane,
                far_plane,
                Plane::from_point_normal(eye, left),
                Plane::from_point_normal(eye, right),
                Plane::from_point_normal(eye, bottom),
                Plane::from_point_normal(eye, top),
            ],
        }
    }

    /// Frustum whose planes coincide with the faces of `aabb`.
    #[must_use]
    pub fn from_aabb(aabb: &Aabb) -> Self {
        let min = aabb.min();
        let max = aabb.max();
        Self {
            planes: [
                Plane::from_point_normal(min, Vec3::UNIT_Z),
                Plane::from_point_normal(max, Vec3::UNIT_Z.scale(-1.0)),
                Plane::from_point_normal(min, Vec3::UNIT_X),
                Plane::from_point_normal(max, Vec3::UNIT_X.scale(-1.0)),
                Plane::from_point_normal(min, Vec3::UNIT_Y),
                Plane::from_point_normal(max, Vec3::UNIT_Y.scale(-1.0)),
            ],
        }
    }

    /// The six bounding planes.
    #[must_use]
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Returns `true` if `aabb` may intersect the frustum.
    #[must_use]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        !self.planes.iter().any(|p| p.excludes(aabb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_at(p: Vec3) -> Aabb {
        Aabb::from_center_half_extents(p, 0.5, 0.5, 0.5)
    }

    #[test]
    fn perspective_sees_ahead_not_behind() {
        let fr = Frustum::perspective(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::UNIT_Y,
            core::f32::consts::FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        );
        assert!(fr.intersects_aabb(&unit_at(Vec3::new(0.0, 0.0, -10.0))));
        assert!(!fr.intersects_aabb(&unit_at(Vec3::new(0.0, 0.0, 10.0))));
        assert!(!fr.intersects_aabb(&unit_at(Vec3::new(0.0, 0.0, -200.0))));
        // 90 degree fov: x = 20 at depth 10 is well outside the right plane.
        assert!(!fr.intersects_aabb(&unit_at(Vec3::new(20.0, 0.0, -10.0))));
        assert!(!fr.intersects_aabb(&unit_at(Vec3::new(0.0, -20.0, -10.0))));
    }

    #[test]
    fn box_frustum_matches_box_overlap() {
        let region = Aabb::new(Vec3::ZERO, Vec3::splat(4.0));
        let fr = Frustum::from_aabb(&region);
        for p in [Vec3::splat(2.0), Vec3::splat(4.4), Vec3::splat(5.0), Vec3::splat(-0.6)] {
            let b = unit_at(p);
            assert_eq!(fr.intersects_aabb(&b), region.overlaps(&b), "{p:?}");
        }
    }
}
