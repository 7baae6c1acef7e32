// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::math::Vec3;
use crate::types::aabb::Aabb;

/// Sphere given by center and radius.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    /// Center point.
    pub center: Vec3,
    /// Radius; negative values are treated as zero.
    pub radius: f32,
}

impl Sphere {
    /// Creates a sphere.
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    /// Tight bounding box of the sphere.
    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_center_half_extents(self.center, self.radius, self.radius, self.radius)
    }

    /// Returns `true` if the sphere touches or overlaps `aabb`.
    #[must_use]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let closest = self.center.max(&aabb.min()).min(&aabb.max());
        closest.sub(&self.center).length_squared() <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_gap_is_not_an_intersection() {
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        // Box of the sphere overlaps the cube corner; the sphere itself does not.
        let s = Sphere::new(Vec3::splat(1.6), 1.0);
        assert!(s.bounding_box().overlaps(&b));
        assert!(!s.intersects_aabb(&b));
        assert!(Sphere::new(Vec3::splat(1.5), 1.0).intersects_aabb(&b));
    }
}
