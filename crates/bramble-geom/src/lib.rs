// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![doc = r"Geometry primitives for Bramble.

This crate provides:
- A float32 vector type (`Vec3`) and a deterministic PRNG (`Prng`).
- Axis-aligned bounding boxes (`Aabb`) with inclusive face overlap.
- Query shapes consumed by broad-phase accelerators (`Ray`, `Sphere`,
  `Frustum`).

Design notes:
- Float32 throughout; no fused multiply-add so results match across platforms.
- Overlap is inclusive on faces: touching boxes are considered overlapping.
"]

/// Vector math and pseudo-random numbers.
pub mod math;
/// Bounding volumes and query shapes.
pub mod types;

pub use math::{Prng, Vec3};
pub use types::aabb::Aabb;
pub use types::frustum::{Frustum, Plane};
pub use types::ray::Ray;
pub use types::sphere::Sphere;
