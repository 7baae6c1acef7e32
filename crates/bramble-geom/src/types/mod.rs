// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounding volumes and query shapes.
//!
//! Overlap semantics are inclusive on faces to avoid pair churn on contact
//! boundaries. Query shapes answer conservative "may intersect" tests against
//! an [`aabb::Aabb`]; exact shape tests belong to the narrow phase.

#[doc = "Axis-aligned bounding boxes (world space)."]
pub mod aabb;
#[doc = "View frusta bounded by six inward-facing planes."]
pub mod frustum;
#[doc = "Rays with normalised directions."]
pub mod ray;
#[doc = "Bounding spheres."]
pub mod sphere;
