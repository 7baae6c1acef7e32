// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use bramble_geom::{Aabb, Frustum, Ray, Sphere};

use crate::entry::Entry;
use crate::error::BroadPhaseError;

/// Kinds of spatial query, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Ray cast with no length limit.
    UnboundedRay,
    /// Ray cast limited to a maximum length.
    BoundedRay,
    /// Box overlap.
    Box,
    /// Sphere overlap.
    Sphere,
    /// Frustum overlap.
    Frustum,
}

impl core::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::UnboundedRay => "unbounded ray",
            Self::BoundedRay => "bounded ray",
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Frustum => "frustum",
        })
    }
}

/// Volume accepted by [`QueryAccelerator::entries`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryVolume {
    /// Axis-aligned box.
    Box(Aabb),
    /// Sphere.
    Sphere(Sphere),
    /// Six-plane frustum.
    Frustum(Frustum),
}

impl QueryVolume {
    /// Query kind, for error reporting.
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Box(_) => QueryKind::Box,
            Self::Sphere(_) => QueryKind::Sphere,
            Self::Frustum(_) => QueryKind::Frustum,
        }
    }

    /// Conservative test against a bounding box.
    pub fn intersects(&self, aabb: &Aabb) -> bool {
        match self {
            Self::Box(b) => b.overlaps(aabb),
            Self::Sphere(s) => s.intersects_aabb(aabb),
            Self::Frustum(f) => f.intersects_aabb(aabb),
        }
    }

    /// Finite box enclosing the volume, if it has one.
    ///
    /// Frusta are treated as unbounded.
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            Self::Box(b) => Some(*b),
            Self::Sphere(s) => Some(s.bounding_box()),
            Self::Frustum(_) => None,
        }
    }
}

/// One ray-cast result.
#[derive(Debug)]
pub struct RayHit<E> {
    /// Entry whose bounding box the ray enters.
    pub entry: Arc<E>,
    /// Distance along the ray to the box entry point (0 when starting inside).
    pub distance: f32,
}

impl<E> Clone for RayHit<E> {
    fn clone(&self) -> Self {
        Self { entry: Arc::clone(&self.entry), distance: self.distance }
    }
}

/// Spatial queries answered from the structure a broad phase maintains.
///
/// Results reflect bounding boxes as of the last `update`. Hits are ordered
/// by distance then id; volume results are ordered by id.
pub trait QueryAccelerator<E: Entry> {
    /// Appends every entry whose box the ray enters within `max_length`
    /// (`None` = unbounded).
    ///
    /// # Errors
    /// [`BroadPhaseError::UnsupportedQuery`] if the strategy cannot answer.
    fn ray_cast(
        &self,
        ray: &Ray,
        max_length: Option<f32>,
        hits: &mut Vec<RayHit<E>>,
    ) -> Result<(), BroadPhaseError>;

    /// Appends every entry whose box intersects `volume`.
    ///
    /// # Errors
    /// [`BroadPhaseError::UnsupportedQuery`] if the strategy cannot answer.
    fn entries(&self, volume: &QueryVolume, out: &mut Vec<Arc<E>>) -> Result<(), BroadPhaseError>;
}

/// Sorts hits by distance, then entry id.
pub(crate) fn sort_hits<E: Entry>(hits: &mut [RayHit<E>]) {
    hits.sort_by(|a, b| {
        a.distance.total_cmp(&b.distance).then_with(|| a.entry.id().cmp(&b.entry.id()))
    });
}

/// Bounding box of the ray segment `[0, length]`.
pub(crate) fn segment_bounds(ray: &Ray, length: f32) -> Aabb {
    let start = ray.origin();
    let end = ray.at(length);
    Aabb::new(start.min(&end), start.max(&end))
}
