// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use bramble_broad::{BoxProxy, Entry};
use bramble_geom::{Aabb, Prng, Vec3};

/// Every seventh box joins group 1, so rule filtering is exercised.
const GROUPED_EVERY: u64 = 7;

/// Boxes drifting at constant velocity inside a cube, bouncing off its walls.
pub struct Scene {
    pub proxies: Vec<Arc<BoxProxy>>,
    velocities: Vec<Vec3>,
    extent: f32,
}

impl Scene {
    /// Deterministic scene for `seed`.
    pub fn generate(seed: u64, entries: usize, extent: f32) -> Self {
        let mut rng = Prng::from_seed_u64(seed);
        let speed = extent * 0.01;
        let mut proxies = Vec::with_capacity(entries);
        let mut velocities = Vec::with_capacity(entries);
        for id in 0..entries as u64 {
            let center = Vec3::new(
                rng.next_range(-extent, extent),
                rng.next_range(-extent, extent),
                rng.next_range(-extent, extent),
            );
            let half = Vec3::new(rng.next_range(0.3, 1.5), rng.next_range(0.3, 1.5), rng.next_range(0.3, 1.5));
            let aabb = Aabb::from_center_half_extents(center, half.x(), half.y(), half.z());
            let group = if id % GROUPED_EVERY == 0 { 1 } else { 0 };
            proxies.push(Arc::new(BoxProxy::new(id, aabb).with_group(group)));
            velocities.push(Vec3::new(
                rng.next_range(-speed, speed),
                rng.next_range(-speed, speed),
                rng.next_range(-speed, speed),
            ));
        }
        Self { proxies, velocities, extent }
    }

    /// Advances every box by one step.
    pub fn step(&mut self) {
        for (proxy, velocity) in self.proxies.iter().zip(self.velocities.iter_mut()) {
            let center = proxy.bounding_box().center().to_array();
            let mut v = velocity.to_array();
            for axis in 0..3 {
                if (center[axis] + v[axis]).abs() > self.extent {
                    v[axis] = -v[axis];
                }
            }
            *velocity = Vec3::from(v);
            proxy.translate(velocity);
        }
    }
}
