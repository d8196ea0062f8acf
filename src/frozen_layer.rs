/*
    Copyright 2023 github.com/programaquatic

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

//! Frozen layer (C8): immobile particles sampled near/inside the
//! obstacle, split into a flat wall-adjacent store and three axial
//! slabs around the funnel, each pruned by a polar-sector `AngleIndex` so
//! a fluid particle near the funnel only scans nearby frozen particles
//! instead of the whole slab.

use std::f32::consts::PI;

use glam::Vec3;

use crate::particle_store::{IdCounter, ParticleStore};
use crate::sdf::CompositeSdf;

/// Sector width `δ = 2·arcsin(r_c / sqrt(|y0|))`: any frozen particle
/// within `r_c` of a query point lies in the query's sector or one of its
/// two neighbors.
#[derive(Debug, Clone)]
pub struct AngleIndex {
    sector_size: f32,
    n_sectors: usize,
    sector_of: Vec<usize>,
}

impl AngleIndex {
    pub fn new(rc: f32, y0: f32) -> Self {
        assert!(y0 < 0.0, "funnel throat y0 must be negative");
        let sector_size = 2.0 * (rc / (-y0).sqrt()).asin();
        let n_sectors = ((2.0 * PI) / sector_size).floor() as usize + 1;
        AngleIndex {
            sector_size,
            n_sectors,
            sector_of: Vec::new(),
        }
    }

    fn angle(x: f32, y: f32) -> f32 {
        y.atan2(x) + PI
    }

    pub fn sector_index(&self, x: f32, y: f32) -> usize {
        let angle = Self::angle(x, y).clamp(0.0, 2.0 * PI);
        ((angle / self.sector_size) as usize).min(self.n_sectors - 1)
    }

    /// Precompute each slab particle's sector so `is_close` is O(1).
    pub fn build(&mut self, positions: &[Vec3]) {
        self.sector_of = positions.iter().map(|p| self.sector_index(p.x, p.y)).collect();
    }

    pub fn is_close(&self, query_sector: usize, slab_index: usize) -> bool {
        let dest = self.sector_of[slab_index];
        dest == query_sector
            || (dest + 1) % self.n_sectors == query_sector
            || (dest + self.n_sectors - 1) % self.n_sectors == query_sector
    }

    pub fn n_sectors(&self) -> usize {
        self.n_sectors
    }
}

/// One of the three `r_c`-wide axial slabs around the funnel, each a
/// small frozen store plus its own angle index.
#[derive(Debug, Clone)]
pub struct FrozenSlab {
    pub store: ParticleStore,
    pub angle_index: AngleIndex,
}

/// The full frozen layer: particles frozen by proximity to the flat
/// sandwich wall (interact with fluid via plain all-pairs DPD, same as
/// the fluid-fluid kernel) and particles frozen by the funnel obstacle,
/// partitioned into three axial slabs (interact via the angle-indexed
/// kernel).
#[derive(Debug, Clone)]
pub struct FrozenLayer {
    pub wall: ParticleStore,
    pub slabs: [FrozenSlab; 3],
}

/// z-bounds of each of the three `r_c`-wide slabs, centered at
/// `z ∈ {-rc, 0, +rc}`.
fn slab_bounds(rc: f32) -> [(f32, f32); 3] {
    [
        (-1.5 * rc, -0.5 * rc),
        (-0.5 * rc, 0.5 * rc),
        (0.5 * rc, 1.5 * rc),
    ]
}

/// Per the spec's literal frozen predicate (an explicit Open Question
/// resolution, see DESIGN.md): the sandwich contribution uses `L/2 - rc`,
/// not the configurable wall half-width.
pub fn is_wall_frozen(z: f32, box_side: f32, rc: f32) -> bool {
    z.abs() > box_side / 2.0 - rc
}

impl FrozenLayer {
    /// An empty frozen layer, used by the equilibration phase (no
    /// obstacle carved yet) when a dump frame still needs a `FrozenLayer`
    /// to report against.
    pub fn empty(rc: f32) -> Self {
        FrozenLayer {
            wall: ParticleStore::with_capacity(0),
            slabs: std::array::from_fn(|_| FrozenSlab {
                store: ParticleStore::with_capacity(0),
                angle_index: AngleIndex::new(rc, -10.0),
            }),
        }
    }

    /// Carve `fluid` into a (smaller) remaining fluid store and a
    /// `FrozenLayer`, re-assigning contiguous ids to every partition from
    /// `id_counter`. Particles that are funnel-frozen but fall outside
    /// all three slab windows are dropped: they sit deep enough inside
    /// the solid that they never interact with anything, matching the
    /// source's own carveAllLayers, which discards the same particles.
    pub fn carve(
        fluid: &ParticleStore,
        sdf: &CompositeSdf,
        box_side: f32,
        rc: f32,
        id_counter: &mut IdCounter,
    ) -> (ParticleStore, FrozenLayer) {
        let n = fluid.len();
        let mut remaining = ParticleStore::with_capacity(n);
        let mut wall = ParticleStore::with_capacity(n / 16 + 1);
        let bounds = slab_bounds(rc);
        let mut slab_stores: [ParticleStore; 3] = [
            ParticleStore::with_capacity(n / 16 + 1),
            ParticleStore::with_capacity(n / 16 + 1),
            ParticleStore::with_capacity(n / 16 + 1),
        ];

        for i in 0..n {
            let p = fluid.pos(i);
            let v = fluid.vel(i);
            let m = fluid.mass(i);

            let funnel_frozen = sdf.funnel_inside(p.x, p.y);
            let wall_frozen = is_wall_frozen(p.z, box_side, rc);

            if !funnel_frozen && !wall_frozen {
                remaining.push(p, v, m, 0);
                continue;
            }

            if funnel_frozen {
                if let Some(slab) = bounds
                    .iter()
                    .position(|&(lo, hi)| p.z > lo && p.z < hi)
                {
                    slab_stores[slab].push(p, Vec3::ZERO, m, 0);
                }
                // else: inside the funnel body but outside all three
                // slabs — discarded, it never participates in C5.
                continue;
            }

            // wall_frozen only.
            wall.push(p, Vec3::ZERO, m, 0);
        }

        remaining.reassign_ids(id_counter.acquire(remaining.len()));
        wall.reassign_ids(id_counter.acquire(wall.len()));

        let y0 = sdf.funnel.as_ref().map(|f| f.y0).unwrap_or(-f32::EPSILON - 1.0);
        let slabs = slab_stores.map(|mut store| {
            store.reassign_ids(id_counter.acquire(store.len()));
            let mut angle_index = AngleIndex::new(rc, y0);
            angle_index.build(store.positions());
            FrozenSlab { store, angle_index }
        });

        (remaining, FrozenLayer { wall, slabs })
    }
}
