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

//! Structure-of-arrays particle store (C2).
//!
//! This is deliberately NOT an entity/component store: every particle is
//! a plain index into parallel arrays, which is what C5's hot pairwise
//! loop wants to iterate cache-friendly.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Global, process-wide, monotonically increasing particle id counter.
/// Ids are assigned once at creation and never change; they are the sort
/// key for the random stream (C1).
#[derive(Debug, Default)]
pub struct IdCounter(u64);

impl IdCounter {
    pub fn new() -> Self {
        IdCounter(0)
    }

    /// Reserve `n` contiguous ids, returning the first one.
    pub fn acquire(&mut self, n: usize) -> u64 {
        let start = self.0;
        self.0 += n as u64;
        start
    }
}

/// A single fluid/frozen particle's persisted state, used at the
/// boundaries (initial condition, restart, carve) where per-particle
/// values need to travel together.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub pos: [f32; 3],
    pub vel: [f32; 3],
}

/// Structure-of-arrays store of N particles: position, velocity, force
/// accumulator, mass, and global id. Capacity does not grow during the
/// main loop; `carve` and restart construct a fresh store instead of
/// mutating one in place.
#[derive(Debug, Default, Clone)]
pub struct ParticleStore {
    pos: Vec<Vec3>,
    vel: Vec<Vec3>,
    force: Vec<Vec3>,
    mass: Vec<f32>,
    id: Vec<u64>,
}

impl ParticleStore {
    pub fn with_capacity(n: usize) -> Self {
        ParticleStore {
            pos: Vec::with_capacity(n),
            vel: Vec::with_capacity(n),
            force: Vec::with_capacity(n),
            mass: Vec::with_capacity(n),
            id: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos.is_empty()
    }

    pub fn push(&mut self, pos: Vec3, vel: Vec3, mass: f32, id: u64) {
        self.pos.push(pos);
        self.vel.push(vel);
        self.force.push(Vec3::ZERO);
        self.mass.push(mass);
        self.id.push(id);
    }

    pub fn pos(&self, i: usize) -> Vec3 {
        self.pos[i]
    }

    pub fn vel(&self, i: usize) -> Vec3 {
        self.vel[i]
    }

    pub fn force(&self, i: usize) -> Vec3 {
        self.force[i]
    }

    pub fn force_mut(&mut self, i: usize) -> &mut Vec3 {
        &mut self.force[i]
    }

    pub fn mass(&self, i: usize) -> f32 {
        self.mass[i]
    }

    pub fn id(&self, i: usize) -> u64 {
        self.id[i]
    }

    pub fn set_pos(&mut self, i: usize, pos: Vec3) {
        self.pos[i] = pos;
    }

    pub fn set_vel(&mut self, i: usize, vel: Vec3) {
        self.vel[i] = vel;
    }

    pub fn add_force(&mut self, i: usize, f: Vec3) {
        self.force[i] += f;
    }

    pub fn zero_forces(&mut self) {
        for f in self.force.iter_mut() {
            *f = Vec3::ZERO;
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.pos
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.vel
    }

    pub fn forces_mut(&mut self) -> &mut [Vec3] {
        &mut self.force
    }

    pub fn ids(&self) -> &[u64] {
        &self.id
    }

    pub fn masses(&self) -> &[f32] {
        &self.mass
    }

    /// Total kinetic energy `Σ 1/2 m v²`, used by the diagnostics writer.
    pub fn kinetic_energy(&self) -> f64 {
        self.vel
            .iter()
            .zip(self.mass.iter())
            .map(|(v, m)| 0.5 * (*m as f64) * (v.length_squared() as f64))
            .sum()
    }

    /// Total linear momentum, used by the diagnostics writer and the
    /// momentum-conservation test.
    pub fn total_momentum(&self) -> Vec3 {
        self.vel
            .iter()
            .zip(self.mass.iter())
            .fold(Vec3::ZERO, |acc, (v, m)| acc + *v * *m)
    }

    pub fn total_mass(&self) -> f64 {
        self.mass.iter().map(|m| *m as f64).sum()
    }

    /// Re-assign contiguous ids starting at `start`, used after carve
    /// splits a store and both halves need fresh id ranges.
    pub fn reassign_ids(&mut self, start: u64) {
        for (slot, id) in self.id.iter_mut().enumerate() {
            *id = start + slot as u64;
        }
    }

    pub fn to_records(&self) -> Vec<ParticleRecord> {
        self.pos
            .iter()
            .zip(self.vel.iter())
            .map(|(p, v)| ParticleRecord {
                pos: [p.x, p.y, p.z],
                vel: [v.x, v.y, v.z],
            })
            .collect()
    }

    pub fn from_records(records: &[ParticleRecord], mass: f32, id_start: u64) -> Self {
        let mut store = ParticleStore::with_capacity(records.len());
        for (slot, r) in records.iter().enumerate() {
            store.push(
                Vec3::from(r.pos),
                Vec3::from(r.vel),
                mass,
                id_start + slot as u64,
            );
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_access_roundtrip() {
        let mut store = ParticleStore::with_capacity(2);
        store.push(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 1.0, 0);
        store.push(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.1, 0.0, 0.0), 1.0, 1);

        assert_eq!(store.len(), 2);
        assert_eq!(store.pos(0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(store.id(1), 1);
    }

    #[test]
    fn zero_forces_clears_all_accumulators() {
        let mut store = ParticleStore::with_capacity(1);
        store.push(Vec3::ZERO, Vec3::ZERO, 1.0, 0);
        store.add_force(0, Vec3::ONE);
        store.zero_forces();
        assert_eq!(store.force(0), Vec3::ZERO);
    }

    #[test]
    fn reassign_ids_is_contiguous() {
        let mut store = ParticleStore::with_capacity(3);
        for _ in 0..3 {
            store.push(Vec3::ZERO, Vec3::ZERO, 1.0, 999);
        }
        store.reassign_ids(10);
        assert_eq!(store.ids(), &[10, 11, 12]);
    }

    #[test]
    fn records_roundtrip() {
        let mut store = ParticleStore::with_capacity(1);
        store.push(Vec3::new(1.0, -2.0, 3.5), Vec3::new(0.1, 0.2, 0.3), 1.0, 0);
        let records = store.to_records();
        let restored = ParticleStore::from_records(&records, 1.0, 0);
        assert_eq!(restored.pos(0), store.pos(0));
        assert_eq!(restored.vel(0), store.vel(0));
    }
}
