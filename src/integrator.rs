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

//! Velocity-Verlet integrator (C9): half-kick, drift, wrap, bounce,
//! half-kick. Force evaluation (C5) sits between the two half-kicks and is
//! the driver's (C10) responsibility, since it needs a freshly rebuilt
//! cell-list on the post-drift positions.

use glam::Vec3;
use rayon::prelude::*;

use crate::bounce::BounceSolver;
use crate::particle_store::ParticleStore;
use crate::periodic_box::PeriodicBox;
use crate::sdf::CompositeSdf;

/// Per-step bounce statistics, handed back to the driver so it can decide
/// whether `failed` exceeds the configured threshold and should abort the
/// run with [`crate::error::SimError::BounceFailureExceeded`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StepCounters {
    pub collided: usize,
    pub failed: usize,
}

/// `v += 1/2 * dt * f / m`, parallel over particles.
pub fn half_kick(store: &mut ParticleStore, dt: f32) {
    let n = store.len();
    let velocities = store.velocities().to_vec();
    let forces = store.forces_mut().to_vec();
    let masses = store.masses().to_vec();

    let new_vels: Vec<Vec3> = (0..n)
        .into_par_iter()
        .map(|i| velocities[i] + 0.5 * dt * forces[i] / masses[i])
        .collect();

    for (i, v) in new_vels.into_iter().enumerate() {
        store.set_vel(i, v);
    }
}

/// `x += dt * v`, wrap into the periodic box, then resolve any surface
/// penetration via the bounce solver. Parallel over particles: each
/// particle's trajectory is resolved independently of the others.
pub fn drift_wrap_bounce(
    store: &mut ParticleStore,
    box_: &PeriodicBox,
    sdf: &CompositeSdf,
    bouncer: &BounceSolver,
    dt: f32,
) -> StepCounters {
    let n = store.len();
    let positions = store.positions().to_vec();
    let velocities = store.velocities().to_vec();

    let results: Vec<(Vec3, Vec3, bool, bool)> = (0..n)
        .into_par_iter()
        .map(|i| {
            let drifted = positions[i] + dt * velocities[i];
            let wrapped = box_.wrap(drifted);
            let r = bouncer.bounce_particle(sdf, wrapped, velocities[i], dt);
            (r.pos, r.vel, r.collided, r.failed)
        })
        .collect();

    let mut counters = StepCounters::default();
    for (i, (pos, vel, collided, failed)) in results.into_iter().enumerate() {
        store.set_pos(i, pos);
        store.set_vel(i, vel);
        if collided {
            counters.collided += 1;
        }
        if failed {
            counters.failed += 1;
        }
    }
    counters
}
