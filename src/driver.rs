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

//! Driver (C10): owns the particle store, frozen layer and global step
//! counter, and runs place → equilibrate → carve → main loop.

use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::bounce::BounceSolver;
use crate::cell_list::CellList;
use crate::config::SimulationConfig;
use crate::dpd::{compute_fluid_fluid_forces, compute_fluid_funnel_forces, compute_fluid_wall_forces, DpdParams};
use crate::diagnostics;
use crate::dump;
use crate::error::{SimError, SimResult};
use crate::frozen_layer::FrozenLayer;
use crate::integrator::{drift_wrap_bounce, half_kick, StepCounters};
use crate::particle_store::{IdCounter, ParticleStore};
use crate::periodic_box::PeriodicBox;
use crate::restart;
use crate::sdf::{CompositeSdf, FunnelGrid, SandwichWall};

/// A serialized funnel grid plus its metadata, the on-disk form of
/// `--funnel-sdf` (§11): `(half_width_x, half_width_y, y0, nx, ny,
/// skin_width)` followed by `nx*ny` phi samples, as JSON.
#[derive(serde::Serialize, serde::Deserialize)]
struct FunnelSdfFile {
    half_width_x: f32,
    half_width_y: f32,
    y0: f32,
    nx: usize,
    ny: usize,
    skin_width: f32,
    phi: Vec<f32>,
}

pub struct Driver {
    config: SimulationConfig,
    id_counter: IdCounter,
}

impl Driver {
    pub fn new(config: SimulationConfig) -> Self {
        Driver {
            config,
            id_counter: IdCounter::new(),
        }
    }

    /// Uniformly sample `N = ceil(density * L^3)` fluid particles at rest
    /// inside the box (§6).
    fn initial_condition(&mut self) -> ParticleStore {
        let n = (self.config.density * self.config.box_side.powi(3)).ceil() as usize;
        let half = self.config.box_side / 2.0;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut store = ParticleStore::with_capacity(n);
        let ids = self.id_counter.acquire(n);
        for slot in 0..n {
            let p = Vec3::new(
                rng.gen_range(-half..half),
                rng.gen_range(-half..half),
                rng.gen_range(-half..half),
            );
            store.push(p, Vec3::ZERO, 1.0, ids + slot as u64);
        }
        store
    }

    fn load_funnel(&self) -> SimResult<Option<FunnelGrid>> {
        let Some(path) = &self.config.funnel_sdf else {
            return Ok(None);
        };
        let raw = std::fs::read_to_string(path)?;
        let file: FunnelSdfFile = serde_json::from_str(&raw)?;
        if file.phi.len() != file.nx * file.ny {
            return Err(SimError::Configuration(format!(
                "funnel SDF grid sample count mismatch: expected {}, got {}",
                file.nx * file.ny,
                file.phi.len()
            )));
        }
        Ok(Some(FunnelGrid::from_samples(
            file.half_width_x,
            file.half_width_y,
            file.y0,
            file.nx,
            file.ny,
            file.phi,
            file.skin_width,
        )))
    }

    pub fn run(&mut self) -> SimResult<()> {
        let cfg = self.config.clone();
        let box_ = PeriodicBox::new(cfg.box_side);
        let bouncer = BounceSolver::default();
        let params = DpdParams::new(cfg.a, cfg.gamma, cfg.kbt, cfg.rc, cfg.power, cfg.dt);

        let mut fluid = if let Some(path) = &cfg.restart_in {
            log::info!("loading restart from {}", path.display());
            let mut store = restart::read(path, 1.0)?;
            store.reassign_ids(self.id_counter.acquire(store.len()));
            store
        } else {
            let store = self.initial_condition();
            log::info!("placed {} fluid particles, equilibrating for {} steps", store.len(), cfg.equilibration_steps);
            let bulk_sdf = CompositeSdf::new(SandwichWall::new(f32::INFINITY), None);
            self.integrate(store, None, &bulk_sdf, &params, &box_, &bouncer, cfg.equilibration_steps, 0, None)?
        };

        let funnel = self.load_funnel()?;
        let sdf = CompositeSdf::new(SandwichWall::new(cfg.wall_halfwidth), funnel);

        log::info!("carving frozen layer (wall_halfwidth={}, funnel={})", cfg.wall_halfwidth, sdf.funnel.is_some());
        let (remaining, frozen) = FrozenLayer::carve(&fluid, &sdf, cfg.box_side, cfg.rc, &mut self.id_counter);
        fluid = remaining;
        log::info!(
            "{} fluid, {} wall-frozen, {} funnel-frozen remain",
            fluid.len(),
            frozen.wall.len(),
            frozen.slabs.iter().map(|s| s.store.len()).sum::<usize>()
        );

        let gravity = Vec3::from(cfg.gravity);
        let fluid = self.integrate(
            fluid,
            Some(&frozen),
            &sdf,
            &params,
            &box_,
            &bouncer,
            cfg.steps,
            cfg.equilibration_steps,
            Some(gravity),
        )?;

        if let Some(path) = &cfg.restart_out {
            restart::write(path, &fluid)?;
            log::info!("wrote restart to {}", path.display());
        }

        Ok(())
    }

    /// Run `n_steps` of velocity-Verlet (§4.9), dumping/diagnosing every
    /// `dump_every` steps, starting the global step counter at `step_base`
    /// (so equilibration and the main loop share one monotonic stream for
    /// the random term, §3). `frozen` is `None` during equilibration.
    #[allow(clippy::too_many_arguments)]
    fn integrate(
        &self,
        mut fluid: ParticleStore,
        frozen: Option<&FrozenLayer>,
        sdf: &CompositeSdf,
        params: &DpdParams,
        box_: &PeriodicBox,
        bouncer: &BounceSolver,
        n_steps: u64,
        step_base: u64,
        gravity: Option<Vec3>,
    ) -> SimResult<ParticleStore> {
        let gravity = gravity.unwrap_or(Vec3::ZERO);

        // §4.9: "the first step uses a = g (no prior force)" — prime the
        // force accumulator before the loop so the first half-kick (item
        // 1) already sees the external acceleration, not just the forces
        // computed from item 5 onward.
        for i in 0..fluid.len() {
            let f = gravity * fluid.mass(i);
            fluid.add_force(i, f);
        }

        for offset in 0..n_steps {
            let step = step_base + offset;

            half_kick(&mut fluid, self.config.dt);
            let counters = drift_wrap_bounce(&mut fluid, box_, sdf, bouncer, self.config.dt);
            self.check_bounce_failures(&counters, fluid.len(), step)?;

            fluid.zero_forces();
            let cell_list = CellList::build(fluid.positions(), self.config.box_side, self.config.rc)?;
            compute_fluid_fluid_forces(&mut fluid, &cell_list, params, step as u32, box_);
            if let Some(frozen) = frozen {
                compute_fluid_wall_forces(&mut fluid, &frozen.wall, params, step as u32, box_);
                compute_fluid_funnel_forces(&mut fluid, frozen, sdf, params, step as u32, box_);
            }
            for i in 0..fluid.len() {
                let f = gravity * fluid.mass(i);
                fluid.add_force(i, f);
            }

            half_kick(&mut fluid, self.config.dt);

            self.check_divergence(&fluid, self.config.kbt, step)?;

            if self.config.dump_every > 0 && step % self.config.dump_every == 0 {
                if let Some(frozen) = frozen {
                    if let Err(e) = dump::append_frame(&self.config.out, step, box_.half_side(), &fluid, frozen) {
                        log::warn!("dump write failed at step {step}: {e}");
                    }
                } else {
                    let empty = FrozenLayer::empty(self.config.rc);
                    if let Err(e) = dump::append_frame(&self.config.out, step, box_.half_side(), &fluid, &empty) {
                        log::warn!("dump write failed at step {step}: {e}");
                    }
                }
                if let Some(path) = &self.config.diagnostics {
                    let time = step as f32 * self.config.dt;
                    if let Err(e) = diagnostics::append_line(path, time, &fluid) {
                        log::warn!("diagnostics write failed at step {step}: {e}");
                    }
                }
            }
        }

        Ok(fluid)
    }

    fn check_bounce_failures(&self, counters: &StepCounters, total: usize, step: u64) -> SimResult<()> {
        if counters.failed == 0 || total == 0 {
            return Ok(());
        }
        let fraction = counters.failed as f32 / total as f32;
        if fraction > self.config.bounce_failure_threshold {
            return Err(SimError::BounceFailureExceeded {
                step,
                failed: counters.failed,
                total,
            });
        }
        log::warn!("{} bounce failures at step {step} (within threshold)", counters.failed);
        Ok(())
    }

    /// §7: a particle diverges when `|v| > 10·√(kBT/m)`; the cap is
    /// per-particle since it depends on that particle's own mass.
    fn check_divergence(&self, fluid: &ParticleStore, kbt: f32, step: u64) -> SimResult<()> {
        let mut offenders = 0usize;
        for i in 0..fluid.len() {
            let v = fluid.vel(i);
            let p = fluid.pos(i);
            if !v.is_finite() || !p.is_finite() {
                return Err(SimError::Divergence {
                    step,
                    detail: format!("non-finite state at particle index {i}"),
                });
            }
            let cap = 10.0 * (kbt / fluid.mass(i)).sqrt();
            if v.length() > cap {
                offenders += 1;
            }
        }
        if offenders > 0 {
            log::warn!("{offenders} particles exceed the divergence velocity threshold at step {step}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_condition_places_approximately_density_times_volume() {
        let cfg = SimulationConfig {
            box_side: 10.0,
            density: 3.0,
            ..SimulationConfig::default()
        };
        let mut driver = Driver::new(cfg);
        let store = driver.initial_condition();
        assert_eq!(store.len(), 3000);
    }

    #[test]
    fn equilibration_only_run_keeps_particles_in_box() {
        let cfg = SimulationConfig {
            box_side: 6.0,
            density: 1.0,
            steps: 5,
            equilibration_steps: 5,
            dump_every: 0,
            ..SimulationConfig::default()
        };
        let mut driver = Driver::new(cfg);
        driver.run().unwrap();
    }
}
