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

//! DPD force kernel (C5): symmetric pairwise conservative + dissipative +
//! random force, accelerated by the cell-list for fluid-fluid pairs and
//! by the angle-indexed frozen slabs for fluid-funnel pairs.

use glam::Vec3;
use rayon::prelude::*;

use crate::cell_list::CellList;
use crate::frozen_layer::FrozenLayer;
use crate::particle_store::ParticleStore;
use crate::periodic_box::PeriodicBox;
use crate::random::pairwise_noise;
use crate::sdf::{BoxRegion, CompositeSdf};

#[derive(Debug, Clone, Copy)]
pub struct DpdParams {
    pub a: f32,
    pub gamma: f32,
    pub kbt: f32,
    pub rc: f32,
    pub power: f32,
    pub dt: f32,
    sigma_f: f32,
}

impl DpdParams {
    pub fn new(a: f32, gamma: f32, kbt: f32, rc: f32, power: f32, dt: f32) -> Self {
        let sigma = (2.0 * gamma * kbt).sqrt();
        DpdParams {
            a,
            gamma,
            kbt,
            rc,
            power,
            dt,
            sigma_f: sigma / dt.sqrt(),
        }
    }
}

/// `w(r) = max(0, 1 - r/rc)^power`, the DPD weight function.
fn weight(r: f32, params: &DpdParams) -> f32 {
    (1.0 - r / params.rc).max(0.0).powf(params.power)
}

/// Force contribution on `i` from a single unordered pair `(i, j)`, `j`
/// displaced by `offset` (a periodic image shift). The raw displacement
/// is additionally run through `box_`'s minimum image per component,
/// matching the original's `_xr/_yr/_zr = diff - L*floor(0.5 + diff/L)`
/// at every one of its pairwise-force call sites, fluid-fluid and
/// fluid-frozen alike: a fluid particle near one periodic face must feel
/// frozen/fluid particles sampled near the opposite face. Returns `None`
/// if the pair is beyond the cutoff. `1/r` is capped at `1e5` when `r ==
/// 0` so coincident particles don't produce NaN.
fn pair_force(
    pi: Vec3,
    pj: Vec3,
    vi: Vec3,
    vj: Vec3,
    offset: Vec3,
    noise: f32,
    params: &DpdParams,
    box_: &PeriodicBox,
) -> Option<Vec3> {
    let d = box_.minimum_image(pi - (pj + offset));
    let r2 = d.length_squared();
    if r2 >= params.rc * params.rc {
        return None;
    }

    let inv_r = if r2 == 0.0 { 1e5 } else { 1.0 / r2.sqrt() };
    let r = r2 * inv_r;
    let rhat = d * inv_r;
    let w = weight(r, params);
    let rdotv = rhat.dot(vi - vj);

    let strength = (params.a - params.gamma * w * rdotv + params.sigma_f * noise) * w;
    Some(strength * rhat)
}

/// Fluid-fluid pairwise forces (C5), enumerated via the cell-list's
/// forward half-stencil so every unordered pair is visited exactly once.
/// Parallel over cells with per-thread force deltas, reduced at the end,
/// per the concurrency model's "per-thread force buffers" option.
pub fn compute_fluid_fluid_forces(
    store: &mut ParticleStore,
    cell_list: &CellList,
    params: &DpdParams,
    step: u32,
    box_: &PeriodicBox,
) {
    let positions = store.positions().to_vec();
    let velocities = store.velocities().to_vec();
    let ids = store.ids().to_vec();

    let n_cells = cell_list.cell_count();
    let partial: Vec<Vec<(usize, Vec3)>> = (0..n_cells)
        .into_par_iter()
        .map(|c| {
            let mut local = Vec::new();
            let members = cell_list.members(c);

            for (slot, &i) in members.iter().enumerate() {
                for &j in &members[slot + 1..] {
                    accumulate_pair(i, j, Vec3::ZERO, &positions, &velocities, &ids, params, step, box_, &mut local);
                }
            }

            for nb in cell_list.forward_half_stencil(c) {
                for &i in members {
                    for &j in cell_list.members(nb.cell) {
                        accumulate_pair(i, j, nb.offset, &positions, &velocities, &ids, params, step, box_, &mut local);
                    }
                }
            }

            local
        })
        .collect();

    for local in partial {
        for (i, f) in local {
            store.add_force(i, f);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn accumulate_pair(
    i: usize,
    j: usize,
    offset: Vec3,
    positions: &[Vec3],
    velocities: &[Vec3],
    ids: &[u64],
    params: &DpdParams,
    step: u32,
    box_: &PeriodicBox,
    out: &mut Vec<(usize, Vec3)>,
) {
    let noise = pairwise_noise(ids[i] as u32, ids[j] as u32, step);
    if let Some(f) = pair_force(positions[i], positions[j], velocities[i], velocities[j], offset, noise, params, box_) {
        out.push((i, f));
        out.push((j, -f));
    }
}

/// Fluid-frozen-wall forces: the same kernel as fluid-fluid, but `j`
/// ranges over the (small) wall-adjacent frozen store and force is added
/// to the fluid particle only, since frozen particles never integrate.
/// Matches the source's own choice of a plain nested loop here (no
/// cell-list on the frozen side).
pub fn compute_fluid_wall_forces(
    store: &mut ParticleStore,
    wall: &ParticleStore,
    params: &DpdParams,
    step: u32,
    box_: &PeriodicBox,
) {
    let n = store.len();
    let forces: Vec<Vec3> = (0..n)
        .into_par_iter()
        .map(|i| {
            let pi = store.pos(i);
            let vi = store.vel(i);
            let id_i = store.id(i) as u32;
            let mut f_total = Vec3::ZERO;
            for j in 0..wall.len() {
                let noise = pairwise_noise(id_i, wall.id(j) as u32, step);
                if let Some(f) = pair_force(pi, wall.pos(j), vi, wall.vel(j), Vec3::ZERO, noise, params, box_) {
                    f_total += f;
                }
            }
            f_total
        })
        .collect();

    for (i, f) in forces.into_iter().enumerate() {
        store.add_force(i, f);
    }
}

/// Fluid-funnel forces via the angle-indexed slabs (C5 + C8): only
/// fluid particles inside the funnel's bounding box participate. Each
/// such particle's z is folded into the canonical `[-3rc/2, 3rc/2]`
/// window, which picks which of the three slabs is its "core" slab and
/// what z-offset the other two need to be shifted by to represent the
/// same periodic tiling; the slab's angle index then prunes frozen
/// candidates to the fluid particle's polar sector and its two neighbors.
pub fn compute_fluid_funnel_forces(
    store: &mut ParticleStore,
    frozen: &FrozenLayer,
    sdf: &CompositeSdf,
    params: &DpdParams,
    step: u32,
    box_: &PeriodicBox,
) {
    let Some(funnel) = &sdf.funnel else {
        return;
    };
    let rc = params.rc;
    let w = 3.0 * rc;
    let core_domain_length = funnel.core_domain_length();
    let (xskin, _) = funnel.skin_width();

    let n = store.len();
    let forces: Vec<Vec3> = (0..n)
        .into_par_iter()
        .map(|i| {
            let p = store.pos(i);
            if funnel.bbox_index(p.x, p.y) == BoxRegion::Outside {
                return Vec3::ZERO;
            }

            let v = store.vel(i);
            let id = store.id(i) as u32;

            let x_shifted = p.x + funnel.tile_offset(p.x);
            let coord = Vec3::new(x_shifted, p.y, p.z);

            let mut total = funnel_layer_contrib(coord, v, id, frozen, w, rc, params, step, box_, 0.0);

            if (coord.x - core_domain_length / 2.0).abs() + xskin < rc {
                // The fluid stays in its home tile; the *frozen* replica on
                // the neighboring tile is what needs shifting into the
                // fluid's frame, by +-core_domain_length on the side the
                // fluid is closest to.
                let sign = if coord.x.is_sign_negative() { -1.0 } else { 1.0 };
                total += funnel_layer_contrib(coord, v, id, frozen, w, rc, params, step, box_, sign * core_domain_length);
            }

            total
        })
        .collect();

    for (i, f) in forces.into_iter().enumerate() {
        store.add_force(i, f);
    }
}

/// `tile_shift` is the additive x-offset applied to the *frozen* side of
/// every pair formed here (0.0 for the fluid's home tile, `±core_domain_
/// length` for the neighboring tile's replica) — the fluid's own
/// coordinate never moves out of its home tile.
#[allow(clippy::too_many_arguments)]
fn funnel_layer_contrib(
    coord: Vec3,
    vel: Vec3,
    fluid_id: u32,
    frozen: &FrozenLayer,
    w: f32,
    rc: f32,
    params: &DpdParams,
    step: u32,
    box_: &PeriodicBox,
    tile_shift: f32,
) -> Vec3 {
    let zh = if coord.z > 0.0 { 0.5 } else { -0.5 };
    let z_offset = -(coord.z / w + zh).trunc() * w;
    let shifted = Vec3::new(coord.x, coord.y, coord.z + z_offset);

    let mut core_layer = ((shifted.z + w / 2.0) / rc).trunc() as i32;
    if core_layer == 3 {
        core_layer = 2;
    }
    let core_layer = core_layer.clamp(0, 2) as usize;

    let mut layer_offset_z = [0.0f32; 3];
    if core_layer == 0 {
        layer_offset_z[2] = -w;
    } else if core_layer == 2 {
        layer_offset_z[0] = w;
    }

    let mut total = Vec3::ZERO;
    for (slab_index, slab) in frozen.slabs.iter().enumerate() {
        let layer_offset = Vec3::new(tile_shift, 0.0, layer_offset_z[slab_index]);
        total += slab_contrib(shifted, vel, fluid_id, slab, layer_offset, params, step, box_);
    }
    total
}

#[allow(clippy::too_many_arguments)]
fn slab_contrib(
    coord: Vec3,
    vel: Vec3,
    fluid_id: u32,
    slab: &crate::frozen_layer::FrozenSlab,
    offset: Vec3,
    params: &DpdParams,
    step: u32,
    box_: &PeriodicBox,
) -> Vec3 {
    if slab.store.is_empty() {
        return Vec3::ZERO;
    }
    let src_sector = slab.angle_index.sector_index(coord.x, coord.y);
    let mut total = Vec3::ZERO;

    for j in 0..slab.store.len() {
        if !slab.angle_index.is_close(src_sector, j) {
            continue;
        }
        let noise = pairwise_noise(fluid_id, slab.store.id(j) as u32, step);
        if let Some(f) = pair_force(coord, slab.store.pos(j), vel, slab.store.vel(j), offset, noise, params, box_) {
            total += f;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle_store::ParticleStore;

    #[test]
    fn pair_force_is_zero_beyond_cutoff() {
        let params = DpdParams::new(2.5, 45.0, 0.1, 1.0, 0.25, 0.02);
        let box_ = PeriodicBox::new(10.0);
        let f = pair_force(
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            0.0,
            &params,
            &box_,
        );
        assert!(f.is_none());
    }

    #[test]
    fn pair_force_wraps_through_periodic_boundary() {
        let params = DpdParams::new(2.5, 45.0, 0.1, 1.0, 0.25, 0.02);
        let box_ = PeriodicBox::new(10.0);
        // 0.3 apart through the wrap (at x=4.9 and x=-4.8), far apart raw.
        let f = pair_force(
            Vec3::new(4.9, 0.0, 0.0),
            Vec3::new(-4.8, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            0.0,
            &params,
            &box_,
        );
        assert!(f.is_some(), "periodic images 0.3 apart should interact within rc=1");
    }

    #[test]
    fn two_particle_forces_are_newtons_third_law() {
        let params = DpdParams::new(2.5, 45.0, 0.1, 1.0, 0.25, 0.02);
        let box_ = PeriodicBox::new(10.0);
        let mut store = ParticleStore::with_capacity(2);
        store.push(Vec3::ZERO, Vec3::ZERO, 1.0, 0);
        store.push(Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO, 1.0, 1);

        let cl = CellList::build(store.positions(), 10.0, 1.0).unwrap();
        compute_fluid_fluid_forces(&mut store, &cl, &params, 0, &box_);

        let diff = (store.force(0) + store.force(1)).length();
        assert!(diff < 1e-5, "forces not equal and opposite: {diff}");
    }

    #[test]
    fn wall_forces_wrap_across_periodic_boundary() {
        let params = DpdParams::new(2.5, 45.0, 0.1, 1.0, 0.25, 0.02);
        let box_ = PeriodicBox::new(10.0);
        let mut fluid = ParticleStore::with_capacity(1);
        fluid.push(Vec3::new(4.9, 0.0, 0.0), Vec3::ZERO, 1.0, 0);
        let mut wall = ParticleStore::with_capacity(1);
        wall.push(Vec3::new(-4.8, 0.0, 0.0), Vec3::ZERO, 1.0, 1);

        compute_fluid_wall_forces(&mut fluid, &wall, &params, 0, &box_);
        assert!(fluid.force(0).length() > 0.0, "wall-frozen particle across the periodic face should interact");
    }

    /// The funnel tile-boundary replica must shift the *frozen* particle
    /// into the fluid's home tile, not the fluid into the frozen's tile:
    /// a frozen particle 13.9 away in raw x (as if sitting near the
    /// opposite tile edge) should interact as if it were 0.1 away, once
    /// the `+core_domain_length` replica offset is applied to it.
    #[test]
    fn fluid_funnel_forces_shift_the_frozen_side_not_the_fluid() {
        use crate::frozen_layer::{AngleIndex, FrozenLayer, FrozenSlab};
        use crate::sdf::{CompositeSdf, FunnelGrid, SandwichWall};

        // gamma=0, kbt=0 isolates the conservative term so the expected
        // force is exactly a*w(r), no dissipative/random contribution.
        let params = DpdParams::new(2.5, 0.0, 0.0, 1.0, 0.25, 0.02);
        let box_ = PeriodicBox::new(100.0);

        // Never-solid funnel: only its tiling geometry (half_width_x=7,
        // core_domain_length=14) and bounding box matter here.
        let funnel = FunnelGrid::from_fn(7.0, 10.0, -10.0, 8, 8, 0.0, |_, _| 1.0);
        let sdf = CompositeSdf::new(SandwichWall::new(f32::INFINITY), Some(funnel));

        let mut fluid = ParticleStore::with_capacity(1);
        fluid.push(Vec3::new(6.9, 0.0, 0.0), Vec3::ZERO, 1.0, 1);

        let mut frozen_store = ParticleStore::with_capacity(1);
        frozen_store.push(Vec3::new(6.9 - 14.0 + 0.1, 0.0, 0.0), Vec3::ZERO, 1.0, 0);
        let mut angle_index = AngleIndex::new(0.99, -1.0);
        angle_index.build(frozen_store.positions());
        let core_slab = FrozenSlab {
            store: frozen_store,
            angle_index,
        };
        let empty_slab = || FrozenSlab {
            store: ParticleStore::with_capacity(0),
            angle_index: AngleIndex::new(0.99, -1.0),
        };
        let frozen = FrozenLayer {
            wall: ParticleStore::with_capacity(0),
            slabs: [empty_slab(), core_slab, empty_slab()],
        };

        compute_fluid_funnel_forces(&mut fluid, &frozen, &sdf, &params, 0, &box_);

        let f = fluid.force(0);
        assert!(f.x < -2.0, "expected strong repulsion from the correctly-shifted frozen replica, got {f:?}");
        assert!(f.y.abs() < 1e-4 && f.z.abs() < 1e-4, "force should be along x only, got {f:?}");
    }
}
