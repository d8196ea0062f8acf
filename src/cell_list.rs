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

//! Uniform cell-list spatial index (C4): bins particles into a 3D grid of
//! cells with edge `>= r_c`, rebuilt from scratch once per step after the
//! integrator's drift and wrap.

use glam::Vec3;
use itertools::iproduct;

use crate::error::SimError;

const FLOOR_EPS: f32 = 1e-6;

/// A neighbor cell reached from some origin cell, together with the
/// periodic-image offset (in units of the box side) needed to bring a
/// particle in that cell back into a frame comparable to the origin's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborCell {
    pub cell: usize,
    pub offset: Vec3,
}

/// Counting-sort cell-list: `cell_start` is a prefix sum over per-cell
/// particle counts, `order` is the permutation such that cell `c`'s
/// members are `order[cell_start[c]..cell_start[c+1]]`.
#[derive(Debug, Clone)]
pub struct CellList {
    side: f32,
    cells_per_axis: [usize; 3],
    cell_edge: Vec3,
    cell_start: Vec<usize>,
    order: Vec<usize>,
}

impl CellList {
    /// Build a cell-list for `positions` inside a periodic box of side
    /// `side`, with cells no smaller than `rc`. Fails (a configuration
    /// error, not a runtime one) if `side` is too small to host even a
    /// single cell of edge `>= rc` per axis.
    pub fn build(positions: &[Vec3], side: f32, rc: f32) -> Result<Self, SimError> {
        if rc <= 0.0 || side <= 0.0 {
            return Err(SimError::Configuration(format!(
                "cell-list requires positive box side and cutoff (side={side}, rc={rc})"
            )));
        }

        let n_per_axis = (side / rc).floor().max(1.0) as usize;
        if side / n_per_axis as f32 < rc {
            return Err(SimError::Configuration(format!(
                "box side {side} cannot host cells of edge >= rc={rc} ({n_per_axis} per axis)"
            )));
        }
        let cells_per_axis = [n_per_axis, n_per_axis, n_per_axis];
        let cell_edge = Vec3::splat(side / n_per_axis as f32);

        let n_cells = cells_per_axis[0] * cells_per_axis[1] * cells_per_axis[2];
        let mut counts = vec![0usize; n_cells];
        let mut cell_of = Vec::with_capacity(positions.len());

        for &p in positions {
            let c = Self::cell_index_of(p, side, cell_edge, cells_per_axis);
            counts[c] += 1;
            cell_of.push(c);
        }

        let mut cell_start = vec![0usize; n_cells + 1];
        for c in 0..n_cells {
            cell_start[c + 1] = cell_start[c] + counts[c];
        }

        let mut cursor = cell_start.clone();
        let mut order = vec![0usize; positions.len()];
        for (i, &c) in cell_of.iter().enumerate() {
            order[cursor[c]] = i;
            cursor[c] += 1;
        }

        Ok(CellList {
            side,
            cells_per_axis,
            cell_edge,
            cell_start,
            order,
        })
    }

    /// Robust per-axis floor-to-cell: break ties at cell faces by testing
    /// the floor at `v`, `v-eps`, and `v+eps` and taking the smallest, so a
    /// particle sitting exactly on a boundary is never lost to rounding.
    fn axis_cell(v: f32, edge: f32, n: usize) -> usize {
        let raw = (v / edge).floor() as i64;
        let lo = ((v - FLOOR_EPS) / edge).floor() as i64;
        let hi = ((v + FLOOR_EPS) / edge).floor() as i64;
        let idx = raw.min(lo).min(hi);
        idx.clamp(0, n as i64 - 1) as usize
    }

    fn cell_index_of(p: Vec3, side: f32, cell_edge: Vec3, cells_per_axis: [usize; 3]) -> usize {
        // shift into [0, side) before binning, since positions are
        // wrapped to [-side/2, side/2) by the periodic box.
        let shifted = p + Vec3::splat(side * 0.5);
        let ix = Self::axis_cell(shifted.x, cell_edge.x, cells_per_axis[0]);
        let iy = Self::axis_cell(shifted.y, cell_edge.y, cells_per_axis[1]);
        let iz = Self::axis_cell(shifted.z, cell_edge.z, cells_per_axis[2]);
        (iz * cells_per_axis[1] + iy) * cells_per_axis[0] + ix
    }

    pub fn cell_count(&self) -> usize {
        self.cells_per_axis[0] * self.cells_per_axis[1] * self.cells_per_axis[2]
    }

    pub fn cells_per_axis(&self) -> [usize; 3] {
        self.cells_per_axis
    }

    /// Indices of particles belonging to cell `c`.
    pub fn members(&self, c: usize) -> &[usize] {
        &self.order[self.cell_start[c]..self.cell_start[c + 1]]
    }

    fn to_3d(&self, c: usize) -> (usize, usize, usize) {
        let nx = self.cells_per_axis[0];
        let ny = self.cells_per_axis[1];
        let ix = c % nx;
        let iy = (c / nx) % ny;
        let iz = c / (nx * ny);
        (ix, iy, iz)
    }

    fn from_3d(&self, ix: i64, iy: i64, iz: i64) -> (usize, Vec3) {
        let n = [
            self.cells_per_axis[0] as i64,
            self.cells_per_axis[1] as i64,
            self.cells_per_axis[2] as i64,
        ];
        let wrap = |v: i64, n: i64| -> (i64, f32) {
            if v < 0 {
                (v + n, -self.side)
            } else if v >= n {
                (v - n, self.side)
            } else {
                (v, 0.0)
            }
        };
        let (wx, ox) = wrap(ix, n[0]);
        let (wy, oy) = wrap(iy, n[1]);
        let (wz, oz) = wrap(iz, n[2]);
        let cell = (wz as usize * self.cells_per_axis[1] as usize + wy as usize)
            * self.cells_per_axis[0] as usize
            + wx as usize;
        (cell, Vec3::new(ox, oy, oz))
    }

    /// All 27 neighbor cells of `c` (including `c` itself), each tagged
    /// with the periodic-image offset needed to bring a position in that
    /// cell into the same frame as `c`.
    pub fn neighbors(&self, c: usize) -> Vec<NeighborCell> {
        let (ix, iy, iz) = self.to_3d(c);
        iproduct!(-1i64..=1, -1i64..=1, -1i64..=1)
            .map(|(dz, dy, dx)| {
                let (cell, offset) =
                    self.from_3d(ix as i64 + dx, iy as i64 + dy, iz as i64 + dz);
                NeighborCell { cell, offset }
            })
            .collect()
    }

    /// The 13 unique forward half-stencil neighbors of `c`, used by C5 so
    /// every unordered pair across cell boundaries is visited exactly once.
    pub fn forward_half_stencil(&self, c: usize) -> Vec<NeighborCell> {
        const FORWARD_OFFSETS: [(i64, i64, i64); 13] = [
            (1, 0, 0),
            (-1, 1, 0),
            (0, 1, 0),
            (1, 1, 0),
            (-1, -1, 1),
            (0, -1, 1),
            (1, -1, 1),
            (-1, 0, 1),
            (0, 0, 1),
            (1, 0, 1),
            (-1, 1, 1),
            (0, 1, 1),
            (1, 1, 1),
        ];
        let (ix, iy, iz) = self.to_3d(c);
        FORWARD_OFFSETS
            .iter()
            .map(|&(dx, dy, dz)| {
                let (cell, offset) =
                    self.from_3d(ix as i64 + dx, iy as i64 + dy, iz as i64 + dz);
                NeighborCell { cell, offset }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_positions(n: usize, side: f32, seed: u64) -> Vec<Vec3> {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-side / 2.0..side / 2.0),
                    rng.gen_range(-side / 2.0..side / 2.0),
                    rng.gen_range(-side / 2.0..side / 2.0),
                )
            })
            .collect()
    }

    #[test]
    fn rejects_cutoff_larger_than_box() {
        let positions = vec![Vec3::ZERO];
        let result = CellList::build(&positions, 1.0, 2.0);
        assert!(result.is_err());
    }

    #[test]
    fn completeness_every_particle_appears_exactly_once() {
        let positions = random_positions(500, 10.0, 42);
        let cl = CellList::build(&positions, 10.0, 1.0).unwrap();

        let mut seen = vec![false; positions.len()];
        for c in 0..cl.cell_count() {
            for &i in cl.members(c) {
                assert!(!seen[i], "index {i} appeared twice");
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&s| s), "some particle missing from order");
    }

    #[test]
    fn build_is_deterministic_across_calls() {
        let positions = random_positions(1000, 10.0, 7);
        let a = CellList::build(&positions, 10.0, 1.0).unwrap();
        let b = CellList::build(&positions, 10.0, 1.0).unwrap();
        for c in 0..a.cell_count() {
            assert_eq!(a.members(c), b.members(c));
        }
    }

    #[test]
    fn empty_store_has_no_occupied_members_but_is_valid() {
        let positions: Vec<Vec3> = Vec::new();
        let cl = CellList::build(&positions, 10.0, 1.0).unwrap();
        for c in 0..cl.cell_count() {
            assert!(cl.members(c).is_empty());
        }
    }

    #[test]
    fn neighbors_returns_27_cells_including_self() {
        let positions = random_positions(10, 10.0, 1);
        let cl = CellList::build(&positions, 10.0, 1.0).unwrap();
        let n = cl.neighbors(0);
        assert_eq!(n.len(), 27);
        assert!(n.iter().any(|nc| nc.cell == 0 && nc.offset == Vec3::ZERO));
    }

    #[test]
    fn forward_half_stencil_has_13_entries() {
        let positions = random_positions(10, 10.0, 1);
        let cl = CellList::build(&positions, 10.0, 1.0).unwrap();
        assert_eq!(cl.forward_half_stencil(0).len(), 13);
    }
}
