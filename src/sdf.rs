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

//! SDF geometry (C6): a planar sandwich wall (analytic) plus a
//! periodically-tiled, bilinearly-interpolated funnel obstacle. The
//! composite "inside" test is the union of the two solids; gradients are
//! never queried analytically, the bounce solver (C7) treats `inside` as
//! a black box and bisects in time.

use serde::{Deserialize, Serialize};

/// A pair of parallel planar walls at `z = ±half_width`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SandwichWall {
    pub half_width: f32,
}

impl SandwichWall {
    pub fn new(half_width: f32) -> Self {
        SandwichWall { half_width }
    }

    /// `φ_plane = h - |z|`, negative inside the solid.
    pub fn phi(&self, z: f32) -> f32 {
        self.half_width - z.abs()
    }

    pub fn is_inside(&self, z: f32) -> bool {
        self.phi(z) < 0.0
    }
}

/// Bilinearly-interpolated 2D obstacle cross-section, tiled periodically
/// along x with period `2 * half_width_x`. `y0` is the throat's
/// y-coordinate and is required to be negative (the `AngleIndex` sector
/// width is derived from `sqrt(-y0)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelGrid {
    pub half_width_x: f32,
    pub half_width_y: f32,
    pub y0: f32,
    pub nx: usize,
    pub ny: usize,
    /// `phi` samples on an `ny × nx` grid (row-major, y outer), negative
    /// inside the obstacle, covering `[-half_width_x, half_width_x] x
    /// [-half_width_y, half_width_y]`.
    pub phi: Vec<f32>,
    /// Half-width of the extra ring of cells treated as "skin" around the
    /// core bounding box, used to decide when the periodic replica on the
    /// other side of a tile boundary also needs to be visited.
    pub skin_width: f32,
}

/// Coarse classifier used to short-circuit the bounce solver and the
/// fluid-frozen pair loop when far from any surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxRegion {
    InsideCore,
    InSkin,
    Outside,
}

impl FunnelGrid {
    pub fn from_samples(
        half_width_x: f32,
        half_width_y: f32,
        y0: f32,
        nx: usize,
        ny: usize,
        phi: Vec<f32>,
        skin_width: f32,
    ) -> Self {
        assert!(y0 < 0.0, "funnel throat y0 must be negative");
        assert_eq!(phi.len(), nx * ny, "grid sample count mismatch");
        FunnelGrid {
            half_width_x,
            half_width_y,
            y0,
            nx,
            ny,
            phi,
            skin_width,
        }
    }

    /// Build a grid by sampling an analytic `phi` closure, used for tests
    /// and for constructing a synthetic obstacle without a grid file.
    pub fn from_fn(
        half_width_x: f32,
        half_width_y: f32,
        y0: f32,
        nx: usize,
        ny: usize,
        skin_width: f32,
        phi_fn: impl Fn(f32, f32) -> f32,
    ) -> Self {
        let mut phi = Vec::with_capacity(nx * ny);
        for iy in 0..ny {
            let y = -half_width_y + 2.0 * half_width_y * (iy as f32) / ((ny - 1).max(1) as f32);
            for ix in 0..nx {
                let x =
                    -half_width_x + 2.0 * half_width_x * (ix as f32) / ((nx - 1).max(1) as f32);
                phi.push(phi_fn(x, y));
            }
        }
        Self::from_samples(half_width_x, half_width_y, y0, nx, ny, phi, skin_width)
    }

    /// Tile period along x.
    pub fn period(&self) -> f32 {
        2.0 * self.half_width_x
    }

    /// Additive shift mapping `x` into the reference tile
    /// `[-half_width_x, half_width_x)`.
    pub fn tile_offset(&self, x: f32) -> f32 {
        let period = self.period();
        -period * (x / period + 0.5).floor()
    }

    fn sample_bilinear(&self, x: f32, y: f32) -> Option<f32> {
        if x < -self.half_width_x
            || x > self.half_width_x
            || y < -self.half_width_y
            || y > self.half_width_y
        {
            return None;
        }

        let fx = (x + self.half_width_x) / (2.0 * self.half_width_x) * (self.nx - 1) as f32;
        let fy = (y + self.half_width_y) / (2.0 * self.half_width_y) * (self.ny - 1) as f32;

        let ix0 = fx.floor().clamp(0.0, (self.nx - 1) as f32) as usize;
        let iy0 = fy.floor().clamp(0.0, (self.ny - 1) as f32) as usize;
        let ix1 = (ix0 + 1).min(self.nx - 1);
        let iy1 = (iy0 + 1).min(self.ny - 1);

        let tx = fx - ix0 as f32;
        let ty = fy - iy0 as f32;

        let at = |ix: usize, iy: usize| self.phi[iy * self.nx + ix];

        let v00 = at(ix0, iy0);
        let v10 = at(ix1, iy0);
        let v01 = at(ix0, iy1);
        let v11 = at(ix1, iy1);

        let v0 = v00 * (1.0 - tx) + v10 * tx;
        let v1 = v01 * (1.0 - tx) + v11 * tx;
        Some(v0 * (1.0 - ty) + v1 * ty)
    }

    /// `φ_funnel(x, y)` after tiling `x` back into the reference tile.
    /// Points outside the sampled y-range are treated as outside the solid.
    pub fn phi(&self, x: f32, y: f32) -> f32 {
        let xt = x + self.tile_offset(x);
        self.sample_bilinear(xt, y).unwrap_or(f32::INFINITY)
    }

    pub fn is_inside(&self, x: f32, y: f32) -> bool {
        self.phi(x, y) < 0.0
    }

    pub fn inside_bounding_box(&self, x: f32, y: f32) -> bool {
        let xt = x + self.tile_offset(x);
        xt.abs() <= self.half_width_x && y.abs() <= self.half_width_y
    }

    pub fn bbox_index(&self, x: f32, y: f32) -> BoxRegion {
        let xt = x + self.tile_offset(x);
        if xt.abs() <= self.half_width_x && y.abs() <= self.half_width_y {
            BoxRegion::InsideCore
        } else if xt.abs() <= self.half_width_x + self.skin_width
            && y.abs() <= self.half_width_y + self.skin_width
        {
            BoxRegion::InSkin
        } else {
            BoxRegion::Outside
        }
    }

    pub fn skin_width(&self) -> (f32, f32) {
        (self.skin_width, self.skin_width)
    }

    /// Full period length of the reference tile along x, used to decide
    /// whether the neighboring tile's frozen replica also needs visiting.
    pub fn core_domain_length(&self) -> f32 {
        self.period()
    }
}

/// The composite SDF: `inside = φ_plane < 0 OR φ_funnel < 0`.
#[derive(Debug, Clone)]
pub struct CompositeSdf {
    pub sandwich: SandwichWall,
    pub funnel: Option<FunnelGrid>,
}

impl CompositeSdf {
    pub fn new(sandwich: SandwichWall, funnel: Option<FunnelGrid>) -> Self {
        CompositeSdf { sandwich, funnel }
    }

    pub fn inside(&self, x: f32, y: f32, z: f32) -> bool {
        if self.sandwich.is_inside(z) {
            return true;
        }
        if let Some(f) = &self.funnel {
            if f.is_inside(x, y) {
                return true;
            }
        }
        false
    }

    pub fn funnel_inside(&self, x: f32, y: f32) -> bool {
        self.funnel.as_ref().is_some_and(|f| f.is_inside(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandwich_is_inside_beyond_half_width() {
        let w = SandwichWall::new(3.0);
        assert!(w.is_inside(3.5));
        assert!(w.is_inside(-4.0));
        assert!(!w.is_inside(0.0));
        assert!(!w.is_inside(2.9));
    }

    fn circular_funnel(radius: f32) -> FunnelGrid {
        FunnelGrid::from_fn(7.0, 10.0, -10.0, 64, 64, 1.0, |x, y| {
            (x * x + y * y).sqrt() - radius
        })
    }

    #[test]
    fn funnel_inside_near_center_outside_far_away() {
        let f = circular_funnel(2.0);
        assert!(f.is_inside(0.0, 0.0));
        assert!(!f.is_inside(6.0, 9.0));
    }

    #[test]
    fn funnel_tiles_periodically_along_x() {
        let f = circular_funnel(2.0);
        let period = f.period();
        assert!((f.phi(0.0, 0.0) - f.phi(period, 0.0)).abs() < 1e-3);
        assert!((f.phi(0.3, 1.0) - f.phi(period * 3.0 + 0.3, 1.0)).abs() < 1e-2);
    }

    #[test]
    fn composite_inside_is_union_of_solids() {
        let sdf = CompositeSdf::new(SandwichWall::new(3.0), Some(circular_funnel(2.0)));
        assert!(sdf.inside(0.0, 0.0, 0.0)); // inside funnel, not wall
        assert!(sdf.inside(20.0, 20.0, 3.5)); // inside wall, not funnel
        assert!(!sdf.inside(20.0, 20.0, 0.0)); // neither
    }

    #[test]
    fn bbox_index_classifies_core_skin_outside() {
        let f = circular_funnel(2.0);
        assert_eq!(f.bbox_index(0.0, 0.0), BoxRegion::InsideCore);
        assert_eq!(f.bbox_index(100.0, 100.0), BoxRegion::Outside);
    }
}
