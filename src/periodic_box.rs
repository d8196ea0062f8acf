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

//! Axis-aligned periodic cube, side `L`, centered on the origin (C3).

use glam::Vec3;

#[derive(Debug, Clone, Copy)]
pub struct PeriodicBox {
    pub side: f32,
}

impl PeriodicBox {
    pub fn new(side: f32) -> Self {
        PeriodicBox { side }
    }

    /// Minimum-image displacement: nearest periodic image of `d`.
    pub fn minimum_image(&self, d: Vec3) -> Vec3 {
        let l = self.side;
        d - l * (d / l + Vec3::splat(0.5)).floor()
    }

    /// Wrap a position into `[-L/2, L/2)`, left-closed. A coordinate
    /// exactly at `+L/2` after wrap must land on `-L/2`, which
    /// `floor(v/L + 1/2)` already guarantees (it never leaves a residual
    /// of exactly `L/2`).
    pub fn wrap(&self, p: Vec3) -> Vec3 {
        self.minimum_image(p)
    }

    pub fn half_side(&self) -> f32 {
        self.side * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_points_in_box_bounds() {
        let b = PeriodicBox::new(10.0);
        for raw in [0.0, 4.999, 5.0, 5.001, -5.0, 23.4, -100.2] {
            let p = Vec3::splat(raw);
            let w = b.wrap(p);
            assert!(w.x >= -5.0 && w.x < 5.0, "wrap({raw}) = {}", w.x);
        }
    }

    #[test]
    fn wrap_is_idempotent() {
        let b = PeriodicBox::new(10.0);
        let p = Vec3::new(12.3, -17.8, 5.0);
        let once = b.wrap(p);
        let twice = b.wrap(once);
        assert!((once - twice).length() < 1e-6);
    }

    #[test]
    fn minimum_image_picks_nearest_copy() {
        let b = PeriodicBox::new(10.0);
        let d = Vec3::new(7.0, -6.0, 0.0);
        let m = b.minimum_image(d);
        assert!((m.x - (-3.0)).abs() < 1e-6);
        assert!((m.y - 4.0).abs() < 1e-6);
    }

    #[test]
    fn wrap_produces_no_nan_for_finite_input() {
        let b = PeriodicBox::new(10.0);
        let p = Vec3::new(1e6, -1e6, 0.0);
        let w = b.wrap(p);
        assert!(w.is_finite());
    }
}
