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

//! DPD obstacle-bouncing fluid simulator: a particle-based fluid/solid
//! solver combining a cell-list-accelerated DPD pair kernel, a velocity-
//! Verlet integrator, an SDF-driven bounce-back collision solver, and a
//! frozen-particle layer that carries the DPD interaction across the
//! solid boundary.

pub mod bounce;
pub mod build_info;
pub mod cell_list;
pub mod config;
pub mod diagnostics;
pub mod dpd;
pub mod driver;
pub mod dump;
pub mod error;
pub mod frozen_layer;
pub mod integrator;
pub mod particle_store;
pub mod periodic_box;
pub mod random;
pub mod restart;
pub mod sdf;
