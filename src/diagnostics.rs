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

//! Momentum/temperature diagnostics log (§11), supplementing the LAMMPS
//! dump: reproduces the source's `diag()` tab-separated
//! `TIME / kBT / X-MOMENTUM / Y-MOMENTUM / Z-MOMENTUM` line, written once
//! per dump step to an optional file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::particle_store::ParticleStore;

/// Instantaneous temperature, `⟨m v²⟩ / 3` (§8 property 4), and total
/// momentum of `store`.
pub fn measure(store: &ParticleStore) -> (f64, glam::Vec3) {
    let n = store.len().max(1) as f64;
    let kbt = (2.0 * store.kinetic_energy()) / (3.0 * n);
    (kbt, store.total_momentum())
}

pub fn append_line(path: &Path, time: f32, store: &ParticleStore) -> std::io::Result<()> {
    let (kbt, momentum) = measure(store);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut w = std::io::BufWriter::new(file);
    writeln!(w, "{time}\t{kbt}\t{}\t{}\t{}", momentum.x, momentum.y, momentum.z)?;
    w.flush()
}
