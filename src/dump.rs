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

//! LAMMPS-style DUMP trajectory writer (§6). Appended once per dump step;
//! an I/O failure here is a warning, not an abort (§7).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::frozen_layer::FrozenLayer;
use crate::particle_store::ParticleStore;

/// Append one DUMP frame for `fluid` (type=2) and every particle in
/// `frozen` (type=1, wall store followed by the three slabs) to `path`.
pub fn append_frame(
    path: &Path,
    step: u64,
    half_side: f32,
    fluid: &ParticleStore,
    frozen: &FrozenLayer,
) -> std::io::Result<()> {
    let n = fluid.len() + frozen.wall.len() + frozen.slabs.iter().map(|s| s.store.len()).sum::<usize>();

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut w = std::io::BufWriter::new(file);

    writeln!(w, "ITEM: TIMESTEP")?;
    writeln!(w, "{step}")?;
    writeln!(w, "ITEM: NUMBER OF ATOMS")?;
    writeln!(w, "{n}")?;
    writeln!(w, "ITEM: BOX BOUNDS pp pp pp")?;
    for _ in 0..3 {
        writeln!(w, "{} {}", -half_side, half_side)?;
    }
    writeln!(w, "ITEM: ATOMS id type xs ys zs")?;

    let mut id = 0u64;
    for i in 0..fluid.len() {
        let p = fluid.pos(i);
        writeln!(w, "{id} 2 {} {} {}", p.x, p.y, p.z)?;
        id += 1;
    }
    for i in 0..frozen.wall.len() {
        let p = frozen.wall.pos(i);
        writeln!(w, "{id} 1 {} {} {}", p.x, p.y, p.z)?;
        id += 1;
    }
    for slab in &frozen.slabs {
        for i in 0..slab.store.len() {
            let p = slab.store.pos(i);
            writeln!(w, "{id} 1 {} {} {}", p.x, p.y, p.z)?;
            id += 1;
        }
    }

    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frozen_layer::{AngleIndex, FrozenSlab};
    use glam::Vec3;

    #[test]
    fn frame_header_reports_correct_atom_count() {
        let dir = std::env::temp_dir().join(format!("dpd-dump-test-{:?}", std::thread::current().id()));
        let path = dir.with_extension("dump");

        let mut fluid = ParticleStore::with_capacity(1);
        fluid.push(Vec3::ZERO, Vec3::ZERO, 1.0, 0);
        let wall = ParticleStore::with_capacity(0);
        let slabs = std::array::from_fn(|_| FrozenSlab {
            store: ParticleStore::with_capacity(0),
            angle_index: AngleIndex::new(1.0, -10.0),
        });
        let frozen = FrozenLayer { wall, slabs };

        append_frame(&path, 0, 5.0, &fluid, &frozen).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("NUMBER OF ATOMS"));
        assert!(contents.contains("\n1\n") || contents.lines().any(|l| l == "1"));
        let _ = std::fs::remove_file(&path);
    }
}
