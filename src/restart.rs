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

//! Binary restart format (§6): a `u32` record count followed by that many
//! `[pos:f32x3, vel:f32x3]` records, little-endian. The source has no
//! restart format of its own; this one exists to satisfy the round-trip
//! property in §8.

use std::io::{Read, Write};
use std::path::Path;

use crate::particle_store::{ParticleRecord, ParticleStore};

pub fn write(path: &Path, store: &ParticleStore) -> std::io::Result<()> {
    let records = store.to_records();
    let mut w = std::io::BufWriter::new(std::fs::File::create(path)?);
    w.write_all(&(records.len() as u32).to_le_bytes())?;
    for r in &records {
        for c in r.pos {
            w.write_all(&c.to_le_bytes())?;
        }
        for c in r.vel {
            w.write_all(&c.to_le_bytes())?;
        }
    }
    w.flush()
}

/// Ids of the returned store start at 0; the caller is responsible for
/// re-assigning them from its own id counter (`ParticleStore::reassign_ids`).
pub fn read(path: &Path, mass: f32) -> std::io::Result<ParticleStore> {
    let mut r = std::io::BufReader::new(std::fs::File::open(path)?);

    let mut count_buf = [0u8; 4];
    r.read_exact(&mut count_buf)?;
    let n = u32::from_le_bytes(count_buf) as usize;

    let mut records = Vec::with_capacity(n);
    for _ in 0..n {
        let mut pos = [0f32; 3];
        let mut vel = [0f32; 3];
        for c in pos.iter_mut() {
            let mut buf = [0u8; 4];
            r.read_exact(&mut buf)?;
            *c = f32::from_le_bytes(buf);
        }
        for c in vel.iter_mut() {
            let mut buf = [0u8; 4];
            r.read_exact(&mut buf)?;
            *c = f32::from_le_bytes(buf);
        }
        records.push(ParticleRecord { pos, vel });
    }

    Ok(ParticleStore::from_records(&records, mass, 0))
}
