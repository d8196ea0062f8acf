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

//! Deterministic, stateless pairwise pseudo-random stream (C1).
//!
//! `saru` is a stateless integer hash: the same three-seed mixer as the
//! source, reproduced constant-for-constant so trajectories agree across
//! ports when run with the same seeds. Callers are responsible for the
//! `min(i,j), max(i,j)` ordering that makes the draw symmetric across a pair.

/// Three-seed Saru hash producing a uniform float in `[0, 1)`.
pub fn saru(seed1: u32, seed2: u32, seed3: u32) -> f32 {
    let mut seed1 = seed1;
    let mut seed2 = seed2;
    let mut seed3 = seed3;

    seed3 ^= (seed1 << 7) ^ (seed2 >> 6);
    seed2 = seed2.wrapping_add((seed1 >> 4) ^ (seed3 >> 15));
    seed1 ^= seed2.wrapping_shl(9).wrapping_add(seed3.wrapping_shl(8));
    seed3 ^= 0xA5366B4Du32.wrapping_mul((seed2 >> 11) ^ (seed1 << 1));
    seed2 = seed2.wrapping_add(0x72BE1579u32.wrapping_mul((seed1 << 4) ^ (seed3 >> 16)));
    seed1 ^= 0x3F38A6EDu32.wrapping_mul((seed3 >> 5) ^ (((seed2 as i32) >> 22) as u32));
    seed2 = seed2.wrapping_add(seed1.wrapping_mul(seed3));
    seed1 = seed1.wrapping_add(seed3 ^ (seed2 >> 2));
    seed2 ^= ((seed2 as i32) >> 17) as u32;

    let mut state = 0x79dedea3u32.wrapping_mul(seed1 ^ (((seed1 as i32) >> 14) as u32));
    let mut wstate = (state.wrapping_add(seed2)) ^ (((state as i32) >> 8) as u32);
    state = state.wrapping_add(wstate.wrapping_mul(wstate ^ 0xdddf97f5));
    wstate = 0xABCB96F7u32.wrapping_add(((wstate as i32) >> 1) as u32);

    state = 0x4beb5d59u32.wrapping_mul(state).wrapping_add(0x2600e1f7); // LCG
    wstate = wstate
        .wrapping_add(0x8009d14bu32)
        .wrapping_add((((wstate as i32) >> 31) as u32) & 0xda879add); // OWS

    let v = (state ^ (((state as i32) >> 26) as u32)).wrapping_add(wstate);
    let r = (v ^ (v >> 20)).wrapping_mul(0x6957f5a7);

    r as f32 / 4294967295.0f32
}

/// Convert a uniform draw `f ∈ [0,1)` to symmetric noise with mean 0,
/// variance 1: `η = √3 · (2f − 1)`.
pub fn uniform_to_symmetric_noise(f: f32) -> f32 {
    const SQRT3: f32 = 1.732_050_8;
    SQRT3 * (2.0 * f - 1.0)
}

/// Pairwise-symmetric noise for particle ids `i`, `j` at step `s`: both
/// call orders draw the same value since the ids are sorted before hashing.
pub fn pairwise_noise(i: u32, j: u32, step: u32) -> f32 {
    let (a, b) = if i < j { (i, j) } else { (j, i) };
    uniform_to_symmetric_noise(saru(a, b, step))
}
