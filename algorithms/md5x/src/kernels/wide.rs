//! Lane-lockstep MD5 block kernels.
//!
//! A wide state holds one 32-bit word per lane for each of the four MD5
//! chaining variables, mirroring the register layout of a vectorised
//! implementation. `block16` reads lanes directly from caller payloads under
//! an active-lane mask; `block8` reads all eight lanes unconditionally from a
//! staging buffer and relies on the caller's masked write-back, so it may
//! churn through stale bytes for finished lanes.

use crate::kernels::constants::INIT_STATE;
use crate::kernels::scalar;
use crate::types::{Digest, BLOCK_SIZE};

/// Per-lane MD5 chaining state, one word per lane for each state variable.
#[derive(Clone, Copy)]
pub(crate) struct WideState<const L: usize> {
    pub v0: [u32; L],
    pub v1: [u32; L],
    pub v2: [u32; L],
    pub v3: [u32; L],
}

impl<const L: usize> WideState<L> {
    /// All lanes at the MD5 initial constants.
    pub(crate) fn fresh() -> Self {
        Self {
            v0: [INIT_STATE[0]; L],
            v1: [INIT_STATE[1]; L],
            v2: [INIT_STATE[2]; L],
            v3: [INIT_STATE[3]; L],
        }
    }

    pub(crate) fn set_lane(&mut self, lane: usize, words: [u32; 4]) {
        self.v0[lane] = words[0];
        self.v1[lane] = words[1];
        self.v2[lane] = words[2];
        self.v3[lane] = words[3];
    }

    pub(crate) fn lane(&self, lane: usize) -> [u32; 4] {
        [self.v0[lane], self.v1[lane], self.v2[lane], self.v3[lane]]
    }

    /// Lane digest in the MD5 output byte order.
    pub(crate) fn lane_digest(&self, lane: usize) -> Digest {
        encode_digest(self.lane(lane))
    }
}

impl WideState<16> {
    /// Split into the two 8-lane halves driven by the doubled kernel path.
    pub(crate) fn split8(&self) -> (WideState<8>, WideState<8>) {
        let mut lo = WideState::<8>::fresh();
        let mut hi = WideState::<8>::fresh();
        for i in 0..8 {
            lo.set_lane(i, self.lane(i));
            hi.set_lane(i, self.lane(i + 8));
        }
        (lo, hi)
    }

    pub(crate) fn merge8(&mut self, lo: &WideState<8>, hi: &WideState<8>) {
        for i in 0..8 {
            self.set_lane(i, lo.lane(i));
            self.set_lane(i + 8, hi.lane(i));
        }
    }
}

/// Serialise four chaining words little-endian, per RFC 1321.
pub(crate) fn encode_digest(words: [u32; 4]) -> Digest {
    let mut out = [0u8; 16];
    for (chunk, word) in out.chunks_exact_mut(4).zip(words.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

pub(crate) fn decode_digest(digest: &Digest) -> [u32; 4] {
    let mut words = [0u32; 4];
    for (word, chunk) in words.iter_mut().zip(digest.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}

/// 16-lane block kernel.
///
/// Processes `n_bytes / 64` blocks for every lane whose mask bit is set,
/// reading lane `i` from `inputs[i]` starting at `offset`. Masked-off lanes
/// are neither read nor written; the mask governs both.
pub(crate) fn block16(
    state: &mut WideState<16>,
    inputs: &[Option<&[u8]>; 16],
    offset: usize,
    mask: u32,
    n_bytes: usize,
) {
    let rounds = n_bytes / BLOCK_SIZE;
    for (lane, input) in inputs.iter().enumerate() {
        if mask & (1 << lane) == 0 {
            continue;
        }
        let Some(bytes) = input else { continue };

        let mut words = state.lane(lane);
        let mut at = offset;
        for _ in 0..rounds {
            scalar::compress(&mut words, &bytes[at..at + BLOCK_SIZE]);
            at += BLOCK_SIZE;
        }
        state.set_lane(lane, words);
    }
}

/// 8-lane block kernel over a shared staging buffer.
///
/// Processes `n_bytes / 64` blocks for every lane unconditionally, reading
/// lane `i` at `base[cursors[i]..]`. The caller guarantees each cursor has
/// `n_bytes` of readable staging behind it and discards the resulting state
/// for lanes that were logically finished.
pub(crate) fn block8(
    state: &mut WideState<8>,
    base: &[u8],
    cursors: &[usize; 8],
    n_bytes: usize,
) {
    let rounds = n_bytes / BLOCK_SIZE;
    for lane in 0..8 {
        let mut words = state.lane(lane);
        let mut at = cursors[lane];
        for _ in 0..rounds {
            scalar::compress(&mut words, &base[at..at + BLOCK_SIZE]);
            at += BLOCK_SIZE;
        }
        state.set_lane(lane, words);
    }
}
