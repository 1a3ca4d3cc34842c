//! Scalar MD5 block function.
//!
//! Used by the small-final bypass and, one lane at a time, by the wide
//! kernels. Operates on the raw chaining state; padding is the caller's job.

use crate::kernels::constants::{K, S};
use crate::types::BLOCK_SIZE;

/// Apply the MD5 compression function for every complete 64-byte block in
/// `data`. Trailing bytes that do not fill a block are ignored.
pub(crate) fn block_generic(state: &mut [u32; 4], data: &[u8]) {
    for block in data.chunks_exact(BLOCK_SIZE) {
        compress(state, block);
    }
}

/// One MD5 block transformation. `block` must be exactly 64 bytes.
pub(crate) fn compress(state: &mut [u32; 4], block: &[u8]) {
    debug_assert_eq!(block.len(), BLOCK_SIZE);

    let mut m = [0u32; 16];
    for (word, bytes) in m.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    let [mut a, mut b, mut c, mut d] = *state;

    for i in 0..64 {
        let (f, g) = match i / 16 {
            0 => ((b & c) | (!b & d), i),
            1 => ((d & b) | (!d & c), (5 * i + 1) % 16),
            2 => (b ^ c ^ d, (3 * i + 5) % 16),
            _ => (c ^ (b | !d), (7 * i) % 16),
        };

        let rotated = a
            .wrapping_add(f)
            .wrapping_add(K[i])
            .wrapping_add(m[g])
            .rotate_left(S[i]);
        a = d;
        d = c;
        c = b;
        b = b.wrapping_add(rotated);
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::constants::INIT_STATE;

    fn oneshot(input: &[u8]) -> String {
        let mut state = INIT_STATE;

        let mut trail = Vec::with_capacity(input.len() + 128);
        trail.extend_from_slice(input);
        trail.push(0x80);
        while trail.len() % 64 != 56 {
            trail.push(0);
        }
        trail.extend_from_slice(&((input.len() as u64) << 3).to_le_bytes());

        block_generic(&mut state, &trail);

        let mut out = [0u8; 16];
        for (chunk, word) in out.chunks_exact_mut(4).zip(state.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        hex::encode(out)
    }

    #[test]
    fn rfc1321_vectors() {
        assert_eq!(oneshot(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(oneshot(b"a"), "0cc175b9c0f1b6a831c399e269772661");
        assert_eq!(oneshot(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(oneshot(b"message digest"), "f96b697d7cb7938d525a2f31aaf161d0");
        assert_eq!(
            oneshot(b"abcdefghijklmnopqrstuvwxyz"),
            "c3fcd3d76192e4007dfb496cca67e13b"
        );
    }

    #[test]
    fn multi_block_input() {
        assert_eq!(
            oneshot(&[b'a'; 64]),
            "014842d480b571495a4a0363793f7367"
        );
        assert_eq!(
            oneshot(&[b'h'; 64]),
            "d141045bfb385cad357e7c39c60e5da0"
        );
    }
}
