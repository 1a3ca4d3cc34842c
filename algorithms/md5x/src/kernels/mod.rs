//! Block kernels and the interface the dispatcher drives them through.
//!
//! The server picks one of two block functions at construction time and
//! stores it as a plain function value; there is no per-flush branching.
//! Both paths consume the whole 16-slot lane table:
//!
//! - **fused**: one 16-lane kernel reading payloads in place,
//! - **doubled**: two 8-lane kernels over staging buffers, run as a
//!   fork/join pair.

pub(crate) mod constants;
pub(crate) mod scalar;
pub(crate) mod staging;
pub(crate) mod wide;

use crate::engine::schedule::generate_mask_rounds;
use crate::types::{Backend, BLOCK_SIZE, MAX_BLOCK_SIZE};
use staging::StagingBuffer;
use wide::WideState;

/// Number of streams a flush feeds through the kernels.
pub(crate) const LANES: usize = 16;

/// Compression entry point selected at server construction.
pub(crate) type BlockFn =
    fn(&mut WideState<16>, &[Option<&[u8]>; LANES], &mut [StagingBuffer; 2]);

/// Block function for the selected backend.
pub(crate) fn block_fn(backend: Backend) -> BlockFn {
    match backend {
        Backend::Fused16 => block_md5_x16,
        Backend::Doubled8 => block_md5_x8x2,
    }
}

/// Staging pair for the selected backend. Only the doubled path reserves
/// memory.
pub(crate) fn staging_for(backend: Backend) -> [StagingBuffer; 2] {
    match backend {
        Backend::Fused16 => [StagingBuffer::unallocated(), StagingBuffer::unallocated()],
        Backend::Doubled8 => [StagingBuffer::allocated(), StagingBuffer::allocated()],
    }
}

fn payload_lengths<const L: usize>(inputs: &[Option<&[u8]>; L]) -> [usize; L] {
    let mut lengths = [0usize; L];
    for (len, input) in lengths.iter_mut().zip(inputs.iter()) {
        *len = input.map_or(0, <[u8]>::len);
        assert!(
            *len <= MAX_BLOCK_SIZE,
            "lane payload of {len} bytes exceeds the {MAX_BLOCK_SIZE}-byte maximum"
        );
    }
    lengths
}

/// Fused path: one 16-lane kernel invocation per schedule instruction,
/// reading each lane's payload in place.
fn block_md5_x16(
    state: &mut WideState<16>,
    inputs: &[Option<&[u8]>; LANES],
    _staging: &mut [StagingBuffer; 2],
) {
    let lengths = payload_lengths(inputs);
    let program = generate_mask_rounds(&lengths);

    let mut offset = 0;
    for instr in &program {
        let n_bytes = instr.rounds as usize * BLOCK_SIZE;
        wide::block16(state, inputs, offset, instr.mask, n_bytes);
        offset += n_bytes;
    }
}

/// Doubled path: split the table into two 8-lane groups and run their
/// kernels in parallel, joining before the flush continues.
fn block_md5_x8x2(
    state: &mut WideState<16>,
    inputs: &[Option<&[u8]>; LANES],
    staging: &mut [StagingBuffer; 2],
) {
    let (mut lo, mut hi) = state.split8();

    let mut in_lo: [Option<&[u8]>; 8] = [None; 8];
    let mut in_hi: [Option<&[u8]>; 8] = [None; 8];
    for i in 0..8 {
        in_lo[i] = inputs[i];
        in_hi[i] = inputs[i + 8];
    }

    let (stage_lo, stage_hi) = staging.split_at_mut(1);
    rayon::join(
        || block_md5_x8(&mut lo, &in_lo, &mut stage_lo[0]),
        || block_md5_x8(&mut hi, &in_hi, &mut stage_hi[0]),
    );

    state.merge8(&lo, &hi);
}

/// One 8-lane group: copy payloads into the staging buffer, then run the
/// schedule with masked write-back. The kernel itself reads all eight lanes
/// every round, so finished lanes chew stale staging bytes whose results are
/// simply not written back.
fn block_md5_x8(
    state: &mut WideState<8>,
    inputs: &[Option<&[u8]>; 8],
    staging: &mut StagingBuffer,
) {
    let lengths = payload_lengths(inputs);
    for (lane, input) in inputs.iter().enumerate() {
        if let Some(payload) = input {
            staging.stage(lane, payload);
        }
    }

    let program = generate_mask_rounds(&lengths);
    let mut cursors = [0usize; 8];
    for (lane, cursor) in cursors.iter_mut().enumerate() {
        *cursor = StagingBuffer::lane_offset(lane);
    }

    let mut work = *state;
    for instr in &program {
        let n_bytes = instr.rounds as usize * BLOCK_SIZE;
        wide::block8(&mut work, staging.bytes(), &cursors, n_bytes);

        for cursor in &mut cursors {
            *cursor += n_bytes;
        }
        for lane in 0..8 {
            if instr.mask & (1 << lane) != 0 {
                state.set_lane(lane, work.lane(lane));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::wide::encode_digest;

    fn trailer(input: &[u8]) -> Vec<u8> {
        let mut padded = input.to_vec();
        padded.push(0x80);
        while padded.len() % 64 != 56 {
            padded.push(0);
        }
        padded.extend_from_slice(&((input.len() as u64) << 3).to_le_bytes());
        padded
    }

    fn run(backend: Backend, payloads: &[&[u8]]) -> Vec<String> {
        let mut state = WideState::<16>::fresh();
        let mut staging = staging_for(backend);

        let mut inputs: [Option<&[u8]>; LANES] = [None; LANES];
        for (slot, payload) in inputs.iter_mut().zip(payloads.iter()) {
            *slot = Some(*payload);
        }

        block_fn(backend)(&mut state, &inputs, &mut staging);

        (0..payloads.len())
            .map(|lane| hex::encode(encode_digest(state.lane(lane))))
            .collect()
    }

    #[test]
    fn both_paths_agree_on_ragged_lanes() {
        let blocks: Vec<Vec<u8>> = (0..16)
            .map(|i| trailer(&vec![b'a' + (i as u8); 17 * (i + 1)]))
            .collect();
        let payloads: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();

        let fused = run(Backend::Fused16, &payloads);
        let doubled = run(Backend::Doubled8, &payloads);
        assert_eq!(fused, doubled);
    }

    #[test]
    fn known_digests_come_out_of_each_path() {
        for backend in [Backend::Fused16, Backend::Doubled8] {
            let one = trailer(b"abc");
            let two = trailer(&[b'h'; 64]);
            let digests = run(backend, &[&one, &two]);
            assert_eq!(digests[0], "900150983cd24fb0d6963f7d28e17f72");
            assert_eq!(digests[1], "d141045bfb385cad357e7c39c60e5da0");
        }
    }

    #[test]
    fn untouched_lanes_keep_initial_constants() {
        let payload = trailer(b"x");
        let mut inputs: [Option<&[u8]>; LANES] = [None; LANES];
        inputs[2] = Some(&payload);

        for backend in [Backend::Fused16, Backend::Doubled8] {
            let mut state = WideState::<16>::fresh();
            let mut staging = staging_for(backend);
            block_fn(backend)(&mut state, &inputs, &mut staging);

            assert_ne!(state.lane(2), constants::INIT_STATE);
            for lane in (0..16).filter(|&l| l != 2) {
                assert_eq!(state.lane(lane), constants::INIT_STATE, "lane {lane}");
            }
        }
    }
}
