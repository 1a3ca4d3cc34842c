//! Shared staging buffer for the 8-lane kernel path.
//!
//! The 8-lane kernel reads every lane unconditionally, so each lane must have
//! a readable 64-byte region even when it is logically finished. Payloads are
//! copied into fixed non-overlapping sub-ranges before the kernel runs; lanes
//! without fresh data expose zeroed or stale bytes, which the masked
//! write-back discards.

use crate::types::MAX_BLOCK_SIZE;

/// Leading bytes reserved ahead of lane 0.
const PREFIX: usize = 4;

/// Fixed scratch region shared by the 8 lanes of one kernel group.
///
/// Allocated once per server (two groups for the 16-lane table), never
/// resized. In 16-lane fused mode no staging is needed and the buffer stays
/// empty.
pub(crate) struct StagingBuffer {
    buf: Vec<u8>,
}

impl StagingBuffer {
    /// Full-size buffer for one 8-lane group.
    pub(crate) fn allocated() -> Self {
        Self {
            buf: vec![0u8; PREFIX + 8 * MAX_BLOCK_SIZE],
        }
    }

    /// Zero-size placeholder for the fused path, which reads payloads
    /// directly.
    pub(crate) fn unallocated() -> Self {
        Self { buf: Vec::new() }
    }

    /// Byte offset of lane `i`'s sub-range.
    pub(crate) const fn lane_offset(lane: usize) -> usize {
        PREFIX + lane * MAX_BLOCK_SIZE
    }

    /// Copy a payload into lane `i`'s sub-range.
    pub(crate) fn stage(&mut self, lane: usize, payload: &[u8]) {
        let start = Self::lane_offset(lane);
        self.buf[start..start + payload.len()].copy_from_slice(payload);
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_do_not_overlap() {
        for lane in 0..7 {
            let end = StagingBuffer::lane_offset(lane) + MAX_BLOCK_SIZE;
            assert!(end <= StagingBuffer::lane_offset(lane + 1));
        }
    }

    #[test]
    fn staged_payload_lands_at_lane_offset() {
        let mut staging = StagingBuffer::allocated();
        staging.stage(3, &[0xAB; 64]);

        let start = StagingBuffer::lane_offset(3);
        assert_eq!(&staging.bytes()[start..start + 64], &[0xAB; 64]);
        assert_eq!(staging.bytes()[start - 1], 0);
        assert_eq!(staging.bytes()[start + 64], 0);
    }
}
