//! Lane table: the dispatcher's view of the 16 in-flight streams.
//!
//! A stream's slot is `uid % 16`; stream IDs start at 16 so the zero uid
//! stays a sentinel and every slot is reachable. A slot holds at most one
//! pending payload; collisions are resolved by flushing first.

use std::collections::HashMap;

use crossbeam_channel::Sender;

use crate::kernels::staging::StagingBuffer;
use crate::kernels::wide::{decode_digest, WideState};
use crate::kernels::{BlockFn, LANES};
use crate::types::Digest;

struct LaneSlot {
    uid: u64,
    payload: Vec<u8>,
    /// Present only for finals that travelled through the lane machinery.
    reply: Option<Sender<Digest>>,
}

pub(crate) struct LaneTable {
    slots: [Option<LaneSlot>; LANES],
    /// Occupied-slot count; a full table triggers a flush.
    total_in: usize,
    /// Saved chaining state per stream, absent until its first flush.
    digests: HashMap<u64, Digest>,
}

impl LaneTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            total_in: 0,
            digests: HashMap::new(),
        }
    }

    pub(crate) const fn slot_of(uid: u64) -> usize {
        (uid % LANES as u64) as usize
    }

    pub(crate) fn is_occupied(&self, uid: u64) -> bool {
        self.slots[Self::slot_of(uid)].is_some()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.total_in == LANES
    }

    pub(crate) fn any_occupied(&self) -> bool {
        self.total_in > 0
    }

    /// Install a payload into the stream's slot. The slot must be empty;
    /// callers flush on collision first.
    pub(crate) fn install(&mut self, uid: u64, payload: Vec<u8>, reply: Option<Sender<Digest>>) {
        let index = Self::slot_of(uid);
        debug_assert!(self.slots[index].is_none());
        self.slots[index] = Some(LaneSlot { uid, payload, reply });
        self.total_in += 1;
    }

    /// Saved chaining words for a stream, or the MD5 initial constants if it
    /// has not been through a flush yet.
    pub(crate) fn saved_words(&self, uid: u64) -> [u32; 4] {
        self.digests.get(&uid).map_or(
            crate::kernels::constants::INIT_STATE,
            decode_digest,
        )
    }

    /// Drop everything the table knows about a stream: a pending payload (on
    /// reset) and the saved digest.
    pub(crate) fn remove_stream(&mut self, uid: u64) {
        let index = Self::slot_of(uid);
        if self.slots[index].as_ref().is_some_and(|s| s.uid == uid) {
            self.slots[index] = None;
            self.total_in -= 1;
        }
        self.digests.remove(&uid);
    }

    /// Run the kernel over every pending payload and propagate results.
    ///
    /// Non-final lanes have their updated chaining state saved for the
    /// stream's next submission. Final lanes get their digest sent on the
    /// reply channel and the stream is forgotten. Empty lanes are left at
    /// whatever state the kernel was seeded with and written back nowhere.
    pub(crate) fn flush(&mut self, block_fn: BlockFn, staging: &mut [StagingBuffer; 2]) {
        let mut state = WideState::<16>::fresh();
        for slot in self.slots.iter().flatten() {
            state.set_lane(Self::slot_of(slot.uid), self.saved_words(slot.uid));
        }

        {
            let mut inputs: [Option<&[u8]>; LANES] = [None; LANES];
            for (input, slot) in inputs.iter_mut().zip(self.slots.iter()) {
                *input = slot.as_ref().map(|s| s.payload.as_slice());
            }
            block_fn(&mut state, &inputs, staging);
        }

        self.total_in = 0;
        for (lane, slot) in self.slots.iter_mut().enumerate() {
            let Some(slot) = slot.take() else { continue };
            let digest = state.lane_digest(lane);
            match slot.reply {
                Some(reply) => {
                    // A finalised stream is done; nothing to retain.
                    let _ = reply.send(digest);
                    self.digests.remove(&slot.uid);
                }
                None => {
                    self.digests.insert(slot.uid, digest);
                }
            }
        }
    }
}
