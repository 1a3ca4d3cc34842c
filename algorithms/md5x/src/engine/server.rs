//! The hashing server: one worker thread owning all shared state.
//!
//! Stream handles never touch the lane table, digest map, or staging
//! buffers; they only send submissions. The worker drains the channel,
//! installs payloads into lane slots, and flushes the table through the
//! selected block function when a slot collides, the table fills, or the
//! channel goes quiet.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::engine::lanes::LaneTable;
use crate::hasher::Md5Hasher;
use crate::kernels::{self, scalar, staging::StagingBuffer, wide, BlockFn, LANES};
use crate::types::{Backend, Digest};

/// How long the worker waits for another submission before flushing a
/// partially filled table. A throughput knob, not a correctness mechanism.
const IDLE_FLUSH: Duration = Duration::from_micros(10);

/// Finals no longer than this skip the lane machinery entirely and run
/// through the scalar block function.
const SMALL_FINAL_MAX: usize = 128;

/// First stream ID handed out. Starting past the lane count keeps uid 0 as a
/// sentinel while still covering every slot.
const FIRST_UID: u64 = LANES as u64;

// =============================================================================
// SUBMISSIONS
// =============================================================================

/// Messages a stream handle sends to the worker. One stream's messages
/// arrive in submission order; the channel is FIFO.
pub(crate) enum Submission {
    /// Whole 64-byte-multiple payload to fold into the stream's digest.
    Block { uid: u64, bytes: Vec<u8> },
    /// Padded trailer ending the digest; answered on `reply`.
    Final {
        uid: u64,
        trailer: Vec<u8>,
        reply: Sender<Digest>,
    },
    /// Forget the stream's history but keep it usable.
    Reset { uid: u64 },
    /// Forget the stream entirely.
    Close { uid: u64 },
    /// Stop the worker.
    Shutdown,
}

// =============================================================================
// SERVER
// =============================================================================

/// State shared between the server façade and its stream handles.
pub(crate) struct Shared {
    pub(crate) submissions: Sender<Submission>,
    pub(crate) closed: AtomicBool,
    uid_counter: AtomicU64,
    backend: Backend,
}

impl Shared {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Parallel MD5 server multiplexing up to 16 concurrent streams through one
/// wide block kernel.
///
/// ```
/// let server = md5x::Server::new();
/// let mut hasher = server.new_hash();
/// hasher.write(b"abc").unwrap();
/// let digest = hasher.sum(&[]).unwrap();
/// assert_eq!(hex::encode(digest), "900150983cd24fb0d6963f7d28e17f72");
/// ```
pub struct Server {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Spin up a server on the widest kernel path the CPU supports.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(Backend::detect())
    }

    /// Spin up a server on an explicit kernel path. Useful for benchmarks
    /// and for pinning behavior in tests; `new` is otherwise the right call.
    #[must_use]
    pub fn with_backend(backend: Backend) -> Self {
        let (tx, rx) = bounded(0);
        let worker = thread::Builder::new()
            .name("md5x-server".into())
            .spawn(move || run(&rx, backend))
            .unwrap_or_else(|e| panic!("failed to spawn md5x server thread: {e}"));

        Self {
            shared: Arc::new(Shared {
                submissions: tx,
                closed: AtomicBool::new(false),
                uid_counter: AtomicU64::new(FIRST_UID),
                backend,
            }),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Open a new stream on this server.
    #[must_use]
    pub fn new_hash(&self) -> Md5Hasher {
        let uid = self.shared.uid_counter.fetch_add(1, Ordering::Relaxed);
        Md5Hasher::new(uid, Arc::clone(&self.shared))
    }

    /// The kernel path this server runs on.
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.shared.backend
    }

    /// Shut the server down and wait for the worker to finish. Idempotent;
    /// every stream operation afterwards fails with
    /// [`Md5Error::ServerClosed`](crate::Md5Error::ServerClosed).
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.shared.submissions.send(Submission::Shutdown);
        if let Ok(mut guard) = self.worker.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// WORKER LOOP
// =============================================================================

fn run(submissions: &Receiver<Submission>, backend: Backend) {
    let block_fn = kernels::block_fn(backend);
    let mut staging = kernels::staging_for(backend);
    let mut lanes = LaneTable::new();

    'outer: loop {
        // Idle: nothing pending, so block until work arrives.
        match submissions.recv() {
            Ok(sub) => {
                if !handle(sub, &mut lanes, block_fn, &mut staging) {
                    return;
                }
            }
            Err(_) => return,
        }

        // Busy: keep draining, flushing leftovers whenever the channel goes
        // quiet for longer than the idle window.
        loop {
            match submissions.recv_timeout(IDLE_FLUSH) {
                Ok(sub) => {
                    if !handle(sub, &mut lanes, block_fn, &mut staging) {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if lanes.any_occupied() {
                        lanes.flush(block_fn, &mut staging);
                    } else {
                        continue 'outer;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}

/// Process one submission. Returns `false` on shutdown.
fn handle(
    sub: Submission,
    lanes: &mut LaneTable,
    block_fn: BlockFn,
    staging: &mut [StagingBuffer; 2],
) -> bool {
    match sub {
        Submission::Block { uid, bytes } => {
            if lanes.is_occupied(uid) {
                // Collision: most likely this stream's previous payload.
                lanes.flush(block_fn, staging);
            }
            lanes.install(uid, bytes, None);
            if lanes.is_full() {
                lanes.flush(block_fn, staging);
            }
        }
        Submission::Final { uid, trailer, reply } => {
            if lanes.is_occupied(uid) {
                lanes.flush(block_fn, staging);
            }
            if trailer.len() <= SMALL_FINAL_MAX {
                // Scalar bypass: finish on a copy of the saved state, so a
                // later write can continue from the pre-pad digest.
                let mut words = lanes.saved_words(uid);
                scalar::block_generic(&mut words, &trailer);
                let _ = reply.send(wide::encode_digest(words));
            } else {
                lanes.install(uid, trailer, Some(reply));
                if lanes.is_full() {
                    lanes.flush(block_fn, staging);
                }
            }
        }
        Submission::Reset { uid } | Submission::Close { uid } => {
            lanes.remove_stream(uid);
        }
        Submission::Shutdown => return false,
    }
    true
}
