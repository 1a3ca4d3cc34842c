//! # md5x
//!
//! Multi-lane MD5. One server multiplexes up to 16 independent MD5 streams
//! through a single wide block engine, amortising per-block work across
//! lanes. Each stream handle behaves like a plain incremental MD5 (write,
//! sum, reset, close) while the server batches whatever the lanes have
//! pending and runs them in lockstep.
//!
//! This trades single-stream latency for aggregate throughput: feed it many
//! streams at once.
//!
//! # Usage
//! ```rust
//! let server = md5x::Server::new();
//!
//! let mut streams: Vec<_> = (0..16).map(|_| server.new_hash()).collect();
//! for (i, h) in streams.iter_mut().enumerate() {
//!     h.write(&vec![i as u8; 1024]).unwrap();
//! }
//! for h in &mut streams {
//!     let digest = h.sum_digest().unwrap();
//!     assert_eq!(digest.len(), md5x::DIGEST_SIZE);
//! }
//! ```

// =============================================================================
// MODULES
// =============================================================================

mod engine;
mod hasher;
mod kernels;
mod types;

// =============================================================================
// EXPORTS
// =============================================================================

#[cfg(feature = "digest-trait")]
pub use digest;

pub use engine::server::Server;
pub use hasher::Md5Hasher;
pub use types::{Backend, Digest, Md5Error, BLOCK_SIZE, DIGEST_SIZE, MAX_BLOCK_SIZE};

/// Returns the name of the kernel path a new server would run on.
#[must_use]
pub fn active_backend() -> &'static str {
    Backend::detect().name()
}
