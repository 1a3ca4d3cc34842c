//! Per-stream digest handle.
//!
//! The handle owns the stream's tail buffer and length counter; everything
//! past the last complete 64-byte block lives here until enough bytes arrive
//! to submit another block, or until finalisation folds it into the trailer.
//! Handles are single-writer: share streams by opening more of them.

use std::sync::Arc;

use crossbeam_channel::bounded;

use crate::engine::server::{Shared, Submission};
use crate::types::{Digest, Md5Error, BLOCK_SIZE, DIGEST_SIZE, MAX_BLOCK_SIZE};

#[cfg(feature = "digest-trait")]
use crypto_common::BlockSizeUser;
#[cfg(feature = "digest-trait")]
use digest::typenum::{U16, U64};
#[cfg(feature = "digest-trait")]
use digest::{FixedOutput, HashMarker, Output, OutputSizeUser, Reset, Update};

// =============================================================================
// STREAM HANDLE
// =============================================================================

/// One MD5 stream multiplexed onto a [`Server`](crate::Server).
///
/// Semantically a plain incremental MD5: write bytes, ask for the sum,
/// reset, close. [`sum`](Self::sum) does **not** end the stream: it
/// finalises a copy of the current state, so writing afterwards continues
/// the digest as if the sum never happened. Only [`close`](Self::close)
/// (or dropping the handle) retires the stream.
pub struct Md5Hasher {
    uid: u64,
    server: Arc<Shared>,
    /// Bytes past the last complete block, at most 63 live between writes.
    tail: [u8; BLOCK_SIZE],
    tail_len: usize,
    total_len: u64,
    closed: bool,
    /// Last finalised digest, served after close.
    cached: Option<Digest>,
}

impl Md5Hasher {
    pub(crate) fn new(uid: u64, server: Arc<Shared>) -> Self {
        Self {
            uid,
            server,
            tail: [0u8; BLOCK_SIZE],
            tail_len: 0,
            total_len: 0,
            closed: false,
            cached: None,
        }
    }

    /// Digest size in bytes.
    #[must_use]
    pub const fn output_size(&self) -> usize {
        DIGEST_SIZE
    }

    /// Compression block size in bytes.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    /// Append `bytes` to the stream.
    ///
    /// Inputs larger than [`MAX_BLOCK_SIZE`] are split into per-chunk
    /// submissions so the server can interleave other streams. Returns the
    /// number of bytes accepted.
    ///
    /// # Errors
    ///
    /// [`Md5Error::StreamClosed`] if the stream was closed,
    /// [`Md5Error::ServerClosed`] if the server has shut down. Neither
    /// consumes any input.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, Md5Error> {
        if self.closed {
            return Err(Md5Error::StreamClosed);
        }
        for chunk in bytes.chunks(MAX_BLOCK_SIZE) {
            self.write_chunk(chunk)?;
        }
        Ok(bytes.len())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), Md5Error> {
        self.total_len += chunk.len() as u64;
        let mut rest = chunk;

        // Top up a partial tail first; a completed tail is its own block.
        if self.tail_len > 0 {
            let take = rest.len().min(BLOCK_SIZE - self.tail_len);
            self.tail[self.tail_len..self.tail_len + take].copy_from_slice(&rest[..take]);
            self.tail_len += take;
            rest = &rest[take..];

            if self.tail_len == BLOCK_SIZE {
                let block = self.tail.to_vec();
                self.tail_len = 0;
                self.submit(Submission::Block {
                    uid: self.uid,
                    bytes: block,
                })?;
            }
        }

        // Largest whole-block prefix goes out as one submission.
        let whole = rest.len() & !(BLOCK_SIZE - 1);
        if whole > 0 {
            self.submit(Submission::Block {
                uid: self.uid,
                bytes: rest[..whole].to_vec(),
            })?;
            rest = &rest[whole..];
        }

        if !rest.is_empty() {
            self.tail[..rest.len()].copy_from_slice(rest);
            self.tail_len = rest.len();
        }
        Ok(())
    }

    /// Finalise the stream and return `prefix` with the 16-byte digest
    /// appended.
    ///
    /// The stream stays open: the trailer is computed on a copy of the
    /// current state, and later writes continue the digest from where it
    /// was. After [`close`](Self::close), returns the last digest computed.
    ///
    /// # Errors
    ///
    /// [`Md5Error::ServerClosed`] if the server shut down before replying;
    /// [`Md5Error::StreamClosed`] if the stream was closed without ever
    /// being summed.
    pub fn sum(&mut self, prefix: &[u8]) -> Result<Vec<u8>, Md5Error> {
        let digest = self.sum_digest()?;
        let mut out = Vec::with_capacity(prefix.len() + DIGEST_SIZE);
        out.extend_from_slice(prefix);
        out.extend_from_slice(&digest);
        Ok(out)
    }

    /// Finalise and return just the digest. See [`sum`](Self::sum).
    ///
    /// # Errors
    ///
    /// Same conditions as [`sum`](Self::sum).
    pub fn sum_digest(&mut self) -> Result<Digest, Md5Error> {
        if self.closed {
            return self.cached.ok_or(Md5Error::StreamClosed);
        }

        let (reply_tx, reply_rx) = bounded(1);
        self.submit(Submission::Final {
            uid: self.uid,
            trailer: self.trailer(),
            reply: reply_tx,
        })?;
        let digest = reply_rx.recv().map_err(|_| Md5Error::ServerClosed)?;
        self.cached = Some(digest);
        Ok(digest)
    }

    /// Final trailer: tail bytes, `0x80`, zero padding to 56 mod 64, then
    /// the bit length little-endian. Always 64 or 128 bytes, so finals take
    /// the server's scalar bypass.
    fn trailer(&self) -> Vec<u8> {
        let mut trail = Vec::with_capacity(2 * BLOCK_SIZE);
        trail.extend_from_slice(&self.tail[..self.tail_len]);

        let rem = (self.total_len % 64) as usize;
        let pad = if rem < 56 { 56 - rem } else { 64 + 56 - rem };
        trail.push(0x80);
        trail.resize(trail.len() + pad - 1, 0);

        trail.extend_from_slice(&(self.total_len << 3).to_le_bytes());
        trail
    }

    /// Erase all history. The stream is reusable afterwards, even if it was
    /// closed.
    pub fn reset(&mut self) {
        // Best-effort: on a shut-down server there is no state to clear.
        let _ = self.server.submissions.send(Submission::Reset { uid: self.uid });
        self.tail_len = 0;
        self.total_len = 0;
        self.closed = false;
        self.cached = None;
    }

    /// Retire the stream. Idempotent; only [`reset`](Self::reset) revives
    /// the handle.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        let _ = self.server.submissions.send(Submission::Close { uid: self.uid });
        self.closed = true;
        self.tail_len = 0;
    }

    fn submit(&self, sub: Submission) -> Result<(), Md5Error> {
        if self.server.is_closed() {
            return Err(Md5Error::ServerClosed);
        }
        self.server
            .submissions
            .send(sub)
            .map_err(|_| Md5Error::ServerClosed)
    }
}

impl Drop for Md5Hasher {
    fn drop(&mut self) {
        // Release the stream's saved digest on the server.
        self.close();
    }
}

// =============================================================================
// DIGEST TRAIT IMPLS
// =============================================================================

#[cfg(feature = "digest-trait")]
impl OutputSizeUser for Md5Hasher {
    type OutputSize = U16;
}

#[cfg(feature = "digest-trait")]
impl BlockSizeUser for Md5Hasher {
    type BlockSize = U64;
}

#[cfg(feature = "digest-trait")]
impl Update for Md5Hasher {
    #[allow(clippy::expect_used)]
    fn update(&mut self, data: &[u8]) {
        self.write(data).expect("update on closed md5 stream");
    }
}

#[cfg(feature = "digest-trait")]
impl FixedOutput for Md5Hasher {
    #[allow(clippy::expect_used)]
    fn finalize_into(mut self, out: &mut Output<Self>) {
        let digest = self.sum_digest().expect("finalize on closed md5 stream");
        out.copy_from_slice(&digest);
    }
}

#[cfg(feature = "digest-trait")]
impl Reset for Md5Hasher {
    fn reset(&mut self) {
        self.reset();
    }
}

#[cfg(feature = "digest-trait")]
impl HashMarker for Md5Hasher {}
