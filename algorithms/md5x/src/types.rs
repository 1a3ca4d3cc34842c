//! Shared types and observable constants.

use core::fmt;
use std::error;

/// MD5 block size in bytes.
pub const BLOCK_SIZE: usize = 64;

/// MD5 digest size in bytes.
pub const DIGEST_SIZE: usize = 16;

/// Largest payload a single submission may carry. `write` splits anything
/// bigger so the server can interleave other streams between chunks.
pub const MAX_BLOCK_SIZE: usize = 2 * 1024 * 1024;

/// A finalised MD5 digest.
pub type Digest = [u8; DIGEST_SIZE];

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Kernel path chosen once at server construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Single 16-lane kernel reading stream payloads in place.
    Fused16,
    /// Two 8-lane kernels over staging buffers, forked and joined per flush.
    Doubled8,
}

impl Backend {
    /// Pick the widest path the CPU makes worthwhile.
    ///
    /// The 512-bit register file keeps all 16 lanes in one kernel; anything
    /// narrower splits the table into two 8-lane groups.
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512bw") {
                return Backend::Fused16;
            }
        }
        Backend::Doubled8
    }

    /// Number of lanes one kernel call advances.
    #[must_use]
    pub const fn kernel_lanes(self) -> usize {
        match self {
            Backend::Fused16 => 16,
            Backend::Doubled8 => 8,
        }
    }

    /// Human-readable path name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Backend::Fused16 => "16-lane fused",
            Backend::Doubled8 => "8-lane doubled",
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by stream handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Md5Error {
    /// The stream was closed; reset it before writing again.
    StreamClosed,
    /// The owning server has shut down and no longer accepts submissions.
    ServerClosed,
}

impl fmt::Display for Md5Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Md5Error::StreamClosed => {
                write!(f, "md5 stream already closed; reset before writing again")
            }
            Md5Error::ServerClosed => write!(f, "md5 server has shut down"),
        }
    }
}

impl error::Error for Md5Error {}
