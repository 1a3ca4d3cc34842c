//! Streaming semantics: split points, interleaved sums, reset, close.

#![allow(clippy::unwrap_used)]

use md5::{Digest as _, Md5};
use md5x::{Backend, Md5Error, Server};

fn reference(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

// =============================================================================
// SPLIT-POINT CONSISTENCY
// =============================================================================

#[test]
fn arbitrary_split_points_match_reference() {
    let server = Server::new();
    let data: Vec<u8> = (0..1021u32).map(|i| (i * 31 + 7) as u8).collect();
    let expected = reference(&data);

    for split in [0, 1, 63, 64, 65, 511, data.len() / 2, data.len() - 1, data.len()] {
        let (first, second) = data.split_at(split);
        let mut h = server.new_hash();
        h.write(first).unwrap();
        h.write(second).unwrap();
        assert_eq!(
            hex::encode(h.sum_digest().unwrap()),
            expected,
            "split at {split}"
        );
    }
}

#[test]
fn byte_by_byte_matches_reference() {
    let server = Server::new();
    let data = b"The quick brown fox jumps over the lazy dog";

    let mut h = server.new_hash();
    for b in data {
        h.write(std::slice::from_ref(b)).unwrap();
    }
    assert_eq!(hex::encode(h.sum_digest().unwrap()), reference(data));
}

// =============================================================================
// SUM DOES NOT END THE STREAM
// =============================================================================

/// Every intermediate sum must equal the reference digest of the bytes
/// written so far; writes after a sum continue the stream.
fn interleaved_sum_and_write(backend: Backend) {
    let server = Server::with_backend(backend);

    for i in 0..128usize {
        for j in 0..64usize {
            let mut h = server.new_hash();
            let mut written = Vec::new();

            for part_len in [64 + i, 64 + j, 64] {
                let part: Vec<u8> = (0..part_len).map(|k| (k * 13 + i + j) as u8).collect();
                h.write(&part).unwrap();
                written.extend_from_slice(&part);

                assert_eq!(
                    hex::encode(h.sum_digest().unwrap()),
                    reference(&written),
                    "i={i} j={j} after {} bytes",
                    written.len()
                );
            }
        }
    }
}

#[test]
fn interleaved_sum_and_write_fused() {
    interleaved_sum_and_write(Backend::Fused16);
}

#[test]
fn interleaved_sum_and_write_doubled() {
    interleaved_sum_and_write(Backend::Doubled8);
}

#[test]
fn sum_is_idempotent_between_writes() {
    let server = Server::new();
    let mut h = server.new_hash();
    h.write(b"hello world").unwrap();

    let first = h.sum_digest().unwrap();
    let second = h.sum_digest().unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// CLOSE / RESET LIFECYCLE
// =============================================================================

#[test]
fn write_after_close_is_an_error() {
    let server = Server::new();
    let mut h = server.new_hash();
    h.write(b"data").unwrap();
    h.close();

    assert_eq!(h.write(b"more"), Err(Md5Error::StreamClosed));
}

#[test]
fn sum_after_close_returns_cached_digest() {
    let server = Server::new();
    let mut h = server.new_hash();
    h.write(b"abc").unwrap();
    let before = h.sum_digest().unwrap();

    h.close();
    h.close(); // idempotent

    assert_eq!(h.sum_digest().unwrap(), before);
    assert_eq!(h.sum(b"p").unwrap()[1..], before[..]);
}

#[test]
fn close_without_sum_leaves_nothing_to_observe() {
    let server = Server::new();
    let mut h = server.new_hash();
    h.write(b"abc").unwrap();
    h.close();

    assert_eq!(h.sum_digest(), Err(Md5Error::StreamClosed));
}

#[test]
fn reset_erases_history() {
    let server = Server::new();
    let data = vec![0x5Au8; 300];

    let mut h = server.new_hash();
    h.write(&data).unwrap();
    let clean = h.sum_digest().unwrap();

    h.reset();
    h.write(&data).unwrap();
    assert_eq!(h.sum_digest().unwrap(), clean);

    // reset also revives a closed stream
    h.close();
    h.reset();
    h.write(&data).unwrap();
    assert_eq!(h.sum_digest().unwrap(), clean);
}

#[test]
fn reset_in_the_middle_of_buffered_bytes() {
    let server = Server::new();
    let mut h = server.new_hash();

    // 100 bytes: one block submitted, 36 left in the tail
    h.write(&[1u8; 100]).unwrap();
    h.reset();
    h.write(b"abc").unwrap();
    assert_eq!(
        hex::encode(h.sum_digest().unwrap()),
        "900150983cd24fb0d6963f7d28e17f72"
    );
}

// =============================================================================
// SERVER SHUTDOWN
// =============================================================================

#[test]
fn operations_fail_cleanly_after_server_close() {
    let server = Server::new();
    let mut h = server.new_hash();
    h.write(b"abc").unwrap();

    server.close();

    assert_eq!(h.write(b"more"), Err(Md5Error::ServerClosed));
    assert_eq!(h.sum_digest(), Err(Md5Error::ServerClosed));
}

#[test]
fn server_close_is_idempotent() {
    let server = Server::new();
    server.close();
    server.close();
}
