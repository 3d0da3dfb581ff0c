// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document fingerprints: Keccak-256 content digests for tamper evidence.

use std::io::Read;

use docseal_core::Bytes32;
use docseal_core::error::{DocsealError, Result};
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use tracing::{debug, instrument, warn};

/// How a `FileDigest` was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    /// Keccak-256 over the full content.
    Keccak256,
    /// SHA-256 over name + size + timestamp. Not content-addressed.
    DegradedFallback,
}

/// A 256-bit document fingerprint, tagged with how it was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDigest {
    pub value: Bytes32,
    pub kind: DigestKind,
}

impl FileDigest {
    /// Keccak-256 of an in-memory buffer. Never fails.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self {
            value: keccak256(data),
            kind: DigestKind::Keccak256,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.kind == DigestKind::DegradedFallback
    }

    /// Lowercase hex, no prefix.
    pub fn to_hex(&self) -> String {
        self.value.to_hex()
    }

    /// Unwrap the digest, refusing the fallback so it is never anchored as
    /// if it identified the content.
    pub fn require_content_addressed(self) -> Result<Bytes32> {
        match self.kind {
            DigestKind::Keccak256 => Ok(self.value),
            DigestKind::DegradedFallback => Err(DocsealError::DegradedHash(format!(
                "fallback digest {} was derived from file name, size and time",
                self.value
            ))),
        }
    }
}

/// Keccak-256 as a `Bytes32`.
pub fn keccak256(data: &[u8]) -> Bytes32 {
    let out = Keccak256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&out);
    Bytes32(bytes)
}

/// Compute the Keccak-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    keccak256(data).to_hex()
}

/// Whether `data` hashes to `expected`.
pub fn matches_digest(data: &[u8], expected: &Bytes32) -> bool {
    keccak256(data) == *expected
}

/// Hash a byte stream. If the stream cannot be read to the end, fall back to
/// a digest of `name`, `declared_size` and `now_millis`, tagged as degraded.
#[instrument(skip(reader))]
pub fn hash_reader<R: Read>(
    mut reader: R,
    name: &str,
    declared_size: u64,
    now_millis: i64,
) -> FileDigest {
    let mut hasher = Keccak256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut total: u64 = 0;
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
                total += n as u64;
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(%err, name, "read failed while hashing, using degraded fallback digest");
                return fallback_digest(name, declared_size, now_millis);
            }
        }
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    debug!(total, "stream hashed");
    FileDigest {
        value: Bytes32(bytes),
        kind: DigestKind::Keccak256,
    }
}

/// Read `reader` to the end, hashing as it goes. On a read failure the bytes
/// read so far come back with the degraded fallback digest.
pub fn read_hashed<R: Read>(
    reader: R,
    name: &str,
    declared_size: u64,
    now_millis: i64,
) -> (Vec<u8>, FileDigest) {
    let mut capture = Capture {
        inner: reader,
        bytes: Vec::with_capacity(declared_size.min(64 << 20) as usize),
    };
    let digest = hash_reader(&mut capture, name, declared_size, now_millis);
    (capture.bytes, digest)
}

/// Keeps a copy of everything read through it.
struct Capture<R> {
    inner: R,
    bytes: Vec<u8>,
}

impl<R: Read> Read for Capture<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

/// SHA-256 over `name + size + timestamp`.
pub fn fallback_digest(name: &str, size: u64, now_millis: i64) -> FileDigest {
    let material = format!("{name}{size}{now_millis}");
    let out = Sha256::digest(material.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&out);
    FileDigest {
        value: Bytes32(bytes),
        kind: DigestKind::DegradedFallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Keccak-256 of the empty byte slice (well-known constant).
    const EMPTY_KECCAK: &str = "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk went away"))
        }
    }

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_KECCAK);
    }

    #[test]
    fn hash_known_value() {
        let expected = "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8";
        assert_eq!(hash_bytes(b"hello"), expected);
    }

    #[test]
    fn hashing_is_deterministic() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(hash_bytes(&data), hash_bytes(&data));
        assert_eq!(FileDigest::of_bytes(&data), FileDigest::of_bytes(&data));
    }

    #[test]
    fn reader_matches_in_memory_digest() {
        let data = vec![7u8; 200_000];
        let streamed = hash_reader(std::io::Cursor::new(&data), "blob.bin", 200_000, 0);
        assert_eq!(streamed, FileDigest::of_bytes(&data));
        assert!(streamed.require_content_addressed().is_ok());
    }

    #[test]
    fn read_failure_yields_flagged_fallback() {
        let digest = hash_reader(FailingReader, "diploma.pdf", 1234, 1_700_000_000_000);
        assert!(digest.is_degraded());
        assert_eq!(digest, fallback_digest("diploma.pdf", 1234, 1_700_000_000_000));
        assert!(matches!(
            digest.require_content_addressed(),
            Err(DocsealError::DegradedHash(_))
        ));
    }

    #[test]
    fn read_hashed_keeps_the_bytes() {
        let data: Vec<u8> = (0..150_000u32).map(|i| (i % 13) as u8).collect();
        let (bytes, digest) = read_hashed(std::io::Cursor::new(&data), "scan.png", 0, 0);
        assert_eq!(bytes, data);
        assert_eq!(digest, FileDigest::of_bytes(&data));
    }

    #[test]
    fn read_hashed_degrades_on_failure() {
        let (bytes, digest) = read_hashed(FailingReader, "scan.png", 99, 5);
        assert!(bytes.is_empty());
        assert_eq!(digest, fallback_digest("scan.png", 99, 5));
    }

    #[test]
    fn fallback_is_not_content_addressed() {
        let a = fallback_digest("a.pdf", 10, 1);
        let b = fallback_digest("b.pdf", 10, 1);
        assert_ne!(a.value, b.value);
    }

    #[test]
    fn matches_digest_detects_tampering() {
        let digest = keccak256(b"original");
        assert!(matches_digest(b"original", &digest));
        assert!(!matches_digest(b"originaI", &digest));
    }
}
