// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docseal-security: document fingerprints and canonical record digests.

pub mod canonical;
pub mod integrity;

pub use canonical::{EncodedRecord, embedded_file_digest, encode_record};
pub use integrity::{DigestKind, FileDigest, hash_bytes, hash_reader, read_hashed};
