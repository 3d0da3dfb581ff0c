// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for Keccak fingerprinting and canonical record
// encoding in the docseal-security crate.

use chrono::NaiveDate;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use docseal_core::{DocType, DocumentId, DocumentMetadata};
use docseal_security::{encode_record, hash_bytes, hash_reader};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Keccak-256 over buffers from a small card scan up to a multi-page PDF.
fn bench_keccak(c: &mut Criterion) {
    let sizes: &[(&str, usize)] = &[
        ("1 KiB", 1024),
        ("100 KiB", 100 * 1024),
        ("1 MiB", 1024 * 1024),
        ("8 MiB", 8 * 1024 * 1024),
    ];

    let mut group = c.benchmark_group("keccak256");
    for &(label, size) in sizes {
        let data = vec![0xABu8; size];
        group.bench_function(label, |b| {
            b.iter(|| black_box(hash_bytes(black_box(&data))));
        });
    }
    group.finish();
}

/// Streaming digest through the 64 KiB read loop.
fn bench_stream_hash(c: &mut Criterion) {
    let data = vec![0x5Au8; 4 * 1024 * 1024];
    c.bench_function("hash_reader (4 MiB)", |b| {
        b.iter(|| {
            let digest = hash_reader(std::io::Cursor::new(black_box(&data)), "bench.pdf", 0, 0);
            black_box(digest);
        });
    });
}

/// One canonical record encode (serialise, sort, hash, fresh nonce).
fn bench_canonical_record(c: &mut Criterion) {
    let mut meta = DocumentMetadata::new(DocType::EmployeeCard, "Acme Corp");
    meta.subject = "Grace Hopper".into();
    meta.role_or_program = "Rear Admiral".into();
    meta.id_number = "E-1906".into();
    let id = DocumentId::generate(DocType::EmployeeCard);
    let digest = docseal_security::FileDigest::of_bytes(b"card").value;
    let date = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");

    c.bench_function("encode_record", |b| {
        b.iter(|| {
            let encoded = encode_record(&id, &digest, &meta, date).expect("encode failed");
            black_box(encoded);
        });
    });
}

criterion_group!(
    benches,
    bench_keccak,
    bench_stream_hash,
    bench_canonical_record
);
criterion_main!(benches);
