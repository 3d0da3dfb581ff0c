// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the placement scorer and QR renderer in the
// docseal-document crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use docseal_document::{QrRenderer, find_optimal_position};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Score all four corners of a scanned-certificate-sized canvas.
///
/// The canvas is mostly white with a dark band across the top, so the scorer
/// visits every region and the winner is not the first one tried.
fn bench_placement(c: &mut Criterion) {
    let (width, height) = (2480u32, 1754u32);
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([250, 250, 250, 255]));
    for y in 0..200 {
        for x in 0..width {
            canvas.put_pixel(x, y, Rgba([20, 20, 60, 255]));
        }
    }

    c.bench_function("find_optimal_position (A5 @ 300dpi)", |b| {
        b.iter(|| black_box(find_optimal_position(black_box(&canvas), 120)));
    });
}

/// Render and sharpen a typical verification payload at the default PDF and
/// maximum image sizes.
fn bench_qr_render(c: &mut Criterion) {
    let payload = "https://verify.example.org/verify?chain=amoy\
                   &contract=0xabcdefabcdefabcdefabcdefabcdefabcdefabcd&id=CERTIFICATE-1a2b3c4d";
    let renderer = QrRenderer::default();

    let mut group = c.benchmark_group("qr_render");
    for size in [80u32, 120] {
        group.bench_function(format!("{size}px"), |b| {
            b.iter(|| {
                let qr = renderer.render(black_box(payload), size).expect("render failed");
                black_box(qr);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_placement, bench_qr_render);
criterion_main!(benches);
