// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `docseal` binary against an offline ledger in a scratch data directory.

use std::io::Cursor;
use std::path::Path;
use std::process::{Command, Output};

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

fn docseal(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_docseal"))
        .args(args)
        .env("DOCSEAL_HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("DOCSEAL_CONTRACT_ADDRESS")
        .env_remove("DOCSEAL_ORIGIN")
        .output()
        .unwrap()
}

fn write_png(path: &Path, width: u32, height: u32) {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([250, 250, 250, 255])))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    std::fs::write(path, out.into_inner()).unwrap();
}

#[test]
fn partly_failed_batch_keeps_the_anchored_records() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let good_one = work.path().join("p1.png");
    let broken = work.path().join("p2.pdf");
    let good_two = work.path().join("p3.png");
    write_png(&good_one, 900, 600);
    std::fs::write(&broken, b"%PDF-1.7 this is not a pdf").unwrap();
    write_png(&good_two, 900, 600);
    let out_dir = work.path().join("out");

    let issued = docseal(
        home.path(),
        &[
            "issue",
            "--type",
            "certificate",
            "--issuer",
            "Acme University",
            "--title",
            "BSc Mathematics",
            "--out",
            out_dir.to_str().unwrap(),
            good_one.to_str().unwrap(),
            broken.to_str().unwrap(),
            good_two.to_str().unwrap(),
        ],
    );
    assert!(!issued.status.success());
    assert!(String::from_utf8_lossy(&issued.stderr).contains("1 of 3 files failed"));

    let stdout = String::from_utf8_lossy(&issued.stdout);
    let ids: Vec<&str> = stdout
        .lines()
        .filter(|line| !line.starts_with(' '))
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(ids.len(), 2, "stdout: {stdout}");
    assert!(home.path().join("ledger.json").exists());

    for id in ids {
        let verified = docseal(home.path(), &["verify", id]);
        assert!(verified.status.success());
        let text = String::from_utf8_lossy(&verified.stdout);
        assert!(text.starts_with("valid:"), "{id}: {text}");
        assert!(out_dir.join(format!("{id}_signed.png")).exists());
    }
}

#[test]
fn hash_prints_the_keccak_digest() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let file = work.path().join("empty.txt");
    std::fs::write(&file, b"").unwrap();

    let out = docseal(home.path(), &["hash", file.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout)
        .starts_with("0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"));
}
