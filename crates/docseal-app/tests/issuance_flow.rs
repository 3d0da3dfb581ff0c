// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end issuance and verification against the in-process ledger.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use docseal_app::{BulkStatus, Issuer, OriginalCheck, Silent, Verifier, check_original, issue_batch};
use docseal_core::config::AnchorMode;
use docseal_core::types::FileStatus;
use docseal_core::{
    Clock, DocType, DocsealConfig, DocsealError, DocumentId, DocumentMetadata, ManualClock, MediaType,
    RegistryErrorKind, UploadedFile, VerificationStatus,
};
use docseal_document::compose::pdf::blank_pdf;
use docseal_registry::Ledger;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

const START: u64 = 1_767_225_600;

type Session = Arc<Ledger<Arc<ManualClock>>>;

struct World {
    clock: Arc<ManualClock>,
    ledger: Session,
    config: DocsealConfig,
}

impl World {
    fn new() -> Self {
        Self::with_ledger(|ledger| ledger)
    }

    fn with_ledger(tweak: impl FnOnce(Ledger<Arc<ManualClock>>) -> Ledger<Arc<ManualClock>>) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let ledger = Arc::new(tweak(Ledger::new(clock.clone())));
        let config = DocsealConfig {
            contract_address: format!("{:?}", ledger.contract_address()),
            ..DocsealConfig::default()
        };
        Self { clock, ledger, config }
    }

    fn dyn_clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    fn issuer(&self) -> Issuer<Session> {
        Issuer::with_clock(self.ledger.clone(), self.config.clone(), self.dyn_clock()).unwrap()
    }

    fn verifier(&self) -> Verifier<Session> {
        Verifier::with_clock(self.ledger.clone(), &self.config, self.dyn_clock()).unwrap()
    }
}

fn certificate(valid_until: u64) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::new(DocType::Certificate, "Acme University");
    metadata.subject = "Ada Lovelace".into();
    metadata.title = "BSc Mathematics".into();
    metadata.valid_until = valid_until;
    metadata
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([250, 250, 250, 255])))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[tokio::test]
async fn issued_document_is_valid_then_expires() {
    let world = World::new();
    let pdf = blank_pdf(1, 595.0, 842.0);
    let file = UploadedFile::new("degree.pdf", MediaType::Pdf, pdf.clone());

    let issued = world
        .issuer()
        .issue(&file, &certificate(START + 3_600))
        .await
        .unwrap();

    let verifier = world.verifier();
    let result = verifier.verify_id(&issued.id).await.unwrap();
    assert_eq!(result.status(), VerificationStatus::Valid);
    let record = result.record().unwrap();
    assert_eq!(record.issuer, "Acme University");
    assert_eq!(record.subject, "Ada Lovelace");
    assert_eq!(record.issued_at, START);
    assert_eq!(check_original(record, &pdf, AnchorMode::File, None), OriginalCheck::Matches);
    assert_eq!(
        check_original(record, &issued.document.bytes, AnchorMode::File, None),
        OriginalCheck::Differs
    );

    let by_link = verifier.verify_link(&issued.verification_url).await.unwrap();
    assert_eq!(by_link.status(), VerificationStatus::Valid);

    world.clock.advance(3_600);
    assert_eq!(
        verifier.verify_id(&issued.id).await.unwrap().status(),
        VerificationStatus::Valid
    );
    world.clock.advance(1);
    assert_eq!(
        verifier.verify_id(&issued.id).await.unwrap().status(),
        VerificationStatus::Expired
    );
}

#[tokio::test]
async fn canonical_anchor_still_recognises_the_original() {
    let mut world = World::new();
    world.config.anchor_mode = AnchorMode::CanonicalRecord;
    let pdf = blank_pdf(1, 595.0, 842.0);
    let file = UploadedFile::new("degree.pdf", MediaType::Pdf, pdf.clone());
    let issued = world.issuer().issue(&file, &certificate(0)).await.unwrap();

    let result = world.verifier().verify_id(&issued.id).await.unwrap();
    assert_eq!(result.status(), VerificationStatus::Valid);
    let record = result.record().unwrap();
    let json = issued.canonical_json.as_deref();
    let mode = AnchorMode::CanonicalRecord;
    assert_eq!(check_original(record, &pdf, mode, json), OriginalCheck::Matches);
    assert_eq!(check_original(record, &pdf, mode, None), OriginalCheck::NeedsRecord);
    assert_eq!(
        check_original(record, &issued.document.bytes, mode, json),
        OriginalCheck::Differs
    );
}

#[tokio::test]
async fn revoked_document_reports_revoked() {
    let world = World::new();
    let file = UploadedFile::new("degree.pdf", MediaType::Pdf, blank_pdf(1, 612.0, 792.0));
    let issued = world.issuer().issue(&file, &certificate(0)).await.unwrap();

    world.ledger.revoke(issued.id.as_str()).unwrap();
    world.clock.advance(10 * 365 * 86_400);
    let result = world.verifier().verify_id(&issued.id).await.unwrap();
    assert_eq!(result.status(), VerificationStatus::Revoked);
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let world = World::new();
    let result = world
        .verifier()
        .verify_id(&DocumentId::parse("CERTIFICATE-deadbeef").unwrap())
        .await
        .unwrap();
    assert_eq!(result.status(), VerificationStatus::NotFound);
    assert!(result.record().is_none());
}

#[tokio::test]
async fn corrupt_file_in_a_batch_does_not_stop_the_rest() {
    let world = World::new();
    let files = [
        UploadedFile::new("first.pdf", MediaType::Pdf, blank_pdf(1, 612.0, 792.0)),
        UploadedFile::new("broken.pdf", MediaType::Pdf, b"%PDF-1.7 this is not a pdf".to_vec()),
        UploadedFile::new("third.png", MediaType::Png, png(800, 600)),
    ];

    let report = issue_batch(&world.issuer(), &files, &certificate(0), &mut Silent).await;

    assert_eq!(
        report.statuses,
        vec![FileStatus::Completed, FileStatus::Error, FileStatus::Completed]
    );
    assert_eq!(report.issued.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "broken.pdf");
    assert_eq!(world.ledger.len(), 2);
}

#[tokio::test]
async fn stamped_image_keeps_its_size_and_verifies_from_the_symbol() {
    let world = World::new();
    let file = UploadedFile::new("card.png", MediaType::Png, png(1600, 1000));
    let issued = world.issuer().issue(&file, &certificate(0)).await.unwrap();

    assert_eq!(issued.document.media_type, MediaType::Png);
    assert!(issued.output_name().ends_with("_signed.png"));
    let stamped = image::load_from_memory(&issued.document.bytes).unwrap();
    assert_eq!((stamped.width(), stamped.height()), (1600, 1000));

    let scanned = UploadedFile::new("scan.png", MediaType::Png, issued.document.bytes.clone());
    let blank = UploadedFile::new("blank.png", MediaType::Png, png(200, 200));
    let entries = world.verifier().verify_images(&[scanned, blank]).await;
    assert_eq!(entries[0].status, BulkStatus::Valid);
    assert_eq!(entries[0].id.as_deref(), Some(issued.id.as_str()));
    assert_eq!(entries[1].status, BulkStatus::NoQr);
}

#[tokio::test]
async fn slow_confirmation_is_a_timeout() {
    let mut world = World::with_ledger(|l| l.with_confirmation_delay(Duration::from_secs(3)));
    world.config.tx_timeout_secs = 1;
    let file = UploadedFile::new("degree.pdf", MediaType::Pdf, blank_pdf(1, 612.0, 792.0));

    let err = world.issuer().issue(&file, &certificate(0)).await.unwrap_err();
    assert_eq!(err.registry_kind(), Some(RegistryErrorKind::Timeout));
    // The transaction still lands; only the wait was abandoned.
    assert_eq!(world.ledger.len(), 1);
}

#[tokio::test]
async fn unconfigured_registry_refuses_to_issue() {
    let mut world = World::new();
    world.config.contract_address = String::new();
    let file = UploadedFile::new("degree.pdf", MediaType::Pdf, blank_pdf(1, 612.0, 792.0));

    let err = world.issuer().issue(&file, &certificate(0)).await.unwrap_err();
    assert!(matches!(
        err,
        DocsealError::Registry {
            kind: RegistryErrorKind::NotConfigured,
            ..
        }
    ));
    assert!(world.ledger.is_empty());
}
