// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification: by id, by scanned link, and in bulk from stamped images.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use docseal_core::config::AnchorMode;
use docseal_core::error::{DocsealError, Result};
use docseal_core::{
    Clock, DocsealConfig, DocumentId, DocumentRecord, SystemClock, UploadedFile, VerificationResult,
    VerificationStatus,
};
use docseal_document::{VerificationLink, decode_qr, parse_payload};
use docseal_registry::{RegistryClient, SigningSession, classify, parse_address};
use docseal_security::embedded_file_digest;
use docseal_security::integrity::{keccak256, matches_digest};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Outcome label for one file in a bulk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkStatus {
    Valid,
    Expired,
    Revoked,
    NotFound,
    NoQr,
    Error,
}

impl BulkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::NotFound => "not_found",
            Self::NoQr => "no_qr",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for BulkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<VerificationStatus> for BulkStatus {
    fn from(status: VerificationStatus) -> Self {
        match status {
            VerificationStatus::Valid => Self::Valid,
            VerificationStatus::Expired => Self::Expired,
            VerificationStatus::Revoked => Self::Revoked,
            VerificationStatus::NotFound => Self::NotFound,
        }
    }
}

/// One row of a bulk verification.
#[derive(Debug, Clone, Serialize)]
pub struct BulkEntry {
    pub file: String,
    pub status: BulkStatus,
    pub id: Option<String>,
    pub reason: String,
    pub record: Option<DocumentRecord>,
}

/// Looks documents up and classifies them.
pub struct Verifier<S> {
    client: RegistryClient<S>,
    clock: Arc<dyn Clock>,
}

impl<S: SigningSession> Verifier<S> {
    pub fn new(session: S, config: &DocsealConfig) -> Result<Self> {
        Self::with_clock(session, config, Arc::new(SystemClock))
    }

    pub fn with_clock(session: S, config: &DocsealConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            client: RegistryClient::new(session, config)?,
            clock,
        })
    }

    /// Look up `id` and classify it against the current time.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn verify_id(&self, id: &DocumentId) -> Result<VerificationResult> {
        let record = self.client.lookup(id).await?;
        let result = classify(record, self.clock.now_unix());
        info!(status = %result.status(), "document verified");
        Ok(result)
    }

    /// Verify the document a scanned link points at. Links naming a
    /// different registry contract are refused.
    pub async fn verify_link(&self, text: &str) -> Result<VerificationResult> {
        let link = parse_payload(text)?;
        self.check_contract(&link)?;
        self.verify_id(&link.id).await
    }

    fn check_contract(&self, link: &VerificationLink) -> Result<()> {
        if let (Some(linked), Some(bound)) = (link.contract.as_deref(), self.client.contract()) {
            if parse_address(linked) != Some(bound) {
                return Err(DocsealError::InvalidInput(format!(
                    "link targets contract {linked}, this verifier is bound to {bound:?}"
                )));
            }
        }
        Ok(())
    }

    /// Verify whatever an image's QR symbol points at. Never fails; problems
    /// become `no_qr` or `error` rows.
    #[instrument(skip(self, file), fields(name = %file.name))]
    pub async fn verify_image(&self, file: &UploadedFile) -> BulkEntry {
        let row = |status: BulkStatus, id: Option<String>, reason: &str, record| BulkEntry {
            file: file.name.clone(),
            status,
            id,
            reason: reason.to_string(),
            record,
        };

        let text = match decode_qr(&file.bytes) {
            Ok(Some(text)) => text,
            Ok(None) => return row(BulkStatus::NoQr, None, "No QR code found", None),
            Err(err) => {
                debug!(error = %err, "image could not be read");
                return row(BulkStatus::Error, None, "Processing error", None);
            }
        };
        let link = match parse_payload(&text) {
            Ok(link) => link,
            Err(_) => return row(BulkStatus::NoQr, None, "No QR code found", None),
        };
        let id = link.id.clone();
        if let Err(err) = self.check_contract(&link) {
            warn!(%id, error = %err, "symbol names another registry");
            return row(BulkStatus::Error, Some(id.to_string()), "Issued on a different registry", None);
        }
        match self.verify_id(&id).await {
            Ok(result) => {
                let status = result.status();
                let record = result.record().cloned();
                row(status.into(), Some(id.to_string()), status.reason(), record)
            }
            Err(err) => {
                warn!(%id, error = %err, "lookup failed");
                row(BulkStatus::Error, Some(id.to_string()), "Verification error", None)
            }
        }
    }

    /// Verify each file in turn.
    pub async fn verify_images(&self, files: &[UploadedFile]) -> Vec<BulkEntry> {
        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            entries.push(self.verify_image(file).await);
        }
        entries
    }
}

/// Outcome of comparing a candidate original with an anchored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginalCheck {
    Matches,
    Differs,
    /// The registry holds a canonical record digest and no record JSON was
    /// supplied, so the file cannot be compared.
    NeedsRecord,
}

/// Whether `original` is the file anchored in `record`.
///
/// Under [`AnchorMode::File`] the anchored digest is the file's own
/// Keccak-256. Under [`AnchorMode::CanonicalRecord`] it is the digest of the
/// canonical record JSON, which must be supplied; its `fileKeccak` is then
/// compared with the file.
pub fn check_original(
    record: &DocumentRecord,
    original: &[u8],
    mode: AnchorMode,
    canonical_json: Option<&str>,
) -> OriginalCheck {
    if record.file_digest.is_zero() {
        return OriginalCheck::Differs;
    }
    let found = match (mode, canonical_json) {
        (AnchorMode::File, _) => matches_digest(original, &record.file_digest),
        (AnchorMode::CanonicalRecord, None) => return OriginalCheck::NeedsRecord,
        (AnchorMode::CanonicalRecord, Some(json)) => {
            if keccak256(json.as_bytes()) != record.file_digest {
                debug!("canonical record does not hash to the anchored digest");
                false
            } else {
                match embedded_file_digest(json) {
                    Ok(embedded) => matches_digest(original, &embedded),
                    Err(err) => {
                        warn!(error = %err, "canonical record unreadable");
                        false
                    }
                }
            }
        }
    };
    if found {
        OriginalCheck::Matches
    } else {
        OriginalCheck::Differs
    }
}

/// Accept either a bare document id or a full verification link.
pub enum Target {
    Id(DocumentId),
    Link(String),
}

impl FromStr for Target {
    type Err = DocsealError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Link(s.to_string()))
        } else {
            DocumentId::parse(s).map(Self::Id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docseal_core::ManualClock;
    use docseal_registry::Ledger;

    fn verifier(ledger: Arc<Ledger<ManualClock>>) -> Verifier<Arc<Ledger<ManualClock>>> {
        let config = DocsealConfig {
            contract_address: format!("{:?}", ledger.contract_address()),
            ..DocsealConfig::default()
        };
        Verifier::with_clock(ledger, &config, Arc::new(ManualClock::new(5_000))).unwrap()
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let v = verifier(Arc::new(Ledger::new(ManualClock::new(0))));
        let result = v.verify_id(&DocumentId::parse("ID_CARD-00000000").unwrap()).await.unwrap();
        assert_eq!(result.status(), VerificationStatus::NotFound);
    }

    #[tokio::test]
    async fn link_to_another_contract_is_refused() {
        let v = verifier(Arc::new(Ledger::new(ManualClock::new(0))));
        let link = "http://localhost:5173/verify?chain=amoy&contract=0x00000000000000000000000000000000000000ff&id=X-1";
        assert!(matches!(v.verify_link(link).await, Err(DocsealError::InvalidInput(_))));
    }

    fn png_of(img: &image::RgbaImage) -> Vec<u8> {
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();
        png.into_inner()
    }

    #[tokio::test]
    async fn symbol_for_another_contract_is_refused() {
        let v = verifier(Arc::new(Ledger::new(ManualClock::new(0))));
        let foreign = "http://localhost:5173/verify?chain=amoy\
                       &contract=0x00000000000000000000000000000000000000ff&id=ID_CARD-0badc0de";
        let qr = docseal_document::QrRenderer::default().render(foreign, 150).unwrap();
        let file = UploadedFile::new("foreign.png", docseal_core::MediaType::Png, png_of(&qr.image));

        let entry = v.verify_image(&file).await;
        assert_eq!(entry.status, BulkStatus::Error);
        assert_eq!(entry.id.as_deref(), Some("ID_CARD-0badc0de"));
        assert_eq!(entry.reason, "Issued on a different registry");
        assert!(entry.record.is_none());
    }

    #[tokio::test]
    async fn image_without_symbol_is_no_qr() {
        let v = verifier(Arc::new(Ledger::new(ManualClock::new(0))));
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            64,
            64,
            image::Rgba([255, 255, 255, 255]),
        ))
        .write_to(&mut png, image::ImageFormat::Png)
        .unwrap();
        let file = UploadedFile::new("blank.png", docseal_core::MediaType::Png, png.into_inner());
        let entry = v.verify_image(&file).await;
        assert_eq!(entry.status, BulkStatus::NoQr);
        assert_eq!(entry.reason, "No QR code found");

        let junk = UploadedFile::new("junk.png", docseal_core::MediaType::Png, b"junk".to_vec());
        assert_eq!(v.verify_image(&junk).await.status, BulkStatus::Error);
    }

    #[test]
    fn original_file_matches_anchored_digest() {
        let bytes = b"%PDF-1.7 original";
        let record = DocumentRecord {
            file_digest: keccak256(bytes),
            ..DocumentRecord::sentinel()
        };
        let check = |r: &DocumentRecord, b: &[u8]| check_original(r, b, AnchorMode::File, None);
        assert_eq!(check(&record, bytes), OriginalCheck::Matches);
        assert_eq!(check(&record, b"%PDF-1.7 altered"), OriginalCheck::Differs);
        assert_eq!(check(&DocumentRecord::sentinel(), b""), OriginalCheck::Differs);
    }

    #[test]
    fn canonical_anchor_compares_through_the_record() {
        let bytes = b"%PDF-1.7 original";
        let mut metadata = docseal_core::DocumentMetadata::new(docseal_core::DocType::Certificate, "Acme U");
        metadata.title = "BSc".into();
        let encoded = docseal_security::encode_record(
            &DocumentId::parse("CERTIFICATE-1a2b3c4d").unwrap(),
            &keccak256(bytes),
            &metadata,
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
        .unwrap();
        let record = DocumentRecord {
            file_digest: encoded.digest,
            ..DocumentRecord::sentinel()
        };
        let mode = AnchorMode::CanonicalRecord;

        assert_eq!(check_original(&record, bytes, mode, Some(&encoded.json)), OriginalCheck::Matches);
        assert_eq!(
            check_original(&record, b"%PDF-1.7 altered", mode, Some(&encoded.json)),
            OriginalCheck::Differs
        );
        assert_eq!(check_original(&record, bytes, mode, None), OriginalCheck::NeedsRecord);
        let forged = encoded.json.replace("Acme U", "Acme V");
        assert_eq!(check_original(&record, bytes, mode, Some(&forged)), OriginalCheck::Differs);
    }

    #[test]
    fn targets_are_told_apart() {
        assert!(matches!("https://v.example/verify?id=A".parse::<Target>(), Ok(Target::Link(_))));
        assert!(matches!("CERTIFICATE-1".parse::<Target>(), Ok(Target::Id(_))));
        assert!("".parse::<Target>().is_err());
    }
}
