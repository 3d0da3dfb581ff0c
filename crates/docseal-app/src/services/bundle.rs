// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export bundle: a ZIP holding every stamped document plus a manifest.
//
//   processed-documents/<id>_signed.<ext>
//   processed-documents/metadata.json

use std::io::{Cursor, Seek, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use docseal_core::error::{DocsealError, Result};
use docseal_core::{Bytes32, DocumentMetadata};
use serde::Serialize;
use tracing::{info, instrument};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use super::issuance::IssuedDocument;

pub const BUNDLE_DIR: &str = "processed-documents";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    processed_at: String,
    document_type: &'a str,
    issuer: &'a str,
    total_documents: usize,
    documents: Vec<ManifestEntry<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry<'a> {
    id: &'a str,
    original_name: &'a str,
    file_hash: Bytes32,
    #[serde(rename = "verificationURL")]
    verification_url: &'a str,
}

fn archive_error(err: zip::result::ZipError) -> DocsealError {
    DocsealError::Archive(err.to_string())
}

/// Write the bundle for `documents` to `writer`.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn write_bundle<W: Write + Seek>(
    writer: W,
    documents: &[IssuedDocument],
    metadata: &DocumentMetadata,
    processed_at: DateTime<Utc>,
) -> Result<W> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    for doc in documents {
        zip.start_file(format!("{BUNDLE_DIR}/{}", doc.output_name()), options)
            .map_err(archive_error)?;
        zip.write_all(&doc.document.bytes)?;
    }

    let manifest = Manifest {
        processed_at: processed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        document_type: metadata.doc_type.as_str(),
        issuer: &metadata.issuer,
        total_documents: documents.len(),
        documents: documents
            .iter()
            .map(|doc| ManifestEntry {
                id: doc.id.as_str(),
                original_name: &doc.original_name,
                file_hash: doc.file_digest,
                verification_url: &doc.verification_url,
            })
            .collect(),
    };
    zip.start_file(format!("{BUNDLE_DIR}/metadata.json"), options)
        .map_err(archive_error)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

    let writer = zip.finish().map_err(archive_error)?;
    info!("bundle written");
    Ok(writer)
}

/// The bundle as an in-memory ZIP.
pub fn bundle_bytes(
    documents: &[IssuedDocument],
    metadata: &DocumentMetadata,
    processed_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    Ok(write_bundle(Cursor::new(Vec::new()), documents, metadata, processed_at)?.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::Arc;

    use super::*;
    use crate::services::issuance::Issuer;
    use docseal_core::{DocType, DocsealConfig, ManualClock, MediaType, UploadedFile};
    use docseal_document::compose::pdf::blank_pdf;
    use docseal_registry::Ledger;

    #[tokio::test]
    async fn bundle_holds_documents_and_manifest() {
        let ledger = Arc::new(Ledger::new(ManualClock::new(0)));
        let config = DocsealConfig {
            contract_address: format!("{:?}", ledger.contract_address()),
            ..DocsealConfig::default()
        };
        let issuer = Issuer::new(ledger, config).unwrap();
        let mut metadata = DocumentMetadata::new(DocType::IdCard, "City Hall");
        metadata.role_or_program = "Physics".into();
        metadata.id_number = "A-1".into();

        let mut issued = Vec::new();
        for name in ["one.pdf", "two.pdf"] {
            let file = UploadedFile::new(name, MediaType::Pdf, blank_pdf(1, 200.0, 300.0));
            issued.push(issuer.issue(&file, &metadata).await.unwrap());
        }

        let when = DateTime::from_timestamp(1_767_225_600, 0).unwrap();
        let bytes = bundle_bytes(&issued, &metadata, when).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);

        let first = format!("{BUNDLE_DIR}/{}_signed.pdf", issued[0].id);
        assert!(archive.by_name(&first).is_ok());

        let mut json = String::new();
        archive
            .by_name("processed-documents/metadata.json")
            .unwrap()
            .read_to_string(&mut json)
            .unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(manifest["processedAt"], "2026-01-01T00:00:00.000Z");
        assert_eq!(manifest["documentType"], "id_card");
        assert_eq!(manifest["issuer"], "City Hall");
        assert_eq!(manifest["totalDocuments"], 2);
        let entry = &manifest["documents"][1];
        assert_eq!(entry["originalName"], "two.pdf");
        assert_eq!(entry["fileHash"], issued[1].file_digest.to_string());
        assert_eq!(entry["verificationURL"], issued[1].verification_url.as_str());
    }
}
