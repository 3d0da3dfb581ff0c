// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-file issuance: hash, build the verification link, stamp the QR, and
// anchor the digest. The stamped output only leaves this module once the
// registry has confirmed the record.

use std::io::Read;
use std::sync::Arc;

use chrono::DateTime;
use docseal_core::config::AnchorMode;
use docseal_core::error::{DocsealError, Result};
use docseal_core::{Bytes32, Clock, DocsealConfig, DocumentId, DocumentMetadata, SystemClock, UploadedFile};
use docseal_document::{ComposedDocument, build_payload, compose};
use docseal_registry::{IssueReceipt, IssueRequest, RegistryClient, SigningSession};
use docseal_security::{FileDigest, encode_record, read_hashed};
use tracing::{debug, info, instrument};

/// One successfully anchored document.
#[derive(Debug, Clone)]
pub struct IssuedDocument {
    pub id: DocumentId,
    pub original_name: String,
    /// Keccak-256 of the original upload.
    pub file_digest: Bytes32,
    /// The value written to the registry's `docHash` slot.
    pub anchored_digest: Bytes32,
    pub anchor_mode: AnchorMode,
    /// Canonical record JSON, when the record digest was anchored.
    pub canonical_json: Option<String>,
    pub verification_url: String,
    pub document: ComposedDocument,
    pub receipt: IssueReceipt,
}

impl IssuedDocument {
    /// `<id>_signed.<ext>`
    pub fn output_name(&self) -> String {
        format!("{}_signed.{}", self.id, self.document.extension())
    }
}

/// Runs the issuance pipeline against one registry.
pub struct Issuer<S> {
    config: DocsealConfig,
    client: RegistryClient<S>,
    clock: Arc<dyn Clock>,
}

impl<S: SigningSession> Issuer<S> {
    pub fn new(session: S, config: DocsealConfig) -> Result<Self> {
        Self::with_clock(session, config, Arc::new(SystemClock))
    }

    /// Like [`Issuer::new`], with the issue date taken from `clock`.
    pub fn with_clock(session: S, config: DocsealConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let client = RegistryClient::new(session, &config)?;
        Ok(Self {
            config,
            client,
            clock,
        })
    }

    pub fn config(&self) -> &DocsealConfig {
        &self.config
    }

    pub fn client(&self) -> &RegistryClient<S> {
        &self.client
    }

    /// Issue `file` under `metadata`.
    #[instrument(skip(self, file, metadata), fields(name = %file.name, data_len = file.bytes.len()))]
    pub async fn issue(&self, file: &UploadedFile, metadata: &DocumentMetadata) -> Result<IssuedDocument> {
        metadata.validate()?;
        let file_digest = FileDigest::of_bytes(&file.bytes).require_content_addressed()?;
        self.stamp_and_anchor(file, file_digest, metadata).await
    }

    /// Read the upload called `name` from `reader` and issue it.
    ///
    /// If the read fails part way, only the degraded fallback digest exists;
    /// issuance stops with `DegradedHash` before anything is stamped or
    /// anchored.
    #[instrument(skip(self, reader, metadata))]
    pub async fn issue_reader<R: Read>(
        &self,
        name: &str,
        reader: R,
        declared_size: u64,
        metadata: &DocumentMetadata,
    ) -> Result<IssuedDocument> {
        metadata.validate()?;
        let now_millis = self.clock.now_unix().saturating_mul(1000) as i64;
        let (bytes, digest) = read_hashed(reader, name, declared_size, now_millis);
        let file_digest = digest.require_content_addressed()?;
        let file = UploadedFile::from_name(name, bytes)?;
        self.stamp_and_anchor(&file, file_digest, metadata).await
    }

    async fn stamp_and_anchor(
        &self,
        file: &UploadedFile,
        file_digest: Bytes32,
        metadata: &DocumentMetadata,
    ) -> Result<IssuedDocument> {
        if file.bytes.is_empty() {
            return Err(DocsealError::EmptyInput(format!("{} has no bytes", file.name)));
        }
        let now = self.clock.now_unix();

        let id = DocumentId::generate(metadata.doc_type);
        let verification_url = build_payload(
            &self.config.origin,
            &self.config.chain,
            &self.config.contract_address,
            &id,
        )?;
        let document = compose(file, &verification_url, &id, &self.config.qr)?;
        debug!(%id, output_len = document.bytes.len(), "document stamped");

        let (anchored_digest, canonical_json) = match self.config.anchor_mode {
            AnchorMode::File => (file_digest, None),
            AnchorMode::CanonicalRecord => {
                let issue_date = DateTime::from_timestamp(now as i64, 0)
                    .map(|t| t.date_naive())
                    .unwrap_or_default();
                let record = encode_record(&id, &file_digest, metadata, issue_date)?;
                (record.digest, Some(record.json))
            }
        };

        let receipt = self
            .client
            .issue(&IssueRequest {
                id: id.clone(),
                doc_hash: anchored_digest.to_string(),
                metadata: metadata.clone(),
            })
            .await?;
        info!(%id, tx_hash = %receipt.tx_hash, "document issued");

        Ok(IssuedDocument {
            id,
            original_name: file.name.clone(),
            file_digest,
            anchored_digest,
            anchor_mode: self.config.anchor_mode,
            canonical_json,
            verification_url,
            document,
            receipt,
        })
    }
}
