// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canonical record encoder: sorted-key JSON of a document's declared
// metadata plus a fresh nonce, digested with Keccak-256.
//
// Every call draws a new 256-bit nonce, so two encodings of the same
// metadata never share a digest.

use chrono::NaiveDate;
use docseal_core::error::{DocsealError, Result};
use docseal_core::{Bytes32, DocumentId, DocumentMetadata};
use rand::RngCore;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::integrity::keccak256;

/// The canonical record as anchored (field names are the wire names).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalRecord<'a> {
    id: &'a str,
    file_keccak: String,
    doc_type: &'a str,
    issuer: &'a str,
    subject: &'a str,
    issue_date: String,
    valid_until: u64,
    #[serde(rename = "metadataURI")]
    metadata_uri: &'a str,
    nonce: String,
}

/// Output of the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    /// Compact sorted-key JSON that was digested.
    pub json: String,
    /// Keccak-256 of `json`.
    pub digest: Bytes32,
    /// The 32-byte nonce, hex encoded.
    pub nonce: String,
}

/// Encode and digest the canonical record for one issuance.
#[instrument(skip(file_digest, metadata), fields(id = %id))]
pub fn encode_record(
    id: &DocumentId,
    file_digest: &Bytes32,
    metadata: &DocumentMetadata,
    issue_date: NaiveDate,
) -> Result<EncodedRecord> {
    let mut nonce = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut nonce);
    encode_with_nonce(id, file_digest, metadata, issue_date, &hex::encode(nonce))
}

fn encode_with_nonce(
    id: &DocumentId,
    file_digest: &Bytes32,
    metadata: &DocumentMetadata,
    issue_date: NaiveDate,
    nonce: &str,
) -> Result<EncodedRecord> {
    let record = CanonicalRecord {
        id: id.as_str(),
        file_keccak: file_digest.to_hex(),
        doc_type: metadata.doc_type.as_str(),
        issuer: &metadata.issuer,
        subject: &metadata.subject,
        issue_date: issue_date.format("%Y-%m-%d").to_string(),
        valid_until: metadata.valid_until,
        metadata_uri: &metadata.metadata_uri,
        nonce: nonce.to_string(),
    };
    let json = canonical_json(&serde_json::to_value(&record)?)?;
    let digest = keccak256(json.as_bytes());
    debug!(%digest, len = json.len(), "canonical record encoded");
    Ok(EncodedRecord {
        json,
        digest,
        nonce: nonce.to_string(),
    })
}

/// The file digest a canonical record embeds under `fileKeccak`.
pub fn embedded_file_digest(json: &str) -> Result<Bytes32> {
    let value: Value = serde_json::from_str(json)?;
    value
        .get("fileKeccak")
        .and_then(Value::as_str)
        .ok_or_else(|| DocsealError::InvalidInput("canonical record carries no fileKeccak".into()))?
        .parse()
}

/// Serialise a JSON value compactly with object keys sorted lexicographically
/// at every depth.
pub fn canonical_json(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}
