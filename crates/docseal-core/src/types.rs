// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for docseal.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{DocsealError, Result};

// -- 32-byte digests ----------------------------------------------------------

/// A 256-bit value as stored in a `bytes32` registry slot.
///
/// Displays and serialises as a `0x`-prefixed, 64-hex-character string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bytes32(pub [u8; 32]);

impl Bytes32 {
    /// The all-zero sentinel the registry returns for unknown ids.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without the `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes32({self})")
    }
}

impl FromStr for Bytes32 {
    type Err = DocsealError;

    /// Accepts 64 hex characters with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        if trimmed.len() != 64 {
            return Err(DocsealError::InvalidInput(format!(
                "expected 64 hex characters, got {}",
                trimmed.len()
            )));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(trimmed, &mut out)
            .map_err(|e| DocsealError::InvalidInput(format!("invalid hex digest: {e}")))?;
        Ok(Self(out))
    }
}

impl Serialize for Bytes32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// -- Document types -----------------------------------------------------------

/// The closed set of document kinds the issuer supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Certificate,
    IdCard,
    EmployeeCard,
}

impl DocType {
    pub const ALL: [DocType; 3] = [Self::Certificate, Self::IdCard, Self::EmployeeCard];

    /// Wire name, as written to the registry `docType` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::IdCard => "id_card",
            Self::EmployeeCard => "employee_card",
        }
    }

    /// Prefix used when generating document ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Certificate => "CERTIFICATE",
            Self::IdCard => "ID_CARD",
            Self::EmployeeCard => "EMPLOYEE_CARD",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Certificate => "Certificate",
            Self::IdCard => "Student ID Card",
            Self::EmployeeCard => "Employee Card",
        }
    }

    /// Type-specific fields that must be non-empty (on top of `issuer`).
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Certificate => &["title"],
            Self::IdCard | Self::EmployeeCard => &["role_or_program", "id_number"],
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = DocsealError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "certificate" => Ok(Self::Certificate),
            "id_card" => Ok(Self::IdCard),
            "employee_card" => Ok(Self::EmployeeCard),
            other => Err(DocsealError::InvalidInput(format!(
                "unknown document type: {other}"
            ))),
        }
    }
}

/// Globally unique, caller-generated document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate `<TYPE-PREFIX>-<8 hex chars>` from a fresh v4 UUID.
    pub fn generate(doc_type: DocType) -> Self {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        Self(format!("{}-{}", doc_type.id_prefix(), suffix))
    }

    /// Wrap an externally supplied id after basic shape checks.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DocsealError::MissingField {
                field: "id",
                doc_type: "document".into(),
            });
        }
        if trimmed.len() > 128 || trimmed.chars().any(|c| c.is_control()) {
            return Err(DocsealError::InvalidInput(format!(
                "malformed document id: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// -- Issuance request ---------------------------------------------------------

/// Declared metadata for a document, as filled in by the issuer.
///
/// Shared by every file in a batch; the core never keeps a copy between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub doc_type: DocType,
    pub issuer: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub role_or_program: String,
    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub metadata_uri: String,
    /// Expiry as unix seconds; 0 means the document never expires.
    #[serde(default)]
    pub valid_until: u64,
}

impl DocumentMetadata {
    pub fn new(doc_type: DocType, issuer: impl Into<String>) -> Self {
        Self {
            doc_type,
            issuer: issuer.into(),
            subject: String::new(),
            title: String::new(),
            role_or_program: String::new(),
            id_number: String::new(),
            metadata_uri: String::new(),
            valid_until: 0,
        }
    }

    /// Check `issuer` plus the type-specific required fields.
    pub fn validate(&self) -> Result<()> {
        if self.issuer.trim().is_empty() {
            return Err(DocsealError::MissingField {
                field: "issuer",
                doc_type: self.doc_type.to_string(),
            });
        }
        for field in self.doc_type.required_fields() {
            let value = match *field {
                "title" => &self.title,
                "role_or_program" => &self.role_or_program,
                "id_number" => &self.id_number,
                _ => continue,
            };
            if value.trim().is_empty() {
                return Err(DocsealError::MissingField {
                    field,
                    doc_type: self.doc_type.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Convert a calendar expiry date to unix seconds at 00:00 UTC.
pub fn valid_until_from_date(date: NaiveDate) -> u64 {
    let seconds = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    seconds.max(0) as u64
}

// -- Registry record ----------------------------------------------------------

/// A record as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub file_digest: Bytes32,
    /// Raw `docType` string; may be a value this client does not know.
    pub doc_type: String,
    pub issuer: String,
    pub subject: String,
    pub metadata_uri: String,
    /// Set by the registry at anchoring time (unix seconds).
    pub issued_at: u64,
    /// 0 means never expires.
    pub valid_until: u64,
    pub revoked: bool,
    pub title: String,
    pub role_or_program: String,
    pub id_number: String,
}

impl DocumentRecord {
    /// The record the registry returns for an unknown id.
    pub fn sentinel() -> Self {
        Self {
            id: String::new(),
            file_digest: Bytes32::ZERO,
            doc_type: String::new(),
            issuer: String::new(),
            subject: String::new(),
            metadata_uri: String::new(),
            issued_at: 0,
            valid_until: 0,
            revoked: false,
            title: String::new(),
            role_or_program: String::new(),
            id_number: String::new(),
        }
    }

    /// Parsed document type, when the registry holds a known one.
    pub fn known_doc_type(&self) -> Option<DocType> {
        self.doc_type.parse().ok()
    }
}

// -- Verification -------------------------------------------------------------

/// Outcome label of a registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    NotFound,
    Revoked,
    Expired,
    Valid,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::Valid => "valid",
        }
    }

    /// Reason text shown next to an invalid document.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound => "Document not found on blockchain",
            Self::Revoked => "Document has been revoked",
            Self::Expired => "Document has expired",
            Self::Valid => "Document is valid",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified lookup, carrying the record for every status but `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum VerificationResult {
    NotFound,
    Revoked(DocumentRecord),
    Expired(DocumentRecord),
    Valid(DocumentRecord),
}

impl VerificationResult {
    pub fn status(&self) -> VerificationStatus {
        match self {
            Self::NotFound => VerificationStatus::NotFound,
            Self::Revoked(_) => VerificationStatus::Revoked,
            Self::Expired(_) => VerificationStatus::Expired,
            Self::Valid(_) => VerificationStatus::Valid,
        }
    }

    pub fn record(&self) -> Option<&DocumentRecord> {
        match self {
            Self::NotFound => None,
            Self::Revoked(r) | Self::Expired(r) | Self::Valid(r) => Some(r),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

// -- Files --------------------------------------------------------------------

/// Supported input media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Pdf,
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Tiff,
}

impl MediaType {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            "image/bmp" => Some(Self::Bmp),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Infer media type from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// Lifecycle of a file inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// A file handed to the core for issuance. Never persisted.
#[derive(Clone)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: MediaType, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    /// Build from a file name, inferring the media type from its extension.
    pub fn from_name(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let media_type = MediaType::from_extension(ext)
            .ok_or_else(|| DocsealError::UnsupportedMedia(format!("{name} (.{ext})")))?;
        Ok(Self::new(name, media_type, bytes))
    }

    /// Extension of the original name, used when naming outputs.
    pub fn extension(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext,
            _ => match self.media_type {
                MediaType::Pdf => "pdf",
                _ => "png",
            },
        }
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// -- QR error correction ------------------------------------------------------

/// QR error-correction level, low → high redundancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EcLevel {
    L,
    M,
    Q,
    H,
}

impl EcLevel {
    /// Byte-mode capacity at version 40.
    pub fn byte_capacity(&self) -> usize {
        match self {
            Self::L => 2953,
            Self::M => 2331,
            Self::Q => 1663,
            Self::H => 1273,
        }
    }
}

impl fmt::Display for EcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes32_round_trips_through_display() {
        let mut raw = [0u8; 32];
        raw[31] = 0xab;
        let value = Bytes32(raw);
        let shown = value.to_string();
        assert_eq!(shown.len(), 66);
        assert!(shown.starts_with("0x"));
        assert_eq!(shown.parse::<Bytes32>().unwrap(), value);
    }

    #[test]
    fn bytes32_rejects_short_hex() {
        assert!("0x1234".parse::<Bytes32>().is_err());
        assert!(Bytes32::ZERO.is_zero());
    }

    #[test]
    fn generated_ids_carry_type_prefix() {
        let id = DocumentId::generate(DocType::IdCard);
        let (prefix, suffix) = id.as_str().rsplit_once('-').unwrap();
        assert_eq!(prefix, "ID_CARD");
        assert_eq!(suffix.len(), 8);
        assert_ne!(id, DocumentId::generate(DocType::IdCard));
    }

    #[test]
    fn certificate_requires_title() {
        let mut meta = DocumentMetadata::new(DocType::Certificate, "Acme U");
        match meta.validate() {
            Err(DocsealError::MissingField { field, .. }) => assert_eq!(field, "title"),
            other => panic!("unexpected: {other:?}"),
        }
        meta.title = "Data Structures".into();
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn id_card_requires_role_and_number() {
        let mut meta = DocumentMetadata::new(DocType::IdCard, "Acme U");
        meta.role_or_program = "Computer Science".into();
        assert!(matches!(
            meta.validate(),
            Err(DocsealError::MissingField { field: "id_number", .. })
        ));
    }

    #[test]
    fn missing_issuer_is_rejected() {
        let meta = DocumentMetadata::new(DocType::EmployeeCard, "  ");
        assert!(matches!(
            meta.validate(),
            Err(DocsealError::MissingField { field: "issuer", .. })
        ));
    }

    #[test]
    fn media_type_from_name() {
        let file = UploadedFile::from_name("scan.JPG", vec![1]).unwrap();
        assert_eq!(file.media_type, MediaType::Jpeg);
        assert_eq!(file.extension(), "JPG");
        assert!(UploadedFile::from_name("notes.txt", vec![1]).is_err());
    }

    #[test]
    fn expiry_date_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(valid_until_from_date(date), 86_400);
    }

    #[test]
    fn verification_result_serialises_with_status_tag() {
        let json = serde_json::to_value(VerificationResult::NotFound).unwrap();
        assert_eq!(json["status"], "not_found");
    }
}
