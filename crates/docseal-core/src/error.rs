// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docseal.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the registry refused (or never confirmed) an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryErrorKind {
    /// RPC endpoint unreachable or transport failure.
    Connectivity,
    /// The signer is not allowed to issue on this registry.
    Unauthorized,
    /// No contract code at the configured address.
    ContractNotDeployed,
    /// The contract address was never configured.
    NotConfigured,
    /// The signing account cannot pay transaction fees.
    InsufficientBalance,
    /// The registry already holds a record under this id.
    DuplicateId,
    /// Fee/gas estimation failed, i.e. the transaction would revert.
    FeeRejected,
    /// The signer declined to authorise the transaction.
    UserDeclined,
    /// Confirmation did not arrive before the deadline.
    Timeout,
    /// The digest is not a 32-byte `0x`-prefixed hex string.
    MalformedHash,
    /// The transaction was mined but reverted, or the response was malformed.
    Reverted,
}

impl fmt::Display for RegistryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connectivity => "connectivity",
            Self::Unauthorized => "unauthorized",
            Self::ContractNotDeployed => "contract not deployed",
            Self::NotConfigured => "registry not configured",
            Self::InsufficientBalance => "insufficient balance",
            Self::DuplicateId => "duplicate document id",
            Self::FeeRejected => "fee estimation rejected",
            Self::UserDeclined => "declined by signer",
            Self::Timeout => "confirmation timeout",
            Self::MalformedHash => "malformed hash",
            Self::Reverted => "reverted",
        };
        f.write_str(label)
    }
}

/// Coarse grouping of errors, used to decide blast radius and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rejected before any side effect.
    Input,
    /// The source file could not be parsed.
    Decode,
    /// The external registry failed or refused.
    Registry,
    /// A non-cryptographic fallback digest was produced.
    DegradedHash,
    /// Local encoding, storage, or configuration failure.
    Internal,
}

/// Top-level error type for all docseal operations.
#[derive(Debug, Error)]
pub enum DocsealError {
    // -- Input errors --
    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("missing required field `{field}` for {doc_type}")]
    MissingField {
        field: &'static str,
        doc_type: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("QR payload of {len} bytes exceeds the {capacity}-byte capacity of EC level {level}")]
    PayloadTooLong {
        len: usize,
        capacity: usize,
        level: String,
    },

    // -- Decode errors --
    #[error("PDF decode failed: {0}")]
    PdfDecode(String),

    #[error("image decode failed: {0}")]
    ImageDecode(String),

    // -- Registry errors --
    #[error("registry error ({kind}): {detail}")]
    Registry {
        kind: RegistryErrorKind,
        detail: String,
    },

    // -- Degraded hashing --
    #[error("degraded digest (not content-addressed): {0}")]
    DegradedHash(String),

    // -- Internal --
    #[error("QR rendering failed: {0}")]
    QrRender(String),

    #[error("PDF encoding failed: {0}")]
    PdfEncode(String),

    #[error("image encoding failed: {0}")]
    ImageEncode(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocsealError {
    /// Shorthand for a registry failure.
    pub fn registry(kind: RegistryErrorKind, detail: impl Into<String>) -> Self {
        Self::Registry {
            kind,
            detail: detail.into(),
        }
    }

    /// Which group of the error taxonomy this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedMedia(_)
            | Self::EmptyInput(_)
            | Self::MissingField { .. }
            | Self::InvalidInput(_)
            | Self::PayloadTooLong { .. } => ErrorCategory::Input,
            Self::PdfDecode(_) | Self::ImageDecode(_) => ErrorCategory::Decode,
            Self::Registry { .. } => ErrorCategory::Registry,
            Self::DegradedHash(_) => ErrorCategory::DegradedHash,
            Self::QrRender(_)
            | Self::PdfEncode(_)
            | Self::ImageEncode(_)
            | Self::Archive(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorCategory::Internal,
        }
    }

    /// The registry sub-kind, if this is a registry error.
    pub fn registry_kind(&self) -> Option<RegistryErrorKind> {
        match self {
            Self::Registry { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocsealError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            DocsealError::UnsupportedMedia("text/plain".into()).category(),
            ErrorCategory::Input
        );
        assert_eq!(
            DocsealError::PdfDecode("bad xref".into()).category(),
            ErrorCategory::Decode
        );
        assert_eq!(
            DocsealError::registry(RegistryErrorKind::Timeout, "60s").category(),
            ErrorCategory::Registry
        );
        assert_eq!(
            DocsealError::DegradedHash("read failed".into()).category(),
            ErrorCategory::DegradedHash
        );
    }

    #[test]
    fn registry_display_names_kind() {
        let err = DocsealError::registry(RegistryErrorKind::DuplicateId, "CERTIFICATE-1");
        assert_eq!(
            err.to_string(),
            "registry error (duplicate document id): CERTIFICATE-1"
        );
        assert_eq!(err.registry_kind(), Some(RegistryErrorKind::DuplicateId));
    }
}
