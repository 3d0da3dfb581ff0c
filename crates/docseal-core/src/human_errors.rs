// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for issuers and verifiers.
//
// Every technical error is mapped to plain English with a clear suggestion,
// and says whether the registry refused the document or local processing
// failed.

use serde::Serialize;

use crate::error::{DocsealError, RegistryErrorKind};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Network blip or timeout. Trying again may work.
    Transient,
    /// User must do something (fund the wallet, fill a field, approve).
    ActionRequired,
    /// Retrying will not help: wrong format, damaged file or duplicate.
    Permanent,
}

/// Where the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureOrigin {
    /// The file or form on this machine.
    Local,
    /// The blockchain registry.
    Registry,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone, Serialize)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    pub origin: FailureOrigin,
    /// Whether re-triggering the same file may succeed. Nothing retries automatically.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    fn local(message: &str, suggestion: String, retriable: bool, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion,
            origin: FailureOrigin::Local,
            retriable,
            severity,
        }
    }

    fn registry(message: &str, suggestion: String, retriable: bool, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion,
            origin: FailureOrigin::Registry,
            retriable,
            severity,
        }
    }

    /// One-line rendering, prefixed with where the failure happened.
    pub fn summary(&self) -> String {
        let origin = match self.origin {
            FailureOrigin::Local => "Processing failed",
            FailureOrigin::Registry => "Blockchain registry rejected the document",
        };
        format!("{origin}: {} {}", self.message, self.suggestion)
    }
}

/// Convert a `DocsealError` into a `HumanError`.
pub fn humanize_error(err: &DocsealError) -> HumanError {
    match err {
        // -- Input errors --
        DocsealError::UnsupportedMedia(detail) => HumanError::local(
            "This type of file isn't supported.",
            format!("Only PDF and image files (PNG, JPEG, GIF, WebP, BMP, TIFF) can be sealed. ({detail})"),
            false,
            Severity::Permanent,
        ),

        DocsealError::EmptyInput(detail) => HumanError::local(
            "The file is empty.",
            format!("Choose the file again; it may not have finished downloading. ({detail})"),
            false,
            Severity::ActionRequired,
        ),

        DocsealError::MissingField { field, doc_type } => HumanError::local(
            "Some required details are missing.",
            format!("Fill in `{field}`; it is required for a {doc_type}."),
            false,
            Severity::ActionRequired,
        ),

        DocsealError::InvalidInput(detail) => HumanError::local(
            "Some details are not in the expected format.",
            format!("Check the form and try again. ({detail})"),
            false,
            Severity::ActionRequired,
        ),

        DocsealError::PayloadTooLong { len, capacity, .. } => HumanError::local(
            "The verification link is too long to fit in a QR code.",
            format!("Shorten the site address or choose a lower error-correction level ({len} of {capacity} bytes)."),
            false,
            Severity::ActionRequired,
        ),

        // -- Decode errors --
        DocsealError::PdfDecode(_) => HumanError::local(
            "There's a problem with this PDF file.",
            "The file may be damaged. Try opening it in a PDF viewer first, or export it again.".into(),
            false,
            Severity::Permanent,
        ),

        DocsealError::ImageDecode(_) => HumanError::local(
            "There's a problem with this image.",
            "The image may be damaged or in an unusual format. Try saving it as PNG or JPEG first.".into(),
            false,
            Severity::Permanent,
        ),

        // -- Registry errors --
        DocsealError::Registry { kind, detail } => humanize_registry(*kind, detail),

        // -- Degraded hashing --
        DocsealError::DegradedHash(_) => HumanError::local(
            "The file could not be fingerprinted reliably.",
            "The file could not be read in full, so it was not sealed. Copy it locally and try again.".into(),
            true,
            Severity::Transient,
        ),

        // -- Internal --
        DocsealError::QrRender(_) | DocsealError::PdfEncode(_) | DocsealError::ImageEncode(_) => {
            HumanError::local(
                "The QR code could not be added to the document.",
                "Try again. If it keeps failing, try a smaller file.".into(),
                true,
                Severity::Transient,
            )
        }

        DocsealError::Archive(_) | DocsealError::Io(_) => HumanError::local(
            "The sealed files could not be saved.",
            "Check there's free disk space and that the output folder is writable.".into(),
            true,
            Severity::Transient,
        ),

        DocsealError::Serialization(_) | DocsealError::Config(_) => HumanError::local(
            "The issuer settings are invalid.",
            format!("Check the configuration file. ({err})"),
            false,
            Severity::ActionRequired,
        ),
    }
}

fn humanize_registry(kind: RegistryErrorKind, detail: &str) -> HumanError {
    match kind {
        RegistryErrorKind::Connectivity => HumanError::registry(
            "We can't reach the blockchain right now.",
            "Check your internet connection, then try this file again.".into(),
            true,
            Severity::Transient,
        ),
        RegistryErrorKind::Unauthorized => HumanError::registry(
            "This wallet isn't allowed to issue documents.",
            "Connect the issuer wallet that owns the registry.".into(),
            false,
            Severity::ActionRequired,
        ),
        RegistryErrorKind::ContractNotDeployed => HumanError::registry(
            "No registry contract was found at the configured address.",
            format!("Check the contract address and network. ({detail})"),
            false,
            Severity::ActionRequired,
        ),
        RegistryErrorKind::NotConfigured => HumanError::registry(
            "The registry address hasn't been set up.",
            "Set DOCSEAL_CONTRACT_ADDRESS or `contract_address` in the config file.".into(),
            false,
            Severity::ActionRequired,
        ),
        RegistryErrorKind::InsufficientBalance => HumanError::registry(
            "The wallet can't pay the transaction fee.",
            "Add funds to the issuer wallet, then try again.".into(),
            false,
            Severity::ActionRequired,
        ),
        RegistryErrorKind::DuplicateId => HumanError::registry(
            "A document with this ID is already registered.",
            "Issue the file again so it gets a new ID.".into(),
            false,
            Severity::Permanent,
        ),
        RegistryErrorKind::FeeRejected => HumanError::registry(
            "The registry would reject this transaction.",
            format!("Reason reported by the network: {detail}"),
            false,
            Severity::Permanent,
        ),
        RegistryErrorKind::UserDeclined => HumanError::registry(
            "The transaction was rejected in the wallet.",
            "Approve the transaction when the wallet asks.".into(),
            true,
            Severity::ActionRequired,
        ),
        RegistryErrorKind::Timeout => HumanError::registry(
            "The blockchain didn't confirm in time.",
            "The transaction may still confirm later. Look the ID up before issuing again.".into(),
            true,
            Severity::Transient,
        ),
        RegistryErrorKind::MalformedHash => HumanError::registry(
            "The document fingerprint has the wrong format.",
            format!("Expected a 32-byte hex value. ({detail})"),
            false,
            Severity::Permanent,
        ),
        RegistryErrorKind::Reverted => HumanError::registry(
            "The registry refused the transaction.",
            format!("Reason reported by the network: {detail}"),
            false,
            Severity::Permanent,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_errors_are_attributed_to_registry() {
        let human = humanize_error(&DocsealError::registry(RegistryErrorKind::Timeout, "60s"));
        assert_eq!(human.origin, FailureOrigin::Registry);
        assert!(human.retriable);
        assert!(human.summary().starts_with("Blockchain registry rejected"));
    }

    #[test]
    fn decode_errors_are_local_and_permanent() {
        let human = humanize_error(&DocsealError::PdfDecode("no xref".into()));
        assert_eq!(human.origin, FailureOrigin::Local);
        assert_eq!(human.severity, Severity::Permanent);
        assert!(human.summary().starts_with("Processing failed"));
    }

    #[test]
    fn missing_field_names_the_field() {
        let human = humanize_error(&DocsealError::MissingField {
            field: "title",
            doc_type: "certificate".into(),
        });
        assert!(human.suggestion.contains("`title`"));
    }
}
