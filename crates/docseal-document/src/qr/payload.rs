// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification URL carried by the QR symbol:
// `<origin>/verify?chain=<chain>&contract=<address>&id=<document-id>`.

use docseal_core::error::{DocsealError, Result};
use docseal_core::{DocumentId, EcLevel};
use tracing::debug;
use url::Url;

/// The fields a scanned verification URL carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationLink {
    pub chain: Option<String>,
    pub contract: Option<String>,
    pub id: DocumentId,
}

/// Build the verification URL for `id`.
pub fn build_payload(origin: &str, chain: &str, contract: &str, id: &DocumentId) -> Result<String> {
    let base = format!("{}/verify", origin.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .map_err(|e| DocsealError::InvalidInput(format!("origin {origin:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(DocsealError::InvalidInput(format!(
            "origin {origin:?} is not a web address"
        )));
    }
    url.query_pairs_mut()
        .append_pair("chain", chain)
        .append_pair("contract", contract)
        .append_pair("id", id.as_str());
    let payload = String::from(url);
    debug!(len = payload.len(), "verification payload built");
    Ok(payload)
}

/// Reject payloads too long for a QR symbol at `level`.
pub fn check_capacity(payload: &str, level: EcLevel) -> Result<()> {
    let capacity = level.byte_capacity();
    if payload.len() > capacity {
        return Err(DocsealError::PayloadTooLong {
            len: payload.len(),
            capacity,
            level: level.to_string(),
        });
    }
    Ok(())
}

/// Pull the document id (and chain/contract, when present) back out of a
/// scanned verification URL.
pub fn parse_payload(text: &str) -> Result<VerificationLink> {
    let url = Url::parse(text.trim())
        .map_err(|e| DocsealError::InvalidInput(format!("not a verification URL: {e}")))?;

    let mut link_chain = None;
    let mut link_contract = None;
    let mut link_id = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "chain" => link_chain = Some(value.into_owned()),
            "contract" => link_contract = Some(value.into_owned()),
            "id" => link_id = Some(value.into_owned()),
            _ => {}
        }
    }

    let id = link_id.ok_or_else(|| {
        DocsealError::InvalidInput(format!("URL carries no `id` parameter: {text}"))
    })?;
    Ok(VerificationLink {
        chain: link_chain,
        contract: link_contract,
        id: DocumentId::parse(&id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

    fn id() -> DocumentId {
        DocumentId::parse("CERTIFICATE-1a2b3c4d").unwrap()
    }

    #[test]
    fn payload_has_expected_shape() {
        let payload = build_payload("https://verify.example.org", "amoy", CONTRACT, &id()).unwrap();
        assert_eq!(
            payload,
            format!("https://verify.example.org/verify?chain=amoy&contract={CONTRACT}&id=CERTIFICATE-1a2b3c4d")
        );
    }

    #[test]
    fn trailing_slash_on_origin_is_ignored() {
        let a = build_payload("http://localhost:5173/", "amoy", CONTRACT, &id()).unwrap();
        let b = build_payload("http://localhost:5173", "amoy", CONTRACT, &id()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reserved_characters_are_query_encoded() {
        let odd = DocumentId::parse("ID_CARD-a&b=c").unwrap();
        let payload = build_payload("http://localhost:5173", "amoy", CONTRACT, &odd).unwrap();
        assert!(payload.ends_with("id=ID_CARD-a%26b%3Dc"));
        assert_eq!(parse_payload(&payload).unwrap().id, odd);
    }

    #[test]
    fn parse_recovers_all_fields() {
        let payload = build_payload("https://verify.example.org", "polygon", CONTRACT, &id()).unwrap();
        let link = parse_payload(&payload).unwrap();
        assert_eq!(link.id, id());
        assert_eq!(link.chain.as_deref(), Some("polygon"));
        assert_eq!(link.contract.as_deref(), Some(CONTRACT));
    }

    #[test]
    fn parse_rejects_url_without_id() {
        let err = parse_payload("https://verify.example.org/verify?chain=amoy").unwrap_err();
        assert!(matches!(err, DocsealError::InvalidInput(_)));
        assert!(parse_payload("not a url").is_err());
    }

    #[test]
    fn capacity_depends_on_level() {
        let long = "x".repeat(1500);
        assert!(check_capacity(&long, EcLevel::M).is_ok());
        let err = check_capacity(&long, EcLevel::H).unwrap_err();
        assert!(matches!(
            err,
            DocsealError::PayloadTooLong { len: 1500, capacity: 1273, .. }
        ));
    }
}
