// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registry ABI, schema version 1.
//
//   issueDocument(string id, bytes32 docHash, string docType, string issuer,
//                 string subject, string metadataURI, uint64 validUntil,
//                 string title, string roleOrProgram, string idNumber)
//
//   verifyDocument(string id) returns (bytes32 docHash, string docType,
//                 string issuer, string subject, string metadataURI,
//                 uint64 issuedAt, uint64 validUntil, bool revoked,
//                 string title, string roleOrProgram, string idNumber)
//
//   revokeDocument(string id)
//
// Everything crossing the session boundary is encoded and decoded here, so a
// schema mismatch surfaces as one error instead of a half-read record.

use docseal_core::error::{DocsealError, Result};
use docseal_core::{Bytes32, DocumentRecord, RegistryErrorKind};
use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::U256;

pub const SCHEMA_VERSION: u32 = 1;

const ISSUE: &str = "issueDocument";
const VERIFY: &str = "verifyDocument";
const REVOKE: &str = "revokeDocument";

fn issue_params() -> [ParamType; 10] {
    [
        ParamType::String,
        ParamType::FixedBytes(32),
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::Uint(64),
        ParamType::String,
        ParamType::String,
        ParamType::String,
    ]
}

fn verify_returns() -> [ParamType; 11] {
    [
        ParamType::FixedBytes(32),
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::Uint(64),
        ParamType::Uint(64),
        ParamType::Bool,
        ParamType::String,
        ParamType::String,
        ParamType::String,
    ]
}

/// Which registry function a piece of calldata targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Issue,
    Verify,
    Revoke,
}

impl Function {
    pub fn selector(&self) -> [u8; 4] {
        match self {
            Self::Issue => abi::short_signature(ISSUE, &issue_params()),
            Self::Verify => abi::short_signature(VERIFY, &[ParamType::String]),
            Self::Revoke => abi::short_signature(REVOKE, &[ParamType::String]),
        }
    }

    /// Identify calldata by its 4-byte selector.
    pub fn of(calldata: &[u8]) -> Option<Self> {
        let selector = calldata.get(..4)?;
        [Self::Issue, Self::Verify, Self::Revoke]
            .into_iter()
            .find(|f| f.selector() == selector)
    }
}

/// Arguments of `issueDocument`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCall {
    pub id: String,
    pub doc_hash: Bytes32,
    pub doc_type: String,
    pub issuer: String,
    pub subject: String,
    pub metadata_uri: String,
    pub valid_until: u64,
    pub title: String,
    pub role_or_program: String,
    pub id_number: String,
}

impl IssueCall {
    pub fn encode(&self) -> Vec<u8> {
        with_selector(
            Function::Issue,
            &[
                Token::String(self.id.clone()),
                Token::FixedBytes(self.doc_hash.as_bytes().to_vec()),
                Token::String(self.doc_type.clone()),
                Token::String(self.issuer.clone()),
                Token::String(self.subject.clone()),
                Token::String(self.metadata_uri.clone()),
                Token::Uint(U256::from(self.valid_until)),
                Token::String(self.title.clone()),
                Token::String(self.role_or_program.clone()),
                Token::String(self.id_number.clone()),
            ],
        )
    }

    pub fn decode(calldata: &[u8]) -> Result<Self> {
        let mut t = Tokens::new(decode_args(Function::Issue, &issue_params(), calldata)?);
        Ok(Self {
            id: t.string()?,
            doc_hash: t.bytes32()?,
            doc_type: t.string()?,
            issuer: t.string()?,
            subject: t.string()?,
            metadata_uri: t.string()?,
            valid_until: t.uint64()?,
            title: t.string()?,
            role_or_program: t.string()?,
            id_number: t.string()?,
        })
    }
}

/// `verifyDocument(id)` calldata.
pub fn encode_verify(id: &str) -> Vec<u8> {
    with_selector(Function::Verify, &[Token::String(id.to_string())])
}

/// `revokeDocument(id)` calldata.
pub fn encode_revoke(id: &str) -> Vec<u8> {
    with_selector(Function::Revoke, &[Token::String(id.to_string())])
}

/// The `id` argument of `verifyDocument` or `revokeDocument` calldata.
pub fn decode_id_call(function: Function, calldata: &[u8]) -> Result<String> {
    Tokens::new(decode_args(function, &[ParamType::String], calldata)?).string()
}

/// ABI-encode a record as `verifyDocument` return data.
pub fn encode_record(record: &DocumentRecord) -> Vec<u8> {
    abi::encode(&[
        Token::FixedBytes(record.file_digest.as_bytes().to_vec()),
        Token::String(record.doc_type.clone()),
        Token::String(record.issuer.clone()),
        Token::String(record.subject.clone()),
        Token::String(record.metadata_uri.clone()),
        Token::Uint(U256::from(record.issued_at)),
        Token::Uint(U256::from(record.valid_until)),
        Token::Bool(record.revoked),
        Token::String(record.title.clone()),
        Token::String(record.role_or_program.clone()),
        Token::String(record.id_number.clone()),
    ])
}

/// Decode `verifyDocument` return data for `id`.
pub fn decode_record(id: &str, data: &[u8]) -> Result<DocumentRecord> {
    let tokens = abi::decode(&verify_returns(), data).map_err(|e| {
        DocsealError::registry(
            RegistryErrorKind::ContractNotDeployed,
            format!("response does not match registry schema v{SCHEMA_VERSION}: {e}"),
        )
    })?;
    let mut t = Tokens::new(tokens);
    Ok(DocumentRecord {
        id: id.to_string(),
        file_digest: t.bytes32()?,
        doc_type: t.string()?,
        issuer: t.string()?,
        subject: t.string()?,
        metadata_uri: t.string()?,
        issued_at: t.uint64()?,
        valid_until: t.uint64()?,
        revoked: t.boolean()?,
        title: t.string()?,
        role_or_program: t.string()?,
        id_number: t.string()?,
    })
}

fn with_selector(function: Function, tokens: &[Token]) -> Vec<u8> {
    let mut out = function.selector().to_vec();
    out.extend(abi::encode(tokens));
    out
}

fn decode_args(function: Function, params: &[ParamType], calldata: &[u8]) -> Result<Vec<Token>> {
    if Function::of(calldata) != Some(function) {
        return Err(schema_error(format!("calldata is not a {function:?} call")));
    }
    abi::decode(params, &calldata[4..]).map_err(|e| schema_error(e.to_string()))
}

fn schema_error(detail: String) -> DocsealError {
    DocsealError::registry(RegistryErrorKind::Reverted, format!("malformed calldata: {detail}"))
}

/// Sequential typed reads over decoded tokens.
struct Tokens(std::vec::IntoIter<Token>);

impl Tokens {
    fn new(tokens: Vec<Token>) -> Self {
        Self(tokens.into_iter())
    }

    fn next(&mut self, expected: &str) -> Result<Token> {
        self.0
            .next()
            .ok_or_else(|| schema_error(format!("missing {expected} value")))
    }

    fn string(&mut self) -> Result<String> {
        self.next("string")?
            .into_string()
            .ok_or_else(|| schema_error("expected string".into()))
    }

    fn bytes32(&mut self) -> Result<Bytes32> {
        let bytes = self
            .next("bytes32")?
            .into_fixed_bytes()
            .ok_or_else(|| schema_error("expected bytes32".into()))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| schema_error("bytes32 of wrong length".into()))?;
        Ok(Bytes32(array))
    }

    fn uint64(&mut self) -> Result<u64> {
        let value = self
            .next("uint64")?
            .into_uint()
            .ok_or_else(|| schema_error("expected uint".into()))?;
        u64::try_from(value).map_err(|_| schema_error(format!("{value} overflows uint64")))
    }

    fn boolean(&mut self) -> Result<bool> {
        self.next("bool")?
            .into_bool()
            .ok_or_else(|| schema_error("expected bool".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> IssueCall {
        IssueCall {
            id: "CERTIFICATE-1a2b3c4d".into(),
            doc_hash: Bytes32([0xAB; 32]),
            doc_type: "certificate".into(),
            issuer: "Acme U".into(),
            subject: "Ada".into(),
            metadata_uri: "ipfs://bafy".into(),
            valid_until: 1_900_000_000,
            title: "BSc".into(),
            role_or_program: String::new(),
            id_number: String::new(),
        }
    }

    #[test]
    fn selectors_match_solidity_signatures() {
        let verify = ethers_core::utils::keccak256("verifyDocument(string)");
        assert_eq!(Function::Verify.selector(), verify[..4]);
        let issue = ethers_core::utils::keccak256(
            "issueDocument(string,bytes32,string,string,string,string,uint64,string,string,string)",
        );
        assert_eq!(Function::Issue.selector(), issue[..4]);
    }

    #[test]
    fn issue_calldata_decodes_to_same_call() {
        let encoded = call().encode();
        assert_eq!(Function::of(&encoded), Some(Function::Issue));
        assert_eq!(IssueCall::decode(&encoded).unwrap(), call());
    }

    #[test]
    fn wrong_selector_is_rejected() {
        let verify = encode_verify("X-1");
        let err = IssueCall::decode(&verify).unwrap_err();
        assert_eq!(err.registry_kind(), Some(RegistryErrorKind::Reverted));
        assert_eq!(decode_id_call(Function::Verify, &verify).unwrap(), "X-1");
    }

    #[test]
    fn sentinel_record_decodes_as_zero_digest() {
        let data = encode_record(&DocumentRecord::sentinel());
        let record = decode_record("missing", &data).unwrap();
        assert!(record.file_digest.is_zero());
        assert_eq!(record.id, "missing");
    }

    #[test]
    fn non_registry_response_is_flagged() {
        let err = decode_record("x", &[]).unwrap_err();
        assert_eq!(
            err.registry_kind(),
            Some(RegistryErrorKind::ContractNotDeployed)
        );
    }
}
