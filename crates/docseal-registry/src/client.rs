// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registry client: anchors document records and looks them up through an
// injected `SigningSession`.
//
// Issuance runs a fixed sequence of pre-flight checks (fields, hash shape,
// contract address, balance, deployed code, gas estimate) before anything is
// signed, then races the receipt against a timeout. A timed-out transaction
// is not cancelled and may still confirm.

use std::str::FromStr;
use std::time::Duration;

use docseal_core::config::{DocsealConfig, is_address};
use docseal_core::error::{DocsealError, Result};
use docseal_core::{Bytes32, DocumentId, DocumentMetadata, DocumentRecord, RegistryErrorKind};
use ethers_core::types::{Address, U256};
use tracing::{debug, info, instrument, warn};

use crate::abi::{self, IssueCall};
use crate::session::{SessionError, SigningSession, TxRequest};

/// What to anchor.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub id: DocumentId,
    /// Hex digest, with or without `0x`.
    pub doc_hash: String,
    pub metadata: DocumentMetadata,
}

/// A confirmed issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReceipt {
    pub tx_hash: Bytes32,
    pub block_number: Option<u64>,
    pub gas_estimate: u64,
}

/// Issues and looks up records on one registry contract.
pub struct RegistryClient<S> {
    session: S,
    contract: Option<Address>,
    gas_limit: u64,
    tx_timeout: Duration,
}

impl<S: SigningSession> RegistryClient<S> {
    /// Bind `session` to the registry named in `config`. An unset or
    /// placeholder address is accepted here and refused at first use.
    pub fn new(session: S, config: &DocsealConfig) -> Result<Self> {
        let contract = if config.contract_configured() {
            let address = parse_address(&config.contract_address).ok_or_else(|| {
                DocsealError::Config(format!(
                    "contract address {:?} is not 0x + 40 hex characters",
                    config.contract_address
                ))
            })?;
            Some(address)
        } else {
            None
        };
        Ok(Self {
            session,
            contract,
            gas_limit: config.gas_limit,
            tx_timeout: config.tx_timeout(),
        })
    }

    /// Override the receipt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = timeout;
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn contract(&self) -> Option<Address> {
        self.contract
    }

    fn require_contract(&self) -> Result<Address> {
        self.contract.ok_or_else(|| {
            DocsealError::registry(
                RegistryErrorKind::NotConfigured,
                "registry contract address is not configured",
            )
        })
    }

    /// Anchor a record.
    #[instrument(skip(self, request), fields(id = %request.id))]
    pub async fn issue(&self, request: &IssueRequest) -> Result<IssueReceipt> {
        request.metadata.validate()?;
        let doc_hash = normalize_hash(&request.doc_hash)?;
        let contract = self.require_contract()?;

        let balance = self
            .session
            .balance()
            .await
            .map_err(|e| map_session_error(e, RegistryErrorKind::Connectivity))?;
        if balance.is_zero() {
            return Err(DocsealError::registry(
                RegistryErrorKind::InsufficientBalance,
                format!("signer {:?} has a zero balance", self.session.account()),
            ));
        }

        let code = self
            .session
            .code_at(contract)
            .await
            .map_err(|e| map_session_error(e, RegistryErrorKind::Connectivity))?;
        if code.is_empty() {
            return Err(DocsealError::registry(
                RegistryErrorKind::ContractNotDeployed,
                format!("no contract code at {contract:?}"),
            ));
        }

        let meta = &request.metadata;
        let calldata = IssueCall {
            id: request.id.as_str().to_string(),
            doc_hash,
            doc_type: meta.doc_type.as_str().to_string(),
            issuer: meta.issuer.clone(),
            subject: meta.subject.clone(),
            metadata_uri: meta.metadata_uri.clone(),
            valid_until: meta.valid_until,
            title: meta.title.clone(),
            role_or_program: meta.role_or_program.clone(),
            id_number: meta.id_number.clone(),
        }
        .encode();

        let mut tx = TxRequest {
            to: contract,
            data: calldata,
            gas_limit: None,
        };
        let estimate = self
            .session
            .estimate_gas(&tx)
            .await
            .map_err(|e| map_session_error(e, RegistryErrorKind::FeeRejected))?;
        debug!(%estimate, "gas estimated");
        if estimate > U256::from(self.gas_limit) {
            warn!(%estimate, limit = self.gas_limit, "estimate exceeds the configured gas limit");
        }

        tx.gas_limit = Some(self.gas_limit);
        let tx_hash = self
            .session
            .send(tx)
            .await
            .map_err(|e| map_session_error(e, RegistryErrorKind::Reverted))?;
        info!(%tx_hash, "issuance submitted");

        let receipt = tokio::time::timeout(self.tx_timeout, self.session.wait_for_receipt(tx_hash))
            .await
            .map_err(|_| {
                DocsealError::registry(
                    RegistryErrorKind::Timeout,
                    format!(
                        "no receipt for {tx_hash} within {}s; it may still confirm",
                        self.tx_timeout.as_secs_f32()
                    ),
                )
            })?
            .map_err(|e| map_session_error(e, RegistryErrorKind::Connectivity))?;

        if !receipt.success {
            return Err(DocsealError::registry(
                RegistryErrorKind::Reverted,
                format!("transaction {tx_hash} was mined but reverted"),
            ));
        }
        info!(%tx_hash, block = ?receipt.block_number, "issuance confirmed");
        Ok(IssueReceipt {
            tx_hash,
            block_number: receipt.block_number,
            gas_estimate: estimate.min(U256::from(u64::MAX)).as_u64(),
        })
    }

    /// Fetch the raw record for `id`. Unknown ids come back as the
    /// zero-digest sentinel, not as an error.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn lookup(&self, id: &DocumentId) -> Result<DocumentRecord> {
        let contract = self.require_contract()?;
        let data = self
            .session
            .call(contract, abi::encode_verify(id.as_str()))
            .await
            .map_err(|e| map_session_error(e, RegistryErrorKind::Connectivity))?;
        let record = abi::decode_record(id.as_str(), &data)?;
        debug!(found = !record.file_digest.is_zero(), "registry lookup");
        Ok(record)
    }
}

/// Parse a `0x` + 40 hex address.
pub fn parse_address(s: &str) -> Option<Address> {
    if !is_address(s) {
        return None;
    }
    Address::from_str(s).ok()
}

/// `0x` + 64 hex characters, or `MalformedHash`.
pub fn normalize_hash(raw: &str) -> Result<Bytes32> {
    let trimmed = raw.trim();
    let prefixed = if trimmed.starts_with("0x") {
        trimmed.to_string()
    } else {
        format!("0x{trimmed}")
    };
    if prefixed.len() != 66 {
        return Err(DocsealError::registry(
            RegistryErrorKind::MalformedHash,
            format!("expected 66 characters, got {}", prefixed.len()),
        ));
    }
    prefixed
        .parse()
        .map_err(|_| DocsealError::registry(RegistryErrorKind::MalformedHash, "not hexadecimal"))
}

/// Map a session failure onto a registry error kind. `fallback` is used for
/// reverts and unclassified failures, which mean different things at each
/// step of issuance.
fn map_session_error(err: SessionError, fallback: RegistryErrorKind) -> DocsealError {
    let kind = match &err {
        SessionError::Transport(_) => RegistryErrorKind::Connectivity,
        SessionError::Rejected => RegistryErrorKind::UserDeclined,
        SessionError::InsufficientFunds(_) => RegistryErrorKind::InsufficientBalance,
        SessionError::Unauthorized(_) => RegistryErrorKind::Unauthorized,
        SessionError::Reverted(reason) | SessionError::Other(reason) => {
            kind_for_reason(reason).unwrap_or(fallback)
        }
    };
    DocsealError::registry(kind, err.to_string())
}

/// Recognise revert reasons with a specific meaning.
fn kind_for_reason(reason: &str) -> Option<RegistryErrorKind> {
    let lower = reason.to_ascii_lowercase();
    if lower.contains("already exists") {
        Some(RegistryErrorKind::DuplicateId)
    } else if lower.contains("not authorized")
        || lower.contains("unauthorized")
        || lower.contains("caller is not")
    {
        Some(RegistryErrorKind::Unauthorized)
    } else {
        None
    }
}
