// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process registry.
//
// `Ledger` is a `SigningSession` that executes registry calldata itself:
// it decodes `issueDocument` / `verifyDocument` / `revokeDocument`, applies
// the same rules the deployed contract does, and mines every transaction
// immediately (after an optional confirmation delay). State can be saved as
// a JSON snapshot so the offline CLI keeps records between runs.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use docseal_core::clock::{Clock, SystemClock};
use docseal_core::error::{DocsealError, Result};
use docseal_core::{Bytes32, DocumentRecord, RegistryErrorKind};
use ethers_core::types::{Address, U256};
use ethers_core::utils::keccak256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::abi::{self, Function, IssueCall, SCHEMA_VERSION};
use crate::session::{SessionError, SigningSession, TxReceipt, TxRequest};

/// Gas reported for every issuance estimate.
pub const ISSUE_GAS: u64 = 180_000;
/// Gas reported for revocations and unknown calls.
const BASE_GAS: u64 = 50_000;

/// Persisted form of a ledger.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    schema_version: u32,
    contract: Address,
    records: Vec<DocumentRecord>,
}

#[derive(Debug)]
struct LedgerState {
    records: BTreeMap<String, DocumentRecord>,
    receipts: HashMap<Bytes32, TxReceipt>,
    balance: U256,
    nonce: u64,
    block: u64,
}

/// A registry that lives in memory.
pub struct Ledger<C: Clock = SystemClock> {
    clock: C,
    account: Address,
    contract: Address,
    chain_id: u64,
    confirmation_delay: Duration,
    state: Mutex<LedgerState>,
}

impl<C: Clock> Ledger<C> {
    /// An empty registry whose `issuedAt` stamps come from `clock`.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            account: Address::from_low_u64_be(0x155e),
            contract: Address::from_low_u64_be(0xd0c5_ea1),
            chain_id: 31337,
            confirmation_delay: Duration::ZERO,
            state: Mutex::new(LedgerState {
                records: BTreeMap::new(),
                receipts: HashMap::new(),
                balance: U256::exp10(18),
                nonce: 0,
                block: 0,
            }),
        }
    }

    /// Delay every receipt by `delay`.
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Address the registry answers on.
    pub fn contract_address(&self) -> Address {
        self.contract
    }

    /// Set the signer's balance.
    pub fn set_balance(&self, balance: U256) {
        if let Ok(mut state) = self.state.lock() {
            state.balance = balance;
        }
    }

    /// A stored record by id.
    pub fn record(&self, id: &str) -> Option<DocumentRecord> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.records.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mined transactions whose receipt has not been collected yet.
    pub fn pending_receipts(&self) -> usize {
        self.state.lock().map(|s| s.receipts.len()).unwrap_or(0)
    }

    /// Mark a record revoked.
    #[instrument(skip(self))]
    pub fn revoke(&self, id: &str) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| DocsealError::registry(RegistryErrorKind::Connectivity, "ledger lock poisoned"))?;
        revoke_in(&mut state, id).map_err(|reason| DocsealError::registry(RegistryErrorKind::Reverted, reason))?;
        info!(id, "document revoked");
        Ok(())
    }

    /// Load a snapshot written by [`Ledger::persist`], or start empty when
    /// `path` does not exist.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, clock: C) -> Result<Self> {
        let path = path.as_ref();
        let ledger = Self::new(clock);
        if !path.exists() {
            debug!("no snapshot, starting empty");
            return Ok(ledger);
        }
        let snapshot: Snapshot = serde_json::from_slice(&std::fs::read(path)?)?;
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(DocsealError::registry(
                RegistryErrorKind::ContractNotDeployed,
                format!(
                    "snapshot schema v{} does not match registry schema v{SCHEMA_VERSION}",
                    snapshot.schema_version
                ),
            ));
        }
        let ledger = Self {
            contract: snapshot.contract,
            ..ledger
        };
        if let Ok(mut state) = ledger.state.lock() {
            state.records = snapshot
                .records
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect();
        }
        info!(records = ledger.len(), "ledger snapshot loaded");
        Ok(ledger)
    }

    /// Write the records as a JSON snapshot.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let records = self
            .state
            .lock()
            .map(|s| s.records.values().cloned().collect())
            .unwrap_or_default();
        let snapshot = Snapshot {
            schema_version: SCHEMA_VERSION,
            contract: self.contract,
            records,
        };
        std::fs::write(path.as_ref(), serde_json::to_vec_pretty(&snapshot)?)?;
        debug!(records = snapshot.records.len(), "ledger snapshot written");
        Ok(())
    }

    /// Run `calldata` against the state without committing anything.
    fn dry_run(&self, state: &LedgerState, calldata: &[u8]) -> std::result::Result<u64, String> {
        match Function::of(calldata) {
            Some(Function::Issue) => {
                let call = IssueCall::decode(calldata).map_err(|e| e.to_string())?;
                check_issue(state, &call)?;
                Ok(ISSUE_GAS)
            }
            Some(Function::Revoke) => {
                let id = abi::decode_id_call(Function::Revoke, calldata).map_err(|e| e.to_string())?;
                match state.records.get(&id) {
                    None => Err("Document not found".into()),
                    Some(r) if r.revoked => Err("Document already revoked".into()),
                    Some(_) => Ok(BASE_GAS),
                }
            }
            Some(Function::Verify) => Ok(BASE_GAS),
            None => Err("unknown function selector".into()),
        }
    }

    /// Apply `calldata`. Returns the revert reason on failure.
    fn execute(&self, state: &mut LedgerState, calldata: &[u8]) -> std::result::Result<(), String> {
        match Function::of(calldata) {
            Some(Function::Issue) => {
                let call = IssueCall::decode(calldata).map_err(|e| e.to_string())?;
                check_issue(state, &call)?;
                let record = DocumentRecord {
                    id: call.id.clone(),
                    file_digest: call.doc_hash,
                    doc_type: call.doc_type,
                    issuer: call.issuer,
                    subject: call.subject,
                    metadata_uri: call.metadata_uri,
                    issued_at: self.clock.now_unix(),
                    valid_until: call.valid_until,
                    revoked: false,
                    title: call.title,
                    role_or_program: call.role_or_program,
                    id_number: call.id_number,
                };
                state.records.insert(call.id, record);
                Ok(())
            }
            Some(Function::Revoke) => {
                let id = abi::decode_id_call(Function::Revoke, calldata).map_err(|e| e.to_string())?;
                revoke_in(state, &id)
            }
            Some(Function::Verify) => Ok(()),
            None => Err("unknown function selector".into()),
        }
    }

    fn lock(&self) -> std::result::Result<std::sync::MutexGuard<'_, LedgerState>, SessionError> {
        self.state
            .lock()
            .map_err(|_| SessionError::Other("ledger lock poisoned".into()))
    }

    fn check_target(&self, to: Address) -> std::result::Result<(), SessionError> {
        if to == self.contract {
            Ok(())
        } else {
            Err(SessionError::Reverted(format!("no registry at {to:?}")))
        }
    }
}

impl Default for Ledger<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

fn check_issue(state: &LedgerState, call: &IssueCall) -> std::result::Result<(), String> {
    if call.id.is_empty() {
        return Err("Document ID required".into());
    }
    if call.doc_hash.is_zero() {
        return Err("Invalid document hash".into());
    }
    if state.records.contains_key(&call.id) {
        return Err("Document already exists".into());
    }
    Ok(())
}

fn revoke_in(state: &mut LedgerState, id: &str) -> std::result::Result<(), String> {
    match state.records.get_mut(id) {
        None => Err("Document not found".into()),
        Some(record) if record.revoked => Err("Document already revoked".into()),
        Some(record) => {
            record.revoked = true;
            Ok(())
        }
    }
}

impl<C: Clock> SigningSession for Ledger<C> {
    fn account(&self) -> Address {
        self.account
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn balance(&self) -> std::result::Result<U256, SessionError> {
        Ok(self.lock()?.balance)
    }

    async fn code_at(&self, address: Address) -> std::result::Result<Vec<u8>, SessionError> {
        // Any non-empty bytecode marks the address as deployed.
        Ok(if address == self.contract {
            abi::Function::Verify.selector().to_vec()
        } else {
            Vec::new()
        })
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> std::result::Result<Vec<u8>, SessionError> {
        self.check_target(to)?;
        let id = abi::decode_id_call(Function::Verify, &data)
            .map_err(|e| SessionError::Reverted(e.to_string()))?;
        let record = self
            .lock()?
            .records
            .get(&id)
            .cloned()
            .unwrap_or_else(DocumentRecord::sentinel);
        Ok(abi::encode_record(&record))
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> std::result::Result<U256, SessionError> {
        self.check_target(tx.to)?;
        let state = self.lock()?;
        self.dry_run(&state, &tx.data)
            .map(U256::from)
            .map_err(SessionError::Reverted)
    }

    async fn send(&self, tx: TxRequest) -> std::result::Result<Bytes32, SessionError> {
        self.check_target(tx.to)?;
        let mut state = self.lock()?;
        if state.balance.is_zero() {
            return Err(SessionError::InsufficientFunds(format!(
                "account {:?} has no balance",
                self.account
            )));
        }
        state.nonce += 1;
        let mut preimage = state.nonce.to_be_bytes().to_vec();
        preimage.extend_from_slice(&tx.data);
        let tx_hash = Bytes32(keccak256(preimage));

        let outcome = self.execute(&mut state, &tx.data);
        if let Err(reason) = &outcome {
            warn!(%tx_hash, reason = %reason, "ledger transaction reverted");
        }
        state.block += 1;
        let receipt = TxReceipt {
            tx_hash,
            success: outcome.is_ok(),
            block_number: Some(state.block),
            gas_used: tx.gas_limit.map(|limit| limit.min(ISSUE_GAS)),
        };
        state.receipts.insert(tx_hash, receipt);
        debug!(%tx_hash, block = state.block, "ledger transaction mined");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: Bytes32) -> std::result::Result<TxReceipt, SessionError> {
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }
        // Each receipt is handed out once.
        self.lock()?
            .receipts
            .remove(&tx_hash)
            .ok_or_else(|| SessionError::Other(format!("unknown transaction {tx_hash}")))
    }
}
