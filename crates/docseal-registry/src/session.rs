// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signing session: the wallet and chain connection the registry client is
// handed. Nothing in the core reaches for an ambient wallet.

use std::future::Future;

use docseal_core::Bytes32;
use ethers_core::types::{Address, U256};
use thiserror::Error;

/// Failures reported by a session, before they are mapped onto registry
/// error kinds.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request rejected by the signer")]
    Rejected,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("signer not authorised: {0}")]
    Unauthorized(String),

    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("{0}")]
    Other(String),
}

/// An unsigned contract transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Vec<u8>,
    pub gas_limit: Option<u64>,
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: Bytes32,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

/// A connected wallet plus chain access.
pub trait SigningSession: Send + Sync {
    /// Address transactions are signed from.
    fn account(&self) -> Address;

    fn chain_id(&self) -> u64;

    /// Native-token balance of `account()`.
    fn balance(&self) -> impl Future<Output = Result<U256, SessionError>> + Send;

    /// Deployed bytecode at `address`; empty when nothing is deployed.
    fn code_at(&self, address: Address) -> impl Future<Output = Result<Vec<u8>, SessionError>> + Send;

    /// Read-only call.
    fn call(&self, to: Address, data: Vec<u8>) -> impl Future<Output = Result<Vec<u8>, SessionError>> + Send;

    fn estimate_gas(&self, tx: &TxRequest) -> impl Future<Output = Result<U256, SessionError>> + Send;

    /// Sign and broadcast; resolves once the node has accepted the transaction.
    fn send(&self, tx: TxRequest) -> impl Future<Output = Result<Bytes32, SessionError>> + Send;

    /// Resolves when `tx_hash` is mined. Callers bound this with a timeout.
    fn wait_for_receipt(&self, tx_hash: Bytes32) -> impl Future<Output = Result<TxReceipt, SessionError>> + Send;
}

impl<S: SigningSession> SigningSession for std::sync::Arc<S> {
    fn account(&self) -> Address {
        (**self).account()
    }

    fn chain_id(&self) -> u64 {
        (**self).chain_id()
    }

    fn balance(&self) -> impl Future<Output = Result<U256, SessionError>> + Send {
        (**self).balance()
    }

    fn code_at(&self, address: Address) -> impl Future<Output = Result<Vec<u8>, SessionError>> + Send {
        (**self).code_at(address)
    }

    fn call(&self, to: Address, data: Vec<u8>) -> impl Future<Output = Result<Vec<u8>, SessionError>> + Send {
        (**self).call(to, data)
    }

    fn estimate_gas(&self, tx: &TxRequest) -> impl Future<Output = Result<U256, SessionError>> + Send {
        (**self).estimate_gas(tx)
    }

    fn send(&self, tx: TxRequest) -> impl Future<Output = Result<Bytes32, SessionError>> + Send {
        (**self).send(tx)
    }

    fn wait_for_receipt(&self, tx_hash: Bytes32) -> impl Future<Output = Result<TxReceipt, SessionError>> + Send {
        (**self).wait_for_receipt(tx_hash)
    }
}

/// Classify a free-text failure reported by a node or wallet.
pub fn classify_message(message: &str) -> SessionError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("user rejected") || lower.contains("user denied") {
        SessionError::Rejected
    } else if lower.contains("insufficient funds") {
        SessionError::InsufficientFunds(message.to_string())
    } else if lower.contains("execution reverted") || lower.contains("revert") {
        SessionError::Reverted(message.to_string())
    } else if lower.contains("not authorized") || lower.contains("unauthorized") {
        SessionError::Unauthorized(message.to_string())
    } else if lower.contains("connection")
        || lower.contains("timed out")
        || lower.contains("dns")
        || lower.contains("http")
    {
        SessionError::Transport(message.to_string())
    } else {
        SessionError::Other(message.to_string())
    }
}
