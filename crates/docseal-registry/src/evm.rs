// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON-RPC signing session: an HTTP provider plus a local private-key
// wallet, via `ethers`.

use std::sync::Arc;
use std::time::Duration;

use docseal_core::error::{DocsealError, Result};
use docseal_core::{Bytes32, RegistryErrorKind};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, H256, TransactionRequest, U256};
use tracing::{debug, info, instrument};

use crate::session::{SessionError, SigningSession, TxReceipt, TxRequest, classify_message};

const RECEIPT_POLL: Duration = Duration::from_secs(2);

type Client = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

/// A wallet connected to one chain.
pub struct EvmSession {
    client: Client,
    chain_id: u64,
}

impl EvmSession {
    /// Connect to `rpc_url` and refuse to continue unless the node reports
    /// `expected_chain_id`.
    #[instrument(skip(private_key))]
    pub async fn connect(rpc_url: &str, private_key: &str, expected_chain_id: u64) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| DocsealError::Config(format!("rpc url {rpc_url:?}: {e}")))?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| DocsealError::registry(RegistryErrorKind::Connectivity, e.to_string()))?
            .as_u64();
        if chain_id != expected_chain_id {
            return Err(DocsealError::registry(
                RegistryErrorKind::Connectivity,
                format!("node is on chain {chain_id}, expected {expected_chain_id}"),
            ));
        }
        let wallet: LocalWallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| DocsealError::Config(format!("private key: {e}")))?;
        let wallet = wallet.with_chain_id(chain_id);
        info!(account = ?wallet.address(), chain_id, "signing session connected");
        Ok(Self {
            client: SignerMiddleware::new(Arc::new(provider), wallet),
            chain_id,
        })
    }

    fn typed(&self, to: Address, data: Vec<u8>, gas: Option<u64>) -> TypedTransaction {
        let mut request = TransactionRequest::new()
            .from(self.account())
            .to(to)
            .data(data);
        if let Some(gas) = gas {
            request = request.gas(gas);
        }
        request.into()
    }
}

fn rpc_error(err: impl std::fmt::Display) -> SessionError {
    classify_message(&err.to_string())
}

impl SigningSession for EvmSession {
    fn account(&self) -> Address {
        self.client.address()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn balance(&self) -> std::result::Result<U256, SessionError> {
        self.client
            .get_balance(self.account(), None)
            .await
            .map_err(rpc_error)
    }

    async fn code_at(&self, address: Address) -> std::result::Result<Vec<u8>, SessionError> {
        self.client
            .get_code(address, None)
            .await
            .map(|code| code.to_vec())
            .map_err(rpc_error)
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> std::result::Result<Vec<u8>, SessionError> {
        let tx = self.typed(to, data, None);
        self.client
            .call(&tx, None)
            .await
            .map(|out| out.to_vec())
            .map_err(rpc_error)
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> std::result::Result<U256, SessionError> {
        let typed = self.typed(tx.to, tx.data.clone(), None);
        self.client.estimate_gas(&typed, None).await.map_err(rpc_error)
    }

    async fn send(&self, tx: TxRequest) -> std::result::Result<Bytes32, SessionError> {
        let typed = self.typed(tx.to, tx.data, tx.gas_limit);
        let pending = self
            .client
            .send_transaction(typed, None)
            .await
            .map_err(rpc_error)?;
        let hash = pending.tx_hash();
        debug!(tx_hash = ?hash, "transaction broadcast");
        Ok(Bytes32(hash.0))
    }

    async fn wait_for_receipt(&self, tx_hash: Bytes32) -> std::result::Result<TxReceipt, SessionError> {
        let hash = H256(tx_hash.0);
        loop {
            if let Some(receipt) = self
                .client
                .get_transaction_receipt(hash)
                .await
                .map_err(rpc_error)?
            {
                return Ok(TxReceipt {
                    tx_hash,
                    success: receipt.status.is_some_and(|s| s.as_u64() == 1),
                    block_number: receipt.block_number.map(|b| b.as_u64()),
                    gas_used: receipt.gas_used.map(|g| g.min(U256::from(u64::MAX)).as_u64()),
                });
            }
            tokio::time::sleep(RECEIPT_POLL).await;
        }
    }
}
