// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docseal-registry: anchoring and looking up document records.
//
// The registry is an external contract reached through a `SigningSession`.
// `Ledger` is an in-process registry that speaks the same ABI; `EvmSession`
// (feature `evm`) talks to a real chain over JSON-RPC.

pub mod abi;
pub mod classifier;
pub mod client;
pub mod ledger;
pub mod session;

#[cfg(feature = "evm")]
pub mod evm;

pub use classifier::classify;
pub use client::{IssueReceipt, IssueRequest, RegistryClient, parse_address};
pub use ledger::Ledger;
pub use session::{SessionError, SigningSession, TxReceipt, TxRequest};

#[cfg(feature = "evm")]
pub use evm::EvmSession;
