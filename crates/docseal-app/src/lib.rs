// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docseal-app: issuer and verifier workflows on top of the core crates.

pub mod services;

pub use services::batch::{BatchFailure, BatchObserver, BatchReport, Silent, issue_batch};
pub use services::bundle::{bundle_bytes, write_bundle};
pub use services::issuance::{IssuedDocument, Issuer};
pub use services::verify::{BulkEntry, BulkStatus, OriginalCheck, Target, Verifier, check_original};
