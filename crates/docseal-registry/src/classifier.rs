// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record classification. Precedence is fixed: a missing record beats
// revocation, revocation beats expiry.

use docseal_core::{DocumentRecord, VerificationResult};

/// Classify a looked-up record against `now` (unix seconds).
pub fn classify(record: DocumentRecord, now: u64) -> VerificationResult {
    if record.file_digest.is_zero() {
        VerificationResult::NotFound
    } else if record.revoked {
        VerificationResult::Revoked(record)
    } else if record.valid_until > 0 && now > record.valid_until {
        VerificationResult::Expired(record)
    } else {
        VerificationResult::Valid(record)
    }
}
