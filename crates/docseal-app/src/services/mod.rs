// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: orchestrates the stateless core crates into issuance and
// verification workflows. Per-file status and results live here, not in the
// core.

pub mod batch;
pub mod bundle;
pub mod data_dir;
pub mod issuance;
pub mod verify;
