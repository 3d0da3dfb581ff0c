// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR module: the verification URL, its rendered symbol, and reading it back.

pub mod payload;
pub mod render;
pub mod scan;
