// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docseal-core: types, configuration and errors shared by every crate.

pub mod clock;
pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::DocsealConfig;
pub use error::{DocsealError, RegistryErrorKind};
pub use types::*;
