// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where the CLI keeps its config and ledger snapshot.

use std::path::PathBuf;

pub const CONFIG_FILE: &str = "config.json";
pub const LEDGER_FILE: &str = "ledger.json";

/// The data directory, created on first use. `DOCSEAL_HOME` wins over the
/// XDG location.
pub fn data_dir() -> PathBuf {
    let dir = match std::env::var_os("DOCSEAL_HOME") {
        Some(home) => PathBuf::from(home),
        None => base_dir().join("docseal"),
    };
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn base_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
