// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Issuer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DocsealError, Result};
use crate::types::EcLevel;

/// Address the original web client shipped as an "unset" marker.
pub const PLACEHOLDER_CONTRACT_ADDRESS: &str = "0x1234567890123456789012345678901234567890";

/// Which digest is written to the registry's `docHash` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    /// Keccak-256 of the original file bytes.
    #[default]
    File,
    /// Keccak-256 of the canonical metadata record (which embeds the file digest).
    CanonicalRecord,
}

/// QR symbol appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrSettings {
    /// Display size of the QR on PDF pages, in points.
    pub pdf_size: u32,
    pub error_correction: EcLevel,
    /// Quiet zone, in modules.
    pub margin: u32,
    /// `#rrggbb` foreground (dark modules).
    pub foreground: String,
    /// `#rrggbb` background (light modules).
    pub background: String,
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            pdf_size: 80,
            error_correction: EcLevel::H,
            margin: 4,
            foreground: "#000000".into(),
            background: "#ffffff".into(),
        }
    }
}

impl QrSettings {
    pub fn foreground_rgb(&self) -> Result<[u8; 3]> {
        parse_hex_colour(&self.foreground)
    }

    pub fn background_rgb(&self) -> Result<[u8; 3]> {
        parse_hex_colour(&self.background)
    }
}

/// Persistent issuer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsealConfig {
    /// Origin of the verification site, e.g. `https://verify.example.org`.
    pub origin: String,
    /// Chain label written into the QR payload (`chain=` parameter).
    pub chain: String,
    /// Numeric EVM chain id the signer must be connected to.
    pub chain_id: u64,
    /// Registry contract address (`0x` + 40 hex).
    pub contract_address: String,
    /// JSON-RPC endpoint for the registry chain.
    pub rpc_url: String,
    pub qr: QrSettings,
    /// Ceiling on waiting for a transaction receipt.
    pub tx_timeout_secs: u64,
    /// Gas limit attached to `issueDocument`.
    pub gas_limit: u64,
    pub anchor_mode: AnchorMode,
}

impl Default for DocsealConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:5173".into(),
            chain: "amoy".into(),
            chain_id: 80002,
            contract_address: String::new(),
            rpc_url: "https://rpc-amoy.polygon.technology/".into(),
            qr: QrSettings::default(),
            tx_timeout_secs: 60,
            gas_limit: 300_000,
            anchor_mode: AnchorMode::File,
        }
    }
}

impl DocsealConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Write the config as pretty-printed JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Apply `DOCSEAL_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("DOCSEAL_ORIGIN") {
            self.origin = v;
        }
        if let Some(v) = lookup("DOCSEAL_CHAIN") {
            self.chain = v;
        }
        if let Some(v) = lookup("DOCSEAL_CONTRACT_ADDRESS") {
            self.contract_address = v;
        }
        if let Some(v) = lookup("DOCSEAL_RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = lookup("DOCSEAL_CHAIN_ID") {
            match v.parse() {
                Ok(id) => self.chain_id = id,
                Err(_) => warn!(value = %v, "ignoring non-numeric DOCSEAL_CHAIN_ID"),
            }
        }
        if let Some(v) = lookup("DOCSEAL_TX_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.tx_timeout_secs = secs,
                Err(_) => warn!(value = %v, "ignoring non-numeric DOCSEAL_TX_TIMEOUT_SECS"),
            }
        }
        self
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_timeout_secs)
    }

    /// Whether a real registry address has been set.
    pub fn contract_configured(&self) -> bool {
        !self.contract_address.is_empty()
            && !self
                .contract_address
                .eq_ignore_ascii_case(PLACEHOLDER_CONTRACT_ADDRESS)
    }

    /// Check the fields the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let origin = url::Url::parse(&self.origin)
            .map_err(|e| DocsealError::Config(format!("origin {:?}: {e}", self.origin)))?;
        if origin.cannot_be_a_base() {
            return Err(DocsealError::Config(format!(
                "origin {:?} cannot carry a path",
                self.origin
            )));
        }
        if self.chain.trim().is_empty() {
            return Err(DocsealError::Config("chain label is empty".into()));
        }
        if self.contract_configured() && !is_address(&self.contract_address) {
            return Err(DocsealError::Config(format!(
                "contract address {:?} is not 0x + 40 hex characters",
                self.contract_address
            )));
        }
        if self.qr.pdf_size == 0 {
            return Err(DocsealError::Config("qr.pdf_size must be positive".into()));
        }
        if self.tx_timeout_secs == 0 {
            return Err(DocsealError::Config("tx_timeout_secs must be positive".into()));
        }
        self.qr.foreground_rgb()?;
        self.qr.background_rgb()?;
        Ok(())
    }
}

/// `0x` followed by exactly 40 hex characters.
pub fn is_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .is_some_and(|rest| rest.len() == 40 && rest.chars().all(|c| c.is_ascii_hexdigit()))
}

fn parse_hex_colour(s: &str) -> Result<[u8; 3]> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    let mut rgb = [0u8; 3];
    hex::decode_to_slice(digits, &mut rgb)
        .map_err(|e| DocsealError::Config(format!("colour {s:?}: {e}")))?;
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = DocsealConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.contract_configured());
        assert_eq!(config.tx_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn placeholder_address_counts_as_unconfigured() {
        let config = DocsealConfig {
            contract_address: PLACEHOLDER_CONTRACT_ADDRESS.into(),
            ..DocsealConfig::default()
        };
        assert!(!config.contract_configured());
    }

    #[test]
    fn overrides_apply() {
        let config = DocsealConfig::default().with_overrides_from(|key| match key {
            "DOCSEAL_CONTRACT_ADDRESS" => {
                Some("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".into())
            }
            "DOCSEAL_CHAIN_ID" => Some("137".into()),
            "DOCSEAL_TX_TIMEOUT_SECS" => Some("soon".into()),
            _ => None,
        });
        assert!(config.contract_configured());
        assert_eq!(config.chain_id, 137);
        assert_eq!(config.tx_timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_colour_fails_validation() {
        let mut config = DocsealConfig::default();
        config.qr.foreground = "#12".into();
        assert!(matches!(config.validate(), Err(DocsealError::Config(_))));
    }

    #[test]
    fn persisted_config_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docseal.json");
        let mut config = DocsealConfig::default();
        config.anchor_mode = AnchorMode::CanonicalRecord;
        config.persist(&path).unwrap();
        let loaded = DocsealConfig::load(&path).unwrap();
        assert_eq!(loaded.anchor_mode, AnchorMode::CanonicalRecord);
        assert_eq!(loaded.qr, QrSettings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r##"{"chain":"polygon","qr":{"pdf_size":96,"error_correction":"Q","margin":2,"foreground":"#111111","background":"#eeeeee"}}"##).unwrap();
        let loaded = DocsealConfig::load(&path).unwrap();
        assert_eq!(loaded.chain, "polygon");
        assert_eq!(loaded.qr.error_correction, EcLevel::Q);
        assert_eq!(loaded.qr.foreground_rgb().unwrap(), [0x11, 0x11, 0x11]);
        assert_eq!(loaded.qr.background_rgb().unwrap(), [0xee, 0xee, 0xee]);
        assert_eq!(loaded.gas_limit, 300_000);
    }
}
