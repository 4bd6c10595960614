//! Vault configuration - passed from higher layers

use crate::address::SOLANA_COIN_TYPE;
use crate::auth::KdfParams;
use crate::error::VaultError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use zeroize::Zeroizing;

/// How the root mnemonic is kept at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Sealed under a PIN; the vault opens locked.
    #[default]
    Pin,
    /// Plain phrase on disk; the vault opens unlocked.
    None,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Pin => "pin",
            AuthMode::None => "none",
        }
    }

    pub fn seals_mnemonic(&self) -> bool {
        matches!(self, AuthMode::Pin)
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = VaultError;

    /// `pin`, or `none` / `plain`. Case-insensitive.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pin" => Ok(AuthMode::Pin),
            "none" | "plain" => Ok(AuthMode::None),
            other => Err(VaultError::InvalidConfig(format!(
                "auth mode {other:?} (expected pin|none)"
            ))),
        }
    }
}

/// Vault configuration. Higher layers construct this.
#[derive(Clone)]
pub struct VaultConfig {
    pub app: String,
    pub data_dir: Option<PathBuf>,
    pub auth_mode: AuthMode,
    pub passphrase: Zeroizing<String>,
    pub coin_type: u32,
    pub kdf: KdfParams,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            app: String::new(),
            data_dir: None,
            auth_mode: AuthMode::default(),
            passphrase: Zeroizing::new(String::new()),
            coin_type: SOLANA_COIN_TYPE,
            kdf: KdfParams::default(),
        }
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("app", &self.app)
            .field("data_dir", &self.data_dir)
            .field("auth_mode", &self.auth_mode)
            .field("coin_type", &self.coin_type)
            .finish_non_exhaustive()
    }
}

impl VaultConfig {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into(), ..Default::default() }
    }

    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Optional BIP39 passphrase (the "25th word"). Never persisted.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Zeroizing::new(passphrase.into());
        self
    }

    pub fn with_coin_type(mut self, coin_type: u32) -> Self {
        self.coin_type = coin_type;
        self
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// `<data_dir | $BEESEED_ROOT | local data dir | .>/<app>/data`
    #[cfg(feature = "native")]
    pub fn resolve_data_dir(&self) -> PathBuf {
        let root = self.data_dir.clone().unwrap_or_else(|| {
            std::env::var("BEESEED_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        });
        root.join(&self.app).join("data")
    }
}
