//! Mnemonic lifecycle - generate once, validate always, never regenerate over a bad record.

use crate::auth::{KdfParams, SealedMnemonic};
use crate::error::{VaultError, VaultResult};
use crate::store::SecretStore;
use bip39::Language;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use zeroize::Zeroizing;

/// Store key of the mnemonic record.
pub const MNEMONIC_KEY: &str = "mnemonic.json";

pub const WORD_COUNT: usize = 12;
const ENTROPY_BYTES: usize = 16;
const FINGERPRINT_CONTEXT: &str = "beeseed 2024-06-01 mnemonic fingerprint v1";

/// Checksum-valid 12-word English BIP39 phrase. Wiped on drop, redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic {
    phrase: Zeroizing<String>,
}

impl Mnemonic {
    /// Fresh phrase from 128 bits of OS entropy.
    pub fn generate() -> VaultResult<Self> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
        OsRng.fill_bytes(&mut entropy[..]);
        let m = bip39::Mnemonic::from_entropy_in(Language::English, &entropy[..])
            .map_err(|e| VaultError::Crypto(format!("mnemonic from entropy: {e}")))?;
        Ok(Self { phrase: Zeroizing::new(m.to_string()) })
    }

    /// Normalise (lowercase, single spaces) and validate the checksum.
    pub fn parse(phrase: &str) -> VaultResult<Self> {
        let normalized = Zeroizing::new(
            phrase
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(" "),
        );
        let words = normalized.split(' ').filter(|w| !w.is_empty()).count();
        if words != WORD_COUNT {
            return Err(VaultError::CorruptSecret(format!(
                "expected {WORD_COUNT} words, got {words}"
            )));
        }
        bip39::Mnemonic::parse_in_normalized(Language::English, &normalized)?;
        Ok(Self { phrase: normalized })
    }

    pub fn phrase(&self) -> &str { &self.phrase }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.phrase.split(' ')
    }

    /// Decoded 16-byte entropy.
    pub fn entropy(&self) -> VaultResult<Zeroizing<Vec<u8>>> {
        let m = bip39::Mnemonic::parse_in_normalized(Language::English, &self.phrase)?;
        Ok(Zeroizing::new(m.to_entropy()))
    }

    /// Stable 16-hex-char id for scoping per-mnemonic state. One-way.
    pub fn fingerprint(&self) -> VaultResult<String> {
        let entropy = self.entropy()?;
        let digest = blake3::derive_key(FINGERPRINT_CONTEXT, &entropy);
        Ok(hex::encode(&digest[..8]))
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mnemonic(<redacted>)")
    }
}

/// How the mnemonic record is written and read.
#[derive(Clone)]
pub enum Protection {
    /// Plain phrase on disk.
    None,
    /// Sealed under a PIN-derived key.
    Pin { pin: Zeroizing<String>, kdf: KdfParams },
}

impl Protection {
    pub fn pin(pin: &str) -> Self {
        Protection::Pin { pin: Zeroizing::new(pin.to_string()), kdf: KdfParams::default() }
    }
}

impl fmt::Debug for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protection::None => f.write_str("None"),
            Protection::Pin { kdf, .. } => {
                f.debug_struct("Pin").field("kdf", kdf).finish_non_exhaustive()
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
enum MnemonicRecord {
    Plain { phrase: String },
    Sealed(SealedMnemonic),
}

/// Owns the root secret's storage scope.
pub struct MnemonicManager {
    store: Arc<dyn SecretStore>,
    protection: Protection,
    create_lock: Mutex<()>,
}

impl MnemonicManager {
    pub fn new(store: Arc<dyn SecretStore>, protection: Protection) -> Self {
        Self { store, protection, create_lock: Mutex::new(()) }
    }

    pub fn is_initialized(&self) -> VaultResult<bool> {
        self.store.exists(MNEMONIC_KEY)
    }

    /// Load the persisted mnemonic, or generate and persist one on the first-ever call.
    pub fn get_or_create_mnemonic(&self) -> VaultResult<Mnemonic> {
        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| VaultError::Persistence("mnemonic lock".into()))?;

        if let Some(mnemonic) = self.load()? {
            return Ok(mnemonic);
        }

        let mnemonic = Mnemonic::generate()?;
        self.persist(&mnemonic)?;
        tracing::info!(fingerprint = %mnemonic.fingerprint()?, "generated new root mnemonic");
        Ok(mnemonic)
    }

    /// Persist a caller-supplied phrase. Refuses to overwrite an existing record.
    pub fn import_mnemonic(&self, phrase: &str) -> VaultResult<Mnemonic> {
        let mnemonic = Mnemonic::parse(phrase)?;
        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| VaultError::Persistence("mnemonic lock".into()))?;
        if self.is_initialized()? {
            return Err(VaultError::AlreadyInitialized);
        }
        self.persist(&mnemonic)?;
        tracing::info!(fingerprint = %mnemonic.fingerprint()?, "imported root mnemonic");
        Ok(mnemonic)
    }

    /// Re-write a plain record sealed under this manager's PIN. The phrase is validated first;
    /// an already sealed record is left alone and must open under the same PIN.
    pub fn seal_plain_record(&self) -> VaultResult<Mnemonic> {
        if matches!(self.protection, Protection::None) {
            return Err(VaultError::InvalidPin);
        }
        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| VaultError::Persistence("mnemonic lock".into()))?;

        let Some(raw) = self.store.load(MNEMONIC_KEY)?.map(Zeroizing::new) else {
            return Err(VaultError::CorruptSecret("no mnemonic record to seal".into()));
        };
        let record: MnemonicRecord = serde_json::from_slice(&raw)
            .map_err(|e| VaultError::CorruptSecret(format!("mnemonic record: {e}")))?;

        match record {
            MnemonicRecord::Plain { phrase } => {
                let phrase = Zeroizing::new(phrase);
                let mnemonic = Mnemonic::parse(&phrase)?;
                self.persist(&mnemonic)?;
                let fingerprint = mnemonic.fingerprint()?;
                tracing::info!(%fingerprint, "sealed plain root mnemonic");
                Ok(mnemonic)
            }
            MnemonicRecord::Sealed(_) => self.load()?.ok_or(VaultError::Locked),
        }
    }

    /// Read the persisted mnemonic without creating one.
    pub fn load(&self) -> VaultResult<Option<Mnemonic>> {
        let Some(raw) = self.store.load(MNEMONIC_KEY)?.map(Zeroizing::new) else {
            return Ok(None);
        };

        let record: MnemonicRecord = serde_json::from_slice(&raw).map_err(|e| {
            tracing::warn!("mnemonic record unreadable");
            VaultError::CorruptSecret(format!("mnemonic record: {e}"))
        })?;

        let phrase = match (record, &self.protection) {
            (MnemonicRecord::Plain { phrase }, Protection::None) => Zeroizing::new(phrase),
            (MnemonicRecord::Plain { phrase }, Protection::Pin { .. }) => {
                drop(Zeroizing::new(phrase));
                tracing::warn!("plain mnemonic record found under PIN protection");
                return Err(VaultError::UnsealedSecret);
            }
            (MnemonicRecord::Sealed(_), Protection::None) => return Err(VaultError::Locked),
            (MnemonicRecord::Sealed(sealed), Protection::Pin { pin, .. }) => sealed.open(pin)?,
        };

        let mnemonic = Mnemonic::parse(&phrase).map_err(|e| {
            tracing::warn!("persisted mnemonic failed validation");
            e
        })?;
        tracing::debug!("loaded root mnemonic");
        Ok(Some(mnemonic))
    }

    fn persist(&self, mnemonic: &Mnemonic) -> VaultResult<()> {
        let record = match &self.protection {
            Protection::None => MnemonicRecord::Plain { phrase: mnemonic.phrase().to_string() },
            Protection::Pin { pin, kdf } => {
                MnemonicRecord::Sealed(SealedMnemonic::seal(mnemonic.phrase(), pin, *kdf)?)
            }
        };
        let bytes = serde_json::to_vec_pretty(&record)
            .map(Zeroizing::new)
            .map_err(|e| VaultError::Persistence(format!("mnemonic json: {e}")))?;
        if let MnemonicRecord::Plain { phrase } = record {
            // wipe the serde copy of the phrase
            drop(Zeroizing::new(phrase));
        }
        self.store.save(MNEMONIC_KEY, &bytes)
    }
}
