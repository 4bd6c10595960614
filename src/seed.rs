//! Seed derivation - BIP39 PBKDF2-HMAC-SHA512 (2048 rounds). Pure, no state.

use crate::error::VaultResult;
use crate::mnemonic::Mnemonic;
use bip39::Language;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const SEED_LEN: usize = 64;

/// 64-byte BIP39 seed. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self { Self(bytes) }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] { &self.0 }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

/// Seed for `mnemonic` with an optional passphrase (empty by default).
/// The passphrase is NFKD-normalised first, so composed and decomposed forms agree.
pub fn derive_seed(mnemonic: &Mnemonic, passphrase: &str) -> VaultResult<Seed> {
    let m = bip39::Mnemonic::parse_in_normalized(Language::English, mnemonic.phrase())?;
    Ok(Seed(m.to_seed(passphrase)))
}

/// Validate `phrase` first; a bad checksum fails before any seed exists.
pub fn derive_seed_from_phrase(phrase: &str, passphrase: &str) -> VaultResult<Seed> {
    let mnemonic = Mnemonic::parse(phrase)?;
    derive_seed(&mnemonic, passphrase)
}
