//! SLIP-0010 hardened derivation for ed25519.
//!
//! ```text
//! master:  I = HMAC-SHA512(key = "ed25519 seed", data = seed)
//! child:   I = HMAC-SHA512(key = c_par, data = 0x00 || k_par || ser32(i + 2^31))
//!          k = I[0..32], c = I[32..64]
//! ```
//!
//! ed25519 has no public-key-only child derivation, so every level is hardened.
//!
//! Reference: https://github.com/satoshilabs/slips/blob/master/slip-0010.md

use crate::error::{VaultError, VaultResult};
use crate::seed::Seed;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha512 = Hmac<Sha512>;

/// First hardened index (2^31).
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

const MASTER_DOMAIN: &[u8] = b"ed25519 seed";

/// One hardened path level. Holds the raw (un-offset) index, always `< 2^31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildIndex(u32);

impl ChildIndex {
    pub fn hardened(index: u32) -> VaultResult<Self> {
        if index >= HARDENED_OFFSET {
            return Err(VaultError::InvalidDerivationPath(format!(
                "index {index} is at or above the hardened boundary"
            )));
        }
        Ok(Self(index))
    }

    pub fn index(&self) -> u32 { self.0 }

    /// Index as serialised into the HMAC input (`i + 2^31`).
    pub fn to_u32(&self) -> u32 { self.0 | HARDENED_OFFSET }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'", self.0)
    }
}

/// Ordered list of hardened levels below the master node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DerivationPath(Vec<ChildIndex>);

impl DerivationPath {
    pub fn master() -> Self { Self::default() }

    pub fn from_indices(indices: &[u32]) -> VaultResult<Self> {
        indices.iter().map(|&i| ChildIndex::hardened(i)).collect::<VaultResult<Vec<_>>>().map(Self)
    }

    pub fn child(mut self, index: ChildIndex) -> Self {
        self.0.push(index);
        self
    }

    pub fn levels(&self) -> &[ChildIndex] { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for level in &self.0 {
            write!(f, "/{level}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = VaultError;

    /// `m/44'/501'/0'/0'`. `'`, `h` and `H` mark hardened levels; unmarked levels are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: String| VaultError::InvalidDerivationPath(format!("{s:?}: {why}"));

        let mut parts = s.trim().split('/');
        if parts.next() != Some("m") {
            return Err(invalid("must start with 'm'".into()));
        }

        let mut levels = Vec::new();
        for part in parts {
            let digits = part
                .strip_suffix('\'')
                .or_else(|| part.strip_suffix('h'))
                .or_else(|| part.strip_suffix('H'))
                .ok_or_else(|| invalid(format!("level {part:?} is not hardened")))?;
            let raw: u32 = digits
                .parse()
                .map_err(|_| invalid(format!("level {part:?} is not a number")))?;
            levels.push(ChildIndex::hardened(raw)?);
        }
        Ok(Self(levels))
    }
}

/// 32-byte secret key and 32-byte chain code of one tree node. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    secret: [u8; 32],
    chain_code: [u8; 32],
}

impl DerivedKey {
    pub fn secret_key(&self) -> &[u8; 32] { &self.secret }

    pub fn chain_code(&self) -> &[u8; 32] { &self.chain_code }

    fn from_hmac(mac: HmacSha512) -> Self {
        let out = mac.finalize().into_bytes();
        let mut secret = [0u8; 32];
        let mut chain_code = [0u8; 32];
        secret.copy_from_slice(&out[..32]);
        chain_code.copy_from_slice(&out[32..]);
        Self { secret, chain_code }
    }

    /// Hardened child: `HMAC-SHA512(c, 0x00 || k || ser32(i'))`.
    pub fn derive_child(&self, index: ChildIndex) -> VaultResult<Self> {
        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        mac.update(&[0x00]);
        mac.update(&self.secret);
        mac.update(&index.to_u32().to_be_bytes());
        Ok(Self::from_hmac(mac))
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("chain_code", &hex::encode(self.chain_code))
            .finish_non_exhaustive()
    }
}

/// Master node from raw seed bytes (16..=64 bytes per SLIP-0010).
pub fn master_key(seed: &[u8]) -> VaultResult<DerivedKey> {
    if !(16..=64).contains(&seed.len()) {
        return Err(VaultError::Crypto(format!("seed length {} outside 16..=64", seed.len())));
    }
    let mut mac = HmacSha512::new_from_slice(MASTER_DOMAIN)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;
    mac.update(seed);
    Ok(DerivedKey::from_hmac(mac))
}

pub fn derive_path_from_bytes(seed: &[u8], path: &DerivationPath) -> VaultResult<DerivedKey> {
    let mut node = master_key(seed)?;
    for &level in path.levels() {
        node = node.derive_child(level)?;
    }
    Ok(node)
}

/// Walk `path` from the master node of `seed`.
pub fn derive_node(seed: &Seed, path: &DerivationPath) -> VaultResult<DerivedKey> {
    derive_path_from_bytes(seed.as_bytes(), path)
}
