//! Keypair & address - SLIP-0010 key material → ed25519 keypair → base58 address.
//!
//! ```text
//! Seed ── m/44'/501'/{index}'/0' ──→ k (32 bytes)
//!                                     │
//!                                     ├── ed25519 SigningKey::from_bytes(k)
//!                                     └── base58(verifying key) → Address
//! ```

use crate::error::{VaultError, VaultResult};
use crate::seed::Seed;
use crate::slip10::{derive_node, ChildIndex, DerivationPath};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// BIP44 purpose level.
pub const PURPOSE: u32 = 44;
/// SLIP-0044 registered coin type for Solana.
pub const SOLANA_COIN_TYPE: u32 = 501;
/// The change level is fixed; every account gets one address.
pub const CHANGE: u32 = 0;

/// `m/44'/{coin_type}'/{account}'/0'`
pub fn account_path(coin_type: u32, account: u32) -> VaultResult<DerivationPath> {
    Ok(DerivationPath::master()
        .child(ChildIndex::hardened(PURPOSE)?)
        .child(ChildIndex::hardened(coin_type)?)
        .child(ChildIndex::hardened(account)?)
        .child(ChildIndex::hardened(CHANGE)?))
}

/// Signing keypair for one account. Never persisted, never logged.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self { signing: SigningKey::from_bytes(secret) }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    pub fn address(&self) -> Address {
        Address(self.public_key())
    }

    /// 64-byte `secret || public` form used by Solana keypair files.
    pub fn to_keypair_bytes(&self) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.signing.to_keypair_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address().to_string())
            .finish_non_exhaustive()
    }
}

/// Base58 (Bitcoin alphabet) of a 32-byte ed25519 public key. No checksum.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 32]);

impl Address {
    pub fn from_public_key(public_key: [u8; 32]) -> Self { Self(public_key) }

    pub fn public_key(&self) -> &[u8; 32] { &self.0 }

    /// Check an ed25519 signature made by this address's key.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        VerifyingKey::from_bytes(&self.0)
            .map(|key| key.verify(message, &Signature::from_bytes(signature)).is_ok())
            .unwrap_or(false)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| VaultError::Crypto(format!("invalid base58 address: {e}")))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| {
                VaultError::Crypto(format!("address must be 32 bytes, got {}", b.len()))
            })?;
        Ok(Self(key))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Keypair and address for account `index` under the Solana coin type.
pub fn derive_address(seed: &Seed, index: u32) -> VaultResult<(Keypair, Address)> {
    derive_address_with_coin(seed, SOLANA_COIN_TYPE, index)
}

pub fn derive_address_with_coin(
    seed: &Seed,
    coin_type: u32,
    index: u32,
) -> VaultResult<(Keypair, Address)> {
    let path = account_path(coin_type, index)?;
    let node = derive_node(seed, &path)?;
    let keypair = Keypair::from_secret(node.secret_key());
    let address = keypair.address();
    Ok((keypair, address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slip10::derive_path_from_bytes;

    #[test]
    fn test_account_path_shape() {
        assert_eq!(account_path(SOLANA_COIN_TYPE, 3).unwrap().to_string(), "m/44'/501'/3'/0'");
        assert!(matches!(
            account_path(SOLANA_COIN_TYPE, 0x8000_0000),
            Err(VaultError::InvalidDerivationPath(_))
        ));
    }

    #[test]
    fn test_slip10_vector1_public_key() {
        // SLIP-0010 ed25519 vector 1, chain m: public key 00a4b285...
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let node = derive_path_from_bytes(&seed, &DerivationPath::master()).unwrap();
        let keypair = Keypair::from_secret(node.secret_key());
        assert_eq!(
            hex::encode(keypair.public_key()),
            "a4b2856bfec510abab89753fac1ac0e1112364e7d250545963f135f2a33188ed"
        );
    }

    #[test]
    fn test_address_text_roundtrip() {
        let (_, address) = derive_address(&Seed::from_bytes([1u8; 64]), 0).unwrap();
        let text = address.to_string();
        assert!((32..=44).contains(&text.len()));
        assert_eq!(text.parse::<Address>().unwrap(), address);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{text}\""));
    }

    #[test]
    fn test_address_rejects_bad_text() {
        assert!("0OIl".parse::<Address>().is_err());
        assert!("3yZe7d".parse::<Address>().is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let (keypair, address) = derive_address(&Seed::from_bytes([2u8; 64]), 5).unwrap();
        let sig = keypair.sign(b"hello");
        assert!(address.verify(b"hello", &sig));
        assert!(!address.verify(b"hellp", &sig));
        assert_eq!(&keypair.to_keypair_bytes()[32..], &address.public_key()[..]);
    }

    #[test]
    fn test_coin_type_changes_address() {
        let seed = Seed::from_bytes([3u8; 64]);
        let (_, sol) = derive_address(&seed, 0).unwrap();
        let (_, other) = derive_address_with_coin(&seed, 607, 0).unwrap();
        assert_ne!(sol, other);
    }
}
