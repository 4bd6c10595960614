//! PIN-based sealing of the mnemonic at rest.
//!
//! Argon2id(pin, salt) → 32-byte key → AES-256-GCM with a fixed AAD. A blake3 hash of
//! the key is kept as a verifier so a wrong PIN is told apart from damaged ciphertext.

use crate::error::{VaultError, VaultResult};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const AAD_MNEMONIC: &[u8] = b"beeseed-mnemonic";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Argon2id cost parameters. Stored next to the ciphertext so they can change later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

/// 32-byte key derived from a PIN. Wiped on drop.
pub struct DerivedKey(Zeroizing<[u8; 32]>);

impl DerivedKey {
    fn verifier(&self) -> String {
        blake3::hash(&self.0[..]).to_hex().to_string()
    }
}

pub fn derive_key_from_pin(pin: &str, salt: &[u8], params: &KdfParams) -> VaultResult<DerivedKey> {
    let argon_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(32))
        .map_err(|e| VaultError::Crypto(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);
    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(pin.as_bytes(), salt, &mut key[..])
        .map_err(|e| VaultError::Crypto(format!("argon2: {e}")))?;
    Ok(DerivedKey(key))
}

/// On-disk form of a sealed mnemonic. Binary fields are base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedMnemonic {
    pub kdf: KdfParams,
    pub salt: String,
    pub verifier: String,
    pub nonce: String,
    pub ciphertext: String,
}

impl SealedMnemonic {
    pub fn seal(phrase: &str, pin: &str, params: KdfParams) -> VaultResult<Self> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let key = derive_key_from_pin(pin, &salt, &params)?;
        let cipher = Aes256Gcm::new_from_slice(&key.0[..])
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload { msg: phrase.as_bytes(), aad: AAD_MNEMONIC },
            )
            .map_err(|_| VaultError::Crypto("mnemonic encryption failed".into()))?;

        Ok(Self {
            kdf: params,
            salt: BASE64.encode(salt),
            verifier: key.verifier(),
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(ciphertext),
        })
    }

    pub fn verify_pin(&self, pin: &str) -> VaultResult<bool> {
        let key = derive_key_from_pin(pin, &decode(&self.salt, "salt")?, &self.kdf)?;
        Ok(key.verifier() == self.verifier)
    }

    /// Decrypt with `pin`. Wrong PIN → `InvalidPin`;
    /// right PIN but bad ciphertext → `CorruptSecret`.
    pub fn open(&self, pin: &str) -> VaultResult<Zeroizing<String>> {
        let key = derive_key_from_pin(pin, &decode(&self.salt, "salt")?, &self.kdf)?;
        if key.verifier() != self.verifier {
            return Err(VaultError::InvalidPin);
        }

        let nonce: [u8; NONCE_LEN] = decode(&self.nonce, "nonce")?
            .try_into()
            .map_err(|_| VaultError::CorruptSecret("sealed nonce has wrong length".into()))?;
        let ciphertext = decode(&self.ciphertext, "ciphertext")?;

        let cipher = Aes256Gcm::new_from_slice(&key.0[..])
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), Payload { msg: &ciphertext, aad: AAD_MNEMONIC })
            .map(Zeroizing::new)
            .map_err(|_| {
                VaultError::CorruptSecret("sealed mnemonic failed authentication".into())
            })?;

        let phrase = std::str::from_utf8(&plaintext)
            .map_err(|e| VaultError::CorruptSecret(format!("mnemonic utf8: {e}")))?;
        Ok(Zeroizing::new(phrase.to_string()))
    }
}

fn decode(value: &str, field: &str) -> VaultResult<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| VaultError::CorruptSecret(format!("sealed {field}: {e}")))
}
