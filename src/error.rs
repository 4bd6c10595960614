//! Errors - one taxonomy for the whole vault. Nothing here triggers regeneration.

use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Stored or supplied mnemonic failed checksum/decoding. Needs a user-driven reset.
    #[error("Corrupt secret: {0}")]
    CorruptSecret(String),

    /// A path level outside the hardened range. Indicates a defect, never user input.
    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    /// Durable read/write failed. Nothing was committed; safe to retry.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Account index exhausted at {0}")]
    IndexExhausted(u32),

    #[error("Vault is locked")]
    Locked,

    #[error("Invalid PIN")]
    InvalidPin,

    /// PIN auth is on but the stored mnemonic is plain text. Resolve with an explicit seal.
    #[error("Stored mnemonic is not sealed; seal it under a PIN before unlocking")]
    UnsealedSecret,

    #[error("Mnemonic already initialized")]
    AlreadyInitialized,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VaultError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, VaultError::Persistence(_))
    }
}

impl From<std::io::Error> for VaultError {
    fn from(e: std::io::Error) -> Self {
        VaultError::Persistence(e.to_string())
    }
}

impl From<bip39::Error> for VaultError {
    fn from(e: bip39::Error) -> Self {
        VaultError::CorruptSecret(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_persistence_is_retryable() {
        assert!(VaultError::Persistence("disk full".into()).is_retryable());
        assert!(!VaultError::CorruptSecret("checksum".into()).is_retryable());
        assert!(!VaultError::IndexExhausted(u32::MAX).is_retryable());
        assert!(!VaultError::Locked.is_retryable());
        assert!(!VaultError::UnsealedSecret.is_retryable());
    }

    #[test]
    fn test_io_maps_to_persistence() {
        let err: VaultError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, VaultError::Persistence(ref m) if m.contains("boom")));
    }
}
