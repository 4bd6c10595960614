//! Beeseed: one mnemonic, unbounded reproducible wallet addresses.
//!
//! # Architecture
//!
//! ```text
//! Vault (entry point)
//!   │
//!   ├── MnemonicManager ── generate once / load / validate checksum
//!   │     └── Store "mnemonic.json" (plain, or sealed under a PIN)
//!   │
//!   ├── IndexAllocator ── next unused account index
//!   │     └── Store "index-<fingerprint>.json"
//!   │
//!   └── per request:
//!         Mnemonic ─PBKDF2─→ Seed ─SLIP-0010─→ m/44'/501'/{index}'/0'
//!                                             └─→ ed25519 Keypair ─base58─→ Address
//! ```
//!
//! # Features
//!
//! - `native` - File-backed store, data-dir resolution, log subscriber, `beeseed` CLI
//!
//! # Usage
//!
//! ```ignore
//! use beeseed::{Vault, VaultConfig};
//!
//! let vault = Vault::open(VaultConfig::new("mywallet"))?;
//! vault.unlock("1234")?;
//!
//! let address = vault.create_next_address()?;
//! let words = vault.reveal_mnemonic()?;
//! ```

pub mod address;
pub mod allocator;
pub mod auth;
pub mod config;
pub mod error;
pub mod mnemonic;
pub mod seed;
pub mod slip10;
pub mod store;
pub mod vault;

#[cfg(feature = "native")]
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================
pub use address::{derive_address, Address, Keypair, SOLANA_COIN_TYPE};
pub use allocator::IndexAllocator;
pub use config::{AuthMode, VaultConfig};
pub use error::{VaultError, VaultResult};
pub use mnemonic::{Mnemonic, MnemonicManager, Protection};
pub use seed::{derive_seed, Seed};
pub use slip10::{derive_node, ChildIndex, DerivationPath, DerivedKey, HARDENED_OFFSET};
pub use store::{MemoryStore, SecretStore};
pub use vault::Vault;

#[cfg(feature = "native")]
pub use store::FileStore;
