//! Vault - the core's face to the UI layer.
//!
//! ```text
//! Vault
//!   ├── MnemonicManager  (mnemonic.json, plain or sealed)
//!   ├── IndexAllocator   (index-<fingerprint>.json)
//!   └── per request: Seed → m/44'/501'/{index}'/0' → Keypair → Address
//! ```
//!
//! With `AuthMode::Pin` the vault opens locked; `unlock(pin)` is the credential gate.
//! `reveal_mnemonic` trusts that gate and performs no check of its own. A plain record found
//! under PIN auth fails with `UnsealedSecret` until `seal_plain(pin)` migrates it.

use crate::address::{derive_address_with_coin, Address, Keypair};
use crate::allocator::IndexAllocator;
use crate::config::{AuthMode, VaultConfig};
use crate::error::{VaultError, VaultResult};
use crate::mnemonic::{Mnemonic, MnemonicManager, Protection, MNEMONIC_KEY};
use crate::seed::derive_seed;
use crate::store::SecretStore;
use std::sync::{Arc, Mutex};
use zeroize::Zeroizing;

pub struct Vault {
    inner: Arc<Mutex<VaultInner>>,
}

struct VaultInner {
    config: VaultConfig,
    store: Arc<dyn SecretStore>,
    unlocked: Option<Unlocked>,
}

struct Unlocked {
    mnemonic: Mnemonic,
    allocator: Arc<IndexAllocator>,
}

/// Snapshot taken under the vault lock so derivation runs outside it.
struct Session {
    mnemonic: Mnemonic,
    allocator: Arc<IndexAllocator>,
    passphrase: Zeroizing<String>,
    coin_type: u32,
}

impl Vault {
    /// Open the file-backed vault for `config.app`.
    #[cfg(feature = "native")]
    pub fn open(config: VaultConfig) -> VaultResult<Self> {
        let store = crate::store::FileStore::open(config.resolve_data_dir())?;
        Self::open_with_store(config, Arc::new(store))
    }

    /// Create the vault from an existing phrase. Fails if a mnemonic is already stored.
    #[cfg(feature = "native")]
    pub fn import(config: VaultConfig, phrase: &str, pin: Option<&str>) -> VaultResult<Self> {
        let store = crate::store::FileStore::open(config.resolve_data_dir())?;
        Self::import_with_store(config, Arc::new(store), phrase, pin)
    }

    /// Open only if a mnemonic is already stored. Never generates one.
    #[cfg(feature = "native")]
    pub fn open_existing(config: VaultConfig) -> VaultResult<Option<Self>> {
        let store = crate::store::FileStore::open(config.resolve_data_dir())?;
        Self::open_existing_with_store(config, Arc::new(store))
    }

    pub fn open_existing_with_store(
        config: VaultConfig,
        store: Arc<dyn SecretStore>,
    ) -> VaultResult<Option<Self>> {
        if !store.exists(MNEMONIC_KEY)? {
            return Ok(None);
        }
        Self::open_with_store(config, store).map(Some)
    }

    pub fn open_with_store(config: VaultConfig, store: Arc<dyn SecretStore>) -> VaultResult<Self> {
        let mut inner = VaultInner { config, store, unlocked: None };
        if !inner.config.auth_mode.seals_mnemonic() {
            let manager = MnemonicManager::new(inner.store.clone(), Protection::None);
            let mnemonic = manager.get_or_create_mnemonic()?;
            inner.initialize_with_mnemonic(mnemonic)?;
        }
        tracing::debug!(app = %inner.config.app, auth = %inner.config.auth_mode, "vault opened");
        Ok(Self { inner: Arc::new(Mutex::new(inner)) })
    }

    pub fn import_with_store(
        config: VaultConfig,
        store: Arc<dyn SecretStore>,
        phrase: &str,
        pin: Option<&str>,
    ) -> VaultResult<Self> {
        let protection = match config.auth_mode {
            AuthMode::None => Protection::None,
            AuthMode::Pin => {
                let pin = pin.filter(|p| !p.is_empty()).ok_or(VaultError::InvalidPin)?;
                Protection::Pin { pin: Zeroizing::new(pin.to_string()), kdf: config.kdf }
            }
        };
        MnemonicManager::new(store.clone(), protection).import_mnemonic(phrase)?;

        let vault = Self::open_with_store(config, store)?;
        if let Some(pin) = pin {
            if vault.is_locked()? && !vault.unlock(pin)? {
                return Err(VaultError::InvalidPin);
            }
        }
        Ok(vault)
    }

    pub fn is_locked(&self) -> VaultResult<bool> {
        Ok(self.guard()?.unlocked.is_none())
    }

    pub fn is_initialized(&self) -> VaultResult<bool> {
        self.guard()?.store.exists(MNEMONIC_KEY)
    }

    /// Verify `pin` and load the mnemonic. The first-ever unlock creates and seals it.
    /// Returns `false` on a wrong PIN.
    pub fn unlock(&self, pin: &str) -> VaultResult<bool> {
        self.guard()?.unlock(pin)
    }

    /// Seal a plain mnemonic record under `pin` and unlock with it.
    /// Returns `false` on an empty PIN, or on a wrong PIN when the record is already sealed.
    pub fn seal_plain(&self, pin: &str) -> VaultResult<bool> {
        self.guard()?.seal_plain(pin)
    }

    /// Forget the in-memory mnemonic. No-op (returns `false`) without PIN auth.
    pub fn lock(&self) -> VaultResult<bool> {
        let mut guard = self.guard()?;
        if !guard.config.auth_mode.seals_mnemonic() {
            return Ok(false);
        }
        guard.unlocked = None;
        Ok(true)
    }

    /// The root mnemonic. Callers gate this behind their own credential check.
    pub fn reveal_mnemonic(&self) -> VaultResult<Mnemonic> {
        Ok(self.session()?.mnemonic)
    }

    pub fn fingerprint(&self) -> VaultResult<String> {
        Ok(self.session()?.allocator.fingerprint().to_string())
    }

    /// Index the next `create_next_address` will use.
    pub fn current_index(&self) -> VaultResult<u32> {
        self.session()?.allocator.current()
    }

    /// Allocate a never-used account index and return its address.
    pub fn create_next_address(&self) -> VaultResult<Address> {
        Ok(self.create_next_account()?.1)
    }

    /// Like `create_next_address`, also returning the index that was allocated.
    pub fn create_next_account(&self) -> VaultResult<(u32, Address)> {
        let session = self.session()?;
        let index = session.allocator.next_index()?;
        let (_keypair, address) = session.derive(index)?;
        tracing::info!(index, %address, "created account address");
        Ok((index, address))
    }

    /// Re-derive the address of an already allocated (or any) index. Does not allocate.
    pub fn address_at(&self, index: u32) -> VaultResult<Address> {
        Ok(self.session()?.derive(index)?.1)
    }

    /// Signing keypair for `index`, for the immediate caller only.
    pub fn keypair_at(&self, index: u32) -> VaultResult<Keypair> {
        Ok(self.session()?.derive(index)?.0)
    }

    fn guard(&self) -> VaultResult<std::sync::MutexGuard<'_, VaultInner>> {
        self.inner.lock().map_err(|_| VaultError::Persistence("vault lock".into()))
    }

    fn session(&self) -> VaultResult<Session> {
        let guard = self.guard()?;
        let unlocked = guard.unlocked.as_ref().ok_or(VaultError::Locked)?;
        Ok(Session {
            mnemonic: unlocked.mnemonic.clone(),
            allocator: unlocked.allocator.clone(),
            passphrase: guard.config.passphrase.clone(),
            coin_type: guard.config.coin_type,
        })
    }
}

impl Session {
    fn derive(&self, index: u32) -> VaultResult<(Keypair, Address)> {
        let seed = derive_seed(&self.mnemonic, &self.passphrase)?;
        derive_address_with_coin(&seed, self.coin_type, index)
    }
}

impl VaultInner {
    fn pin_manager(&self, pin: &str) -> MnemonicManager {
        let protection = Protection::Pin {
            pin: Zeroizing::new(pin.to_string()),
            kdf: self.config.kdf,
        };
        MnemonicManager::new(self.store.clone(), protection)
    }

    fn unlock(&mut self, pin: &str) -> VaultResult<bool> {
        if !self.config.auth_mode.seals_mnemonic() {
            return Ok(true);
        }
        if pin.is_empty() {
            return Ok(false);
        }

        match self.pin_manager(pin).get_or_create_mnemonic() {
            Ok(mnemonic) => {
                self.initialize_with_mnemonic(mnemonic)?;
                Ok(true)
            }
            Err(VaultError::InvalidPin) => {
                tracing::warn!(app = %self.config.app, "unlock rejected: wrong PIN");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn seal_plain(&mut self, pin: &str) -> VaultResult<bool> {
        if !self.config.auth_mode.seals_mnemonic() {
            return Err(VaultError::InvalidPin);
        }
        if pin.is_empty() {
            return Ok(false);
        }

        match self.pin_manager(pin).seal_plain_record() {
            Ok(mnemonic) => {
                self.initialize_with_mnemonic(mnemonic)?;
                Ok(true)
            }
            Err(VaultError::InvalidPin) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn initialize_with_mnemonic(&mut self, mnemonic: Mnemonic) -> VaultResult<()> {
        let fingerprint = mnemonic.fingerprint()?;
        let allocator = Arc::new(IndexAllocator::new(self.store.clone(), fingerprint));
        self.unlocked = Some(Unlocked { mnemonic, allocator });
        Ok(())
    }
}
