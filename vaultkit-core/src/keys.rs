//! Key identities, handles, and the hardware key-pair manager.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::info;
use zeroize::Zeroizing;

use crate::error::{StorageError, StorageResult};
use crate::traits::DeviceKeystore;

/// Validity of the self-signed certificate, in years from generation time.
const CERT_VALIDITY_YEARS: u32 = 25;
/// Serial number of the self-signed certificate.
const CERT_SERIAL: u64 = 1;

/// Stable per-installation identifier for the hardware key pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyAlias(String);

impl KeyAlias {
    /// Wraps an already-derived alias string.
    ///
    /// Aliases are normally derived via
    /// [`crate::layout::StorageLayout::key_alias`].
    #[must_use]
    pub const fn new(alias: String) -> Self {
        Self(alias)
    }

    /// Returns the alias as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to a private key held inside the keystore provider.
///
/// The handle never carries key bytes; it is only meaningful to the
/// [`DeviceKeystore`] that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHandle {
    alias: KeyAlias,
}

impl KeyHandle {
    /// Builds a handle for the key pair stored under `alias`.
    #[must_use]
    pub const fn new(alias: KeyAlias) -> Self {
        Self { alias }
    }

    /// Returns the alias this handle refers to.
    #[must_use]
    pub const fn alias(&self) -> &KeyAlias {
        &self.alias
    }
}

/// An unwrapped symmetric key, zeroized on drop.
///
/// Key bytes are only readable inside this crate; the decryptor is the
/// sole consumer.
pub struct SymmetricKey(Zeroizing<Vec<u8>>);

impl SymmetricKey {
    /// Takes ownership of raw key bytes recovered by a keystore provider.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey([REDACTED; {}])", self.len())
    }
}

/// Generation parameters for a hardware-backed key pair.
///
/// The values are fixed by the external writer's format: an RSA pair with a
/// self-signed certificate, subject common name equal to the alias, serial
/// number 1 and a 25-year validity window starting at generation time.
/// Adapters must also configure PKCS#1 v1.5 encryption padding, SHA-256
/// digest and ECB block mode so the pair can unwrap the writer's key.
#[derive(Debug, Clone)]
pub struct KeyPairSpec {
    /// Keystore alias the pair is stored under.
    pub alias: KeyAlias,
    /// Subject common name of the self-signed certificate.
    pub common_name: String,
    /// Certificate validity in years, starting at generation time.
    pub validity_years: u32,
    /// Certificate serial number.
    pub serial: u64,
}

impl KeyPairSpec {
    /// Builds the writer-compatible spec for `alias`.
    #[must_use]
    pub fn for_alias(alias: &KeyAlias) -> Self {
        Self {
            alias: alias.clone(),
            common_name: alias.to_string(),
            validity_years: CERT_VALIDITY_YEARS,
            serial: CERT_SERIAL,
        }
    }
}

/// Owns the hardware-backed key pair for one alias.
///
/// Creation is lazy and idempotent: the keystore is probed before the
/// generation lock and re-probed after acquiring it, so concurrent callers
/// in this process generate at most one pair, and concurrent processes are
/// covered by the provider re-check.
pub struct KeyStoreKeyManager {
    keystore: Arc<dyn DeviceKeystore>,
    alias: KeyAlias,
    generation: Mutex<()>,
}

impl KeyStoreKeyManager {
    /// Builds a manager for the key pair stored under `alias`.
    #[must_use]
    pub fn new(keystore: Arc<dyn DeviceKeystore>, alias: KeyAlias) -> Self {
        Self {
            keystore,
            alias,
            generation: Mutex::new(()),
        }
    }

    /// Returns the alias this manager owns.
    #[must_use]
    pub const fn alias(&self) -> &KeyAlias {
        &self.alias
    }

    /// Returns a handle to the key pair, generating it on first access.
    ///
    /// Idempotent: an existing pair is returned unchanged, never
    /// regenerated.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::KeystoreUnavailable`] if the keystore cannot
    /// be opened (retryable), or whatever the provider reports if
    /// generation fails.
    pub fn ensure_key_pair(&self) -> StorageResult<KeyHandle> {
        if let Some(handle) = self.keystore.private_key(&self.alias)? {
            return Ok(handle);
        }
        let _guard = self.generation.lock().map_err(|_| {
            StorageError::KeystoreUnavailable("key generation guard poisoned".to_string())
        })?;
        if let Some(handle) = self.keystore.private_key(&self.alias)? {
            return Ok(handle);
        }
        info!(alias = %self.alias, "generating hardware-backed key pair");
        self.keystore
            .generate_key_pair(&KeyPairSpec::for_alias(&self.alias))
    }

    /// Returns a handle to the private key without generating anything.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnwrapFailure`] if no key pair exists under
    /// the alias, or [`StorageError::KeystoreUnavailable`] if the keystore
    /// cannot be opened.
    pub fn private_key_handle(&self) -> StorageResult<KeyHandle> {
        self.keystore.private_key(&self.alias)?.ok_or_else(|| {
            StorageError::UnwrapFailure(format!("no private key under alias {}", self.alias))
        })
    }
}
