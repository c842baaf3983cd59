//! Platform interfaces for the secure value read path.
//!
//! The pipeline only ever talks to these traits. Each target platform
//! supplies an adapter over its native secure-enclave API and preference
//! stores; tests drive the same pipeline through software fakes.

use std::sync::Arc;

use crate::envelope::WrappedKeyAlgorithm;
use crate::error::StorageResult;
use crate::keys::{KeyAlias, KeyHandle, KeyPairSpec, SymmetricKey};
use crate::layout::StorageLayout;

/// Device keystore interface over the platform's hardware-backed provider.
///
/// Private keys generated through this interface are non-exportable: the
/// unwrap operation is the only way to recover a symmetric key wrapped
/// under the pair's public key, and it executes inside the provider.
pub trait DeviceKeystore: Send + Sync {
    /// Returns a handle to the private key stored under `alias`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::KeystoreUnavailable`] if the keystore
    /// cannot be opened, e.g. the device has not been unlocked since boot.
    fn private_key(&self, alias: &KeyAlias) -> StorageResult<Option<KeyHandle>>;

    /// Generates a key pair per `spec` inside the hardware-backed provider.
    ///
    /// Callers must not assume idempotency here; serialization of
    /// concurrent generation is owned by
    /// [`crate::keys::KeyStoreKeyManager`].
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be opened or refuses the
    /// generation parameters.
    fn generate_key_pair(&self, spec: &KeyPairSpec) -> StorageResult<KeyHandle>;

    /// Unwraps a symmetric key inside the provider, using the private key
    /// behind `handle` with PKCS#1 v1.5 padding.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::UnwrapFailure`] if `wrapped` is
    /// malformed, `algorithm` does not match what the provider expects, or
    /// the handle no longer refers to a private key.
    fn unwrap_key(
        &self,
        handle: &KeyHandle,
        wrapped: &[u8],
        algorithm: WrappedKeyAlgorithm,
    ) -> StorageResult<SymmetricKey>;

    /// Returns the DER-encoded certificate of the key pair under `alias`,
    /// if one exists.
    ///
    /// The companion writer reads this to wrap the symmetric key; the read
    /// path only uses it to observe key identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be opened or the
    /// certificate cannot be encoded.
    fn public_certificate(&self, alias: &KeyAlias) -> StorageResult<Option<Vec<u8>>>;
}

/// Read-only view of one writer-owned preference store.
pub trait RecordStore: Send + Sync {
    /// Reads the raw string stored under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::RecordStore`] if the read fails.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
}

/// Provider responsible for platform-specific read-path components.
pub trait StorageProvider: Send + Sync {
    /// Returns the device keystore implementation.
    fn keystore(&self) -> Arc<dyn DeviceKeystore>;

    /// Returns the store holding encrypted records (store A).
    fn record_store(&self) -> Arc<dyn RecordStore>;

    /// Returns the store holding the wrapped symmetric key (store B).
    fn key_material_store(&self) -> Arc<dyn RecordStore>;

    /// Returns the storage layout selected by the platform.
    fn layout(&self) -> StorageLayout;
}
