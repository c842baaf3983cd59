//! Read-side pipeline recovering secrets persisted by the external writer.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use secrecy::SecretString;
use tracing::debug;

use crate::cipher::{SymmetricDecryptor, IV_SIZE};
use crate::envelope::{EnvelopeUnwrapper, WrappedKeyAlgorithm};
use crate::error::{StorageError, StorageResult};
use crate::keys::KeyStoreKeyManager;
use crate::layout::StorageLayout;
use crate::traits::{DeviceKeystore, RecordStore, StorageProvider};

/// Recovers stored secrets: one context object per process entry point.
///
/// Construct once (main process, background service, or notification
/// extension) and share by reference; every component needing decrypt
/// access goes through it. Each [`SecureValueReader::lookup`] re-reads
/// storage and re-derives the secret; nothing is cached between calls.
pub struct SecureValueReader {
    layout: StorageLayout,
    records: Arc<dyn RecordStore>,
    key_material: Arc<dyn RecordStore>,
    key_manager: KeyStoreKeyManager,
    unwrapper: EnvelopeUnwrapper,
}

impl SecureValueReader {
    /// Builds a reader from explicit components.
    #[must_use]
    pub fn new(
        layout: StorageLayout,
        keystore: Arc<dyn DeviceKeystore>,
        records: Arc<dyn RecordStore>,
        key_material: Arc<dyn RecordStore>,
    ) -> Self {
        let key_manager = KeyStoreKeyManager::new(Arc::clone(&keystore), layout.key_alias());
        let unwrapper = EnvelopeUnwrapper::new(keystore);
        Self {
            layout,
            records,
            key_material,
            key_manager,
            unwrapper,
        }
    }

    /// Builds a reader from a platform provider.
    #[must_use]
    pub fn from_provider(provider: &dyn StorageProvider) -> Self {
        Self::new(
            provider.layout(),
            provider.keystore(),
            provider.record_store(),
            provider.key_material_store(),
        )
    }

    /// Looks up and decrypts the secret stored under `entry`.
    ///
    /// Returns `Ok(None)` if nothing is stored under the entry; that case
    /// never touches the keystore, so probing for an absent record works
    /// even while the device is locked.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRecord`] for a malformed record,
    /// [`StorageError::KeyMaterialMissing`] if the wrapped symmetric key is
    /// absent although a record exists, [`StorageError::KeystoreUnavailable`]
    /// (retryable) if the keystore cannot be opened, and
    /// [`StorageError::UnwrapFailure`] / [`StorageError::DecryptFailure`]
    /// for unwrap and decrypt failures. No fallback value is ever
    /// substituted.
    pub fn lookup(&self, entry: &str) -> StorageResult<Option<SecretString>> {
        let Some(raw) = self.records.get(&self.layout.record_key(entry))? else {
            debug!(entry, "no stored record");
            return Ok(None);
        };
        let decoded = decode_base64(&raw)
            .map_err(|err| StorageError::InvalidRecord(format!("record is not valid base64: {err}")))?;
        if decoded.len() < IV_SIZE {
            return Err(StorageError::InvalidRecord(format!(
                "record is {} bytes, shorter than the {IV_SIZE}-byte iv",
                decoded.len()
            )));
        }
        let (iv, ciphertext) = decoded.split_at(IV_SIZE);

        let wrapped = self.wrapped_symmetric_key()?;
        let handle = self.key_manager.ensure_key_pair()?;
        let key = self
            .unwrapper
            .unwrap_key(&wrapped, WrappedKeyAlgorithm::Aes, &handle)?;
        let plaintext = SymmetricDecryptor::decrypt(ciphertext, &key, iv)?;

        let secret = String::from_utf8(plaintext).map_err(|_| {
            StorageError::DecryptFailure("plaintext is not valid utf-8".to_string())
        })?;
        Ok(Some(SecretString::from(secret)))
    }

    fn wrapped_symmetric_key(&self) -> StorageResult<Vec<u8>> {
        let Some(raw) = self.key_material.get(self.layout.wrapped_key_entry())? else {
            return Err(StorageError::KeyMaterialMissing);
        };
        decode_base64(&raw)
            .map_err(|err| StorageError::UnwrapFailure(format!("wrapped key is not valid base64: {err}")))
    }
}

/// Decodes a stored base64 value, ignoring whitespace.
///
/// The writer's platform encoder line-wraps long values, so embedded and
/// trailing newlines are part of the stored format.
fn decode_base64(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if raw.bytes().any(|byte| byte.is_ascii_whitespace()) {
        let compact: String = raw.split_ascii_whitespace().collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(raw)
    }
}
