//! Software fakes and a reference writer for exercising the read pipeline.
//!
//! The fakes implement the same platform contracts as the production
//! adapters: the keystore does real RSA PKCS#1 v1.5 in software, and the
//! reference writer reproduces the external writer's on-disk format byte
//! for byte, so round-trip tests cover the true compatibility surface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::envelope::WrappedKeyAlgorithm;
use crate::error::{StorageError, StorageResult};
use crate::keys::{KeyAlias, KeyHandle, KeyPairSpec, SymmetricKey};
use crate::layout::StorageLayout;
use crate::traits::{DeviceKeystore, RecordStore, StorageProvider};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

/// Modulus size matching the platform keystore's default RSA pair.
const RSA_KEY_BITS: usize = 2048;

/// In-memory keystore doing real RSA PKCS#1 v1.5 in software.
pub(crate) struct SoftwareKeystore {
    keys: Mutex<HashMap<String, RsaPrivateKey>>,
    locked: AtomicBool,
    generated: AtomicUsize,
}

impl SoftwareKeystore {
    pub(crate) fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            locked: AtomicBool::new(false),
            generated: AtomicUsize::new(0),
        }
    }

    /// Simulates a device that has not been unlocked since boot.
    pub(crate) fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    /// Number of key pairs generated over the keystore's lifetime.
    pub(crate) fn generated_key_pairs(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    /// Wraps `key_bytes` under the public key of the pair at `alias`.
    pub(crate) fn wrap_for_tests(&self, alias: &KeyAlias, key_bytes: &[u8]) -> Vec<u8> {
        let keys = self.keys.lock().expect("keystore mutex");
        let private = keys.get(alias.as_str()).expect("key pair present");
        RsaPublicKey::from(private)
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, key_bytes)
            .expect("wrap")
    }

    fn check_unlocked(&self) -> StorageResult<()> {
        if self.locked.load(Ordering::SeqCst) {
            return Err(StorageError::KeystoreUnavailable(
                "device has not been unlocked since boot".to_string(),
            ));
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, RsaPrivateKey>>> {
        self.keys
            .lock()
            .map_err(|_| StorageError::KeystoreUnavailable("keystore mutex poisoned".to_string()))
    }
}

impl DeviceKeystore for SoftwareKeystore {
    fn private_key(&self, alias: &KeyAlias) -> StorageResult<Option<KeyHandle>> {
        self.check_unlocked()?;
        let keys = self.keys()?;
        Ok(keys
            .contains_key(alias.as_str())
            .then(|| KeyHandle::new(alias.clone())))
    }

    fn generate_key_pair(&self, spec: &KeyPairSpec) -> StorageResult<KeyHandle> {
        self.check_unlocked()?;
        let mut keys = self.keys()?;
        let private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|err| StorageError::KeystoreUnavailable(err.to_string()))?;
        keys.insert(spec.alias.as_str().to_string(), private);
        self.generated.fetch_add(1, Ordering::SeqCst);
        Ok(KeyHandle::new(spec.alias.clone()))
    }

    fn unwrap_key(
        &self,
        handle: &KeyHandle,
        wrapped: &[u8],
        algorithm: WrappedKeyAlgorithm,
    ) -> StorageResult<SymmetricKey> {
        self.check_unlocked()?;
        match algorithm {
            WrappedKeyAlgorithm::Aes => {}
        }
        let keys = self.keys()?;
        let private = keys.get(handle.alias().as_str()).ok_or_else(|| {
            StorageError::UnwrapFailure(format!("no private key under alias {}", handle.alias()))
        })?;
        let bytes = private
            .decrypt(Pkcs1v15Encrypt, wrapped)
            .map_err(|err| StorageError::UnwrapFailure(err.to_string()))?;
        Ok(SymmetricKey::from_bytes(bytes))
    }

    fn public_certificate(&self, alias: &KeyAlias) -> StorageResult<Option<Vec<u8>>> {
        self.check_unlocked()?;
        let keys = self.keys()?;
        keys.get(alias.as_str())
            .map(|private| {
                RsaPublicKey::from(private)
                    .to_public_key_der()
                    .map(|der| der.into_vec())
                    .map_err(|err| StorageError::UnwrapFailure(err.to_string()))
            })
            .transpose()
    }
}

/// In-memory preference store fake.
pub(crate) struct InMemoryRecordStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryRecordStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn put(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("record store mutex")
            .insert(key.to_string(), value.to_string());
    }

    pub(crate) fn remove(&self, key: &str) {
        self.entries.lock().expect("record store mutex").remove(key);
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::RecordStore("record store mutex poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }
}

/// Reimplements the external writer's write path against the fakes.
///
/// Generates an AES-256 key, wraps it under the keystore public key with
/// PKCS#1 v1.5, and persists records as `base64(iv[16] || ciphertext)`
/// under the layout's prefixed keys.
pub(crate) struct ReferenceWriter {
    layout: StorageLayout,
    key: [u8; 32],
}

impl ReferenceWriter {
    pub(crate) fn provision(
        layout: StorageLayout,
        keystore: &dyn DeviceKeystore,
        key_material: &InMemoryRecordStore,
    ) -> StorageResult<Self> {
        let alias = layout.key_alias();
        if keystore.private_key(&alias)?.is_none() {
            keystore.generate_key_pair(&KeyPairSpec::for_alias(&alias))?;
        }
        let der = keystore
            .public_certificate(&alias)?
            .ok_or_else(|| StorageError::UnwrapFailure("no certificate after generation".to_string()))?;
        let public = RsaPublicKey::from_public_key_der(&der)
            .map_err(|err| StorageError::UnwrapFailure(err.to_string()))?;

        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        let wrapped = public
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, &key)
            .map_err(|err| StorageError::UnwrapFailure(err.to_string()))?;
        key_material.put(layout.wrapped_key_entry(), &STANDARD.encode(wrapped));

        Ok(Self { layout, key })
    }

    pub(crate) fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub(crate) fn write(&self, records: &InMemoryRecordStore, entry: &str, plaintext: &[u8]) {
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut iv);
        let ciphertext = Aes256CbcEnc::new_from_slices(&self.key, &iv)
            .expect("cipher params")
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut record = iv.to_vec();
        record.extend_from_slice(&ciphertext);
        records.put(&self.layout.record_key(entry), &STANDARD.encode(record));
    }
}

/// Platform provider fake wiring the software components together.
pub(crate) struct SoftwareProvider {
    layout: StorageLayout,
    keystore: Arc<SoftwareKeystore>,
    records: Arc<InMemoryRecordStore>,
    key_material: Arc<InMemoryRecordStore>,
}

impl SoftwareProvider {
    pub(crate) fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            keystore: Arc::new(SoftwareKeystore::new()),
            records: Arc::new(InMemoryRecordStore::new()),
            key_material: Arc::new(InMemoryRecordStore::new()),
        }
    }

    pub(crate) fn software_keystore(&self) -> &SoftwareKeystore {
        &self.keystore
    }

    pub(crate) fn software_record_store(&self) -> &InMemoryRecordStore {
        &self.records
    }

    pub(crate) fn software_key_material_store(&self) -> &InMemoryRecordStore {
        &self.key_material
    }
}

impl StorageProvider for SoftwareProvider {
    fn keystore(&self) -> Arc<dyn DeviceKeystore> {
        self.keystore.clone()
    }

    fn record_store(&self) -> Arc<dyn RecordStore> {
        self.records.clone()
    }

    fn key_material_store(&self) -> Arc<dyn RecordStore> {
        self.key_material.clone()
    }

    fn layout(&self) -> StorageLayout {
        self.layout.clone()
    }
}
