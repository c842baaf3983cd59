//! Writer-compatible naming for stores, records, and the keystore alias.
//!
//! Every constant in this module is fixed by the mobile secure-storage
//! writer that owns the encrypt path. Changing any of them breaks
//! cross-process decryption of already-persisted records; the application
//! package identifier is the only per-installation input.

use crate::keys::KeyAlias;

/// Preference store holding the encrypted records (store A).
const RECORD_STORE_NAME: &str = "FlutterSecureStorage";
/// Preference store holding the wrapped symmetric key (store B).
const KEY_MATERIAL_STORE_NAME: &str = "FlutterSecureKeyStorage";
/// Prefix the writer puts in front of every record key.
const RECORD_KEY_PREFIX: &str = "VGhpcyBpcyB0aGUgcHJlZml4IGZvciBhIHNlY3VyZSBzdG9yYWdl";
/// Entry the writer stores the wrapped symmetric key under.
const WRAPPED_KEY_ENTRY: &str = "VGhpcyBpcyB0aGUga2V5IGZvciBhIHNlY3VyZSBzdG9yYWdlIEFFUyBLZXkK";
/// Suffix appended to the package identifier to form the keystore alias.
const KEY_ALIAS_SUFFIX: &str = "FlutterSecureStoragePluginKey";

/// Derives every writer-compatible name from the application package
/// identifier.
///
/// Platform adapters use the store names to open the right preference
/// stores; the read pipeline uses the record keys and the keystore alias.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    package_id: String,
}

impl StorageLayout {
    /// Builds a layout for the installation identified by `package_id`.
    #[must_use]
    pub fn new(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
        }
    }

    /// Returns the application package identifier.
    #[must_use]
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// Returns the name of the preference store holding encrypted records.
    #[must_use]
    pub const fn record_store_name(&self) -> &'static str {
        RECORD_STORE_NAME
    }

    /// Returns the name of the preference store holding the wrapped key.
    #[must_use]
    pub const fn key_material_store_name(&self) -> &'static str {
        KEY_MATERIAL_STORE_NAME
    }

    /// Returns the record store key for `entry`.
    #[must_use]
    pub fn record_key(&self, entry: &str) -> String {
        format!("{RECORD_KEY_PREFIX}_{entry}")
    }

    /// Returns the key the wrapped symmetric key is stored under.
    #[must_use]
    pub const fn wrapped_key_entry(&self) -> &'static str {
        WRAPPED_KEY_ENTRY
    }

    /// Returns the keystore alias for this installation's key pair.
    #[must_use]
    pub fn key_alias(&self) -> KeyAlias {
        KeyAlias::new(format!("{}.{KEY_ALIAS_SUFFIX}", self.package_id))
    }
}
