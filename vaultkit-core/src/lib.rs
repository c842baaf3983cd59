//! Read-side secure credential storage.
//!
//! Recovers secrets that the mobile secure-storage writer persisted on
//! device, so a background process can authenticate without user
//! interaction. The writer's envelope scheme is a fixed compatibility
//! contract: a symmetric AES key wrapped under a hardware-backed RSA key
//! pair (PKCS#1 v1.5), records stored as `base64(iv[16] || ciphertext)`
//! encrypted with AES-CBC-PKCS#7. This crate only reads and decrypts;
//! encryption is owned by the external writer.
//!
//! All platform access goes through the capability traits in [`traits`]:
//! a [`traits::DeviceKeystore`] adapter over the native secure enclave and
//! [`traits::RecordStore`] views of the writer's preference stores. The
//! entry point is [`reader::SecureValueReader`], constructed once per
//! process and shared by reference.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod layout;
pub mod reader;
pub mod traits;

#[cfg(test)]
mod tests_utils;

pub use cipher::{SymmetricDecryptor, IV_SIZE};
pub use envelope::{EnvelopeUnwrapper, WrappedKeyAlgorithm};
pub use error::{StorageError, StorageResult};
pub use keys::{KeyAlias, KeyHandle, KeyPairSpec, KeyStoreKeyManager, SymmetricKey};
pub use layout::StorageLayout;
pub use reader::SecureValueReader;
pub use traits::{DeviceKeystore, RecordStore, StorageProvider};
