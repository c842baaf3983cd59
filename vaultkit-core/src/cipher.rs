//! AES-CBC decryption of stored records.
//!
//! The transform is fixed by the external writer: AES in CBC mode with
//! PKCS#7 padding and an explicit 16-byte IV, no authentication tag.
//! Corruption that happens to unpad cleanly yields garbage plaintext
//! instead of an error; that limitation is inherited from the format and
//! must not be "fixed" here without a coordinated format version bump.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, KeyIvInit};

use crate::error::{StorageError, StorageResult};
use crate::keys::SymmetricKey;

/// Initialization vector size fixed by the writer's record format.
pub const IV_SIZE: usize = 16;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Stateless AES-CBC-PKCS#7 decryptor.
pub struct SymmetricDecryptor;

impl SymmetricDecryptor {
    /// Decrypts `ciphertext` with `key` and the explicit `iv`.
    ///
    /// Deterministic, stateless and synchronous. The cipher width is
    /// picked from the unwrapped key length (16, 24 or 32 bytes).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRecord`] if `iv` is not exactly
    /// [`IV_SIZE`] bytes (checked before the cipher is built), and
    /// [`StorageError::DecryptFailure`] on an unsupported key length or a
    /// padding error (wrong key, wrong IV, or corrupted ciphertext).
    pub fn decrypt(
        ciphertext: &[u8],
        key: &SymmetricKey,
        iv: &[u8],
    ) -> StorageResult<Vec<u8>> {
        if iv.len() != IV_SIZE {
            return Err(StorageError::InvalidRecord(format!(
                "iv is {} bytes, expected {IV_SIZE}",
                iv.len()
            )));
        }
        let key_bytes = key.as_bytes();
        let decrypted = match key_bytes.len() {
            16 => Aes128CbcDec::new_from_slices(key_bytes, iv)
                .map_err(bad_cipher_params)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            24 => Aes192CbcDec::new_from_slices(key_bytes, iv)
                .map_err(bad_cipher_params)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            32 => Aes256CbcDec::new_from_slices(key_bytes, iv)
                .map_err(bad_cipher_params)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            other => {
                return Err(StorageError::DecryptFailure(format!(
                    "unsupported symmetric key length {other}"
                )))
            }
        };
        decrypted.map_err(|_| {
            StorageError::DecryptFailure(
                "bad padding: wrong key, wrong iv, or corrupted ciphertext".to_string(),
            )
        })
    }
}

fn bad_cipher_params(err: aes::cipher::InvalidLength) -> StorageError {
    StorageError::DecryptFailure(format!("cipher rejected key or iv: {err}"))
}
