//! Unwrapping of the writer's wrapped symmetric key.

use std::fmt;
use std::sync::Arc;

use crate::error::{StorageError, StorageResult};
use crate::keys::{KeyHandle, SymmetricKey};
use crate::traits::DeviceKeystore;

/// Algorithm the writer declared when wrapping the symmetric key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrappedKeyAlgorithm {
    /// AES, the only algorithm the writer produces.
    Aes,
}

impl WrappedKeyAlgorithm {
    /// Returns the provider-facing algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aes => "AES",
        }
    }
}

impl fmt::Display for WrappedKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Recovers the symmetric key from its asymmetric envelope.
///
/// The unwrap executes inside the keystore provider referenced by the key
/// handle; the private key never leaves the hardware boundary, so this is
/// the only path to the symmetric key.
pub struct EnvelopeUnwrapper {
    keystore: Arc<dyn DeviceKeystore>,
}

impl EnvelopeUnwrapper {
    /// Builds an unwrapper over `keystore`.
    #[must_use]
    pub fn new(keystore: Arc<dyn DeviceKeystore>) -> Self {
        Self { keystore }
    }

    /// Unwraps `wrapped` with the private key behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnwrapFailure`] if `wrapped` is empty or
    /// malformed, `algorithm` does not match the provider's expectation, or
    /// the handle is invalid. Returns
    /// [`StorageError::KeystoreUnavailable`] if the keystore cannot be
    /// opened.
    pub fn unwrap_key(
        &self,
        wrapped: &[u8],
        algorithm: WrappedKeyAlgorithm,
        handle: &KeyHandle,
    ) -> StorageResult<SymmetricKey> {
        if wrapped.is_empty() {
            return Err(StorageError::UnwrapFailure(
                "wrapped key is empty".to_string(),
            ));
        }
        self.keystore.unwrap_key(handle, wrapped, algorithm)
    }
}
